mod config;
mod driver;
mod error;
mod test_runner;

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use xtract::Query;
use xtract::block::Block;
use xtract::parser::CommandLine;

use crate::config::Config;
use crate::driver::{Overrides, Settings};
use crate::error::CliError;

const SUBCOMMANDS: &[&str] = &["run", "test", "help"];
const TOP_LEVEL_FLAGS: &[&str] = &["-h", "--help", "-V", "--version"];

#[derive(Parser)]
#[command(name = "xtract", version, about = "Extract fields from XML records")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a query over XML records (the default)
    Run(RunArgs),

    /// Run .test.xml fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// XML input file (standard input when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// TOML config file (defaults to ./xtract.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Printed before the first record
    #[arg(long)]
    head: Option<String>,

    /// Printed after the last record
    #[arg(long)]
    tail: Option<String>,

    /// Printed before each record with output
    #[arg(long)]
    hd: Option<String>,

    /// Printed after each record with output
    #[arg(long)]
    tl: Option<String>,

    /// Two-column TSV used by -translate
    #[arg(long)]
    translate: Option<PathBuf>,

    /// Two-column TSV of pattern and label used by -classify
    #[arg(long)]
    patterns: Option<PathBuf>,

    /// Worker threads (0 = one per core)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Keep entity references undecoded
    #[arg(long)]
    raw: bool,

    /// Drop inline formatting tags from element text
    #[arg(long)]
    no_markup: bool,

    /// Compile only, don't read input (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Print the compiled block tree
    #[arg(long)]
    tree: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,

    /// The query, starting at -pattern
    #[arg(last = true, required = true)]
    query: Vec<String>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.xml file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

/// Insert `run` when no subcommand is given, and `--` before `-pattern` so
/// the query reaches clap as trailing arguments.
fn normalize_args(mut args: Vec<String>) -> Vec<String> {
    if let Some(start) = args.iter().position(|a| a == "-pattern") {
        if !args[..start].iter().any(|a| a == "--") {
            args.insert(start, "--".to_string());
        }
    }
    let explicit = args
        .get(1)
        .is_some_and(|first| SUBCOMMANDS.contains(&first.as_str()) || TOP_LEVEL_FLAGS.contains(&first.as_str()));
    if !explicit && args.len() > 1 {
        args.insert(1, "run".to_string());
    }
    args
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "xtract=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() {
    let args = normalize_args(std::env::args().collect());
    let cli = Cli::parse_from(&args);

    match cli.command {
        Command::Run(run_args) => {
            init_tracing(run_args.verbose);
            if let Err(err) = do_run(run_args, cli.no_color) {
                eprintln!("error: {}", err);
                process::exit(1);
            }
        }
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

/// Compile the query, rendering any error against the command line.
fn compile(tokens: &[String], no_color: bool) -> Query {
    let mut files = SimpleFiles::new();
    let line = CommandLine::new(tokens);
    let file_id = files.add("<command line>".to_string(), line.source().to_string());
    let parser = xtract::parser::Parser::new(tokens, file_id);

    match parser.parse() {
        Ok(query) => query,
        Err(error) => {
            let color_choice = if no_color {
                ColorChoice::Never
            } else {
                ColorChoice::Auto
            };
            let writer = StandardStream::stderr(color_choice);
            let config = term::Config::default();
            let _ = term::emit_to_write_style(
                &mut writer.lock(),
                &config,
                &files,
                &error.to_diagnostic(),
            );
            process::exit(1);
        }
    }
}

fn print_tree(block: &Block, indent: usize) {
    let pad = "  ".repeat(indent);
    println!(
        "{}{:?} {} [{}] {} condition(s), {} command(s), {} else",
        pad,
        block.level,
        block.visit,
        block.position,
        block.conditions.len(),
        block.commands.len(),
        block.failure.len()
    );
    for child in &block.children {
        print_tree(child, indent + 1);
    }
}

fn read_input(path: Option<&Path>) -> Result<String, CliError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(CliError::Stdin)?;
            Ok(text)
        }
    }
}

fn do_run(args: RunArgs, no_color: bool) -> Result<(), CliError> {
    let query = compile(&args.query, no_color);

    if args.tree {
        print_tree(&query.root, 0);
        return Ok(());
    }
    if args.check {
        eprintln!("ok: query for <{}> compiled successfully", query.pattern);
        return Ok(());
    }

    let config = Config::load(args.config.as_deref())?;
    let settings = Settings::resolve(
        config,
        Overrides {
            head: args.head,
            tail: args.tail,
            hd: args.hd,
            tl: args.tl,
            jobs: args.jobs,
            translate: args.translate,
            patterns: args.patterns,
            raw: args.raw,
            no_markup: args.no_markup,
        },
    );
    let ctx = settings.context()?;
    let input = read_input(args.input.as_deref())?;

    let output = driver::run(&query, &input, &ctx, &settings)?;
    std::io::stdout()
        .lock()
        .write_all(output.as_bytes())
        .map_err(CliError::Write)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn run_is_the_default_subcommand() {
        assert_eq!(
            normalize_args(args("xtract -pattern Rec -element Id")),
            args("xtract run -- -pattern Rec -element Id")
        );
        assert_eq!(
            normalize_args(args("xtract --input a.xml -pattern Rec -element Id")),
            args("xtract run --input a.xml -- -pattern Rec -element Id")
        );
    }

    #[test]
    fn explicit_subcommands_are_kept() {
        assert_eq!(
            normalize_args(args("xtract run -- -pattern Rec -element Id")),
            args("xtract run -- -pattern Rec -element Id")
        );
        assert_eq!(normalize_args(args("xtract test fixtures")), args("xtract test fixtures"));
        assert_eq!(normalize_args(args("xtract --help")), args("xtract --help"));
    }

    #[test]
    fn normalized_arguments_parse() {
        let cli = Cli::parse_from(normalize_args(args(
            "xtract --jobs 2 --head <Set> -pattern Rec -element Id",
        )));
        let Command::Run(run) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(run.jobs, Some(2));
        assert_eq!(run.head.as_deref(), Some("<Set>"));
        assert_eq!(run.query, args("-pattern Rec -element Id"));
    }
}
