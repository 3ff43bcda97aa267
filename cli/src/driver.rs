use std::fmt::Write as _;
use std::path::PathBuf;

use interpreter::{Context, PatternSearcher, load_translation_table, process_extract};
use rayon::prelude::*;
use xtract::Query;
use xtract::document::{TextPolicy, split_records};
use xtract::parser::clause::unescape_literal;

use crate::config::Config;
use crate::error::CliError;

/// Resolved run options: config file values overridden by flags.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub head: String,
    pub tail: String,
    pub hd: String,
    pub tl: String,
    pub jobs: usize,
    pub translate: Option<PathBuf>,
    pub patterns: Option<PathBuf>,
    pub policy: TextPolicy,
}

/// Flag values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub head: Option<String>,
    pub tail: Option<String>,
    pub hd: Option<String>,
    pub tl: Option<String>,
    pub jobs: Option<usize>,
    pub translate: Option<PathBuf>,
    pub patterns: Option<PathBuf>,
    pub raw: bool,
    pub no_markup: bool,
}

impl Settings {
    pub fn resolve(config: Config, flags: Overrides) -> Self {
        let mut policy = config.policy();
        if flags.raw {
            policy.unescape = false;
        }
        if flags.no_markup {
            policy.inline_markup = false;
        }
        let literal = |value: Option<String>| value.map(|s| unescape_literal(&s)).unwrap_or_default();
        Settings {
            head: literal(flags.head.or(config.head)),
            tail: literal(flags.tail.or(config.tail)),
            hd: literal(flags.hd.or(config.hd)),
            tl: literal(flags.tl.or(config.tl)),
            jobs: flags.jobs.or(config.jobs).unwrap_or(0),
            translate: flags.translate.or(config.translate),
            patterns: flags.patterns.or(config.patterns),
            policy,
        }
    }

    /// Build the shared record context, loading any lookup tables.
    pub fn context(&self) -> Result<Context, CliError> {
        let mut ctx = Context::new().with_policy(self.policy);
        if let Some(path) = &self.translate {
            ctx = ctx.with_translation(load_translation_table(path)?);
        }
        if let Some(path) = &self.patterns {
            let searcher = PatternSearcher::from_tsv(path)?;
            tracing::debug!(patterns = searcher.len(), "loaded classification patterns");
            ctx = ctx.with_searcher(Box::new(searcher));
        }
        Ok(ctx)
    }
}

/// Split `input` at the pattern element, run the query over every record in
/// parallel, and assemble the output in input order.
pub fn run(query: &Query, input: &str, ctx: &Context, settings: &Settings) -> Result<String, CliError> {
    let records = split_records(input, &query.pattern)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.jobs)
        .build()?;

    let bodies: Vec<String> = pool.install(|| {
        records
            .par_iter()
            .enumerate()
            .map(|(index, record)| {
                process_extract(
                    record,
                    &query.pattern,
                    index + 1,
                    &settings.hd,
                    &settings.tl,
                    ctx,
                    &query.root,
                )
            })
            .collect()
    });
    tracing::debug!(records = records.len(), "processed input");

    let mut out = String::new();
    if !settings.head.is_empty() {
        out.push_str(&settings.head);
        out.push('\n');
    }
    for body in &bodies {
        out.push_str(body);
    }
    if !settings.tail.is_empty() {
        out.push_str(&settings.tail);
        out.push('\n');
    }
    for (value, count) in ctx.histogram.snapshot() {
        let _ = writeln!(out, "{count}\t{value}");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtract::parser::Parser;

    fn compile(line: &str) -> Query {
        let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        Parser::new(&tokens, 0).parse().unwrap()
    }

    fn numbered(count: usize) -> String {
        let recs: String = (1..=count)
            .map(|i| format!("<Rec><Id>{}</Id></Rec>\n", i))
            .collect();
        format!("<?xml version=\"1.0\"?>\n<Set>\n{}</Set>\n", recs)
    }

    #[test]
    fn output_keeps_input_order_across_workers() {
        let query = compile("-pattern Rec -element Id");
        let settings = Settings {
            jobs: 4,
            ..Settings::default()
        };
        let out = run(&query, &numbered(200), &Context::new(), &settings).unwrap();
        let expected: String = (1..=200).map(|i| format!("{}\n", i)).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn head_tail_and_record_wrappers() {
        let query = compile("-pattern Rec -if Id -gt 1 -element Id");
        let settings = Settings::resolve(
            Config::default(),
            Overrides {
                head: Some("<Ids>".into()),
                tail: Some("</Ids>".into()),
                hd: Some("\\t<Id>".into()),
                tl: Some("</Id>".into()),
                jobs: Some(1),
                ..Overrides::default()
            },
        );
        let out = run(&query, &numbered(3), &Context::new(), &settings).unwrap();
        assert_eq!(out, "<Ids>\n\t<Id>2</Id>\n\t<Id>3</Id>\n</Ids>\n");
    }

    #[test]
    fn histogram_follows_the_records() {
        let query = compile("-pattern Rec -histogram Kind");
        let input = "<Set><Rec><Kind>b</Kind></Rec><Rec><Kind>a</Kind><Kind>b</Kind></Rec></Set>";
        let out = run(&query, input, &Context::new(), &Settings::default()).unwrap();
        assert_eq!(out, "1\ta\n2\tb\n");
    }

    #[test]
    fn flags_override_the_config_file() {
        let config = Config::parse(
            "head = \"<A>\"\njobs = 3\n[text]\nunescape = false\n",
            std::path::Path::new("xtract.toml"),
        )
        .unwrap();
        let settings = Settings::resolve(
            config,
            Overrides {
                head: Some("<B>".into()),
                no_markup: true,
                ..Overrides::default()
            },
        );
        assert_eq!(settings.head, "<B>");
        assert_eq!(settings.jobs, 3);
        assert!(!settings.policy.unescape);
        assert!(!settings.policy.inline_markup);
    }

    #[test]
    fn tables_load_into_the_context() {
        let dir = tempfile::tempdir().unwrap();
        let codes = dir.path().join("codes.tsv");
        std::fs::write(&codes, "1\tone\n2\ttwo\n").unwrap();
        let settings = Settings {
            translate: Some(codes),
            ..Settings::default()
        };
        let ctx = settings.context().unwrap();
        let query = compile("-pattern Rec -translate Id");
        let out = run(&query, &numbered(2), &ctx, &settings).unwrap();
        assert_eq!(out, "one\ntwo\n");

        let broken = Settings {
            patterns: Some(dir.path().join("missing.tsv")),
            ..Settings::default()
        };
        assert!(matches!(broken.context(), Err(CliError::Table(_))));
    }
}
