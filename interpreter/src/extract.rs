//! Runs a block's commands against one node.

use std::collections::BTreeSet;

use xtract::document::Node;
use xtract::operation::step::StepKind;
use xtract::operation::{Extraction, Format, Operation, OperationKind};

use crate::citation;
use crate::environment::{Context, Environment, Variables};
use crate::index::{index_tag, positional_index, word_stream};
use crate::numeric;
use crate::sequence;
use crate::text;
use crate::values::{Site, step_values};

/// Output customization in effect while one block processes one node.
#[derive(Debug, Clone)]
pub struct Formatter {
    pub pfx: String,
    pub sfx: String,
    /// Between the values of one command.
    pub sep: String,
    /// Between successive outputs, deferred until more output follows.
    pub tab: String,
    /// Written once before the first output.
    pub plg: String,
    /// Written after the last output, if there was any.
    pub elg: String,
    pub def: String,
    pub reg: String,
    pub exp: String,
    /// ANSI SGR code wrapped around each value.
    pub color: Option<String>,
    /// Set by `-wrp`; values are XML-encoded.
    pub encode: bool,
    /// Closing tags owed by `-pkg`, innermost last.
    closers: Vec<String>,
    wrote: bool,
}

impl Default for Formatter {
    fn default() -> Self {
        Formatter {
            pfx: String::new(),
            sfx: String::new(),
            sep: "\t".to_string(),
            tab: "\t".to_string(),
            plg: String::new(),
            elg: String::new(),
            def: String::new(),
            reg: String::new(),
            exp: String::new(),
            color: None,
            encode: false,
            closers: Vec::new(),
            wrote: false,
        }
    }
}

/// Open and close tag strings for a slash-separated tag path.
pub fn wrap_tags(path: &str) -> (String, String) {
    let names: Vec<&str> = path.split('/').filter(|name| !name.is_empty()).collect();
    let open = names.iter().map(|name| format!("<{}>", name)).collect();
    let close = names.iter().rev().map(|name| format!("</{}>", name)).collect();
    (open, close)
}

fn color_code(name: &str) -> Option<String> {
    let code = match name.to_ascii_lowercase().as_str() {
        "none" | "off" | "" => return None,
        "bold" => "1",
        "underline" => "4",
        "red" => "31",
        "green" => "32",
        "yellow" => "33",
        "blue" => "34",
        "magenta" | "purple" => "35",
        "cyan" => "36",
        "white" => "37",
        other if other.chars().all(|c| c.is_ascii_digit() || c == ';') => {
            return Some(other.to_string());
        }
        _ => return None,
    };
    Some(code.to_string())
}

impl Formatter {
    fn reset(&mut self) {
        let fresh = Formatter::default();
        self.pfx = fresh.pfx;
        self.sfx = fresh.sfx;
        self.sep = fresh.sep;
        self.plg = fresh.plg;
        self.elg = fresh.elg;
        self.def = fresh.def;
        self.encode = false;
    }

    /// Write one piece of output after the pending tab and the prologue.
    fn emit(&mut self, text: &str, env: &mut Environment, out: &mut String) {
        out.push_str(&env.tab);
        out.push_str(&self.plg);
        self.plg.clear();
        out.push_str(text);
        env.tab = self.tab.clone();
        self.wrote = true;
    }

    fn decorate(&self, value: &str) -> String {
        let value = if self.encode {
            text::encode(value)
        } else {
            value.to_string()
        };
        match &self.color {
            Some(code) => format!("\x1b[{}m{}\x1b[0m", code, value),
            None => value,
        }
    }

    /// The text a command contributes: prefix, separated values, suffix.
    fn clause_text(&self, results: &[String]) -> String {
        let body: Vec<String> = results.iter().map(|value| self.decorate(value)).collect();
        format!("{}{}{}", self.pfx, body.join(&self.sep), self.sfx)
    }

    fn apply(
        &mut self,
        operation: &Operation,
        format: Format,
        site: &Site<'_>,
        env: &mut Environment,
        out: &mut String,
    ) {
        let value = operation.value.as_str();
        match format {
            Format::Pfx => self.pfx = value.to_string(),
            Format::Sfx => self.sfx = value.to_string(),
            Format::Sep => self.sep = value.to_string(),
            Format::Tab => self.tab = value.to_string(),
            Format::Ret => env.ret = value.to_string(),
            Format::Plg => self.plg = value.to_string(),
            Format::Elg => self.elg = value.to_string(),
            Format::Def => self.def = value.to_string(),
            Format::Reg => self.reg = value.to_string(),
            Format::Exp => self.exp = value.to_string(),
            Format::Color => self.color = color_code(value),
            Format::Rst => self.reset(),
            Format::Lbl => self.emit(value, env, out),
            Format::Clr => env.tab.clear(),
            Format::Pfc => {
                env.tab.clear();
                self.pfx = value.to_string();
            }
            Format::Deq => {
                if !env.tab.is_empty() {
                    env.tab = value.to_string();
                }
            }
            Format::Wrp => {
                let (open, close) = wrap_tags(value);
                self.sep = format!("{}{}", close, open);
                self.pfx = open;
                self.sfx = close;
                self.encode = true;
            }
            Format::Enc => {
                let (open, close) = wrap_tags(value);
                self.plg = open;
                self.elg = close;
            }
            Format::Pkg => {
                let (open, close) = wrap_tags(value);
                out.push_str(&open);
                self.closers.push(close);
            }
            Format::Tag => {
                out.push_str(&env.tab);
                out.push('<');
                out.push_str(value);
                env.tab.clear();
            }
            Format::Att => {
                out.push_str(&format!(" {}=\"{}\"", value, text::encode(&operation.extra)));
            }
            Format::Atr => {
                let Some(source) = operation.attribute.as_deref() else {
                    return;
                };
                if let Some(found) = gather(source, Extraction::Element, site, &env.variables)
                    .into_iter()
                    .next()
                {
                    out.push_str(&format!(" {}=\"{}\"", value, text::encode(&found)));
                }
            }
            Format::Cls => out.push('>'),
            Format::Slf => {
                out.push_str("/>");
                env.tab = self.tab.clone();
            }
            Format::End => {
                out.push_str(&format!("</{}>", value));
                env.tab = self.tab.clone();
            }
            // block-level, consumed by the compiler
            Format::Fwd | Format::Awd => {}
        }
    }

    fn finish(&mut self, out: &mut String) {
        if self.wrote {
            out.push_str(&self.elg);
        }
        while let Some(close) = self.closers.pop() {
            out.push_str(&close);
        }
    }
}

/// Values of every operand step, after the per-step selection an
/// extraction asks for.
fn gather(
    operation: &Operation,
    extraction: Extraction,
    site: &Site<'_>,
    vars: &Variables,
) -> Vec<String> {
    let reverse_inverted = extraction == Extraction::Nucleic;
    let mut values = Vec::new();
    for step in &operation.steps {
        let found = step_values(step, site, vars, reverse_inverted);
        match extraction {
            Extraction::First => values.extend(found.into_iter().next()),
            Extraction::Last => values.extend(found.into_iter().last()),
            Extraction::Even => values.extend(found.into_iter().skip(1).step_by(2)),
            Extraction::Odd => values.extend(found.into_iter().step_by(2)),
            _ => values.extend(found),
        }
    }
    if extraction == Extraction::Backward {
        values.reverse();
    }
    values
}

/// `-date` reads date elements structurally rather than as text.
fn dates(operation: &Operation, site: &Site<'_>, vars: &Variables) -> Vec<String> {
    let mut found = Vec::new();
    for step in &operation.steps {
        if step.is_current_node() && step.attribute.is_none() {
            found.extend(citation::date(site.node));
            continue;
        }
        if step.kind == StepKind::Element && step.attribute.is_none() && step.slice.is_whole() {
            found.extend(
                site.elements(step)
                    .into_iter()
                    .filter_map(|(node, _)| citation::date(node)),
            );
            continue;
        }
        for value in step_values(step, site, vars, false) {
            let node = Node {
                contents: value,
                ..Node::default()
            };
            found.extend(citation::date(&node));
        }
    }
    found
}

fn per_value(values: Vec<String>, transform: impl Fn(&str) -> String) -> Vec<String> {
    values.iter().map(|value| transform(value)).collect()
}

fn per_value_opt(values: Vec<String>, transform: impl Fn(&str) -> Option<String>) -> Vec<String> {
    values.iter().filter_map(|value| transform(value)).collect()
}

fn classify(values: &[String], ctx: &Context) -> Vec<String> {
    let Some(searcher) = ctx.searcher.as_deref() else {
        return Vec::new();
    };
    let mut found = BTreeSet::new();
    for value in values {
        searcher.search(value, &mut |pattern, alias, _| {
            let label = ctx.translation.get(alias).map_or(alias, String::as_str);
            found.insert(format!("<{label}>{pattern}</{label}>"));
            true
        });
    }
    found.into_iter().collect()
}

fn meshcodes(values: &[String], ctx: &Context) -> Vec<String> {
    let codes: BTreeSet<String> = values
        .iter()
        .filter_map(|value| ctx.translation.get(value.trim()))
        .flat_map(|codes| codes.split(','))
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect();
    codes.into_iter().collect()
}

/// Unordered pairs of distinct values, each pair sorted, as `a|b`.
fn matrix(values: &[String]) -> Vec<String> {
    let distinct: Vec<&String> = values.iter().collect::<BTreeSet<_>>().into_iter().collect();
    let mut pairs = Vec::new();
    for (i, first) in distinct.iter().enumerate() {
        for second in &distinct[i + 1..] {
            pairs.push(format!("{}|{}", first, second));
        }
    }
    pairs
}

fn replace(values: Vec<String>, formatter: &Formatter, ctx: &Context) -> Vec<String> {
    if formatter.reg.is_empty() {
        return values;
    }
    match ctx.regexes.get_or_compile(&formatter.reg) {
        Ok(regex) => per_value(values, |value| {
            regex.replace_all(value, formatter.exp.as_str()).into_owned()
        }),
        Err(err) => {
            tracing::warn!(pattern = %formatter.reg, error = %err, "invalid -reg pattern");
            values
        }
    }
}

/// Compute the results of one extraction command.
fn extract(
    operation: &Operation,
    extraction: Extraction,
    site: &Site<'_>,
    vars: &Variables,
    ctx: &Context,
    formatter: &Formatter,
) -> Vec<String> {
    if extraction == Extraction::Date {
        return dates(operation, site, vars);
    }
    let values = gather(operation, extraction, site, vars);
    if numeric::is_numeric(extraction) {
        return numeric::reduce(extraction, &values);
    }
    if let Some(tag) = index_tag(extraction) {
        return positional_index(&values, tag, extraction == Extraction::Stemmed);
    }

    match extraction {
        // --- Selection ---
        Extraction::Element
        | Extraction::First
        | Extraction::Last
        | Extraction::Even
        | Extraction::Odd
        | Extraction::Backward
        | Extraction::Nucleic => values,

        // --- Text ---
        Extraction::Encode => per_value(values, text::encode),
        Extraction::Decode => per_value(values, text::decode),
        Extraction::Upper => per_value(values, str::to_uppercase),
        Extraction::Lower => per_value(values, str::to_lowercase),
        Extraction::Chain => per_value(values, text::chain),
        Extraction::Title => per_value(values, text::title_case),
        Extraction::Mirror => per_value(values, text::mirror),
        Extraction::Alpha => per_value(values, |value| text::letters_only(value, false)),
        Extraction::Alnum => per_value(values, |value| text::letters_only(value, true)),
        Extraction::Plain => per_value(values, text::plain),
        Extraction::Trim => per_value(values, text::trim),
        Extraction::Basic => per_value(values, text::basic),
        Extraction::Order => per_value(values, text::order),
        Extraction::Wct => per_value(values, |value| text::word_count(value).to_string()),
        Extraction::Doi => per_value_opt(values, text::doi),
        Extraction::Len => per_value(values, |value| value.chars().count().to_string()),
        Extraction::Translate => {
            per_value_opt(values, |value| ctx.translation.get(value.trim()).cloned())
        }
        Extraction::Replace => replace(values, formatter, ctx),

        // --- Word streams ---
        Extraction::Terms
        | Extraction::Words
        | Extraction::Pairs
        | Extraction::Reverse
        | Extraction::Clauses
        | Extraction::Letters => word_stream(extraction, &values),

        // --- Citations ---
        Extraction::Year => per_value_opt(values, citation::year),
        Extraction::Month => per_value_opt(values, citation::month),
        Extraction::Auth => per_value(values, citation::author),
        Extraction::Initials => per_value(values, citation::initials),
        Extraction::Jour => per_value(values, citation::journal),
        Extraction::Prop => per_value(values, citation::proper),
        Extraction::Page => per_value_opt(values, citation::first_page),

        // --- Sequences ---
        Extraction::Revcomp => per_value(values, sequence::reverse_complement),
        Extraction::Fasta => per_value(values, sequence::fasta),
        Extraction::Ncbi2na => per_value_opt(values, |value| sequence::ncbi2na(value, None)),
        Extraction::Ncbi4na => per_value_opt(values, |value| sequence::ncbi4na(value, None)),
        Extraction::Molwt => {
            per_value_opt(values, |value| sequence::molecular_weight(value).map(|w| w.to_string()))
        }
        Extraction::Hgvs => per_value_opt(values, sequence::hgvs),

        // --- Lookups ---
        Extraction::Classify => classify(&values, ctx),
        Extraction::Meshcode => meshcodes(&values, ctx),
        Extraction::Matrix => matrix(&values),
        Extraction::Histogram => {
            for value in &values {
                ctx.histogram.record(value);
            }
            Vec::new()
        }

        // --- Data quality ---
        Extraction::Test => per_value_opt(values, |value| {
            let markers = text::quality_markers(value);
            (!markers.is_empty()).then(|| format!("[{}] {}", markers.join(","), value))
        }),
        Extraction::Scan => text::scan_characters(values.iter().map(String::as_str)),

        // routed above
        Extraction::Date
        | Extraction::Num
        | Extraction::Sum
        | Extraction::Acc
        | Extraction::Min
        | Extraction::Max
        | Extraction::Inc
        | Extraction::Dec
        | Extraction::Sub
        | Extraction::Avg
        | Extraction::Dev
        | Extraction::Med
        | Extraction::Mul
        | Extraction::Div
        | Extraction::Mod
        | Extraction::Bin
        | Extraction::Oct
        | Extraction::Hex
        | Extraction::Bit
        | Extraction::Pad
        | Extraction::Log
        | Extraction::Ln
        | Extraction::Lg2
        | Extraction::Indices
        | Extraction::Article
        | Extraction::Abstract
        | Extraction::Paragraph
        | Extraction::Stemmed => Vec::new(),
    }
}

/// Run `commands` for the node at `site`, appending output to `out`.
///
/// A fresh formatter is used for each call; the pending tab and the
/// record terminator live in `env` and carry over.
pub fn process_commands(
    commands: &[Operation],
    site: &Site<'_>,
    env: &mut Environment,
    ctx: &Context,
    out: &mut String,
) {
    let mut formatter = Formatter::default();
    for operation in commands {
        match &operation.kind {
            OperationKind::Format(format) => {
                formatter.apply(operation, *format, site, env, out);
            }
            OperationKind::Extract(extraction) => {
                let mut results =
                    extract(operation, *extraction, site, &env.variables, ctx, &formatter);
                if results.is_empty() {
                    if formatter.def.is_empty() || *extraction == Extraction::Histogram {
                        continue;
                    }
                    results.push(formatter.def.clone());
                }
                let text = formatter.clause_text(&results);
                match &operation.target {
                    Some(target) if target.accumulate => {
                        env.variables.accumulate(&target.name, &text, &formatter.sep);
                    }
                    Some(target) => env.variables.set(&target.name, text),
                    None => formatter.emit(&text, env, out),
                }
            }
            OperationKind::Test(_) => {}
        }
    }
    formatter.finish(out);
}

/// Pass the source text of a selected node through unchanged.
pub fn emit_raw(text: &str, env: &mut Environment, out: &mut String) {
    let mut formatter = Formatter::default();
    formatter.emit(text, env, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtract::document::{Record, TextPolicy, parse_record};
    use xtract::parser::Parser;

    use crate::search::PatternSearcher;

    const REC: &str = r#"<Rec id="7"><Name>Phospholipase A2</Name><Score>3</Score><Score>4</Score>
        <Title>Snake venom &amp; toxins</Title><Author>Smith, John A</Author>
        <PubDate><Year>2019</Year><Month>Mar</Month></PubDate></Rec>"#;

    fn record() -> Record {
        parse_record(REC, "Rec", TextPolicy::default()).unwrap()
    }

    fn run_with(args: &[&str], ctx: &Context) -> (String, Environment) {
        let mut tokens = vec!["-pattern".to_string(), "Rec".to_string()];
        tokens.extend(args.iter().map(|arg| arg.to_string()));
        let query = Parser::new(&tokens, 0).parse().unwrap();
        let block = query.root.pattern().unwrap().clone();
        let record = record();
        let site = Site::new(&record, &record.root, 1, 1);
        let mut env = Environment::new();
        let mut out = String::new();
        process_commands(&block.commands, &site, &mut env, ctx, &mut out);
        (out, env)
    }

    fn run(args: &[&str]) -> String {
        run_with(args, &Context::new()).0
    }

    #[test]
    fn values_are_separated_and_outputs_tabbed() {
        assert_eq!(run(&["-element", "Score"]), "3\t4");
        assert_eq!(run(&["-sep", ",", "-element", "Score", "-element", "Name"]), "3,4\tPhospholipase A2");
        assert_eq!(run(&["-first", "Score", "-last", "Score"]), "3\t4");
        assert_eq!(run(&["-backward", "Score"]), "4\t3");
        assert_eq!(run(&["-element", "@id"]), "7");
    }

    #[test]
    fn prefix_suffix_and_reset() {
        assert_eq!(
            run(&["-pfx", "[", "-sfx", "]", "-element", "Name", "-rst", "-element", "@id"]),
            "[Phospholipase A2]\t7"
        );
        assert_eq!(run(&["-tab", "|", "-element", "Name", "-element", "@id"]), "Phospholipase A2|7");
        assert_eq!(run(&["-element", "Name", "-clr", "-element", "@id"]), "Phospholipase A27");
        assert_eq!(run(&["-element", "Name", "-deq", "; ", "-element", "@id"]), "Phospholipase A2; 7");
        assert_eq!(run(&["-lbl", "ID", "-element", "@id"]), "ID\t7");
    }

    #[test]
    fn defaults_cover_missing_data() {
        assert_eq!(run(&["-element", "Missing"]), "");
        assert_eq!(run(&["-def", "-", "-element", "Missing"]), "-");
    }

    #[test]
    fn wrapping_and_xml_construction() {
        assert_eq!(
            run(&["-wrp", "Scores/S", "-element", "Score"]),
            "<Scores><S>3</S></Scores><Scores><S>4</S></Scores>"
        );
        assert_eq!(run(&["-wrp", "T", "-element", "Title"]), "<T>Snake venom &amp; toxins</T>");
        assert_eq!(run(&["-enc", "Out", "-element", "@id"]), "<Out>7</Out>");
        assert_eq!(
            run(&[
                "-tag", "Item", "-att", "kind", "a", "-atr", "ref", "@id", "-cls", "-element",
                "Score", "-end", "Item"
            ]),
            "<Item kind=\"a\" ref=\"7\">3\t4</Item>"
        );
        assert_eq!(run(&["-pkg", "Set", "-element", "@id"]), "<Set>7</Set>");
        assert_eq!(run(&["-tag", "Empty", "-slf"]), "<Empty/>");
    }

    #[test]
    fn variables_capture_clause_text() {
        let (out, env) = run_with(&["-ID", "@id", "--ALL", "Score", "--ALL", "Name"], &Context::new());
        assert_eq!(out, "");
        assert_eq!(env.variables.get("ID"), Some("7"));
        assert_eq!(env.variables.get("ALL"), Some("3\t4\tPhospholipase A2"));

        let (out, env) = run_with(&["-TOTAL", "-sum", "Score", "-element", "&TOTAL"], &Context::new());
        assert_eq!(out, "7");
        assert_eq!(env.variables.get("TOTAL"), Some("7"));
    }

    #[test]
    fn transforms() {
        assert_eq!(run(&["-upper", "Name"]), "PHOSPHOLIPASE A2");
        assert_eq!(run(&["-encode", "Title"]), "Snake venom &amp; toxins");
        assert_eq!(run(&["-sum", "Score"]), "7");
        assert_eq!(run(&["-sub", "Score"]), "-1");
        assert_eq!(run(&["-len", "Name"]), "16");
        assert_eq!(run(&["-auth", "Author"]), "Smith JA");
        assert_eq!(run(&["-date", "PubDate"]), "2019/03");
        assert_eq!(run(&["-words", "Title"]), "snake\tvenom\ttoxins");
        assert_eq!(run(&["-element", "Name[1:5]"]), "Phosp");
        assert_eq!(run(&["-reg", "[0-9]", "-exp", "#", "-replace", "Name"]), "Phospholipase A#");
        assert_eq!(run(&["-color", "red", "-element", "@id"]), "\x1b[31m7\x1b[0m");
    }

    #[test]
    fn lookups_use_context() {
        let searcher = PatternSearcher::new([("venom", "TOXIN"), ("snake", "ANIMAL")]).unwrap();
        let translation = [("ANIMAL".to_string(), "Organism".to_string())].into_iter().collect();
        let ctx = Context::new()
            .with_translation(translation)
            .with_searcher(Box::new(searcher));
        let (out, _) = run_with(&["-sep", " ", "-classify", "Title"], &ctx);
        assert_eq!(out, "<Organism>snake</Organism> <TOXIN>venom</TOXIN>");

        let (out, _) = run_with(&["-histogram", "Score", "-element", "@id"], &ctx);
        assert_eq!(out, "7");
        assert_eq!(ctx.histogram.snapshot(), vec![("3".to_string(), 1), ("4".to_string(), 1)]);
    }

    #[test]
    fn matrix_pairs_are_unordered() {
        assert_eq!(
            matrix(&["b".to_string(), "a".to_string(), "c".to_string(), "a".to_string()]),
            vec!["a|b", "a|c", "b|c"]
        );
        assert_eq!(wrap_tags("A/B"), ("<A><B>".to_string(), "</B></A>".to_string()));
    }
}
