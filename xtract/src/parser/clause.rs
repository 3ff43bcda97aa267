use std::ops::Range;

use crate::operation::step::Step;
use crate::operation::{
    Command, Comparison, Extraction, Format, Operation, OperationKind, Target, Test,
};
use crate::parser::CommandLine;
use crate::parser::error::ParseError;
use crate::parser::items::{parse_item, split_inline_value, split_items};
use crate::parser::tokens::Lexeme;

/// The compiled own tokens of one block.
#[derive(Debug, Default)]
pub struct Clauses {
    pub conditions: Vec<Operation>,
    pub commands: Vec<Operation>,
    pub failure: Vec<Operation>,
    pub foreword: String,
    pub afterword: String,
}

/// A flag with the argument lexemes that follow it.
struct Clause<'a> {
    flag: &'a Lexeme,
    args: &'a [Lexeme],
}

fn group_clauses(lexemes: &[Lexeme]) -> Vec<Clause<'_>> {
    let mut clauses = Vec::new();
    let mut i = 0;
    while i < lexemes.len() {
        let start = i;
        i += 1;
        while i < lexemes.len() && lexemes[i].is_argument() {
            i += 1;
        }
        clauses.push(Clause {
            flag: &lexemes[start],
            args: &lexemes[start + 1..i],
        });
    }
    clauses
}

/// Resolve `\n`, `\t`, `\r` and `\\` in a formatting argument.
pub fn unescape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

struct ClauseParser<'a> {
    line: &'a CommandLine,
    file_id: usize,
    out: Clauses,
    /// Commands after `-else` go to the failure list.
    in_failure: bool,
    /// The combinator used so far in the open condition group.
    combinator: Option<Test>,
    /// The flag that opened the current condition group.
    group: Option<Test>,
    /// `-NAME` waiting for the next extraction.
    pending: Option<(Target, usize)>,
}

/// Compile the own tokens of a block (everything before its first child
/// exploration flag, after the visit argument).
pub fn parse_clauses(
    line: &CommandLine,
    lexemes: &[Lexeme],
    file_id: usize,
) -> Result<Clauses, ParseError> {
    let mut parser = ClauseParser {
        line,
        file_id,
        out: Clauses::default(),
        in_failure: false,
        combinator: None,
        group: None,
        pending: None,
    };

    if let Some(first) = lexemes.first() {
        if first.is_argument() {
            return Err(parser.fail(
                format!("unexpected argument '{}'", line.token(first.index)),
                first.index,
            ));
        }
    }

    for clause in group_clauses(lexemes) {
        parser.clause(&clause)?;
    }
    parser.finish(lexemes)
}

impl<'a> ClauseParser<'a> {
    fn fail(&self, message: String, index: usize) -> ParseError {
        ParseError::error(message, self.line.span(index), self.file_id)
    }

    fn span(&self, clause: &Clause<'_>) -> Range<usize> {
        let last = clause.args.last().map_or(clause.flag.index, |l| l.index);
        self.line.span_between(clause.flag.index, last)
    }

    fn token(&self, lexeme: &Lexeme) -> &'a str {
        self.line.token(lexeme.index)
    }

    fn clause(&mut self, clause: &Clause<'_>) -> Result<(), ParseError> {
        let flag = self.token(clause.flag);
        let Some(command) = clause.flag.class.command.clone() else {
            return Err(self.fail(format!("unexpected argument '{}'", flag), clause.flag.index));
        };

        if let Some((target, index)) = &self.pending {
            if !matches!(command, Command::Extract(_)) {
                let prefix = if target.accumulate { "--" } else { "-" };
                return Err(self
                    .fail(
                        format!(
                            "variable '{}{}' must be followed by an argument or an extraction command",
                            prefix, target.name
                        ),
                        *index,
                    )
                    .with_note(format!("found '{}' instead", flag)));
            }
        }

        match command {
            Command::Test(test) => self.test(clause, test),
            Command::Compare(comparison) => self.compare(clause, comparison),
            Command::Else => self.otherwise(clause),
            Command::Extract(extraction) => self.extract(clause, extraction),
            Command::Format(format) => self.format(clause, format),
            Command::Assign { name, accumulate } => self.assign(clause, name, accumulate),
            Command::Position => Err(self.fail(
                "-position must directly follow the exploration argument".to_string(),
                clause.flag.index,
            )),
            Command::Explore(_) => Err(self.fail(
                format!("'{}' is not allowed here", flag),
                clause.flag.index,
            )),
        }
    }

    fn test(&mut self, clause: &Clause<'_>, test: Test) -> Result<(), ParseError> {
        let flag = self.token(clause.flag);
        if self.in_failure {
            return Err(self.fail(
                format!("condition '{}' after -else", flag),
                clause.flag.index,
            ));
        }

        if test.starts_group() {
            self.group = Some(test);
            self.combinator = None;
        } else {
            if self.group.is_none() {
                return Err(self
                    .fail(format!("'{}' without a preceding condition", flag), clause.flag.index)
                    .with_note("start a condition group with -if or -unless"));
            }
            match self.combinator {
                Some(previous) if previous != test => {
                    return Err(self
                        .fail(
                            "cannot mix -and and -or in one condition group".to_string(),
                            clause.flag.index,
                        )
                        .with_note("start a new group with -if or -unless"));
                }
                _ => self.combinator = Some(test),
            }
        }

        let Some(arg) = clause.args.first() else {
            return Err(self.fail(
                format!("'{}' requires an argument", flag),
                clause.flag.index,
            ));
        };
        if let Some(extra) = clause.args.get(1) {
            return Err(self.fail(
                format!("unexpected argument '{}' after '{}'", self.token(extra), flag),
                extra.index,
            ));
        }

        let text = self.token(arg);
        let span = self.line.span(arg.index);
        let inline = matches!(self.group, Some(Test::Match | Test::Avoid));
        let (item, value) = if inline {
            split_inline_value(text)
        } else {
            (text, None)
        };

        let mut steps = vec![parse_item(item, span.clone(), self.file_id)?];
        if let Some(value) = value {
            steps.push(Step::constraint(Comparison::Equals, value, span));
        }
        let operation =
            Operation::new(OperationKind::Test(test), self.span(clause)).with_steps(steps);
        self.out.conditions.push(operation);
        Ok(())
    }

    fn compare(&mut self, clause: &Clause<'_>, comparison: Comparison) -> Result<(), ParseError> {
        let flag = self.token(clause.flag);
        let Some(arg) = clause.args.first() else {
            return Err(self.fail(format!("'{}' requires a value", flag), clause.flag.index));
        };
        if let Some(extra) = clause.args.get(1) {
            return Err(self.fail(
                format!("unexpected argument '{}' after '{}'", self.token(extra), flag),
                extra.index,
            ));
        }

        let attachable = !self.in_failure
            && self
                .out
                .conditions
                .last()
                .is_some_and(|op| op.steps.len() == 1);
        if !attachable {
            return Err(self
                .fail(format!("'{}' must follow a condition", flag), clause.flag.index)
                .with_note("only one comparison may follow each -if, -unless, -and or -or"));
        }

        let value = self.token(arg);
        if comparison.is_element_relative() && value.is_empty() {
            return Err(self.fail(format!("'{}' requires an element name", flag), arg.index));
        }
        let step = Step::constraint(comparison, value, self.line.span(arg.index));
        let span = self.span(clause);
        if let Some(condition) = self.out.conditions.last_mut() {
            condition.steps.push(step);
            condition.span = condition.span.start..span.end;
        }
        Ok(())
    }

    fn otherwise(&mut self, clause: &Clause<'_>) -> Result<(), ParseError> {
        if self.in_failure {
            return Err(self.fail("duplicate -else".to_string(), clause.flag.index));
        }
        if self.out.conditions.is_empty() {
            return Err(self.fail(
                "-else without a preceding condition".to_string(),
                clause.flag.index,
            ));
        }
        if let Some(extra) = clause.args.first() {
            return Err(self.fail(
                format!("unexpected argument '{}' after '-else'", self.token(extra)),
                extra.index,
            ));
        }
        self.in_failure = true;
        Ok(())
    }

    fn items(&self, args: &[Lexeme]) -> Result<Vec<Step>, ParseError> {
        let mut steps = Vec::new();
        for arg in args {
            let token = self.token(arg);
            let base = self.line.span(arg.index).start;
            for (offset, item) in split_items(token) {
                let start = base + offset;
                steps.push(parse_item(item, start..start + item.len(), self.file_id)?);
            }
        }
        Ok(steps)
    }

    fn push(&mut self, operation: Operation) {
        if self.in_failure {
            self.out.failure.push(operation);
        } else {
            self.out.commands.push(operation);
        }
    }

    fn extract(&mut self, clause: &Clause<'_>, extraction: Extraction) -> Result<(), ParseError> {
        let flag = self.token(clause.flag);
        if clause.args.is_empty() {
            let next = self.line.token(clause.flag.index + 1);
            let mut error = self.fail(format!("'{}' requires an argument", flag), clause.flag.index);
            if !next.is_empty() {
                error = error.with_note(format!("'{}' is a flag, not an element name", next));
            }
            return Err(error);
        }

        let steps = self.items(clause.args)?;
        let mut operation =
            Operation::new(OperationKind::Extract(extraction), self.span(clause)).with_steps(steps);
        if let Some((target, _)) = self.pending.take() {
            operation.target = Some(target);
        }
        self.push(operation);
        Ok(())
    }

    fn assign(
        &mut self,
        clause: &Clause<'_>,
        name: String,
        accumulate: bool,
    ) -> Result<(), ParseError> {
        let target = Target { name, accumulate };
        if clause.args.is_empty() {
            self.pending = Some((target, clause.flag.index));
            return Ok(());
        }
        let steps = self.items(clause.args)?;
        let mut operation = Operation::new(
            OperationKind::Extract(Extraction::Element),
            self.span(clause),
        )
        .with_steps(steps);
        operation.target = Some(target);
        self.push(operation);
        Ok(())
    }

    fn format(&mut self, clause: &Clause<'_>, format: Format) -> Result<(), ParseError> {
        let flag = self.token(clause.flag);
        let arity = format.arity();
        if clause.args.len() < arity {
            let message = match arity {
                2 => format!("'{}' requires two values", flag),
                _ => format!("'{}' requires a value", flag),
            };
            return Err(self.fail(message, clause.flag.index));
        }
        if let Some(extra) = clause.args.get(arity) {
            return Err(self.fail(
                format!("unexpected argument '{}' after '{}'", self.token(extra), flag),
                extra.index,
            ));
        }

        let value = clause
            .args
            .first()
            .map(|arg| unescape_literal(self.token(arg)))
            .unwrap_or_default();

        match format {
            Format::Fwd => {
                self.out.foreword = value;
                return Ok(());
            }
            Format::Awd => {
                self.out.afterword = value;
                return Ok(());
            }
            Format::Reg => {
                if let Err(err) = regex::Regex::new(&value) {
                    return Err(self
                        .fail(format!("invalid regular expression '{}'", value), clause.args[0].index)
                        .with_note(err.to_string()));
                }
            }
            Format::Tag | Format::End | Format::Wrp | Format::Enc | Format::Pkg
                if value.is_empty() =>
            {
                return Err(self.fail(format!("'{}' requires a tag name", flag), clause.flag.index));
            }
            _ => {}
        }

        let mut operation =
            Operation::new(OperationKind::Format(format), self.span(clause)).with_value(value);
        match format {
            Format::Att => {
                operation.extra = unescape_literal(self.token(&clause.args[1]));
            }
            Format::Atr => {
                let source = &clause.args[1];
                let steps = self.items(std::slice::from_ref(source))?;
                let inner = Operation::new(
                    OperationKind::Extract(Extraction::Element),
                    self.line.span(source.index),
                )
                .with_steps(steps);
                operation.attribute = Some(Box::new(inner));
            }
            _ => {}
        }
        self.push(operation);
        Ok(())
    }

    fn finish(self, lexemes: &[Lexeme]) -> Result<Clauses, ParseError> {
        if let Some((target, index)) = &self.pending {
            let prefix = if target.accumulate { "--" } else { "-" };
            return Err(self.fail(
                format!(
                    "variable '{}{}' must be followed by an argument or an extraction command",
                    prefix, target.name
                ),
                *index,
            ));
        }
        if self.in_failure && self.out.failure.is_empty() {
            let index = lexemes
                .iter()
                .rev()
                .find(|l| matches!(l.class.command, Some(Command::Else)))
                .map_or(0, |l| l.index);
            return Err(self.fail("-else without an alternative".to_string(), index));
        }
        Ok(self.out)
    }
}
