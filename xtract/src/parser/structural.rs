use crate::block::position::Position;
use crate::block::{Block, decompose_visit};
use crate::operation::{Command, Level};
use crate::parser::CommandLine;
use crate::parser::clause::parse_clauses;
use crate::parser::error::ParseError;
use crate::parser::tokens::Lexeme;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the `-pattern` block from the classified command line.
pub fn parse_query(
    line: &CommandLine,
    lexemes: &[Lexeme],
    file_id: usize,
) -> Result<Block, ParseError> {
    let patterns: Vec<&Lexeme> = lexemes
        .iter()
        .filter(|l| l.level() == Some(Level::Pattern))
        .collect();

    let Some(first) = patterns.first() else {
        let span = if line.is_empty() { line.end() } else { line.span(0) };
        return Err(ParseError::error("missing -pattern", span, file_id)
            .with_note("a query starts with -pattern ELEMENT"));
    };
    if let Some(second) = patterns.get(1) {
        return Err(ParseError::error(
            "only one -pattern may appear in a query",
            line.span(second.index),
            file_id,
        ));
    }
    if first.index != 0 {
        return Err(ParseError::error(
            format!("unexpected '{}' before -pattern", line.token(0)),
            line.span(0),
            file_id,
        ));
    }

    let pattern = parse_block(line, lexemes, file_id)?;
    if !pattern.produces_output() {
        return Err(ParseError::error(
            "no extraction command",
            line.span_between(0, line.len().saturating_sub(1)),
            file_id,
        )
        .with_note("add -element or another extraction command"));
    }
    Ok(pattern)
}

// ---------------------------------------------------------------------------
// Scope partitioning
// ---------------------------------------------------------------------------

/// Split a window that starts with an exploration flag into sibling blocks.
///
/// The window is cut at every flag of the highest level present. Tokens
/// before the first such flag are partitioned again at the lower levels.
fn parse_scopes(
    line: &CommandLine,
    window: &[Lexeme],
    file_id: usize,
) -> Result<Vec<Block>, ParseError> {
    let Some(highest) = window.iter().filter_map(Lexeme::level).max() else {
        return Ok(Vec::new());
    };

    let cuts: Vec<usize> = window
        .iter()
        .enumerate()
        .filter(|(_, l)| l.level() == Some(highest))
        .map(|(i, _)| i)
        .collect();

    let mut blocks = Vec::new();
    if cuts[0] > 0 {
        blocks.extend(parse_scopes(line, &window[..cuts[0]], file_id)?);
    }
    for (n, &start) in cuts.iter().enumerate() {
        let end = cuts.get(n + 1).copied().unwrap_or(window.len());
        blocks.push(parse_block(line, &window[start..end], file_id)?);
    }
    Ok(blocks)
}

/// Parse one scope: its flag, visit argument, optional `-position`, own
/// clauses, and nested scopes.
fn parse_block(
    line: &CommandLine,
    window: &[Lexeme],
    file_id: usize,
) -> Result<Block, ParseError> {
    let head = &window[0];
    let level = head.level().unwrap_or(Level::Pattern);
    let flag = line.token(head.index);
    let last = window.last().map_or(head.index, |l| l.index);
    let span = line.span_between(head.index, last);

    let visit = match window.get(1) {
        Some(arg) if arg.is_argument() && !line.token(arg.index).is_empty() => {
            line.token(arg.index).to_string()
        }
        _ => {
            return Err(ParseError::error(
                format!("'{}' requires an element name", flag),
                line.span(head.index + 1),
                file_id,
            ));
        }
    };

    let mut rest = &window[2..];
    let mut position = None;
    if let Some(lexeme) = rest.first() {
        if lexeme.class.command == Some(Command::Position) {
            let value = rest.get(1).filter(|l| l.is_argument()).ok_or_else(|| {
                ParseError::error("-position requires a value", line.span(lexeme.index), file_id)
            })?;
            let text = line.token(value.index);
            position = Some(Position::parse(text).ok_or_else(|| {
                ParseError::error(
                    format!("invalid position '{}'", text),
                    line.span(value.index),
                    file_id,
                )
                .with_note("expected all, first, last, outer, inner, even, odd, path, select, or a number")
            })?);
            rest = &rest[2..];
        }
    }

    let own = rest
        .iter()
        .position(|l| l.level().is_some())
        .unwrap_or(rest.len());
    let clauses = parse_clauses(line, &rest[..own], file_id)?;
    let children = parse_scopes(line, &rest[own..], file_id)?;

    let (parent, matcher, path) = decompose_visit(&visit);
    if matcher.is_empty() || path.iter().any(String::is_empty) {
        return Err(ParseError::error(
            format!("malformed element path '{}'", visit),
            line.span(head.index + 1),
            file_id,
        ));
    }
    let position = match position {
        Some(position) => position,
        None if !path.is_empty() => Position::Path,
        None => Position::All,
    };

    if position == Position::Select && !clauses.commands.is_empty() {
        return Err(ParseError::error(
            "-position select cannot be combined with extraction commands",
            clauses.commands[0].span.clone(),
            file_id,
        ));
    }

    Ok(Block {
        level,
        visit,
        parent,
        matcher,
        path,
        position,
        foreword: clauses.foreword,
        afterword: clauses.afterword,
        conditions: clauses.conditions,
        commands: clauses.commands,
        failure: clauses.failure,
        children,
        span,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn compile(line: &str) -> Result<Block, ParseError> {
        let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        Parser::new(&tokens, 0).parse().map(|query| query.root)
    }

    fn pattern(line: &str) -> Block {
        compile(line).unwrap().children.remove(0)
    }

    fn error(line: &str) -> String {
        compile(line).unwrap_err().message
    }

    #[test]
    fn pattern_with_own_commands() {
        let block = pattern("-pattern Rec -if Status -equals Active -element Name");
        assert_eq!(block.level, Level::Pattern);
        assert_eq!(block.matcher, "Rec");
        assert_eq!(block.conditions.len(), 1);
        assert_eq!(block.commands.len(), 1);
        assert!(block.children.is_empty());
    }

    #[test]
    fn sibling_blocks_at_the_highest_level() {
        let block = pattern("-pattern Rec -group A -element X -group B -element Y");
        assert_eq!(block.children.len(), 2);
        assert_eq!(block.children[0].matcher, "A");
        assert_eq!(block.children[1].matcher, "B");
        assert_eq!(block.children[1].level, Level::Group);
    }

    #[test]
    fn lower_levels_nest_and_prefixes_stay_siblings() {
        let block = pattern(
            "-pattern Rec -block Pre -element P -division D -group G -block B -element Z",
        );
        // the -block before -division is a sibling of the division
        assert_eq!(block.children.len(), 2);
        assert_eq!(block.children[0].level, Level::Block);
        let division = &block.children[1];
        assert_eq!(division.level, Level::Division);
        let group = &division.children[0];
        assert_eq!(group.matcher, "G");
        assert_eq!(group.children[0].matcher, "B");
        assert_eq!(group.children[0].commands.len(), 1);
    }

    #[test]
    fn visit_forms_and_positions() {
        let block = pattern("-pattern Rec -block AuthorList/Author -position last -element LastName");
        let child = &block.children[0];
        assert_eq!(child.parent.as_deref(), Some("AuthorList"));
        assert_eq!(child.matcher, "Author");
        assert_eq!(child.position, Position::Last);

        let block = pattern("-pattern Rec -block Article.AuthorList.Author -element LastName");
        let child = &block.children[0];
        assert_eq!(child.matcher, "Article");
        assert_eq!(child.path, vec!["AuthorList".to_string(), "Author".to_string()]);
        assert_eq!(child.position, Position::Path);
    }

    #[test]
    fn select_blocks_produce_output() {
        let block = pattern("-pattern Rec -block Author -position select -if LastName");
        assert_eq!(block.children[0].position, Position::Select);
    }

    #[test]
    fn structural_errors() {
        assert!(error("-element Name").contains("missing -pattern"));
        assert!(error("-pattern A -element X -pattern B -element Y").contains("only one -pattern"));
        assert!(error("-pattern Rec -if Name").contains("no extraction command"));
        assert!(error("-pattern -element Name").contains("requires an element name"));
        assert!(error("-pattern Rec -position bogus -element Name").contains("invalid position"));
        assert!(
            error("-pattern Rec -element Name -position first")
                .contains("-position must directly follow")
        );
        assert!(
            error("-pattern Rec -block A -position select -element X")
                .contains("cannot be combined")
        );
        assert!(error("-pattern Rec -elemnt Name").contains("unrecognized argument"));
    }
}
