pub mod clause;
pub mod error;
pub mod items;
mod structural;
pub mod tokens;

pub use error::ParseError;

use std::ops::Range;

use crate::Query;
use crate::block::Block;

/// The command-line tokens together with a single-line rendering used as the
/// diagnostic source. Each token keeps its byte span in that rendering.
#[derive(Debug, Clone)]
pub struct CommandLine {
    source: String,
    tokens: Vec<String>,
    spans: Vec<Range<usize>>,
}

impl CommandLine {
    pub fn new(tokens: &[String]) -> Self {
        let mut source = String::new();
        let mut spans = Vec::with_capacity(tokens.len());
        for token in tokens {
            if !source.is_empty() {
                source.push(' ');
            }
            let quoted = token.is_empty() || token.contains(char::is_whitespace);
            if quoted {
                source.push('"');
            }
            let start = source.len();
            source.push_str(token);
            spans.push(start..source.len());
            if quoted {
                source.push('"');
            }
        }
        CommandLine {
            source,
            tokens: tokens.to_vec(),
            spans,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn token(&self, index: usize) -> &str {
        self.tokens.get(index).map(String::as_str).unwrap_or("")
    }

    /// Span of token `index`; past the end, an empty span at the end of the line.
    pub fn span(&self, index: usize) -> Range<usize> {
        self.spans
            .get(index)
            .cloned()
            .unwrap_or_else(|| self.end())
    }

    /// Span from the start of token `first` to the end of token `last`.
    pub fn span_between(&self, first: usize, last: usize) -> Range<usize> {
        let start = self.span(first).start;
        let end = self.span(last).end.max(start);
        start..end
    }

    pub fn end(&self) -> Range<usize> {
        self.source.len()..self.source.len()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Compiler entry point.
pub struct Parser {
    line: CommandLine,
    file_id: usize,
}

impl Parser {
    pub fn new(tokens: &[String], file_id: usize) -> Self {
        Parser {
            line: CommandLine::new(tokens),
            file_id,
        }
    }

    /// The reconstructed command line that diagnostics point into.
    pub fn source(&self) -> &str {
        self.line.source()
    }

    /// Compile the command line into a query rooted at the `-pattern` block.
    pub fn parse(&self) -> Result<Query, ParseError> {
        let lexemes = tokens::lex(&self.line, self.file_id)?;
        let pattern = structural::parse_query(&self.line, &lexemes, self.file_id)?;
        let name = pattern.matcher.clone();
        tracing::debug!(
            pattern = %name,
            blocks = count_blocks(&pattern),
            "compiled query"
        );
        Ok(Query {
            root: Block::root(&name, pattern),
            pattern: name,
            source_id: self.file_id,
        })
    }
}

fn count_blocks(block: &Block) -> usize {
    1 + block.children.iter().map(count_blocks).sum::<usize>()
}

/// Compile `tokens` and check that the `-pattern` element is `pattern`
/// (any pattern is accepted when `pattern` is empty).
pub fn parse_arguments(tokens: &[String], pattern: &str) -> Result<Block, ParseError> {
    let parser = Parser::new(tokens, 0);
    let query = parser.parse()?;
    if !pattern.is_empty() && query.pattern != pattern {
        let span = query
            .root
            .pattern()
            .map(|block| block.span.clone())
            .unwrap_or(0..0);
        return Err(ParseError::error(
            format!(
                "pattern '{}' does not match record element '{}'",
                query.pattern, pattern
            ),
            span,
            0,
        ));
    }
    Ok(query.root)
}
