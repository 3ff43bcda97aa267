pub mod block;
pub mod document;
pub mod operation;
pub mod parser;

use crate::block::Block;

/// A compiled command line.
#[derive(Debug, Clone)]
pub struct Query {
    /// Synthetic root whose only child is the `-pattern` block.
    pub root: Block,
    /// Element name given to `-pattern`.
    pub pattern: String,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}
