pub mod cache;
pub mod citation;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod extract;
pub mod index;
pub mod numeric;
pub mod printer;
pub mod search;
pub mod sequence;
pub mod text;
pub mod values;

pub use environment::Context;
pub use error::LoadError;
pub use executor::{process_extract, try_process_extract};
pub use search::{PatternSearcher, Searcher, load_translation_table};
