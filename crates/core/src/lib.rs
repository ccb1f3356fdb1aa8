//! Core domain types, row parsing, instruction building and fallback
//! content for TCFD report decks.

pub mod error;
pub mod fallback;
pub mod parse;
pub mod prompt;
pub mod types;

pub use error::{Error, Result};
pub use parse::{ParseOutcome, ParseStrategy, RowParser};
pub use types::{
    ContentRow, EmissionMetrics, GenerationContext, TopicCategory, TopicSpec, FIELD_COUNT,
    SENTINEL,
};
