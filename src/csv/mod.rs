//! CSV utilities for encoding and parsing

mod encoder;
mod parser;

pub use encoder::{CsvEncoder, QuoteStyle};
pub use parser::CsvParser;
