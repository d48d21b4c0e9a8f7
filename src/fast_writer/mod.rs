//! Streaming XLSX writer
//!
//! Rows go straight into the compressed worksheet entry; only a fixed
//! shared-string vocabulary is kept in memory.

mod workbook;
mod xml_writer;

pub(crate) use workbook::validate_sheet_name;
pub use workbook::StreamingWorkbook;
pub use xml_writer::{escape_into, XmlWriter};
