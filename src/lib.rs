//! # sheetstream
//!
//! Streaming XLSX to CSV conversion and windowed XLSX generation with memory
//! use that does not grow with the number of rows.
//!
//! ## Features
//!
//! - **Streaming read**: the first worksheet is decompressed and parsed as an
//!   XML event stream, one row at a time
//! - **Shared strings**: loaded once per document, out-of-range references
//!   fall back to the raw index text
//! - **Score offset**: data rows get a fixed offset added to their last column
//!   while being written to CSV
//! - **Windowed generation**: synthetic student workbooks of any size with at
//!   most `window_size` rows in memory
//!
//! ## Quick Start
//!
//! ### Converting
//!
//! ```no_run
//! use sheetstream::convert::{convert_to_csv, ConvertOptions};
//!
//! let summary = convert_to_csv("students.xlsx", "students.csv", &ConvertOptions::default())?;
//! println!("{} rows, {} scores adjusted", summary.rows_written, summary.values_adjusted);
//! # Ok::<(), sheetstream::SheetError>(())
//! ```
//!
//! ### Generating
//!
//! ```no_run
//! use sheetstream::generator::{generate, GeneratorConfig};
//!
//! let mut rng = rand::thread_rng();
//! generate(1_000_000, &GeneratorConfig::default(), &mut rng, "students.xlsx")?;
//! # Ok::<(), sheetstream::SheetError>(())
//! ```
//!
//! ### Custom row handling
//!
//! ```no_run
//! use sheetstream::convert::stream_rows;
//! use sheetstream::transform::row_sink;
//!
//! stream_rows("students.xlsx", &mut row_sink(|row, cells| {
//!     println!("{}: {:?}", row, cells);
//!     Ok(())
//! }))?;
//! # Ok::<(), sheetstream::SheetError>(())
//! ```

pub mod convert;
pub mod csv;
pub mod csv_writer;
pub mod error;
pub mod fast_writer;
pub mod generator;
pub mod naming;
pub mod package;
pub mod shared_strings;
pub mod sheet_parser;
pub mod student;
pub mod transform;
pub mod types;

pub use convert::{convert_reader_to_csv, convert_to_csv, stream_rows, ConversionSummary, ConvertOptions};
pub use csv_writer::CsvWriter;
pub use error::{ErrorKind, Result, SheetError};
pub use fast_writer::StreamingWorkbook;
pub use generator::{generate, generate_to_writer, GenerationSummary, GeneratorConfig, StudentSchema};
pub use package::SpreadsheetPackage;
pub use shared_strings::SharedStringTable;
pub use sheet_parser::{ParseState, ParseSummary, SheetParser};
pub use student::{read_students, StudentCsvReader, StudentRecord};
pub use transform::{row_sink, CsvRowSink, OffsetTransform, RowCollector, RowSink};
pub use types::{CellAddress, CellValue, Row};
