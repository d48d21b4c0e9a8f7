//! CSV file writing with streaming support

use crate::csv::{CsvEncoder, QuoteStyle};
use crate::error::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Streaming CSV writer
///
/// Each row is encoded into a reusable buffer and written straight through,
/// so memory use does not depend on how many rows are written.
///
/// # Examples
///
/// ```no_run
/// use sheetstream::csv_writer::CsvWriter;
///
/// let mut writer = CsvWriter::new("output.csv")?;
/// writer.write_row(["studentId", "firstName", "score"])?;
/// writer.write_row(["1", "Alice", "70"])?;
/// writer.save()?;
/// # Ok::<(), sheetstream::SheetError>(())
/// ```
pub struct CsvWriter<W: Write> {
    writer: BufWriter<W>,
    encoder: CsvEncoder,
    delimiter: u8,
    quote_char: u8,
    quote_style: QuoteStyle,
    line_ending: &'static [u8],
    buffer: Vec<u8>,
    row_count: u64,
}

impl CsvWriter<File> {
    /// Create (or truncate) a CSV file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> CsvWriter<W> {
    /// Write CSV into any `Write` sink
    pub fn from_writer(writer: W) -> Self {
        CsvWriter {
            writer: BufWriter::with_capacity(64 * 1024, writer),
            encoder: CsvEncoder::default(),
            delimiter: b',',
            quote_char: b'"',
            quote_style: QuoteStyle::Necessary,
            line_ending: b"\n",
            buffer: Vec::with_capacity(4096),
            row_count: 0,
        }
    }

    /// Set custom delimiter (builder pattern)
    ///
    /// ```no_run
    /// use sheetstream::csv_writer::CsvWriter;
    ///
    /// let writer = CsvWriter::new("data.csv")?.delimiter(b';');
    /// # Ok::<(), sheetstream::SheetError>(())
    /// ```
    pub fn delimiter(mut self, delim: u8) -> Self {
        self.delimiter = delim;
        self.rebuild_encoder();
        self
    }

    /// Set custom quote character (builder pattern)
    pub fn quote_char(mut self, quote: u8) -> Self {
        self.quote_char = quote;
        self.rebuild_encoder();
        self
    }

    /// Set quoting policy (builder pattern)
    pub fn quote_style(mut self, style: QuoteStyle) -> Self {
        self.quote_style = style;
        self.rebuild_encoder();
        self
    }

    /// Use `\r\n` instead of `\n` between records (builder pattern)
    pub fn crlf(mut self, enabled: bool) -> Self {
        self.line_ending = if enabled { &b"\r\n"[..] } else { &b"\n"[..] };
        self
    }

    fn rebuild_encoder(&mut self) {
        self.encoder =
            CsvEncoder::new(self.delimiter, self.quote_char).with_quote_style(self.quote_style);
    }

    /// Write a row of strings
    pub fn write_row<I, S>(&mut self, data: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.buffer.clear();
        self.encoder.encode_row(data, &mut self.buffer);
        self.buffer.extend_from_slice(self.line_ending);
        self.writer.write_all(&self.buffer)?;
        self.row_count += 1;
        Ok(())
    }

    /// Write multiple rows at once
    pub fn write_rows_batch<I, R, S>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    /// Get the number of rows written
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Flush buffered output and return the underlying writer.
    ///
    /// Dropping the writer without calling `save` still flushes on a best
    /// effort basis, but errors are lost.
    pub fn save(self) -> Result<W> {
        let inner = self.writer.into_inner().map_err(|e| e.into_error())?;
        Ok(inner)
    }
}
