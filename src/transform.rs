//! Row sinks and the score offset transform
//!
//! The parser pushes every completed row into a [`RowSink`]. Sinks see one
//! row at a time and may rewrite it in place before forwarding it.

use crate::csv::QuoteStyle;
use crate::csv_writer::CsvWriter;
use crate::error::{BoxError, Result};
use crate::types::Row;
use std::io::Write;

/// Result returned by a sink for a single row
pub type SinkResult = std::result::Result<(), BoxError>;

/// Row number treated as the header
pub const HEADER_ROW: u32 = 1;

/// Consumer of assembled rows.
///
/// `cells` is the parser's row buffer; it is cleared after the call returns,
/// so sinks that need to keep a row must copy it. Returning an error aborts
/// the whole parse.
pub trait RowSink {
    fn on_row(&mut self, row_number: u32, cells: &mut Vec<String>) -> SinkResult;
}

impl<S: RowSink + ?Sized> RowSink for &mut S {
    fn on_row(&mut self, row_number: u32, cells: &mut Vec<String>) -> SinkResult {
        (**self).on_row(row_number, cells)
    }
}

impl<S: RowSink + ?Sized> RowSink for Box<S> {
    fn on_row(&mut self, row_number: u32, cells: &mut Vec<String>) -> SinkResult {
        (**self).on_row(row_number, cells)
    }
}

/// Sink backed by a closure, see [`row_sink`]
pub struct FnSink<F>(F);

impl<F> RowSink for FnSink<F>
where
    F: FnMut(u32, &mut Vec<String>) -> SinkResult,
{
    fn on_row(&mut self, row_number: u32, cells: &mut Vec<String>) -> SinkResult {
        (self.0)(row_number, cells)
    }
}

/// Wrap a closure as a [`RowSink`]
///
/// # Example
///
/// ```no_run
/// use sheetstream::package::SpreadsheetPackage;
/// use sheetstream::transform::row_sink;
///
/// let mut package = SpreadsheetPackage::open("students.xlsx")?;
/// let mut count = 0u64;
/// package.parse_first_sheet(&mut row_sink(|_row, _cells| {
///     count += 1;
///     Ok(())
/// }))?;
/// # Ok::<(), sheetstream::SheetError>(())
/// ```
pub fn row_sink<F>(f: F) -> FnSink<F>
where
    F: FnMut(u32, &mut Vec<String>) -> SinkResult,
{
    FnSink(f)
}

/// Sink that keeps every row; meant for small sheets and tests
#[derive(Debug, Default)]
pub struct RowCollector {
    rows: Vec<Row>,
}

impl RowCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl RowSink for RowCollector {
    fn on_row(&mut self, row_number: u32, cells: &mut Vec<String>) -> SinkResult {
        self.rows.push(Row::new(row_number, cells.clone()));
        Ok(())
    }
}

impl RowSink for Vec<Row> {
    fn on_row(&mut self, row_number: u32, cells: &mut Vec<String>) -> SinkResult {
        self.push(Row::new(row_number, cells.clone()));
        Ok(())
    }
}

/// What [`OffsetTransform::apply`] did to a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Header row, passed through
    Header,
    /// Last cell replaced by the adjusted number
    Adjusted,
    /// Last cell missing or not numeric, left as is
    Skipped,
}

/// Adds a fixed offset to the last cell of every data row
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OffsetTransform {
    offset: f64,
}

impl Default for OffsetTransform {
    fn default() -> Self {
        OffsetTransform::new(Self::DEFAULT_OFFSET)
    }
}

impl OffsetTransform {
    pub const DEFAULT_OFFSET: f64 = 10.0;

    pub fn new(offset: f64) -> Self {
        OffsetTransform { offset }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Transform a row in place.
    ///
    /// Row 1 is never touched. For other rows the last cell is parsed as a
    /// number; on success it becomes `trunc(value + offset)`.
    pub fn apply(&self, row_number: u32, cells: &mut [String]) -> Adjustment {
        if row_number == HEADER_ROW {
            return Adjustment::Header;
        }
        let Some(last) = cells.last_mut() else {
            return Adjustment::Skipped;
        };
        match self.adjust_value(last) {
            Some(adjusted) => {
                *last = adjusted;
                Adjustment::Adjusted
            }
            None => Adjustment::Skipped,
        }
    }

    /// Adjusted text for a single value, `None` when it is not a usable number
    pub fn adjust_value(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let mut buf = itoa::Buffer::new();

        // Whole numbers stay in i64 so large values keep every digit
        if self.offset.fract() == 0.0 && self.offset.abs() < i64::MAX as f64 {
            if let Ok(value) = trimmed.parse::<i64>() {
                return value
                    .checked_add(self.offset as i64)
                    .map(|adjusted| buf.format(adjusted).to_string());
            }
        }

        let value: f64 = trimmed.parse().ok()?;
        let adjusted = (value + self.offset).trunc();
        if !adjusted.is_finite() || adjusted < i64::MIN as f64 || adjusted >= i64::MAX as f64 {
            return None;
        }
        Some(buf.format(adjusted as i64).to_string())
    }
}

/// Counters kept by [`CsvRowSink`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformStats {
    /// Rows written to the output
    pub rows_written: u64,
    /// Data rows whose last cell was adjusted
    pub adjusted: u64,
    /// Data rows whose last cell could not be read as a number
    pub skipped: u64,
}

/// Applies [`OffsetTransform`] and writes each row to CSV immediately
pub struct CsvRowSink<W: Write> {
    writer: CsvWriter<W>,
    transform: OffsetTransform,
    pad_to: Option<usize>,
    pad_to_header: bool,
    header_width: Option<usize>,
    stats: TransformStats,
}

impl<W: Write> CsvRowSink<W> {
    pub fn new(writer: CsvWriter<W>, transform: OffsetTransform) -> Self {
        CsvRowSink {
            writer,
            transform,
            pad_to: None,
            pad_to_header: false,
            header_width: None,
            stats: TransformStats::default(),
        }
    }

    /// Pad short data rows with empty cells up to `columns` before the
    /// transform runs (builder pattern)
    pub fn pad_to(mut self, columns: Option<usize>) -> Self {
        self.pad_to = columns;
        self
    }

    /// Pad short data rows to the width of the header row (builder pattern).
    /// An explicit [`pad_to`](Self::pad_to) width takes precedence.
    pub fn pad_to_header(mut self, enabled: bool) -> Self {
        self.pad_to_header = enabled;
        self
    }

    fn padded_width(&self) -> Option<usize> {
        match self.pad_to {
            Some(columns) => Some(columns),
            None if self.pad_to_header => self.header_width,
            None => None,
        }
    }

    /// Set output quoting (builder pattern)
    pub fn quote_style(mut self, style: QuoteStyle) -> Self {
        self.writer = self.writer.quote_style(style);
        self
    }

    pub fn stats(&self) -> &TransformStats {
        &self.stats
    }

    /// Flush the output and hand back the underlying writer
    pub fn finish(self) -> Result<(W, TransformStats)> {
        let inner = self.writer.save()?;
        Ok((inner, self.stats))
    }
}

impl<W: Write> RowSink for CsvRowSink<W> {
    fn on_row(&mut self, row_number: u32, cells: &mut Vec<String>) -> SinkResult {
        if row_number == HEADER_ROW {
            self.header_width = Some(cells.len());
        } else if let Some(columns) = self.padded_width() {
            if cells.len() < columns {
                cells.resize(columns, String::new());
            }
        }

        match self.transform.apply(row_number, cells) {
            Adjustment::Adjusted => self.stats.adjusted += 1,
            Adjustment::Skipped => {
                self.stats.skipped += 1;
                log::debug!(
                    "Non-numeric score at row {}: {:?}",
                    row_number,
                    cells.last()
                );
            }
            Adjustment::Header => {}
        }

        self.writer.write_row(cells.iter())?;
        self.stats.rows_written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_header_is_untouched() {
        let t = OffsetTransform::default();
        let mut row = cells(&["studentId", "score", "50"]);
        assert_eq!(t.apply(1, &mut row), Adjustment::Header);
        assert_eq!(row, cells(&["studentId", "score", "50"]));
    }

    #[test]
    fn test_integer_offset() {
        let t = OffsetTransform::default();
        let mut row = cells(&["1", "Ann", "Lee", "2001-02-03", "Class1", "60"]);
        assert_eq!(t.apply(2, &mut row), Adjustment::Adjusted);
        assert_eq!(row[5], "70");
        assert_eq!(row[1], "Ann");
    }

    #[test]
    fn test_decimal_is_truncated() {
        let t = OffsetTransform::new(10.0);
        assert_eq!(t.adjust_value("60.7").as_deref(), Some("70"));
        assert_eq!(t.adjust_value(" 61.0 ").as_deref(), Some("71"));
        assert_eq!(t.adjust_value("-12.5").as_deref(), Some("-2"));
        assert_eq!(OffsetTransform::new(0.5).adjust_value("3").as_deref(), Some("3"));
    }

    #[test]
    fn test_large_integers_keep_precision() {
        let t = OffsetTransform::default();
        assert_eq!(
            t.adjust_value("9007199254740993").as_deref(),
            Some("9007199254741003")
        );
        assert_eq!(t.adjust_value("-9007199254740993").as_deref(), Some("-9007199254740983"));
        assert_eq!(t.adjust_value(&i64::MAX.to_string()), None);
    }

    #[test]
    fn test_non_numeric_is_skipped() {
        let t = OffsetTransform::default();
        for raw in ["", "  ", "abc", "7x", "NaN", "inf"] {
            let mut row = cells(&["2", raw]);
            assert_eq!(t.apply(3, &mut row), Adjustment::Skipped, "{:?}", raw);
            assert_eq!(row[1], raw);
        }
        let mut empty: Vec<String> = Vec::new();
        assert_eq!(t.apply(4, &mut empty), Adjustment::Skipped);
    }

    #[test]
    fn test_csv_sink_pads_and_adjusts() {
        let writer = CsvWriter::from_writer(Vec::new());
        let mut sink = CsvRowSink::new(writer, OffsetTransform::default()).pad_to(Some(3));

        sink.on_row(1, &mut cells(&["a", "b", "score"])).unwrap();
        sink.on_row(2, &mut cells(&["x", "y", "80"])).unwrap();
        sink.on_row(3, &mut cells(&["x, y", "z"])).unwrap();

        let (out, stats) = sink.finish().unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "a,b,score\nx,y,90\n\"x, y\",z,\n"
        );
        assert_eq!(stats.rows_written, 3);
        assert_eq!(stats.adjusted, 1);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_csv_sink_pads_to_header_width() {
        let writer = CsvWriter::from_writer(Vec::new());
        let mut sink = CsvRowSink::new(writer, OffsetTransform::default()).pad_to_header(true);

        sink.on_row(1, &mut cells(&["id", "name", "score"])).unwrap();
        sink.on_row(2, &mut cells(&["1", "Ann", "60"])).unwrap();
        sink.on_row(3, &mut cells(&["2", "Bo"])).unwrap();
        sink.on_row(4, &mut cells(&["3", "Cy", "50", "extra"])).unwrap();

        let (out, stats) = sink.finish().unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id,name,score\n1,Ann,70\n2,Bo,\n3,Cy,50,extra\n"
        );
        assert_eq!(stats.adjusted, 1);
        assert_eq!(stats.skipped, 2);
    }

    #[test]
    fn test_collector_copies_rows() {
        let mut collector = RowCollector::new();
        let mut buf = cells(&["x"]);
        collector.on_row(7, &mut buf).unwrap();
        buf.clear();
        assert_eq!(collector.rows()[0], Row::new(7, vec!["x".into()]));

        let mut rows: Vec<Row> = Vec::new();
        rows.on_row(2, &mut cells(&["a", "b"])).unwrap();
        assert_eq!(rows[0].get(1), Some("b"));
    }
}
