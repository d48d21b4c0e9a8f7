//! XLSX to CSV conversion with the score offset applied
//!
//! Wires [`SpreadsheetPackage`], the sheet parser and [`CsvRowSink`] into a
//! single pass: each row is read, adjusted and written before the next one is
//! parsed.

use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::csv::QuoteStyle;
use crate::csv_writer::CsvWriter;
use crate::error::Result;
use crate::package::SpreadsheetPackage;
use crate::sheet_parser::{ParseSummary, DEFAULT_PROGRESS_INTERVAL};
use crate::transform::{CsvRowSink, OffsetTransform, RowSink};

/// Options for [`convert_to_csv`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvertOptions {
    /// Added to the last column of every data row
    pub offset: f64,
    pub delimiter: u8,
    pub quote_style: QuoteStyle,
    /// Fixed width for short data rows; overrides `pad_to_header`
    pub pad_to: Option<usize>,
    /// Pad short data rows to the header row's width
    pub pad_to_header: bool,
    /// Rows between progress log lines (0 disables)
    pub progress_interval: u64,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            offset: OffsetTransform::DEFAULT_OFFSET,
            delimiter: b',',
            quote_style: QuoteStyle::Necessary,
            pad_to: None,
            pad_to_header: true,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set score offset (builder pattern)
    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Set output delimiter (builder pattern)
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set output quoting (builder pattern)
    pub fn quote_style(mut self, style: QuoteStyle) -> Self {
        self.quote_style = style;
        self
    }

    /// Set a fixed padded row width (builder pattern)
    pub fn pad_to(mut self, columns: Option<usize>) -> Self {
        self.pad_to = columns;
        self
    }

    /// Pad short data rows to the header width (builder pattern)
    pub fn pad_to_header(mut self, enabled: bool) -> Self {
        self.pad_to_header = enabled;
        self
    }

    /// Set progress log interval (builder pattern)
    pub fn progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }
}

/// Outcome of a conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    /// CSV lines written, header included
    pub rows_written: u64,
    /// Data rows whose score was adjusted
    pub values_adjusted: u64,
    /// Data rows whose score was missing or not numeric
    pub values_skipped: u64,
    /// Shared-string references that fell back to the raw index
    pub unresolved_strings: u64,
    pub elapsed: Duration,
}

/// Convert the first sheet of `input` into a CSV file at `output`.
///
/// Fails with [`SheetError::NotFound`](crate::SheetError::NotFound) before the
/// output file is created when `input` does not exist. The output is written
/// in place; an error part way leaves a truncated file behind.
///
/// # Example
///
/// ```no_run
/// use sheetstream::convert::{convert_to_csv, ConvertOptions};
///
/// let summary = convert_to_csv("students.xlsx", "students.csv", &ConvertOptions::default())?;
/// println!("{} rows", summary.rows_written);
/// # Ok::<(), sheetstream::SheetError>(())
/// ```
pub fn convert_to_csv<P, Q>(input: P, output: Q, options: &ConvertOptions) -> Result<ConversionSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let input = input.as_ref();
    let output = output.as_ref();
    log::info!("Converting {} to {}", input.display(), output.display());

    let package = SpreadsheetPackage::open(input)?;
    let file = File::create(output)?;
    let (_, summary) = convert_package(package, file, options)?;

    log::info!(
        "Converted {} rows in {} ms: {}",
        summary.rows_written,
        summary.elapsed.as_millis(),
        output.display()
    );
    Ok(summary)
}

/// Convert an in-memory or otherwise seekable XLSX into any writer
pub fn convert_reader_to_csv<R, W>(
    input: R,
    output: W,
    options: &ConvertOptions,
) -> Result<(W, ConversionSummary)>
where
    R: Read + Seek,
    W: Write,
{
    let package = SpreadsheetPackage::from_reader(input)?;
    convert_package(package, output, options)
}

fn convert_package<R, W>(
    mut package: SpreadsheetPackage<R>,
    output: W,
    options: &ConvertOptions,
) -> Result<(W, ConversionSummary)>
where
    R: Read + Seek,
    W: Write,
{
    let start = Instant::now();
    package.set_progress_interval(options.progress_interval);

    let writer = CsvWriter::from_writer(output).delimiter(options.delimiter);
    let mut sink = CsvRowSink::new(writer, OffsetTransform::new(options.offset))
        .pad_to(options.pad_to)
        .pad_to_header(options.pad_to_header)
        .quote_style(options.quote_style);

    let parsed = package.parse_first_sheet(&mut sink)?;
    let (output, stats) = sink.finish()?;

    if parsed.unresolved_strings > 0 {
        log::debug!(
            "{} shared-string references were out of range",
            parsed.unresolved_strings
        );
    }

    let summary = ConversionSummary {
        rows_written: stats.rows_written,
        values_adjusted: stats.adjusted,
        values_skipped: stats.skipped,
        unresolved_strings: parsed.unresolved_strings,
        elapsed: start.elapsed(),
    };
    Ok((output, summary))
}

/// Stream the first sheet of the XLSX at `path` into `sink` without any
/// transform
pub fn stream_rows<P, S>(path: P, sink: &mut S) -> Result<ParseSummary>
where
    P: AsRef<Path>,
    S: RowSink + ?Sized,
{
    let mut package = SpreadsheetPackage::open(path)?;
    package.parse_first_sheet(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transform::RowCollector;
    use std::io::Cursor;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn xlsx(shared: &[&str], sheet_data: &str) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        zip.start_file("xl/workbook.xml", options).unwrap();
        zip.write_all(
            br#"<workbook xmlns:r="r"><sheets><sheet name="S" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        )
        .unwrap();
        zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
        zip.write_all(
            br#"<Relationships><Relationship Id="rId1" Type="x/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#,
        )
        .unwrap();
        zip.start_file("xl/sharedStrings.xml", options).unwrap();
        let items: String = shared.iter().map(|s| format!("<si><t>{}</t></si>", s)).collect();
        zip.write_all(format!("<sst>{}</sst>", items).as_bytes()).unwrap();
        zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
        zip.write_all(format!("<worksheet><sheetData>{}</sheetData></worksheet>", sheet_data).as_bytes())
            .unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_convert_reader() -> Result<()> {
        let data = xlsx(
            &["score", "Ann"],
            r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row>
               <row r="2"><c r="A2" t="s"><v>1</v></c><c r="B2"><v>41.9</v></c></row>
               <row r="3"><c r="A3" t="s"><v>9</v></c><c r="B3" t="inlineStr"><is><t>n/a</t></is></c></row>"#,
        );
        let options = ConvertOptions::default().pad_to_header(false);
        let (out, summary) = convert_reader_to_csv(Cursor::new(data), Vec::new(), &options)?;

        assert_eq!(String::from_utf8(out).unwrap(), "score\nAnn,51\n9,n/a\n");
        assert_eq!(summary.rows_written, 3);
        assert_eq!(summary.values_adjusted, 1);
        assert_eq!(summary.values_skipped, 1);
        assert_eq!(summary.unresolved_strings, 1);
        Ok(())
    }

    #[test]
    fn test_missing_input_creates_no_output() -> Result<()> {
        let dir = tempdir()?;
        let output = dir.path().join("out.csv");
        let err = convert_to_csv(dir.path().join("absent.xlsx"), &output, &ConvertOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!output.exists());
        Ok(())
    }

    #[test]
    fn test_stream_rows_untransformed() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("in.xlsx");
        std::fs::write(&path, xlsx(&[], r#"<row r="2"><c r="A2"><v>5</v></c></row>"#))?;

        let mut collector = RowCollector::new();
        let summary = stream_rows(&path, &mut collector)?;
        assert_eq!(summary.rows, 1);
        assert_eq!(collector.rows()[0].cells, vec!["5".to_string()]);
        Ok(())
    }
}
