//! Synthetic student workbook generation through a bounded row window
//!
//! Rows are built one at a time and parked in a [`RowWindow`] of at most
//! `window_size` rows. Once the window is full, pushing a new row evicts the
//! oldest one, which is written to the [`StreamingWorkbook`] right away. The
//! rows still in the window are flushed when generation ends, so memory use
//! depends on the window size and never on `n`.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{Days, NaiveDate};
use rand::Rng;

use crate::error::{Result, SheetError};
use crate::fast_writer::{validate_sheet_name, StreamingWorkbook};
use crate::sheet_parser::DEFAULT_PROGRESS_INTERVAL;
use crate::types::CellValue;

/// Header of the student dataset, in column order
pub const STUDENT_COLUMNS: [&str; 6] = [
    "studentId",
    "firstName",
    "lastName",
    "dob",
    "className",
    "score",
];

/// Rows kept in memory before the oldest is written out
pub const DEFAULT_WINDOW_SIZE: usize = 100;

pub const DEFAULT_SHEET_NAME: &str = "students";

/// Row limit of a single worksheet
pub const MAX_SHEET_ROWS: u64 = 1_048_576;

/// Value ranges for generated students
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StudentSchema {
    pub min_name_len: usize,
    pub max_name_len: usize,
    pub dob_start: NaiveDate,
    pub dob_end: NaiveDate,
    pub classes: Vec<String>,
    pub min_score: i64,
    pub max_score: i64,
}

impl Default for StudentSchema {
    fn default() -> Self {
        StudentSchema {
            min_name_len: 3,
            max_name_len: 8,
            dob_start: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            dob_end: NaiveDate::from_ymd_opt(2010, 12, 31).unwrap_or_default(),
            classes: (1..=5).map(|i| format!("Class{}", i)).collect(),
            min_score: 55,
            max_score: 75,
        }
    }
}

impl StudentSchema {
    /// Check that every range is non-empty
    pub fn validate(&self) -> Result<()> {
        if self.min_name_len == 0 || self.min_name_len > self.max_name_len {
            return Err(SheetError::Config(format!(
                "invalid name length range {}..={}",
                self.min_name_len, self.max_name_len
            )));
        }
        if self.dob_start > self.dob_end {
            return Err(SheetError::Config(format!(
                "dob range starts after it ends ({} > {})",
                self.dob_start, self.dob_end
            )));
        }
        if self.classes.is_empty() {
            return Err(SheetError::Config("class list is empty".to_string()));
        }
        if self.min_score > self.max_score {
            return Err(SheetError::Config(format!(
                "invalid score range {}..={}",
                self.min_score, self.max_score
            )));
        }
        Ok(())
    }

    /// Build the data row for `student_id`
    pub fn sample_row<R: Rng + ?Sized>(&self, student_id: u64, rng: &mut R) -> Vec<CellValue> {
        let class = &self.classes[rng.gen_range(0..self.classes.len())];
        vec![
            CellValue::Int(student_id as i64),
            CellValue::String(self.sample_name(rng)),
            CellValue::String(self.sample_name(rng)),
            CellValue::String(self.sample_dob(rng).format("%Y-%m-%d").to_string()),
            CellValue::String(class.clone()),
            CellValue::Int(rng.gen_range(self.min_score..=self.max_score)),
        ]
    }

    /// Random lowercase letters with the first one capitalized
    fn sample_name<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let len = rng.gen_range(self.min_name_len..=self.max_name_len);
        let mut name = String::with_capacity(len);
        for i in 0..len {
            let c = rng.gen_range(b'a'..=b'z') as char;
            name.push(if i == 0 { c.to_ascii_uppercase() } else { c });
        }
        name
    }

    fn sample_dob<R: Rng + ?Sized>(&self, rng: &mut R) -> NaiveDate {
        let span = (self.dob_end - self.dob_start).num_days().max(0) as u64;
        let offset = rng.gen_range(0..=span);
        self.dob_start
            .checked_add_days(Days::new(offset))
            .unwrap_or(self.dob_start)
    }
}

/// Settings for [`generate`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneratorConfig {
    pub window_size: usize,
    pub sheet_name: String,
    pub schema: StudentSchema,
    /// Data rows between progress log lines (0 disables)
    pub progress_interval: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            window_size: DEFAULT_WINDOW_SIZE,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            schema: StudentSchema::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set window size (builder pattern)
    pub fn window_size(mut self, size: usize) -> Self {
        self.window_size = size;
        self
    }

    /// Set sheet name (builder pattern)
    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    /// Set value ranges (builder pattern)
    pub fn schema(mut self, schema: StudentSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Set progress log interval (builder pattern)
    pub fn progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(SheetError::Config(
                "window size must be at least 1".to_string(),
            ));
        }
        validate_sheet_name(&self.sheet_name)?;
        self.schema.validate()
    }
}

/// Bounded FIFO of rows awaiting flush
#[derive(Debug)]
pub struct RowWindow {
    rows: VecDeque<Vec<CellValue>>,
    capacity: usize,
    peak: usize,
}

impl RowWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        RowWindow {
            rows: VecDeque::with_capacity(capacity),
            capacity,
            peak: 0,
        }
    }

    /// Add a row; when the window is full the oldest row is evicted first
    /// and returned so the caller can write it out.
    pub fn push(&mut self, row: Vec<CellValue>) -> Option<Vec<CellValue>> {
        let evicted = if self.rows.len() >= self.capacity {
            self.rows.pop_front()
        } else {
            None
        };
        self.rows.push_back(row);
        self.peak = self.peak.max(self.rows.len());
        evicted
    }

    /// Remove the remaining rows, oldest first
    pub fn drain(&mut self) -> impl Iterator<Item = Vec<CellValue>> + '_ {
        self.rows.drain(..)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest number of rows held at once
    pub fn peak(&self) -> usize {
        self.peak
    }
}

/// Result of a generation run
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSummary {
    /// Student rows written (header excluded)
    pub data_rows: u64,
    /// Rows in the sheet, header included
    pub total_rows: u64,
    /// Largest number of rows held in the window
    pub peak_window: usize,
    pub elapsed: Duration,
}

/// Generate `n` students into an XLSX file at `path`.
///
/// The file is written in place; a failure part way leaves a truncated file
/// behind.
///
/// # Example
///
/// ```no_run
/// use sheetstream::generator::{generate, GeneratorConfig};
///
/// let mut rng = rand::thread_rng();
/// let summary = generate(1_000, &GeneratorConfig::default(), &mut rng, "students.xlsx")?;
/// assert!(summary.peak_window <= 100);
/// # Ok::<(), sheetstream::SheetError>(())
/// ```
pub fn generate<P, R>(
    n: u64,
    config: &GeneratorConfig,
    rng: &mut R,
    path: P,
) -> Result<GenerationSummary>
where
    P: AsRef<Path>,
    R: Rng + ?Sized,
{
    let path = path.as_ref();
    check_request(n, config)?;

    let file = File::create(path)?;
    let writer = BufWriter::with_capacity(64 * 1024, file);
    let (_, summary) = generate_to_writer(n, config, rng, writer)?;

    log::info!(
        "Generated workbook with {} records in {} ms: {}",
        summary.data_rows,
        summary.elapsed.as_millis(),
        path.display()
    );
    Ok(summary)
}

/// Generate `n` students into any seekable writer and hand the writer back
pub fn generate_to_writer<W, R>(
    n: u64,
    config: &GeneratorConfig,
    rng: &mut R,
    writer: W,
) -> Result<(W, GenerationSummary)>
where
    W: Write + Seek,
    R: Rng + ?Sized,
{
    check_request(n, config)?;
    let start = Instant::now();

    let vocabulary = STUDENT_COLUMNS
        .iter()
        .map(|s| s.to_string())
        .chain(config.schema.classes.iter().cloned());
    let mut workbook = StreamingWorkbook::new(writer, vocabulary)?;
    workbook.start_sheet(&config.sheet_name)?;

    let mut window = RowWindow::new(config.window_size);
    let header = STUDENT_COLUMNS.iter().map(|&s| CellValue::from(s)).collect();
    if let Some(evicted) = window.push(header) {
        workbook.write_row(&evicted)?;
    }

    log::info!("Starting to generate {} records...", n);
    for student_id in 1..=n {
        let row = config.schema.sample_row(student_id, rng);
        if let Some(evicted) = window.push(row) {
            workbook.write_row(&evicted)?;
        }

        if config.progress_interval > 0 && student_id % config.progress_interval == 0 {
            log::info!("Generated {} records...", student_id);
        }
    }

    for row in window.drain() {
        workbook.write_row(&row)?;
    }
    let total_rows = u64::from(workbook.rows_written());
    let writer = workbook.close()?;

    let summary = GenerationSummary {
        data_rows: n,
        total_rows,
        peak_window: window.peak(),
        elapsed: start.elapsed(),
    };
    log::debug!(
        "Generation finished: {} rows, peak window {}",
        summary.total_rows,
        summary.peak_window
    );
    Ok((writer, summary))
}

fn check_request(n: u64, config: &GeneratorConfig) -> Result<()> {
    config.validate()?;
    if n >= MAX_SHEET_ROWS {
        return Err(SheetError::Config(format!(
            "{} records do not fit in one worksheet (limit {} data rows)",
            n,
            MAX_SHEET_ROWS - 1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Cursor;

    #[test]
    fn test_window_evicts_oldest() {
        let mut window = RowWindow::new(2);
        assert!(window.push(vec![CellValue::Int(1)]).is_none());
        assert!(window.push(vec![CellValue::Int(2)]).is_none());
        assert_eq!(window.push(vec![CellValue::Int(3)]), Some(vec![CellValue::Int(1)]));
        assert_eq!(window.len(), 2);
        assert_eq!(window.peak(), 2);

        let rest: Vec<_> = window.drain().collect();
        assert_eq!(rest, vec![vec![CellValue::Int(2)], vec![CellValue::Int(3)]]);
        assert!(window.is_empty());
    }

    #[test]
    fn test_sample_row_respects_schema() {
        let schema = StudentSchema::default();
        let mut rng = StdRng::seed_from_u64(7);
        for id in 1..=500 {
            let row = schema.sample_row(id, &mut rng);
            assert_eq!(row.len(), STUDENT_COLUMNS.len());
            assert_eq!(row[0], CellValue::Int(id as i64));

            for name in [&row[1], &row[2]] {
                let CellValue::String(name) = name else {
                    panic!("name is not text: {:?}", name)
                };
                assert!((3..=8).contains(&name.len()));
                let mut chars = name.chars();
                assert!(chars.next().is_some_and(|c| c.is_ascii_uppercase()));
                assert!(chars.all(|c| c.is_ascii_lowercase()));
            }

            let CellValue::String(dob) = &row[3] else {
                panic!("dob is not text")
            };
            let dob = NaiveDate::parse_from_str(dob, "%Y-%m-%d").unwrap();
            assert!(dob >= schema.dob_start && dob <= schema.dob_end);

            assert!(schema.classes.contains(&row[4].as_string()));
            let CellValue::Int(score) = row[5] else {
                panic!("score is not an integer")
            };
            assert!((55..=75).contains(&score));
        }
    }

    #[test]
    fn test_generate_bounds_window() -> Result<()> {
        let config = GeneratorConfig::default().window_size(10);
        let mut rng = StdRng::seed_from_u64(1);
        let (out, summary) = generate_to_writer(250, &config, &mut rng, Cursor::new(Vec::new()))?;

        assert_eq!(summary.data_rows, 250);
        assert_eq!(summary.total_rows, 251);
        assert_eq!(summary.peak_window, 10);
        assert!(!out.into_inner().is_empty());
        Ok(())
    }

    #[test]
    fn test_zero_records_writes_header_only() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(1);
        let (_, summary) =
            generate_to_writer(0, &GeneratorConfig::default(), &mut rng, Cursor::new(Vec::new()))?;
        assert_eq!(summary.total_rows, 1);
        assert_eq!(summary.peak_window, 1);
        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        let mut rng = StdRng::seed_from_u64(1);
        let bad = [
            GeneratorConfig::default().window_size(0),
            GeneratorConfig::default().sheet_name(""),
            GeneratorConfig::default().schema(StudentSchema {
                classes: Vec::new(),
                ..StudentSchema::default()
            }),
            GeneratorConfig::default().schema(StudentSchema {
                min_score: 80,
                ..StudentSchema::default()
            }),
        ];
        for config in bad {
            let err = generate_to_writer(5, &config, &mut rng, Cursor::new(Vec::new())).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Config, "{:?}", config);
        }

        let err = generate_to_writer(
            MAX_SHEET_ROWS,
            &GeneratorConfig::default(),
            &mut rng,
            Cursor::new(Vec::new()),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
