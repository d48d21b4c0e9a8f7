//! Event-driven worksheet parser
//!
//! Drives a quick-xml token stream over `sheetN.xml` and assembles one row at
//! a time. Only the current row is ever held in memory: the buffer is handed
//! to the [`RowSink`] on `</row>` and cleared afterwards, so memory stays flat
//! no matter how many rows the sheet has.
//!
//! ```text
//! Idle --<row>--> InRow --<c>--> InCell --<v>/<is><t>--> InValue
//!  ^                ^               |  ^                    |
//!  |                |               |  +------</v>/</t>-----+
//!  +----</row>------+-----</c>------+
//! ```

use crate::error::{Result, SheetError};
use crate::shared_strings::SharedStringTable;
use crate::transform::RowSink;
use crate::types::{CellAddress, MAX_COLUMNS};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;

/// Log a progress line every N rows by default
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;

/// Parser position within the sheet markup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Between rows
    Idle,
    /// Inside `<row>`, between cells
    InRow,
    /// Inside `<c>`, outside any value element
    InCell,
    /// Inside `<v>` or an inline string's `<t>`, collecting text
    InValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    /// `t="s"`: the value is an index into the shared strings table
    SharedString,
    /// Numbers, booleans, inline and formula strings, kept as written
    Literal,
}

/// Counters reported once the sheet has been fully parsed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseSummary {
    /// Rows handed to the sink
    pub rows: u64,
    /// Number of the last row emitted
    pub last_row: Option<u32>,
    /// Shared-string cells whose index had no table entry
    pub unresolved_strings: u64,
}

/// Streaming state machine for a single worksheet
pub struct SheetParser<'a> {
    shared_strings: &'a SharedStringTable,
    state: ParseState,
    row_number: u32,
    last_row: Option<u32>,
    cursor: usize,
    row: Vec<String>,
    value: String,
    value_kind: ValueKind,
    cell_col: Option<usize>,
    cell_has_value: bool,
    in_inline_string: bool,
    progress_interval: u64,
    summary: ParseSummary,
}

impl<'a> SheetParser<'a> {
    pub fn new(shared_strings: &'a SharedStringTable) -> Self {
        SheetParser {
            shared_strings,
            state: ParseState::Idle,
            row_number: 0,
            last_row: None,
            cursor: 0,
            row: Vec::with_capacity(16),
            value: String::with_capacity(64),
            value_kind: ValueKind::Literal,
            cell_col: None,
            cell_has_value: false,
            in_inline_string: false,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            summary: ParseSummary::default(),
        }
    }

    /// Set how many rows pass between progress log lines (0 disables)
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Parse a worksheet stream, pushing every completed row into `sink`.
    ///
    /// A sink error aborts the parse with [`SheetError::RowProcessing`]
    /// carrying the offending row number.
    pub fn parse<R: BufRead, S: RowSink + ?Sized>(
        mut self,
        source: R,
        sink: &mut S,
    ) -> Result<ParseSummary> {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(false);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"row" => self.open_row(&e)?,
                    b"c" => self.open_cell(&e)?,
                    b"v" if self.state == ParseState::InCell => self.open_value(),
                    b"is" if self.state == ParseState::InCell => self.in_inline_string = true,
                    b"t" if self.state == ParseState::InCell && self.in_inline_string => {
                        self.state = ParseState::InValue;
                    }
                    _ => {}
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"row" => {
                        self.open_row(&e)?;
                        self.close_row(sink)?;
                    }
                    b"c" => {
                        self.open_cell(&e)?;
                        self.close_cell();
                    }
                    b"v" if self.state == ParseState::InCell => {
                        self.open_value();
                        self.close_value();
                    }
                    _ => {}
                },
                Event::Text(e) if self.state == ParseState::InValue => {
                    self.value.push_str(&e.unescape()?);
                }
                Event::CData(e) if self.state == ParseState::InValue => {
                    self.value.push_str(&String::from_utf8_lossy(&e));
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"v" if self.state == ParseState::InValue && !self.in_inline_string => {
                        self.close_value();
                    }
                    b"t" if self.state == ParseState::InValue && self.in_inline_string => {
                        // Rich inline strings have several runs; keep collecting until </is>
                        self.state = ParseState::InCell;
                    }
                    b"is" if self.in_inline_string => {
                        self.in_inline_string = false;
                        self.close_value();
                    }
                    b"c" => self.close_cell(),
                    b"row" => self.close_row(sink)?,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if self.state != ParseState::Idle {
            return Err(SheetError::malformed(format!(
                "worksheet ended inside row {}",
                self.row_number
            )));
        }

        Ok(self.summary)
    }

    fn open_row(&mut self, e: &BytesStart<'_>) -> Result<()> {
        if self.state != ParseState::Idle {
            return Err(SheetError::malformed(format!(
                "row opened inside row {}",
                self.row_number
            )));
        }

        let number = match attribute(e, b"r")? {
            Some(raw) => raw.trim().parse::<u32>().map_err(|_| {
                SheetError::malformed(format!("invalid row number '{}'", raw))
            })?,
            None => self.last_row.map_or(1, |n| n.saturating_add(1)),
        };
        if let Some(last) = self.last_row {
            if number < last {
                return Err(SheetError::malformed(format!(
                    "row {} follows row {}",
                    number, last
                )));
            }
        }

        self.row_number = number;
        self.cursor = 0;
        self.row.clear();
        self.state = ParseState::InRow;
        Ok(())
    }

    fn open_cell(&mut self, e: &BytesStart<'_>) -> Result<()> {
        if self.state != ParseState::InRow {
            return Err(SheetError::malformed(format!(
                "cell outside of a row near row {}",
                self.row_number
            )));
        }

        let mut reference = None;
        let mut kind = ValueKind::Literal;
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            match attr.key.as_ref() {
                b"r" => reference = Some(attr.unescape_value()?.into_owned()),
                b"t" if attr.value.as_ref() == b"s" => kind = ValueKind::SharedString,
                _ => {}
            }
        }

        // A cell without a usable reference lands on the cursor
        self.cell_col = reference
            .as_deref()
            .and_then(CellAddress::parse)
            .map(|addr| addr.col);
        if let Some(col) = self.cell_col {
            if col >= MAX_COLUMNS {
                return Err(SheetError::malformed(format!(
                    "cell reference '{}' in row {} is past the last column",
                    reference.as_deref().unwrap_or_default(),
                    self.row_number
                )));
            }
        }
        self.value_kind = kind;
        self.value.clear();
        self.cell_has_value = false;
        self.in_inline_string = false;
        self.state = ParseState::InCell;
        Ok(())
    }

    fn open_value(&mut self) {
        self.value.clear();
        self.state = ParseState::InValue;
    }

    /// Finalize the accumulated text and append it at the cell's column
    fn close_value(&mut self) {
        let raw = std::mem::take(&mut self.value);
        let text = match self.value_kind {
            ValueKind::SharedString => match self.shared_strings.lookup(&raw) {
                Some(resolved) => resolved.to_string(),
                None => {
                    self.summary.unresolved_strings += 1;
                    log::debug!(
                        "Unresolved shared string '{}' at row {}",
                        raw,
                        self.row_number
                    );
                    raw
                }
            },
            ValueKind::Literal => raw,
        };

        let col = self.cell_col.unwrap_or(self.cursor);
        self.pad_to(col);
        self.row.push(text);
        self.cursor += 1;
        self.cell_has_value = true;
        self.state = ParseState::InCell;
    }

    fn close_cell(&mut self) {
        if self.state == ParseState::Idle {
            return;
        }
        // A referenced cell without a value still widens the row
        if !self.cell_has_value {
            if let Some(col) = self.cell_col {
                if col >= self.cursor {
                    self.pad_to(col + 1);
                }
            }
        }
        self.cell_col = None;
        self.in_inline_string = false;
        self.state = ParseState::InRow;
    }

    fn close_row<S: RowSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        if self.state == ParseState::Idle {
            return Ok(());
        }

        let row = self.row_number;
        sink.on_row(row, &mut self.row)
            .map_err(|source| SheetError::RowProcessing { row, source })?;

        self.summary.rows += 1;
        self.summary.last_row = Some(row);
        self.last_row = Some(row);
        self.row.clear();
        self.cursor = 0;
        self.state = ParseState::Idle;

        if self.progress_interval > 0 && self.summary.rows % self.progress_interval == 0 {
            log::info!("Processed {} rows...", self.summary.rows);
        }
        Ok(())
    }

    /// Insert empty placeholders for skipped columns
    fn pad_to(&mut self, col: usize) {
        while self.cursor < col {
            self.row.push(String::new());
            self.cursor += 1;
        }
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
