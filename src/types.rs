//! Type definitions for sheet rows and cell addressing

use std::fmt;

/// A cell address such as `C7`, split into a 0-based column and the
/// 1-based row number as written in the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    /// Column index (0-based, A = 0)
    pub col: usize,
    /// Row number (1-based), `None` when the reference carries no digits
    pub row: Option<u32>,
}

impl CellAddress {
    /// Parse a cell reference (e.g. "A1", "AA12", "c7").
    ///
    /// Column letters accumulate in base 26 (A=1 … Z=26, AA=27) and are then
    /// shifted to 0-based. Returns `None` when the reference has no leading
    /// letters.
    pub fn parse(reference: &str) -> Option<Self> {
        let letters = reference
            .bytes()
            .take_while(|b| b.is_ascii_alphabetic())
            .count();
        if letters == 0 {
            return None;
        }

        let col = column_index(&reference[..letters])?;
        let row = reference[letters..].parse::<u32>().ok();
        Some(CellAddress { col, row })
    }

    /// Excel-style reference (e.g. "A1"); the row part is omitted when unknown
    pub fn reference(&self) -> String {
        match self.row {
            Some(row) => format!("{}{}", column_letters(self.col), row),
            None => column_letters(self.col),
        }
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference())
    }
}

/// Number of columns in a worksheet (`A` through `XFD`)
pub const MAX_COLUMNS: usize = 16_384;

/// Convert column letters to a 0-based index ("A" -> 0, "AA" -> 26).
///
/// Returns `None` for empty input, non-letters, or indices past `usize`.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut col = 0usize;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let digit = (b.to_ascii_uppercase() - b'A' + 1) as usize;
        col = col.checked_mul(26)?.checked_add(digit)?;
    }
    Some(col - 1)
}

/// Convert a 0-based column index to letters (0 -> "A", 25 -> "Z", 26 -> "AA")
pub fn column_letters(col: usize) -> String {
    let mut result = Vec::new();
    let mut n = col + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        result.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    result.reverse();
    String::from_utf8(result).unwrap_or_default()
}

/// One assembled sheet row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Row number (1-based, as supplied by the sheet)
    pub number: u32,
    /// Cell text, contiguous from column 0
    pub cells: Vec<String>,
}

impl Row {
    pub fn new(number: u32, cells: Vec<String>) -> Self {
        Row { number, cells }
    }

    /// Get cell at column index
    pub fn get(&self, col: usize) -> Option<&str> {
        self.cells.get(col).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// True when every cell is empty text
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }
}

/// Typed value handed to the workbook writer
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Empty cell (not written)
    Empty,
    /// Text value
    String(String),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// Boolean value
    Bool(bool),
}

impl CellValue {
    /// Convert cell value to string
    pub fn as_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::String(s) => s.clone(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => b.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("Z"), Some(25));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("AZ"), Some(51));
        assert_eq!(column_index("XFD"), Some(16383));
        assert_eq!(column_index("b"), Some(1));
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(16383), "XFD");
    }

    #[test]
    fn test_parse_address() {
        let addr = CellAddress::parse("C7").unwrap();
        assert_eq!(addr.col, 2);
        assert_eq!(addr.row, Some(7));
        assert_eq!(addr.to_string(), "C7");

        let addr = CellAddress::parse("AB").unwrap();
        assert_eq!(addr.col, 27);
        assert_eq!(addr.row, None);

        assert!(CellAddress::parse("12").is_none());
        assert!(CellAddress::parse("").is_none());
    }

    #[test]
    fn test_row_accessors() {
        let row = Row::new(3, vec!["x".into(), String::new(), "y".into()]);
        assert_eq!(row.len(), 3);
        assert_eq!(row.get(2), Some("y"));
        assert_eq!(row.get(5), None);
        assert!(!row.is_empty());
        assert!(!row.is_blank());

        let blank = Row::new(4, vec![String::new()]);
        assert!(blank.is_blank());
        assert!(!blank.is_empty());
        assert!(Row::new(5, Vec::new()).is_empty());
    }
}
