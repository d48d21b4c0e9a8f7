//! CSV record parsing
//!
//! Records are read line by line; a quoted field that contains a line break
//! keeps pulling lines until its closing quote, so only one record is held at
//! a time.

use crate::error::Result;
use std::io::BufRead;

/// Streaming CSV record reader
pub struct CsvParser<R: BufRead> {
    reader: R,
    line: String,
    delimiter: char,
    quote_char: char,
    records: u64,
}

impl<R: BufRead> CsvParser<R> {
    pub fn new(reader: R) -> Self {
        CsvParser {
            reader,
            line: String::with_capacity(256),
            delimiter: ',',
            quote_char: '"',
            records: 0,
        }
    }

    /// Set custom delimiter (builder pattern)
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter as char;
        self
    }

    /// Set custom quote character (builder pattern)
    pub fn quote_char(mut self, quote: u8) -> Self {
        self.quote_char = quote as char;
        self
    }

    /// Number of records returned so far
    pub fn records_read(&self) -> u64 {
        self.records
    }

    /// Read the next record, `Ok(None)` at end of input
    pub fn read_record(&mut self) -> Result<Option<Vec<String>>> {
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut started = false;

        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                if !started {
                    return Ok(None);
                }
                // Unterminated quote at end of input: keep what was read
                break;
            }
            started = true;

            let mut chars = self.line.chars().peekable();
            while let Some(ch) = chars.next() {
                if ch == self.quote_char {
                    if in_quotes && chars.peek() == Some(&self.quote_char) {
                        field.push(self.quote_char);
                        chars.next();
                    } else {
                        in_quotes = !in_quotes;
                    }
                } else if ch == self.delimiter && !in_quotes {
                    fields.push(std::mem::take(&mut field));
                } else if (ch == '\n' || ch == '\r') && !in_quotes {
                    // Line terminator outside quotes ends the record
                } else {
                    field.push(ch);
                }
            }

            if !in_quotes {
                break;
            }
        }

        fields.push(field);
        self.records += 1;
        Ok(Some(fields))
    }
}

impl<R: BufRead> Iterator for CsvParser<R> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}
