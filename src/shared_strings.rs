//! Shared Strings Table (SST) loading and lookup
//!
//! The table is loaded fully before any row is parsed because cells reference
//! strings by index. It is streamed from the ZIP entry token by token, so only
//! the decoded strings are kept, never the raw XML.

use crate::error::{Result, SheetError};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::BufRead;

/// Flat, append-only table of interned strings
#[derive(Debug, Clone, Default)]
pub struct SharedStringTable {
    strings: Vec<String>,
}

impl SharedStringTable {
    /// Load the table from a `sharedStrings.xml` stream.
    ///
    /// Rich-text runs (`<r><t>`) are concatenated into one entry. Phonetic
    /// runs (`<rPh>`) are skipped. A table with zero entries is valid.
    pub fn load<R: BufRead>(source: R) -> Result<Self> {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(false);

        let mut strings = Vec::new();
        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;
        let mut phonetic_depth = 0usize;
        let mut saw_root = false;
        let mut root_closed = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"sst" => saw_root = true,
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"rPh" => phonetic_depth += 1,
                    b"t" if in_si && phonetic_depth == 0 => in_t = true,
                    _ => {}
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"sst" => {
                        saw_root = true;
                        root_closed = true;
                    }
                    // <si/> still occupies an index
                    b"si" => strings.push(String::new()),
                    _ => {}
                },
                Event::Text(e) if in_t => {
                    current.push_str(&e.unescape()?);
                }
                Event::CData(e) if in_t => {
                    current.push_str(&String::from_utf8_lossy(&e));
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"si" => {
                        strings.push(std::mem::take(&mut current));
                        in_si = false;
                    }
                    b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                    b"t" => in_t = false,
                    b"sst" => root_closed = true,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !saw_root {
            return Err(SheetError::malformed(
                "shared strings part has no <sst> root element",
            ));
        }
        if in_si || !root_closed {
            return Err(SheetError::malformed(format!(
                "shared strings part is truncated after {} entries",
                strings.len()
            )));
        }

        Ok(SharedStringTable { strings })
    }

    /// Build a table from already decoded strings
    pub fn from_strings(strings: Vec<String>) -> Self {
        SharedStringTable { strings }
    }

    /// Get a string by index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    /// Resolve a raw `<v>` token of a shared-string cell.
    ///
    /// Tokens that are not an index, or point past the end of the table,
    /// come back unchanged.
    pub fn resolve<'a>(&'a self, raw: &'a str) -> &'a str {
        match self.lookup(raw) {
            Some(s) => s,
            None => raw,
        }
    }

    /// Like [`resolve`](Self::resolve) but reports whether the lookup hit
    pub fn lookup(&self, raw: &str) -> Option<&str> {
        raw.trim().parse::<usize>().ok().and_then(|idx| self.get(idx))
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Rough heap footprint in bytes
    pub fn estimated_size(&self) -> usize {
        self.strings.iter().map(|s| s.len() + 24).sum()
    }
}
