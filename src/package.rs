//! Packaged spreadsheet (XLSX) container access
//!
//! Opens the ZIP container, loads the shared strings part and locates the
//! first worksheet. The worksheet itself is never read into memory; it is
//! handed to the [`SheetParser`](crate::sheet_parser::SheetParser) as a
//! decompressing stream.

use crate::error::{Result, SheetError};
use crate::shared_strings::SharedStringTable;
use crate::sheet_parser::{ParseSummary, SheetParser, DEFAULT_PROGRESS_INTERVAL};
use crate::transform::RowSink;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const DEFAULT_SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const DEFAULT_FIRST_SHEET_PART: &str = "xl/worksheets/sheet1.xml";
const REL_TYPE_SHARED_STRINGS: &str = "/sharedStrings";

/// Buffer size for the decompressed worksheet stream
const SHEET_BUFFER_SIZE: usize = 128 * 1024;

/// An opened XLSX package with its shared strings loaded
pub struct SpreadsheetPackage<R: Read + Seek> {
    archive: ZipArchive<R>,
    shared_strings: SharedStringTable,
    sheet_name: String,
    sheet_path: String,
    progress_interval: u64,
}

impl SpreadsheetPackage<File> {
    /// Open an XLSX file from disk
    ///
    /// Fails with [`SheetError::NotFound`] before touching the container when
    /// the file does not exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sheetstream::package::SpreadsheetPackage;
    ///
    /// let package = SpreadsheetPackage::open("students.xlsx")?;
    /// println!("first sheet: {}", package.first_sheet_name());
    /// # Ok::<(), sheetstream::SheetError>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SheetError::NotFound(path.to_path_buf()),
            _ => SheetError::Io(e),
        })?;
        Self::from_reader(file)
    }
}

impl<R: Read + Seek> SpreadsheetPackage<R> {
    /// Open a package from any seekable source
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let relationships = read_part(&mut archive, WORKBOOK_RELS_PART, parse_relationships)?;
        if relationships.is_none() {
            log::warn!(
                "{} missing, falling back to default part locations",
                WORKBOOK_RELS_PART
            );
        }
        let relationships = relationships.unwrap_or_default();

        let shared_strings_path = relationships
            .iter()
            .find(|rel| rel.kind.ends_with(REL_TYPE_SHARED_STRINGS))
            .map(|rel| resolve_target(&rel.target))
            .unwrap_or_else(|| DEFAULT_SHARED_STRINGS_PART.to_string());

        let shared_strings = read_part(&mut archive, &shared_strings_path, |r| {
            SharedStringTable::load(r)
        })?
        .ok_or_else(|| {
            SheetError::malformed(format!("shared strings part {} is missing", shared_strings_path))
        })?;

        log::debug!(
            "Loaded {} shared strings (~{:.2} MB in memory)",
            shared_strings.len(),
            shared_strings.estimated_size() as f64 / (1024.0 * 1024.0)
        );

        let first_sheet = read_part(&mut archive, WORKBOOK_PART, parse_first_sheet)?
            .ok_or_else(|| SheetError::malformed(format!("{} is missing", WORKBOOK_PART)))?
            .ok_or_else(|| SheetError::malformed("workbook declares no sheets"))?;

        let sheet_path = relationships
            .iter()
            .find(|rel| rel.id == first_sheet.rel_id)
            .map(|rel| resolve_target(&rel.target))
            .unwrap_or_else(|| {
                log::warn!(
                    "No relationship for sheet '{}', assuming {}",
                    first_sheet.name,
                    DEFAULT_FIRST_SHEET_PART
                );
                DEFAULT_FIRST_SHEET_PART.to_string()
            });

        Ok(SpreadsheetPackage {
            archive,
            shared_strings,
            sheet_name: first_sheet.name,
            sheet_path,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        })
    }

    /// Rows between progress log lines while parsing (0 disables)
    pub fn set_progress_interval(&mut self, interval: u64) {
        self.progress_interval = interval;
    }

    pub fn shared_strings(&self) -> &SharedStringTable {
        &self.shared_strings
    }

    /// Name of the first sheet as declared in the workbook
    pub fn first_sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// ZIP entry path of the first sheet
    pub fn first_sheet_path(&self) -> &str {
        &self.sheet_path
    }

    /// Stream the first sheet through `sink`, one row at a time.
    ///
    /// Additional sheets in the package are ignored.
    pub fn parse_first_sheet<S: RowSink + ?Sized>(&mut self, sink: &mut S) -> Result<ParseSummary> {
        let entry = match self.archive.by_name(&self.sheet_path) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(SheetError::malformed(format!(
                    "worksheet part {} is missing",
                    self.sheet_path
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let reader = BufReader::with_capacity(SHEET_BUFFER_SIZE, entry);
        SheetParser::new(&self.shared_strings)
            .with_progress_interval(self.progress_interval)
            .parse(reader, sink)
    }
}

/// Run `parse` over a ZIP entry, or return `None` when the entry is absent
fn read_part<R, T, F>(archive: &mut ZipArchive<R>, name: &str, parse: F) -> Result<Option<T>>
where
    R: Read + Seek,
    F: FnOnce(&mut dyn BufRead) -> Result<T>,
{
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut reader = BufReader::new(entry);
    parse(&mut reader).map(Some)
}

#[derive(Debug, Default)]
struct Relationship {
    id: String,
    kind: String,
    target: String,
}

#[derive(Debug)]
struct SheetDecl {
    name: String,
    rel_id: String,
}

fn parse_relationships(source: &mut dyn BufRead) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();
    let mut rels = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut rel = Relationship::default();
                for attr in e.attributes() {
                    let attr = attr.map_err(quick_xml::Error::from)?;
                    let value = attr.unescape_value()?.into_owned();
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.kind = value,
                        b"Target" => rel.target = value,
                        _ => {}
                    }
                }
                rels.push(rel);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

fn parse_first_sheet(source: &mut dyn BufRead) -> Result<Option<SheetDecl>> {
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let mut name = String::new();
                let mut rel_id = String::new();
                for attr in e.attributes() {
                    let attr = attr.map_err(quick_xml::Error::from)?;
                    match attr.key.local_name().as_ref() {
                        b"name" => name = attr.unescape_value()?.into_owned(),
                        b"id" => rel_id = attr.unescape_value()?.into_owned(),
                        _ => {}
                    }
                }
                return Ok(Some(SheetDecl { name, rel_id }));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

/// Targets in workbook relationships are relative to `xl/` unless absolute
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(resolve_target("./sharedStrings.xml"), "xl/sharedStrings.xml");
    }

    #[test]
    fn test_parse_relationships() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#;
        let mut source: &[u8] = xml;
        let rels = parse_relationships(&mut source).unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[0].id, "rId1");
        assert_eq!(rels[1].target, "sharedStrings.xml");
        assert!(rels[1].kind.ends_with(REL_TYPE_SHARED_STRINGS));
    }

    #[test]
    fn test_parse_first_sheet_only() {
        let xml = br#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="students" sheetId="1" r:id="rId1"/><sheet name="other" sheetId="2" r:id="rId2"/></sheets>
</workbook>"#;
        let mut source: &[u8] = xml;
        let sheet = parse_first_sheet(&mut source).unwrap().unwrap();
        assert_eq!(sheet.name, "students");
        assert_eq!(sheet.rel_id, "rId1");

        let mut empty: &[u8] = b"<workbook><sheets/></workbook>";
        assert!(parse_first_sheet(&mut empty).unwrap().is_none());
    }
}
