//! Single-sheet XLSX writer that streams rows straight into the ZIP entry

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use indexmap::IndexSet;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use super::xml_writer::{escape_into, XmlWriter};
use crate::error::{Result, SheetError};
use crate::types::{column_letters, CellValue};

const SHEET_PART: &str = "xl/worksheets/sheet1.xml";
const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SheetState {
    NotStarted,
    Open,
    Closed,
}

/// Streaming workbook with exactly one worksheet
///
/// Rows are serialized into a reusable buffer and written to the compressed
/// sheet entry immediately. Only a fixed vocabulary (headers, category
/// labels) goes into the shared strings part; every other string is written
/// inline, so nothing grows with the number of rows.
///
/// # Example
///
/// ```no_run
/// use sheetstream::fast_writer::StreamingWorkbook;
/// use sheetstream::types::CellValue;
///
/// let mut workbook = StreamingWorkbook::create("out.xlsx", ["id", "name"])?;
/// workbook.start_sheet("students")?;
/// workbook.write_row(&["id".into(), "name".into()])?;
/// workbook.write_row(&[CellValue::Int(1), "Alice".into()])?;
/// workbook.close()?;
/// # Ok::<(), sheetstream::SheetError>(())
/// ```
pub struct StreamingWorkbook<W: Write + Seek> {
    zip: ZipWriter<W>,
    vocabulary: IndexSet<String>,
    sheet_name: String,
    state: SheetState,
    current_row: u32,
    xml_buffer: Vec<u8>,
    cell_ref_cache: Vec<String>,
    flush_interval: u32,
}

impl StreamingWorkbook<BufWriter<File>> {
    /// Create a workbook file on disk
    pub fn create<P, I, S>(path: P, vocabulary: I) -> Result<Self>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let file = File::create(path)?;
        Self::new(BufWriter::with_capacity(64 * 1024, file), vocabulary)
    }
}

impl<W: Write + Seek> StreamingWorkbook<W> {
    /// Start a workbook on any seekable writer.
    ///
    /// Strings listed in `vocabulary` are interned as shared strings.
    pub fn new<I, S>(writer: W, vocabulary: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut zip = ZipWriter::new(writer);
        let options = Self::file_options();

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES.as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(ROOT_RELS.as_bytes())?;

        zip.start_file("docProps/core.xml", options)?;
        Self::write_core_props(&mut zip)?;

        zip.start_file("docProps/app.xml", options)?;
        zip.write_all(APP_PROPS.as_bytes())?;

        let cell_ref_cache = (0..26).map(column_letters).collect();

        Ok(StreamingWorkbook {
            zip,
            vocabulary: vocabulary.into_iter().map(Into::into).collect(),
            sheet_name: String::new(),
            state: SheetState::NotStarted,
            current_row: 0,
            xml_buffer: Vec::with_capacity(8192),
            cell_ref_cache,
            flush_interval: 1000,
        })
    }

    /// Set flush interval (rows between explicit flushes of the ZIP stream)
    pub fn set_flush_interval(&mut self, interval: u32) {
        self.flush_interval = interval.max(1);
    }

    fn file_options() -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(6))
            .large_file(true) // ZIP64 for sheets past 4 GB
    }

    /// Open the single worksheet. Must be called once before `write_row`.
    pub fn start_sheet(&mut self, name: &str) -> Result<()> {
        if self.state != SheetState::NotStarted {
            return Err(SheetError::Config(
                "workbook already has a worksheet".to_string(),
            ));
        }
        validate_sheet_name(name)?;

        self.zip.start_file(SHEET_PART, Self::file_options())?;
        let mut xml = XmlWriter::new(&mut self.zip);
        xml.declaration()?;
        xml.open("worksheet", &[("xmlns", MAIN_NS), ("xmlns:r", REL_NS)])?;
        xml.open("sheetData", &[])?;
        xml.finish()?;

        self.sheet_name = name.to_string();
        self.state = SheetState::Open;
        Ok(())
    }

    /// Append one row to the worksheet
    pub fn write_row(&mut self, values: &[CellValue]) -> Result<()> {
        if self.state != SheetState::Open {
            return Err(SheetError::Config("No active worksheet".to_string()));
        }

        self.current_row += 1;
        let mut row_num = itoa::Buffer::new();
        let row_num = row_num.format(self.current_row);

        self.xml_buffer.clear();
        self.xml_buffer.extend_from_slice(b"<row r=\"");
        self.xml_buffer.extend_from_slice(row_num.as_bytes());
        self.xml_buffer.extend_from_slice(b"\">");

        for (col_idx, value) in values.iter().enumerate() {
            if value.is_empty() {
                continue;
            }

            self.xml_buffer.extend_from_slice(b"<c r=\"");
            match self.cell_ref_cache.get(col_idx) {
                Some(letters) => self.xml_buffer.extend_from_slice(letters.as_bytes()),
                None => self
                    .xml_buffer
                    .extend_from_slice(column_letters(col_idx).as_bytes()),
            }
            self.xml_buffer.extend_from_slice(row_num.as_bytes());
            self.xml_buffer.push(b'"');

            match value {
                CellValue::String(s) => match self.vocabulary.get_index_of(s.as_str()) {
                    Some(idx) => {
                        let mut buf = itoa::Buffer::new();
                        self.xml_buffer.extend_from_slice(b" t=\"s\"><v>");
                        self.xml_buffer.extend_from_slice(buf.format(idx).as_bytes());
                        self.xml_buffer.extend_from_slice(b"</v></c>");
                    }
                    None => push_inline_string(&mut self.xml_buffer, s),
                },
                CellValue::Int(n) => {
                    let mut buf = itoa::Buffer::new();
                    self.xml_buffer.extend_from_slice(b"><v>");
                    self.xml_buffer.extend_from_slice(buf.format(*n).as_bytes());
                    self.xml_buffer.extend_from_slice(b"</v></c>");
                }
                CellValue::Float(f) if f.is_finite() => {
                    self.xml_buffer.extend_from_slice(b"><v>");
                    self.xml_buffer.extend_from_slice(f.to_string().as_bytes());
                    self.xml_buffer.extend_from_slice(b"</v></c>");
                }
                CellValue::Float(f) => push_inline_string(&mut self.xml_buffer, &f.to_string()),
                CellValue::Bool(b) => {
                    self.xml_buffer.extend_from_slice(b" t=\"b\"><v>");
                    self.xml_buffer.push(if *b { b'1' } else { b'0' });
                    self.xml_buffer.extend_from_slice(b"</v></c>");
                }
                CellValue::Empty => {}
            }
        }

        self.xml_buffer.extend_from_slice(b"</row>");
        self.zip.write_all(&self.xml_buffer)?;

        if self.current_row % self.flush_interval == 0 {
            self.zip.flush()?;
        }
        Ok(())
    }

    /// Rows written so far
    pub fn rows_written(&self) -> u32 {
        self.current_row
    }

    /// Finish the worksheet, write the remaining parts and close the ZIP
    pub fn close(mut self) -> Result<W> {
        match self.state {
            SheetState::NotStarted => {
                return Err(SheetError::Config(
                    "workbook closed without a worksheet".to_string(),
                ))
            }
            SheetState::Open => {
                let mut xml = XmlWriter::new(&mut self.zip);
                xml.close("sheetData")?;
                xml.close("worksheet")?;
                xml.finish()?;
                self.state = SheetState::Closed;
            }
            SheetState::Closed => {}
        }

        let options = Self::file_options();

        self.zip.start_file("xl/sharedStrings.xml", options)?;
        self.write_shared_strings()?;

        self.zip.start_file("xl/workbook.xml", options)?;
        self.write_workbook_xml()?;

        self.zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        self.write_workbook_rels()?;

        self.zip.start_file("xl/styles.xml", options)?;
        self.zip.write_all(STYLES.as_bytes())?;

        let mut inner = self.zip.finish()?;
        inner.flush()?;
        Ok(inner)
    }

    fn write_shared_strings(&mut self) -> Result<()> {
        let count = self.vocabulary.len().to_string();
        let mut xml = XmlWriter::new(&mut self.zip);
        xml.declaration()?;
        xml.open(
            "sst",
            &[("xmlns", MAIN_NS), ("count", &count), ("uniqueCount", &count)],
        )?;
        for s in &self.vocabulary {
            xml.open("si", &[])?;
            if needs_space_preserve(s) {
                xml.open("t", &[("xml:space", "preserve")])?;
            } else {
                xml.open("t", &[])?;
            }
            xml.text(s)?;
            xml.close("t")?;
            xml.close("si")?;
        }
        xml.close("sst")?;
        xml.finish()?;
        Ok(())
    }

    fn write_workbook_xml(&mut self) -> Result<()> {
        let mut xml = XmlWriter::new(&mut self.zip);
        xml.declaration()?;
        xml.open("workbook", &[("xmlns", MAIN_NS), ("xmlns:r", REL_NS)])?;
        xml.open("sheets", &[])?;
        xml.empty(
            "sheet",
            &[("name", &self.sheet_name), ("sheetId", "1"), ("r:id", "rId1")],
        )?;
        xml.close("sheets")?;
        xml.close("workbook")?;
        xml.finish()?;
        Ok(())
    }

    fn write_workbook_rels(&mut self) -> Result<()> {
        let mut xml = XmlWriter::new(&mut self.zip);
        xml.declaration()?;
        xml.open("Relationships", &[("xmlns", PKG_REL_NS)])?;
        for (id, kind, target) in [
            ("rId1", "worksheet", "worksheets/sheet1.xml"),
            ("rId2", "styles", "styles.xml"),
            ("rId3", "sharedStrings", "sharedStrings.xml"),
        ] {
            let rel_type = format!("{}/{}", REL_NS, kind);
            xml.empty(
                "Relationship",
                &[("Id", id), ("Type", &rel_type), ("Target", target)],
            )?;
        }
        xml.close("Relationships")?;
        xml.finish()?;
        Ok(())
    }

    fn write_core_props(zip: &mut ZipWriter<W>) -> Result<()> {
        let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let mut xml = XmlWriter::new(zip);
        xml.declaration()?;
        xml.open(
            "cp:coreProperties",
            &[
                (
                    "xmlns:cp",
                    "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
                ),
                ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
                ("xmlns:dcterms", "http://purl.org/dc/terms/"),
                ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
            ],
        )?;
        xml.text_element("dc:creator", "sheetstream")?;
        xml.open("dcterms:created", &[("xsi:type", "dcterms:W3CDTF")])?;
        xml.text(&now)?;
        xml.close("dcterms:created")?;
        xml.open("dcterms:modified", &[("xsi:type", "dcterms:W3CDTF")])?;
        xml.text(&now)?;
        xml.close("dcterms:modified")?;
        xml.close("cp:coreProperties")?;
        xml.finish()?;
        Ok(())
    }
}

fn push_inline_string(out: &mut Vec<u8>, s: &str) {
    if needs_space_preserve(s) {
        out.extend_from_slice(b" t=\"inlineStr\"><is><t xml:space=\"preserve\">");
    } else {
        out.extend_from_slice(b" t=\"inlineStr\"><is><t>");
    }
    escape_into(s, out);
    out.extend_from_slice(b"</t></is></c>");
}

fn needs_space_preserve(s: &str) -> bool {
    s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace)
}

pub(crate) fn validate_sheet_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().count() > 31 {
        return Err(SheetError::Config(format!(
            "sheet name '{}' must be 1 to 31 characters",
            name
        )));
    }
    if name.contains(['[', ']', ':', '*', '?', '/', '\\']) {
        return Err(SheetError::Config(format!(
            "sheet name '{}' contains a forbidden character",
            name
        )));
    }
    Ok(())
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

const APP_PROPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">
<Application>sheetstream</Application>
<DocSecurity>0</DocSecurity>
<ScaleCrop>false</ScaleCrop>
<LinksUpToDate>false</LinksUpToDate>
<SharedDoc>false</SharedDoc>
<HyperlinksChanged>false</HyperlinksChanged>
</Properties>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>
</styleSheet>"#;
