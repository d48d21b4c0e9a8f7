//! Minimal XML emitter for package parts

use crate::error::Result;
use std::io::Write;

/// Append `text` to `out` with XML escaping.
///
/// Control characters other than tab, LF and CR are not allowed in XML 1.0
/// and are dropped.
pub fn escape_into(text: &str, out: &mut Vec<u8>) {
    for ch in text.chars() {
        match ch {
            '&' => out.extend_from_slice(b"&amp;"),
            '<' => out.extend_from_slice(b"&lt;"),
            '>' => out.extend_from_slice(b"&gt;"),
            '"' => out.extend_from_slice(b"&quot;"),
            '\'' => out.extend_from_slice(b"&apos;"),
            c if (c as u32) < 0x20 && c != '\t' && c != '\n' && c != '\r' => {}
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
}

/// Buffered element writer used for the small, fixed parts of a package
/// (workbook, relationships, shared strings)
pub struct XmlWriter<W: Write> {
    writer: W,
    buffer: Vec<u8>,
    flush_threshold: usize,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(writer: W) -> Self {
        XmlWriter {
            writer,
            buffer: Vec::with_capacity(8192),
            flush_threshold: 4096,
        }
    }

    /// Write the standard XML declaration
    pub fn declaration(&mut self) -> Result<()> {
        self.raw(b"<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n")
    }

    /// `<name a="1" ...>`
    pub fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.tag(name, attrs);
        self.buffer.push(b'>');
        self.auto_flush()
    }

    /// `<name a="1" .../>`
    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.tag(name, attrs);
        self.buffer.extend_from_slice(b"/>");
        self.auto_flush()
    }

    /// `</name>`
    pub fn close(&mut self, name: &str) -> Result<()> {
        self.buffer.extend_from_slice(b"</");
        self.buffer.extend_from_slice(name.as_bytes());
        self.buffer.push(b'>');
        self.auto_flush()
    }

    /// Escaped character data
    pub fn text(&mut self, text: &str) -> Result<()> {
        escape_into(text, &mut self.buffer);
        self.auto_flush()
    }

    /// `<name>text</name>`
    pub fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.open(name, &[])?;
        self.text(text)?;
        self.close(name)
    }

    pub fn raw(&mut self, data: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(data);
        self.auto_flush()
    }

    fn tag(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.buffer.push(b'<');
        self.buffer.extend_from_slice(name.as_bytes());
        for (key, value) in attrs {
            self.buffer.push(b' ');
            self.buffer.extend_from_slice(key.as_bytes());
            self.buffer.extend_from_slice(b"=\"");
            escape_into(value, &mut self.buffer);
            self.buffer.push(b'"');
        }
    }

    #[inline]
    fn auto_flush(&mut self) -> Result<()> {
        if self.buffer.len() >= self.flush_threshold {
            self.writer.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }

    /// Write out anything still buffered
    pub fn finish(mut self) -> Result<W> {
        if !self.buffer.is_empty() {
            self.writer.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}
