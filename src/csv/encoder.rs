//! CSV field encoding

/// When fields get wrapped in quote characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QuoteStyle {
    /// Quote only fields containing the delimiter, quote char, CR or LF
    #[default]
    Necessary,
    /// Quote every field
    Always,
}

/// Encodes rows into delimited text
#[derive(Debug, Clone, Copy)]
pub struct CsvEncoder {
    delimiter: u8,
    quote_char: u8,
    style: QuoteStyle,
}

impl Default for CsvEncoder {
    fn default() -> Self {
        CsvEncoder::new(b',', b'"')
    }
}

impl CsvEncoder {
    pub fn new(delimiter: u8, quote_char: u8) -> Self {
        CsvEncoder {
            delimiter,
            quote_char,
            style: QuoteStyle::Necessary,
        }
    }

    pub fn with_quote_style(mut self, style: QuoteStyle) -> Self {
        self.style = style;
        self
    }

    /// Append one row (without line ending) to `buffer`
    pub fn encode_row<I, S>(&self, fields: I, buffer: &mut Vec<u8>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                buffer.push(self.delimiter);
            }
            self.encode_field(field.as_ref(), buffer);
        }
    }

    fn encode_field(&self, field: &str, buffer: &mut Vec<u8>) {
        let quote = match self.style {
            QuoteStyle::Always => true,
            QuoteStyle::Necessary => self.needs_quoting(field),
        };
        if !quote {
            buffer.extend_from_slice(field.as_bytes());
            return;
        }

        buffer.push(self.quote_char);
        for byte in field.bytes() {
            // Embedded quotes are doubled: " -> ""
            if byte == self.quote_char {
                buffer.push(self.quote_char);
            }
            buffer.push(byte);
        }
        buffer.push(self.quote_char);
    }

    fn needs_quoting(&self, field: &str) -> bool {
        field
            .bytes()
            .any(|b| b == self.delimiter || b == self.quote_char || b == b'\n' || b == b'\r')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(encoder: CsvEncoder, fields: &[&str]) -> String {
        let mut buffer = Vec::new();
        encoder.encode_row(fields, &mut buffer);
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_plain_fields() {
        assert_eq!(encode(CsvEncoder::default(), &["a", "", "c"]), "a,,c");
    }

    #[test]
    fn test_quoting_when_needed() {
        let e = CsvEncoder::default();
        assert_eq!(encode(e, &["a,b", "c"]), r#""a,b",c"#);
        assert_eq!(encode(e, &[r#"Say "Hi""#]), r#""Say ""Hi""""#);
        assert_eq!(encode(e, &["Line 1\nLine 2"]), "\"Line 1\nLine 2\"");
    }

    #[test]
    fn test_always_quote() {
        let e = CsvEncoder::default().with_quote_style(QuoteStyle::Always);
        assert_eq!(encode(e, &["1", "", "x"]), r#""1","","x""#);
    }

    #[test]
    fn test_custom_delimiter() {
        let e = CsvEncoder::new(b';', b'"');
        assert_eq!(encode(e, &["a", "b;c", "d,e"]), r#"a;"b;c";d,e"#);
    }
}
