//! Textual header parsing for flat binary cubes.
//!
//! Headers are line-oriented `key = value` files. Keys are
//! case-insensitive (normalized to lowercase here); list-valued fields are
//! written as `{ v1, v2, ... }` and may span multiple lines. Unrecognized
//! keys are preserved as-is and never interpreted.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::value::{self, Value};

/// A parsed header: lowercase keys mapped to typed values.
#[derive(Debug, Clone, Default)]
pub struct Header {
    entries: HashMap<String, Value>,
}

impl Header {
    /// Parse a header file from disk.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Header> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&text)
    }

    /// Parse header text.
    ///
    /// A leading `ENVI` magic line is accepted and skipped, as are blank
    /// lines and lines without a `=` separator.
    pub fn parse_str(text: &str) -> Result<Header> {
        let mut entries = HashMap::new();
        let mut lines = text.lines();

        while let Some(line) = lines.next() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("ENVI") {
                continue;
            }
            let Some(eq) = line.find('=') else {
                continue;
            };
            let key = line[..eq].trim().to_lowercase();
            if key.is_empty() {
                continue;
            }

            let raw = line[eq + 1..].trim();
            if let Some(stripped) = raw.strip_prefix('{') {
                // List values may continue over several lines until the
                // closing brace.
                let mut body = String::from(stripped);
                while !body.contains('}') {
                    match lines.next() {
                        Some(next) => {
                            body.push(' ');
                            body.push_str(next.trim());
                        }
                        None => return Err(Error::InvalidStructure("unterminated list value")),
                    }
                }
                let end = body.rfind('}').unwrap_or(body.len());
                entries.insert(key, value::parse_list(&body[..end]));
            } else {
                entries.insert(key, value::parse_scalar(raw));
            }
        }

        Ok(Header { entries })
    }

    /// Look up a key (already lowercase).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Look up a required key.
    pub fn required(&self, key: &'static str) -> Result<&Value> {
        self.entries.get(key).ok_or(Error::MissingKeyword(key))
    }

    /// All keys present in the header.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the header holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
ENVI
description = { Synthetic test scene }
samples = 5
lines = 4
bands = 3
header offset = 0
data type = 4
interleave = bil
byte order = 0
wavelength units = Nanometers
wavelength = { 450.0 , 550.0 , 650.0 }
";

    #[test]
    fn parse_basic_header() {
        let header = Header::parse_str(SAMPLE).unwrap();
        assert_eq!(header.get("samples").unwrap().as_usize(), Some(5));
        assert_eq!(header.get("lines").unwrap().as_usize(), Some(4));
        assert_eq!(header.get("interleave").unwrap().as_str(), Some("bil"));
        assert_eq!(
            header.get("wavelength").unwrap().as_f64_list(),
            Some(vec![450.0, 550.0, 650.0])
        );
    }

    #[test]
    fn keys_are_lowercased() {
        let header = Header::parse_str("Samples = 3\nDATA TYPE = 4\n").unwrap();
        assert!(header.get("samples").is_some());
        assert!(header.get("data type").is_some());
        assert!(header.get("Samples").is_none());
    }

    #[test]
    fn multiline_list() {
        let text = "bbl = { 1, 1,\n 0, 1,\n 1 }\n";
        let header = Header::parse_str(text).unwrap();
        assert_eq!(
            header.get("bbl").unwrap().as_f64_list(),
            Some(vec![1.0, 1.0, 0.0, 1.0, 1.0])
        );
    }

    #[test]
    fn unterminated_list_fails() {
        let err = Header::parse_str("wavelength = { 450.0, 550.0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidStructure(_)));
    }

    #[test]
    fn unrecognized_keys_preserved() {
        let header = Header::parse_str("sensor type = AVIRIS-NG\nlines = 2\n").unwrap();
        assert_eq!(
            header.get("sensor type").unwrap().as_str(),
            Some("AVIRIS-NG")
        );
    }

    #[test]
    fn lines_without_separator_skipped() {
        let header = Header::parse_str("ENVI\njunk line\nlines = 2\n").unwrap();
        assert_eq!(header.len(), 1);
    }

    #[test]
    fn required_missing_reports_keyword() {
        let header = Header::parse_str("lines = 2\n").unwrap();
        let err = header.required("interleave").unwrap_err();
        assert!(matches!(err, Error::MissingKeyword("interleave")));
    }
}
