//! Deterministic JSON output.
//!
//! Keys follow struct declaration order, indentation is two spaces and every
//! non-ASCII character is written as a `\uXXXX` escape so maps diff cleanly
//! regardless of the editor or terminal encoding.

use crate::error::Result;
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};
use std::io::{self, Write};
use std::path::Path;

/// Pretty formatter that escapes everything outside ASCII.
pub struct AsciiFormatter<'a> {
    inner: PrettyFormatter<'a>,
}

impl<'a> AsciiFormatter<'a> {
    /// Create a formatter with two-space indentation.
    pub fn new() -> Self {
        Self {
            inner: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl Default for AsciiFormatter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for AsciiFormatter<'_> {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if c.is_ascii() {
                writer.write_all(&[c as u8])?;
            } else {
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Serialize a value as ASCII-escaped, indented JSON with a trailing newline.
pub fn to_ascii_pretty<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, AsciiFormatter::new());
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Serialize a value and write it to `path`.
pub fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = to_ascii_pretty(value)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_non_ascii() {
        let out = to_ascii_pretty(&vec!["Café", "日本", "ok"]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "[\n  \"Caf\\u00e9\",\n  \"\\u65e5\\u672c\",\n  \"ok\"\n]\n");
    }

    #[test]
    fn test_escapes_astral_as_surrogate_pair() {
        let out = to_ascii_pretty(&"🎉").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\"\\ud83c\\udf89\"\n");
    }

    #[test]
    fn test_escaped_output_parses_back() {
        let values = vec!["Grüße\n\"quoted\"".to_string(), "Ünïcödé 🎉".to_string()];
        let out = to_ascii_pretty(&values).unwrap();
        assert!(out.is_ascii());
        let parsed: Vec<String> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, values);
    }

    #[test]
    fn test_object_layout() {
        let value = serde_json::json!({"a": 1, "b": []});
        let out = String::from_utf8(to_ascii_pretty(&value).unwrap()).unwrap();
        assert_eq!(out, "{\n  \"a\": 1,\n  \"b\": []\n}\n");
    }
}
