//! JSON text rendering for nested descriptors
//!
//! Descriptors are stored as text with `", "` and `": "` separators, keys in
//! document order. Escaped quotes are then collapsed to plain quotes, so a
//! descriptor that embeds JSON text is stored as directly embeddable JSON
//! rather than as a doubly escaped string.

use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;

/// Formatter with a space after `,` and `:`
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Render a value as stored descriptor text
pub fn to_json_text<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut serializer)?;

    // serde_json only writes valid UTF-8
    let text = String::from_utf8_lossy(&buf);
    Ok(collapse_escaped_quotes(&text))
}

/// Replace every `\"` escape with `"`.
///
/// Only the escape token itself is rewritten: an escaped backslash (`\\`)
/// followed by a quote is left as is.
pub fn collapse_escaped_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn spaced_separators() {
        let value: serde_yaml::Value =
            serde_yaml::from_str("name: orders\nfields: [a, b]\nnested: {x: 1}\n").unwrap();
        assert_eq!(
            to_json_text(&value).unwrap(),
            r#"{"name": "orders", "fields": ["a", "b"], "nested": {"x": 1}}"#
        );
    }

    #[test]
    fn keeps_document_key_order() {
        let value: serde_yaml::Value = serde_yaml::from_str("z: 1\na: 2\n").unwrap();
        assert_eq!(to_json_text(&value).unwrap(), r#"{"z": 1, "a": 2}"#);
    }

    #[test]
    fn embedded_json_is_not_double_escaped() {
        let value: serde_yaml::Value =
            serde_yaml::from_str(r#"schema: '{"type": "record"}'"#).unwrap();
        assert_eq!(
            to_json_text(&value).unwrap(),
            r#"{"schema": "{"type": "record"}"}"#
        );
    }

    #[test]
    fn collapse_leaves_escaped_backslash() {
        assert_eq!(collapse_escaped_quotes(r#"\"a\""#), r#""a""#);
        assert_eq!(collapse_escaped_quotes(r#""C:\\""#), r#""C:\\""#);
        assert_eq!(collapse_escaped_quotes(r#"a\nb"#), r#"a\nb"#);
        assert_eq!(collapse_escaped_quotes("tail\\"), "tail\\");
    }

    #[test]
    fn non_string_keys_are_stringified() {
        let value: serde_yaml::Value = serde_yaml::from_str("1: one\n").unwrap();
        assert_eq!(to_json_text(&value).unwrap(), r#"{"1": "one"}"#);
    }

    #[test]
    fn complex_keys_fail() {
        let value: serde_yaml::Value = serde_yaml::from_str("? [a, b]\n: pair\n").unwrap();
        assert!(to_json_text(&value).is_err());
    }
}
