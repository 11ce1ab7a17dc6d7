//! JSON helpers. Output never escapes HTML characters and never ends in a newline.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::Result;

/// Serialize a value to compact JSON bytes.
pub fn json_marshal<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Serialize a value to indented JSON bytes.
///
/// `prefix` starts every line after the first, followed by one `indent`
/// per nesting level.
pub fn json_marshal_indent<T: Serialize + ?Sized>(
    value: &T,
    prefix: &str,
    indent: &str,
) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;

    if prefix.is_empty() {
        return Ok(buf);
    }

    // raw newlines only occur between tokens; string contents are escaped
    let mut out = Vec::with_capacity(buf.len());
    for byte in buf {
        out.push(byte);
        if byte == b'\n' {
            out.extend_from_slice(prefix.as_bytes());
        }
    }
    Ok(out)
}

/// Serialize a value to a compact JSON string.
pub fn json_encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Parse JSON text into a dynamic value.
pub fn json_decode(text: &str) -> Result<serde_json::Value> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    #[test]
    fn test_encode_keeps_html() {
        let encoded = json_encode(&json!({"html": "<a href=\"x\">&</a>"})).unwrap();
        assert_eq!(encoded, r#"{"html":"<a href=\"x\">&</a>"}"#);
    }

    #[test]
    fn test_marshal_has_no_trailing_newline() {
        let bytes = json_marshal(&vec![1, 2, 3]).unwrap();
        assert_eq!(bytes, b"[1,2,3]");
    }

    #[test]
    fn test_marshal_indent_with_prefix() {
        let bytes = json_marshal_indent(&json!({"a": [1]}), ">", "\t").unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "{\n>\t\"a\": [\n>\t\t1\n>\t]\n>}");
    }

    #[test]
    fn test_marshal_indent_without_prefix() {
        let bytes = json_marshal_indent(&json!({"k": "v"}), "", "  ").unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "{\n  \"k\": \"v\"\n}");
    }

    #[test]
    fn test_decode() {
        let value = json_decode(r#"{"n": 1.5, "s": "<b>"}"#).unwrap();
        assert_eq!(value["n"], json!(1.5));
        assert_eq!(value["s"], json!("<b>"));
    }

    #[test]
    fn test_decode_invalid() {
        assert!(matches!(json_decode("{"), Err(Error::Json(_))));
    }
}
