use std::io;

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::tool_parser::errors::{ParserError, ParserResult};

/// Writes JSON with `", "` between items and `": "` after keys.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
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

/// Render an argument map the way clients of this bridge expect it:
/// `{"key": "value", "n": 1}`, non-ASCII kept verbatim, keys in insertion order.
pub fn to_json_string(args: &Map<String, Value>) -> ParserResult<String> {
    let mut buf = Vec::with_capacity(64);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    args.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| ParserError::ParsingFailed(e.to_string()))
}

/// Strip one pair of matching surrounding quotes (single or double)
pub fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// Fresh call id: `prefix` followed by 24 hex characters
pub fn generate_call_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, &hex[..24])
}

/// Fingerprint of a fenced block: any byte change in `body` changes it
pub fn block_fingerprint(name: &str, body: &str) -> String {
    format!("{}|{:x}", name, Sha256::digest(body.as_bytes()))
}

/// Empty means null or a string that is blank after trimming
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_to_json_string_spacing() {
        let mut args = Map::new();
        args.insert("name".to_string(), json!("John"));
        assert_eq!(to_json_string(&args).unwrap(), r#"{"name": "John"}"#);

        args.insert("tags".to_string(), json!(["a", "b"]));
        args.insert("nested".to_string(), json!({"x": 1}));
        assert_eq!(
            to_json_string(&args).unwrap(),
            r#"{"name": "John", "tags": ["a", "b"], "nested": {"x": 1}}"#
        );
    }

    #[test]
    fn test_to_json_string_keeps_unicode_and_order() {
        let mut args = Map::new();
        args.insert("zeta".to_string(), json!("héllo"));
        args.insert("alpha".to_string(), json!("世界"));
        assert_eq!(
            to_json_string(&args).unwrap(),
            r#"{"zeta": "héllo", "alpha": "世界"}"#
        );
        assert_eq!(to_json_string(&Map::new()).unwrap(), "{}");
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"a.txt\""), "a.txt");
        assert_eq!(strip_quotes("'a.txt'"), "a.txt");
        assert_eq!(strip_quotes("  a.txt "), "a.txt");
        assert_eq!(strip_quotes("\"a.txt'"), "\"a.txt'");
        assert_eq!(strip_quotes("\""), "\"");
        assert_eq!(strip_quotes("\"\""), "");
    }

    #[test]
    fn test_generate_call_id() {
        let id = generate_call_id("call_");
        assert!(id.starts_with("call_"));
        assert_eq!(id.len(), "call_".len() + 24);
        assert_ne!(id, generate_call_id("call_"));
    }

    #[test]
    fn test_block_fingerprint_sensitive_to_body() {
        let a = block_fingerprint("edit_file", "TOOL_NAME: edit_file\nEND_ARG\n");
        let b = block_fingerprint("edit_file", "TOOL_NAME: edit_file\nEND_ARG \n");
        assert_ne!(a, b);
        assert!(a.starts_with("edit_file|"));
        assert_eq!(a, block_fingerprint("edit_file", "TOOL_NAME: edit_file\nEND_ARG\n"));
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&json!("  ")));
        assert!(!is_blank(&json!("x")));
        assert!(!is_blank(&json!(0)));
    }
}
