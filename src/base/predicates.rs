//! Classification helpers for untyped input.
//!
//! The builder API is statically typed; these checks only apply where a
//! value arrives as a `serde_json::Value` (TTL arguments, form objects,
//! query maps built from JSON).

use http::header::CONTENT_DISPOSITION;
use http::HeaderMap;
use serde_json::Value;

/// Numeric value of `value` if it is a finite number or a string that parses
/// as one (surrounding whitespace allowed).
pub fn numeric_value(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

pub fn is_numeric(value: &Value) -> bool {
    numeric_value(value).is_some()
}

pub fn is_boolean(value: &Value) -> bool {
    value.is_boolean()
}

pub fn is_array(value: &Value) -> bool {
    value.is_array()
}

pub fn is_string(value: &Value) -> bool {
    value.is_string()
}

/// Objects and arrays.
pub fn is_object(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Null, scalars without enumerable entries, and empty strings, arrays and
/// objects.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

pub fn is_primitive(value: &Value) -> bool {
    !is_object(value)
}

pub fn is_valid_json(text: &str) -> bool {
    serde_json::from_str::<Value>(text).is_ok()
}

/// Filename announced by a `Content-Disposition` response header.
pub fn header_filename(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    let (_, rest) = value.split_once("filename=")?;
    let raw = rest.split(';').next()?.trim();
    let name = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(raw);
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_numeric() {
        assert!(is_numeric(&json!(10)));
        assert!(is_numeric(&json!(-1)));
        assert!(is_numeric(&json!(1.5)));
        assert!(is_numeric(&json!("10")));
        assert!(is_numeric(&json!(" 42 ")));
        assert!(!is_numeric(&json!("a")));
        assert!(!is_numeric(&json!("")));
        assert!(!is_numeric(&json!("10abc")));
        assert!(!is_numeric(&json!(true)));
        assert!(!is_numeric(&json!(false)));
        assert!(!is_numeric(&Value::Null));
        assert!(!is_numeric(&json!("inf")));
        assert_eq!(numeric_value(&json!("250")), Some(250.0));
    }

    #[test]
    fn test_shapes() {
        assert!(is_boolean(&json!(false)));
        assert!(is_array(&json!([1, 2])));
        assert!(is_string(&json!("x")));
        assert!(is_object(&json!({"a": 1})));
        assert!(is_object(&json!([])));
        assert!(!is_object(&json!("x")));
        assert!(is_primitive(&json!(3)));
        assert!(is_primitive(&Value::Null));
        assert!(!is_primitive(&json!({})));
    }

    #[test]
    fn test_empty() {
        assert!(is_empty(&Value::Null));
        assert!(is_empty(&json!({})));
        assert!(is_empty(&json!([])));
        assert!(is_empty(&json!("")));
        assert!(is_empty(&json!(5)));
        assert!(!is_empty(&json!({"a": 1})));
        assert!(!is_empty(&json!("abc")));
    }

    #[test]
    fn test_valid_json() {
        assert!(is_valid_json(r#"{"a":1}"#));
        assert!(is_valid_json("null"));
        assert!(!is_valid_json("{a:1}"));
    }

    #[test]
    fn test_header_filename() {
        let mut headers = HeaderMap::new();
        assert_eq!(header_filename(&headers), None);

        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=\"report.pdf\""),
        );
        assert_eq!(header_filename(&headers).as_deref(), Some("report.pdf"));

        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=data.csv; size=12"),
        );
        assert_eq!(header_filename(&headers).as_deref(), Some("data.csv"));

        headers.insert(CONTENT_DISPOSITION, HeaderValue::from_static("inline"));
        assert_eq!(header_filename(&headers), None);
    }
}
