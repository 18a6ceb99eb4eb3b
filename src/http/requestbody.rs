//! Request body for POST/PUT/PATCH operations.

use bytes::Bytes;
use serde_json::Value;

/// Request body as handed to a verb.
///
/// `Json` bodies are serialized to text when the effective Content-Type is
/// `application/json`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// Structured value.
    Json(Value),
    /// Text.
    Text(String),
    /// Raw bytes.
    Bytes(Bytes),
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::Text(s)
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::Text(s.to_owned())
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(v: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(v))
    }
}

impl From<&'static [u8]> for RequestBody {
    fn from(v: &'static [u8]) -> Self {
        RequestBody::Bytes(Bytes::from_static(v))
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        RequestBody::Bytes(b)
    }
}

impl From<Value> for RequestBody {
    fn from(v: Value) -> Self {
        RequestBody::Json(v)
    }
}

impl<T: Into<RequestBody>> From<Option<T>> for RequestBody {
    fn from(v: Option<T>) -> Self {
        v.map_or(RequestBody::Empty, Into::into)
    }
}

impl RequestBody {
    /// Serialize any value into a `Json` body.
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(RequestBody::Json)
    }

    /// Check if there is no body at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    /// Whether the body counts as present: empty text or bytes, `null`,
    /// `false`, `0` and `""` do not.
    pub fn is_present(&self) -> bool {
        match self {
            RequestBody::Empty => false,
            RequestBody::Text(s) => !s.is_empty(),
            RequestBody::Bytes(b) => !b.is_empty(),
            RequestBody::Json(v) => match v {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
                Value::String(s) => !s.is_empty(),
                Value::Array(_) | Value::Object(_) => true,
            },
        }
    }

    /// JSON-encode the body as text. Bytes are left untouched.
    pub fn into_json_text(self) -> Self {
        match self {
            RequestBody::Json(v) => RequestBody::Text(v.to_string()),
            RequestBody::Text(s) => RequestBody::Text(Value::String(s).to_string()),
            other => other,
        }
    }

    /// Wire bytes, or `None` when the body is not present.
    pub fn into_bytes(self) -> Option<Bytes> {
        if !self.is_present() {
            return None;
        }
        match self {
            RequestBody::Empty => None,
            RequestBody::Json(Value::String(s)) | RequestBody::Text(s) => Some(Bytes::from(s)),
            RequestBody::Json(v) => Some(Bytes::from(v.to_string())),
            RequestBody::Bytes(b) => Some(b),
        }
    }

    /// Text view of the body, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RequestBody::Text(s) => Some(s),
            RequestBody::Json(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Get the length of the body in bytes.
    pub fn len(&self) -> usize {
        match self {
            RequestBody::Empty => 0,
            RequestBody::Text(s) => s.len(),
            RequestBody::Bytes(b) => b.len(),
            RequestBody::Json(v) => v.to_string().len(),
        }
    }
}
