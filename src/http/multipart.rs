//! Multipart form data support.
//!
//! RFC 7578 `multipart/form-data` encoding for fields accumulated through
//! [`RequestBuilder::append`](crate::urlrequest::RequestBuilder::append) and
//! [`RequestBuilder::form_data`](crate::urlrequest::RequestBuilder::form_data).
//!
//! # Example
//! ```ignore
//! use flynet::http::multipart::{Form, Part};
//!
//! let form = Form::new()
//!     .text("username", "user123")
//!     .part("file", Part::bytes(b"file content".as_slice()).file_name("doc.txt"));
//!
//! let content_type = form.content_type();
//! let body = form.into_body();
//! ```

use crate::http::encode::scalar_text;
use bytes::Bytes;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};

/// An ordered multipart form.
#[derive(Debug)]
pub struct Form {
    boundary: String,
    fields: Vec<(Cow<'static, str>, Part)>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create a new empty form.
    pub fn new() -> Self {
        Self {
            boundary: generate_boundary(),
            fields: Vec::new(),
        }
    }

    /// Get the boundary string.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Add a text field.
    pub fn text<N, V>(self, name: N, value: V) -> Self
    where
        N: Into<Cow<'static, str>>,
        V: Into<Cow<'static, str>>,
    {
        self.part(name, Part::text(value))
    }

    /// Add a custom part.
    pub fn part<N>(mut self, name: N, part: Part) -> Self
    where
        N: Into<Cow<'static, str>>,
    {
        self.fields.push((name.into(), part));
        self
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Get the Content-Type header value.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Total encoded length of the body.
    pub fn content_length(&self) -> usize {
        if self.fields.is_empty() {
            return 0;
        }

        let mut length = 0usize;

        for (name, part) in &self.fields {
            // --boundary\r\n
            length += 2 + self.boundary.len() + 2;
            length += part.format_headers(name).len();
            // \r\n\r\n
            length += 4;
            length += part.data.len();
            // \r\n
            length += 2;
        }

        // --boundary--\r\n
        length += 2 + self.boundary.len() + 4;

        length
    }

    /// Encode the form into body bytes.
    pub fn into_body(self) -> Bytes {
        if self.fields.is_empty() {
            return Bytes::new();
        }

        let mut output = Vec::with_capacity(self.content_length());

        for (name, part) in self.fields {
            output.extend_from_slice(b"--");
            output.extend_from_slice(self.boundary.as_bytes());
            output.extend_from_slice(b"\r\n");

            output.extend_from_slice(part.format_headers(&name).as_bytes());
            output.extend_from_slice(b"\r\n\r\n");

            output.extend_from_slice(&part.data);
            output.extend_from_slice(b"\r\n");
        }

        output.extend_from_slice(b"--");
        output.extend_from_slice(self.boundary.as_bytes());
        output.extend_from_slice(b"--\r\n");

        Bytes::from(output)
    }
}

/// A part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    data: Bytes,
    content_type: Option<String>,
    file_name: Option<Cow<'static, str>>,
}

impl Part {
    /// Create a text part. Text parts carry no Content-Type (RFC 7578
    /// defaults them to `text/plain`).
    pub fn text<V>(value: V) -> Self
    where
        V: Into<Cow<'static, str>>,
    {
        Self {
            data: Bytes::from(value.into().into_owned()),
            content_type: None,
            file_name: None,
        }
    }

    /// Create a part from bytes.
    pub fn bytes<B>(data: B) -> Self
    where
        B: Into<Bytes>,
    {
        Self {
            data: data.into(),
            content_type: Some("application/octet-stream".to_string()),
            file_name: None,
        }
    }

    /// Set the content type.
    pub fn content_type<S: Into<String>>(mut self, mime: S) -> Self {
        self.content_type = Some(mime.into());
        self
    }

    /// Set the file name.
    pub fn file_name<S>(mut self, name: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        self.file_name = Some(name.into());
        self
    }

    /// Raw part contents.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Contents as UTF-8 text, if they are valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    pub fn get_file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    fn format_headers(&self, name: &str) -> String {
        let mut header = format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_quotes(name)
        );

        if let Some(ref filename) = self.file_name {
            header.push_str(&format!("; filename=\"{}\"", escape_quotes(filename)));
        }

        if let Some(ref mime) = self.content_type {
            header.push_str(&format!("\r\nContent-Type: {}", mime));
        }

        header
    }

    /// Get the data length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if part is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<&'static str> for Part {
    fn from(value: &'static str) -> Self {
        Part::text(value)
    }
}

impl From<String> for Part {
    fn from(value: String) -> Self {
        Part::text(value)
    }
}

impl From<bool> for Part {
    fn from(value: bool) -> Self {
        Part::text(value.to_string())
    }
}

impl From<i64> for Part {
    fn from(value: i64) -> Self {
        Part::text(value.to_string())
    }
}

impl From<Bytes> for Part {
    fn from(value: Bytes) -> Self {
        Part::bytes(value)
    }
}

impl From<Vec<u8>> for Part {
    fn from(value: Vec<u8>) -> Self {
        Part::bytes(value)
    }
}

impl From<Value> for Part {
    fn from(value: Value) -> Self {
        Part::text(scalar_text(&value))
    }
}

impl From<&Value> for Part {
    fn from(value: &Value) -> Self {
        Part::text(scalar_text(value))
    }
}

/// Assemble accumulated `(name, part)` fields into a form, in order.
pub fn build_multipart<I>(fields: I) -> Form
where
    I: IntoIterator<Item = (String, Part)>,
{
    fields
        .into_iter()
        .fold(Form::new(), |form, (name, part)| form.part(name, part))
}

/// Escape quotes and backslashes in a string.
fn escape_quotes(s: &str) -> Cow<'_, str> {
    if s.contains('"') || s.contains('\\') || s.contains('\r') || s.contains('\n') {
        Cow::Owned(
            s.replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\r', "\\r")
                .replace('\n', "\\n"),
        )
    } else {
        Cow::Borrowed(s)
    }
}

/// Generate a unique boundary string.
fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!(
        "----flynet-boundary-{:016x}{:08x}{:04x}",
        nanos,
        std::process::id(),
        seq & 0xffff
    )
}
