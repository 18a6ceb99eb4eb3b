//! Normalized response envelope.

use crate::base::neterror::NetError;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde_json::Value;

/// Decoded response data.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// No body.
    #[default]
    Null,
    /// Body decoded from a JSON response.
    Json(Value),
    /// Body decoded as UTF-8 text.
    Text(String),
    /// Undecoded body (downloads, non-text content).
    Binary(Bytes),
}

impl Payload {
    pub fn is_null(&self) -> bool {
        matches!(self, Payload::Null)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Deserialize JSON data into `T`.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, NetError> {
        match self {
            Payload::Json(v) => {
                T::deserialize(v).map_err(|_| NetError::ContentDecodingFailed)
            }
            Payload::Text(s) => {
                serde_json::from_str(s).map_err(|_| NetError::ContentDecodingFailed)
            }
            Payload::Binary(b) => {
                serde_json::from_slice(b).map_err(|_| NetError::ContentDecodingFailed)
            }
            Payload::Null => {
                T::deserialize(&Value::Null).map_err(|_| NetError::ContentDecodingFailed)
            }
        }
    }

    /// Raw bytes of the data, re-encoding JSON as needed.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Payload::Null => Bytes::new(),
            Payload::Json(v) => Bytes::from(v.to_string()),
            Payload::Text(s) => Bytes::from(s.clone()),
            Payload::Binary(b) => b.clone(),
        }
    }
}

/// A successful response: `{data, status, headers}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub data: Payload,
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl Envelope {
    pub fn new(status: StatusCode, headers: HeaderMap, data: Payload) -> Self {
        Self { data, status, headers }
    }
}

/// A failed request: the envelope shape plus a message.
///
/// `status` is `None` when no response was received at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub data: Payload,
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub message: String,
    pub cause: Option<NetError>,
}

impl Failure {
    /// Failure for a response that arrived with a non-success status.
    pub fn from_envelope(envelope: Envelope) -> Self {
        Self {
            message: format!(
                "HTTP Request failed with status code:{}",
                envelope.status.as_u16()
            ),
            data: envelope.data,
            status: Some(envelope.status),
            headers: envelope.headers,
            cause: None,
        }
    }

    /// Failure for a request that never produced a response.
    pub fn network(error: NetError) -> Self {
        tracing::debug!(
            code = error.as_i32(),
            connection = error.is_connection_error(),
            "request failed without a response: {}",
            error
        );
        Self {
            data: Payload::Null,
            status: None,
            headers: HeaderMap::new(),
            message: format!("HTTP Request failed: {}", error),
            cause: Some(error),
        }
    }
}

impl Failure {
    /// Whether the request never reached a server, e.g. refused or timed out.
    pub fn is_connection_error(&self) -> bool {
        self.cause.map_or(false, |cause| cause.is_connection_error())
    }
}

impl From<NetError> for Failure {
    fn from(error: NetError) -> Self {
        Failure::network(error)
    }
}

/// What a dispatched request resolves with.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Just the response data (the default).
    Data(Payload),
    /// The whole envelope, after `enrich_response()`.
    Envelope(Envelope),
}

impl Reply {
    /// The data, whichever shape the reply has.
    pub fn data(&self) -> &Payload {
        match self {
            Reply::Data(data) => data,
            Reply::Envelope(envelope) => &envelope.data,
        }
    }

    pub fn into_data(self) -> Payload {
        match self {
            Reply::Data(data) => data,
            Reply::Envelope(envelope) => envelope.data,
        }
    }

    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            Reply::Envelope(envelope) => Some(envelope),
            _ => None,
        }
    }

    /// Deserialize the data into `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, NetError> {
        self.data().deserialize()
    }
}
