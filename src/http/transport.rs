//! Transport adapter contract.
//!
//! The request builder never talks to the network directly. It hands a
//! fully resolved [`TransportRequest`] to a [`Transport`] and gets back a
//! normalized [`Envelope`] or [`Failure`].

use crate::http::response::{Envelope, Failure};
use bytes::Bytes;
use futures::future::BoxFuture;
use http::{HeaderMap, Method};
use std::sync::Arc;

/// A request ready for the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// URL as built by the request builder. May be relative; transports
    /// resolve it against their own base.
    pub url: String,
    pub method: Method,
    /// Encoded body, `None` when no body is sent.
    pub body: Option<Bytes>,
    pub headers: HeaderMap,
    /// The caller wants the body undecoded (downloads).
    pub binary: bool,
}

impl TransportRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            body: None,
            headers: HeaderMap::new(),
            binary: false,
        }
    }

    /// Body as UTF-8 text, when there is one.
    pub fn body_text(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| std::str::from_utf8(b).ok())
    }
}

/// Outcome of one transport call.
pub type TransportResult = Result<Envelope, Failure>;

/// Performs the network call.
///
/// Implementations must resolve with `Err(Failure)` for non-2xx responses
/// and for requests that never got a response.
pub trait Transport: Send + Sync {
    fn send(&self, request: TransportRequest) -> BoxFuture<'static, TransportResult>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: TransportRequest) -> BoxFuture<'static, TransportResult> {
        (**self).send(request)
    }
}
