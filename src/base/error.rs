//! Crate-level error returned by request dispatch.

use crate::base::neterror::NetError;
use crate::http::response::Failure;
use http::StatusCode;
use thiserror::Error;

/// Error returned by [`RequestBuilder::send`](crate::urlrequest::RequestBuilder::send)
/// and the verb shortcuts.
#[derive(Debug, Error)]
pub enum Error {
    /// Caching was requested for a method other than GET.
    ///
    /// Raised before the cache or the transport is touched.
    #[error("Can only cache GET requests (got {method})")]
    CacheNonGet { method: String },

    /// The method name is not a valid HTTP token.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The transport reported a failed request.
    #[error("{}", .0.message)]
    Http(Box<Failure>),

    /// A local operation (e.g. saving a download) failed.
    #[error(transparent)]
    Net(#[from] NetError),
}

impl Error {
    /// Whether this is a configuration error raised before any I/O.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::CacheNonGet { .. } | Error::InvalidMethod(_))
    }

    /// The normalized failure, for transport errors.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Error::Http(failure) => Some(failure),
            _ => None,
        }
    }

    /// Whether the transport failed before any response arrived.
    pub fn is_connection_error(&self) -> bool {
        self.failure().map_or(false, Failure::is_connection_error)
    }

    /// HTTP status of a failed response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        self.failure().and_then(|f| f.status)
    }
}

impl From<Failure> for Error {
    fn from(failure: Failure) -> Self {
        Error::Http(Box::new(failure))
    }
}
