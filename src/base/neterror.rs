use thiserror::Error;

/// Transport-level failure causes.
///
/// Codes follow Chromium's `net_error_list.h` where an equivalent exists.
/// Crate-specific conditions use codes from -10000 downwards so they never
/// collide with a Chromium range.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum NetError {
    // Generic Errors
    #[error("Operation failed")]
    Failed,
    #[error("File not found")]
    FileNotFound,
    #[error("Operation timed out")]
    TimedOut,
    #[error("Access denied")]
    AccessDenied,

    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection reset (TCP RST)")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("SSL protocol error")]
    SslProtocolError,

    // HTTP Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Unknown URL scheme")]
    UnknownUrlScheme,
    #[error("Empty response")]
    EmptyResponse,
    #[error("Content decoding failed")]
    ContentDecodingFailed,
    #[error("Invalid HTTP response")]
    InvalidHttpResponse,

    // Crate-specific
    #[error("Failed to read response body")]
    HttpBodyError,
}

impl NetError {
    /// Numeric code, as reported in logs.
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::Failed => -2,
            NetError::FileNotFound => -6,
            NetError::TimedOut => -7,
            NetError::AccessDenied => -10,

            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionFailed => -104,
            NetError::NameNotResolved => -105,
            NetError::SslProtocolError => -107,

            NetError::InvalidUrl => -300,
            NetError::UnknownUrlScheme => -302,
            NetError::EmptyResponse => -324,
            NetError::ContentDecodingFailed => -330,
            NetError::InvalidHttpResponse => -370,

            NetError::HttpBodyError => -10000,
        }
    }

    /// Whether the failure happened before any response was received.
    pub fn is_connection_error(&self) -> bool {
        (-199..=-100).contains(&self.as_i32()) || *self == NetError::TimedOut
    }
}
