//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding context to `Result` types,
//! converting IO errors into `NetError` codes.

use crate::base::neterror::NetError;
use std::io;
use std::path::Path;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Map a socket-level IO error, logging the peer it concerned.
    ///
    /// # Example
    /// ```ignore
    /// use flynet::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(addr).await
    ///     .connection_context("example.com", 443)?;
    /// ```
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError>;

    /// Map a filesystem IO error, logging the path it concerned.
    fn file_context(self, path: &Path) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError> {
        self.map_err(|e| {
            tracing::debug!(host = %host, port, error = %e, "connection failed");
            match e.kind() {
                io::ErrorKind::ConnectionRefused => NetError::ConnectionRefused,
                io::ErrorKind::ConnectionReset => NetError::ConnectionReset,
                io::ErrorKind::ConnectionAborted => NetError::ConnectionClosed,
                io::ErrorKind::TimedOut => NetError::TimedOut,
                _ => NetError::ConnectionFailed,
            }
        })
    }

    fn file_context(self, path: &Path) -> Result<T, NetError> {
        self.map_err(|e| {
            tracing::debug!(path = %path.display(), error = %e, "file operation failed");
            match e.kind() {
                io::ErrorKind::NotFound => NetError::FileNotFound,
                io::ErrorKind::PermissionDenied => NetError::AccessDenied,
                _ => NetError::Failed,
            }
        })
    }
}
