//! High-level request API.
//!
//! - [`RequestBuilder`]: fluent per-request builder
//! - [`download`]: file saving for downloads

pub mod download;
pub mod request;

pub use download::{FileSaver, FsSaver};
pub use request::{BeforeSend, Outgoing, RequestBuilder};
