//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): transport-level error codes
//! - [`Error`](error::Error): error returned by request dispatch
//! - [`predicates`]: checks for untyped JSON input
//! - [`timer`]: schedulers used for cache eviction

pub mod context;
pub mod error;
pub mod neterror;
pub mod predicates;
pub mod timer;
