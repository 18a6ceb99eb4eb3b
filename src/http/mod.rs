//! Encoding, caching and transport for requests.

pub mod encode;
pub mod httpcache;
pub mod multipart;
pub mod requestbody;
pub mod response;
pub mod transaction;
pub mod transport;

// Re-exports for convenience
pub use httpcache::{CacheStore, Ttl};
pub use requestbody::RequestBody;
pub use response::{Envelope, Failure, Payload, Reply};
pub use transaction::HyperTransport;
pub use transport::{Transport, TransportRequest, TransportResult};
