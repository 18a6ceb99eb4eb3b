//! Connections opened by the default transport.
//!
//! - [`connectjob`]: resolve, connect over TCP, then TLS for `https`
//! - [`client`]: the connected socket, plain or TLS
//! - [`tls`]: BoringSSL connector settings

pub mod client;
pub mod connectjob;
pub mod tls;
