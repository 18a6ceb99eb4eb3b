//! # flynet
//!
//! A fluent HTTP request builder with opt-in response caching.
//!
//! Requests are composed by chaining calls on a [`RequestBuilder`] and
//! dispatched through a [`Transport`](crate::http::Transport). GET responses can be
//! cached by URL for a TTL; identical requests issued while one is in
//! flight share its result.
//!
//! ## Features
//!
//! - **URL building**: per-segment percent-encoding, repeated-key query lists
//! - **Bodies**: JSON, `application/x-www-form-urlencoded` and multipart
//! - **Caching**: TTL eviction through an injectable scheduler, dedupe by key
//! - **Hooks**: before-send callbacks that may adjust headers and body
//! - **Downloads**: save a response body through a pluggable file saver
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flynet::Client;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), flynet::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com/".parse().unwrap())
//!         .build();
//!
//!     let items = client
//!         .path("items")
//!         .query("tag", ["a", "b"])
//!         .cache(60_000u64)
//!         .get()
//!         .await?;
//!     println!("{:?}", items.data());
//!
//!     client.path("items").post(json!({"name": "pony"})).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error types, predicates and timers
//! - [`http`] - Encoding, cache store, responses and the transport
//! - [`socket`] - TCP/TLS connection setup for the default transport
//! - [`urlrequest`] - The request builder and downloads

pub mod base;
pub mod client;
pub mod http;
pub mod socket;
pub mod urlrequest;

pub use base::error::Error;
pub use base::neterror::NetError;
pub use client::{clear_cache, Client, ClientBuilder};
pub use crate::http::{CacheStore, Envelope, Failure, Payload, Reply, RequestBody, Ttl};
pub use urlrequest::RequestBuilder;
