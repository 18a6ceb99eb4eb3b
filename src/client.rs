//! HTTP Client with builder pattern.
//!
//! A [`Client`] owns the collaborators every request needs (transport,
//! cache store, file saver, default headers) and starts a fresh
//! [`RequestBuilder`] for each call chain, so unrelated chains never share
//! state.
//!
//! # Example
//!
//! ```rust,ignore
//! use flynet::Client;
//! use std::time::Duration;
//!
//! let client = Client::builder()
//!     .base_url("https://api.example.com/v1/".parse()?)
//!     .timeout(Duration::from_secs(10))
//!     .build();
//!
//! let items = client.path("items").query("tag", ["a", "b"]).get().await?;
//! ```

use crate::base::error::Error;
use crate::base::timer::Scheduler;
use crate::http::encode::IntoQueryValue;
use crate::http::httpcache::{CacheStore, Ttl};
use crate::http::multipart::Part;
use crate::http::response::Reply;
use crate::http::transaction::HyperTransport;
use crate::http::transport::Transport;
use crate::socket::tls::TlsConfig;
use crate::urlrequest::download::{FileSaver, FsSaver};
use crate::urlrequest::request::{Outgoing, RequestBuilder};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Empty the process-wide cache store.
pub fn clear_cache() {
    CacheStore::global().clear_all();
}

/// Entry point for building requests.
///
/// Use [`Client::builder()`] to configure and create a client. Cloning is
/// cheap; clones share the transport and the cache store.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    cache: Arc<CacheStore>,
    saver: Arc<dyn FileSaver>,
    default_headers: HeaderMap,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("cache", &self.cache)
            .field("default_headers", &self.default_headers)
            .finish()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a client with the hyper transport and the global cache.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// The cache store requests from this client use.
    pub fn cache_store(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Empty this client's cache store.
    pub fn clear_cache(&self) {
        self.cache.clear_all();
    }

    /// Start a new request with fresh state.
    pub fn request(&self) -> RequestBuilder {
        RequestBuilder::new(self.transport.clone(), self.cache.clone())
            .file_saver(self.saver.clone())
            .with_headers(self.default_headers.clone())
    }

    pub fn path<S: ToString>(&self, segment: S) -> RequestBuilder {
        self.request().path(segment)
    }

    pub fn p<S: ToString>(&self, segment: S) -> RequestBuilder {
        self.request().p(segment)
    }

    pub fn path_raw(&self, segment: impl Into<String>) -> RequestBuilder {
        self.request().path_raw(segment)
    }

    pub fn query<K, V>(&self, key: K, value: V) -> RequestBuilder
    where
        K: Into<String>,
        V: IntoQueryValue,
    {
        self.request().query(key, value)
    }

    pub fn q<K, V>(&self, key: K, value: V) -> RequestBuilder
    where
        K: Into<String>,
        V: IntoQueryValue,
    {
        self.request().q(key, value)
    }

    pub fn query_all<I, K, V>(&self, params: I) -> RequestBuilder
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoQueryValue,
    {
        self.request().query_all(params)
    }

    pub fn header<K, V>(&self, name: K, value: V) -> RequestBuilder
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        self.request().header(name, value)
    }

    pub fn auth<V: TryInto<HeaderValue>>(&self, value: V) -> RequestBuilder {
        self.request().auth(value)
    }

    pub fn basic_auth(&self, username: &str, password: &str) -> RequestBuilder {
        self.request().basic_auth(username, password)
    }

    pub fn content<V: TryInto<HeaderValue>>(&self, content_type: V) -> RequestBuilder {
        self.request().content(content_type)
    }

    pub fn with_text(&self) -> RequestBuilder {
        self.request().with_text()
    }

    pub fn with_json(&self) -> RequestBuilder {
        self.request().with_json()
    }

    pub fn accept<V: TryInto<HeaderValue>>(&self, accept: V) -> RequestBuilder {
        self.request().accept(accept)
    }

    pub fn as_text(&self) -> RequestBuilder {
        self.request().as_text()
    }

    pub fn as_xml(&self) -> RequestBuilder {
        self.request().as_xml()
    }

    pub fn cache(&self, ttl: impl Into<Ttl>) -> RequestBuilder {
        self.request().cache(ttl)
    }

    pub fn cache_forever(&self) -> RequestBuilder {
        self.request().cache_forever()
    }

    pub fn cache_value(&self, ttl: &Value) -> RequestBuilder {
        self.request().cache_value(ttl)
    }

    pub fn enrich_response(&self) -> RequestBuilder {
        self.request().enrich_response()
    }

    pub fn before_send<F>(&self, hook: F) -> RequestBuilder
    where
        F: FnMut(&mut Outgoing) + Send + 'static,
    {
        self.request().before_send(hook)
    }

    pub fn append<N, P>(&self, name: N, value: P) -> RequestBuilder
    where
        N: Into<String>,
        P: Into<Part>,
    {
        self.request().append(name, value)
    }

    pub fn form_data(&self, object: impl Into<Value>) -> RequestBuilder {
        self.request().form_data(object)
    }

    pub fn form_url(&self, input: impl Into<Value>) -> RequestBuilder {
        self.request().form_url(input)
    }

    /// GET the root URL.
    pub async fn get(&self) -> Result<Reply, Error> {
        self.request().get().await
    }

    /// GET the root URL and save the body.
    pub async fn download(&self) -> Result<PathBuf, Error> {
        self.request().download().await
    }

    /// GET the root URL and save the body under `file_name`.
    pub async fn download_as(&self, file_name: &str) -> Result<PathBuf, Error> {
        self.request().download_as(file_name).await
    }
}

/// Builder for creating a [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    cache: Option<Arc<CacheStore>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    saver: Option<Arc<dyn FileSaver>>,
    base_url: Option<Url>,
    timeout: Option<Duration>,
    tls: Option<TlsConfig>,
    default_headers: HeaderMap,
}

impl ClientBuilder {
    /// Use a custom transport. `base_url`, `timeout` and `tls_config` only
    /// apply to the default transport.
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Use an existing cache store instead of the global one.
    pub fn cache_store(mut self, store: Arc<CacheStore>) -> Self {
        self.cache = Some(store);
        self
    }

    /// Give the client a private cache store driven by `scheduler`.
    /// Ignored when a store is set with [`cache_store`](Self::cache_store).
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Set where downloads are saved.
    pub fn file_saver<S: FileSaver + 'static>(mut self, saver: S) -> Self {
        self.saver = Some(Arc::new(saver));
        self
    }

    /// Resolve relative request URLs against this base.
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set TLS options for HTTPS connections.
    pub fn tls_config(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Add a header sent with every request unless the request overrides it.
    pub fn default_header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        match (name.try_into(), value.try_into()) {
            (Ok(name), Ok(value)) => {
                self.default_headers.insert(name, value);
            }
            _ => tracing::warn!("invalid default header dropped"),
        }
        self
    }

    /// Build the client.
    pub fn build(self) -> Client {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HyperTransport::with_options(
                self.base_url,
                self.timeout,
                self.tls.unwrap_or_default(),
            )),
        };

        let cache = match (self.cache, self.scheduler) {
            (Some(cache), _) => cache,
            (None, Some(scheduler)) => Arc::new(CacheStore::with_scheduler(scheduler)),
            (None, None) => CacheStore::global(),
        };

        let saver: Arc<dyn FileSaver> = match self.saver {
            Some(saver) => saver,
            None => Arc::new(FsSaver::default()),
        };

        Client {
            transport,
            cache,
            saver,
            default_headers: self.default_headers,
        }
    }
}
