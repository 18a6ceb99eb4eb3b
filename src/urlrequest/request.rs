//! The fluent request builder.
//!
//! A [`RequestBuilder`] accumulates path segments, query parameters,
//! headers, form fields and cache settings through chained calls and is
//! consumed by one dispatch (`get`, `post`, ... or [`RequestBuilder::send`]).
//!
//! ```rust,ignore
//! let client = flynet::Client::new();
//! let items = client
//!     .path("items")
//!     .query("tag", ["a", "b"])
//!     .cache(10_000u64)
//!     .get()
//!     .await?;
//! ```

use crate::base::error::Error;
use crate::http::encode::{self, IntoQueryValue, QueryValue};
use crate::http::httpcache::{CacheStore, Ttl};
use crate::http::multipart::{self, Part};
use crate::http::requestbody::RequestBody;
use crate::http::response::{Envelope, Reply};
use crate::http::transport::{Transport, TransportRequest, TransportResult};
use crate::urlrequest::download::{self, FileSaver, FsSaver};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::BoxFuture;
use futures::FutureExt;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub const JSON: &str = "application/json";
pub const TEXT: &str = "text/plain";
pub const XML: &str = "text/xml";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const MULTIPART: &str = "multipart/form-data";

/// A before-send hook.
pub type BeforeSend = Box<dyn FnMut(&mut Outgoing) + Send + 'static>;

/// The pending call as seen by before-send hooks.
///
/// Method and URL are fixed at this point; headers and body may still be
/// changed.
#[derive(Debug)]
pub struct Outgoing {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: RequestBody,
}

impl Outgoing {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut RequestBody {
        &mut self.body
    }
}

/// Fluent builder for one request.
pub struct RequestBuilder {
    transport: Arc<dyn Transport>,
    cache: Arc<CacheStore>,
    saver: Arc<dyn FileSaver>,
    path: Vec<String>,
    params: Vec<(String, QueryValue)>,
    headers: HeaderMap,
    form_fields: Vec<(String, Part)>,
    form_url: Option<String>,
    cache_ttl: Option<Ttl>,
    enrich: bool,
    hooks: Vec<BeforeSend>,
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("path", &self.path)
            .field("params", &self.params)
            .field("headers", &self.headers)
            .field("form_fields", &self.form_fields.len())
            .field("form_url", &self.form_url)
            .field("cache_ttl", &self.cache_ttl)
            .field("enrich", &self.enrich)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl RequestBuilder {
    /// A builder with fresh state that dispatches through `transport` and
    /// caches in `cache`. Downloads are saved to the working directory.
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<CacheStore>) -> Self {
        Self {
            transport,
            cache,
            saver: Arc::new(FsSaver::default()),
            path: Vec::new(),
            params: Vec::new(),
            headers: HeaderMap::new(),
            form_fields: Vec::new(),
            form_url: None,
            cache_ttl: None,
            enrich: false,
            hooks: Vec::new(),
        }
    }

    /// Replace the saver used by [`download`](Self::download).
    pub fn file_saver(mut self, saver: Arc<dyn FileSaver>) -> Self {
        self.saver = saver;
        self
    }

    /// Start from a set of headers (client defaults).
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Append an encoded path segment.
    ///
    /// Numbers and booleans are written out as text. Segments containing
    /// `/` keep their slashes and other reserved characters.
    pub fn path<S: ToString>(mut self, segment: S) -> Self {
        let segment = segment.to_string();
        self.path.push(encode::encode_segment(&segment));
        self
    }

    /// Alias for [`path`](Self::path).
    pub fn p<S: ToString>(self, segment: S) -> Self {
        self.path(segment)
    }

    /// Append a segment verbatim. Empty segments are ignored.
    pub fn path_raw(mut self, segment: impl Into<String>) -> Self {
        let segment = segment.into();
        if !segment.is_empty() {
            self.path.push(segment);
        }
        self
    }

    /// Set a query parameter. Absent values (`None`, JSON `null`) are
    /// dropped; setting a key again replaces its value in place.
    pub fn query<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: IntoQueryValue,
    {
        let Some(value) = value.into_query_value() else {
            return self;
        };
        let key = key.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.params.push((key, value)),
        }
        self
    }

    /// Alias for [`query`](Self::query).
    pub fn q<K, V>(self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: IntoQueryValue,
    {
        self.query(key, value)
    }

    /// [`query`](Self::query) for every pair. A `serde_json::Map` works
    /// directly.
    pub fn query_all<I, K, V>(self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoQueryValue,
    {
        params
            .into_iter()
            .fold(self, |builder, (key, value)| builder.query(key, value))
    }

    /// Set a header, replacing earlier values. Invalid names or values are
    /// dropped.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        match (name.try_into(), value.try_into()) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!("invalid header dropped"),
        }
        self
    }

    /// Set the `Authorization` header.
    pub fn auth<V: TryInto<HeaderValue>>(self, value: V) -> Self {
        self.header(AUTHORIZATION, value)
    }

    /// Set `Authorization: Basic ...` from credentials.
    pub fn basic_auth(self, username: &str, password: &str) -> Self {
        let token = STANDARD.encode(format!("{}:{}", username, password));
        self.auth(format!("Basic {}", token))
    }

    /// Set the `Content-Type` header.
    pub fn content<V: TryInto<HeaderValue>>(self, content_type: V) -> Self {
        self.header(CONTENT_TYPE, content_type)
    }

    pub fn with_text(self) -> Self {
        self.content(TEXT)
    }

    pub fn with_json(self) -> Self {
        self.content(JSON)
    }

    /// Set the `Accept` header.
    pub fn accept<V: TryInto<HeaderValue>>(self, accept: V) -> Self {
        self.header(ACCEPT, accept)
    }

    pub fn as_text(self) -> Self {
        self.accept(TEXT)
    }

    pub fn as_xml(self) -> Self {
        self.accept(XML)
    }

    /// Cache the response under the request URL. GET only.
    pub fn cache(mut self, ttl: impl Into<Ttl>) -> Self {
        self.cache_ttl = Some(ttl.into());
        self
    }

    /// Cache until the store is cleared.
    pub fn cache_forever(self) -> Self {
        self.cache(Ttl::Forever)
    }

    /// Cache with an untyped TTL; anything non-numeric means forever.
    pub fn cache_value(self, ttl: &Value) -> Self {
        self.cache(Ttl::from_value(ttl))
    }

    /// Resolve with the whole envelope instead of just the data.
    pub fn enrich_response(mut self) -> Self {
        self.enrich = true;
        self
    }

    /// Register a hook that runs right before dispatch, on cache misses only.
    pub fn before_send<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut Outgoing) + Send + 'static,
    {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Append a multipart field and switch to `multipart/form-data`.
    pub fn append<N, P>(mut self, name: N, value: P) -> Self
    where
        N: Into<String>,
        P: Into<Part>,
    {
        self.form_fields.push((name.into(), value.into()));
        self.content(MULTIPART)
    }

    /// Append every entry of an object as multipart fields. Arrays become
    /// repeated `key[]` fields.
    pub fn form_data(self, object: impl Into<Value>) -> Self {
        let Value::Object(object) = object.into() else {
            tracing::warn!("form data must be an object");
            return self;
        };
        object.into_iter().fold(self, |builder, (key, value)| match value {
            Value::Array(items) => items
                .into_iter()
                .fold(builder, |b, item| b.append(format!("{}[]", key), item)),
            other => builder.append(key, other),
        })
    }

    /// Send a URL-encoded form: strings are used as-is, objects are encoded.
    pub fn form_url(mut self, input: impl Into<Value>) -> Self {
        let encoded = match input.into() {
            Value::String(s) => s,
            Value::Object(object) => encode::encode_form_object(&object),
            _ => {
                tracing::warn!("form url input must be an object or a string");
                return self;
            }
        };
        self.form_url = Some(encoded);
        self.content(FORM_URLENCODED)
    }

    pub fn path_segments(&self) -> &[String] {
        &self.path
    }

    pub fn query_params(&self) -> &[(String, QueryValue)] {
        &self.params
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn form_fields(&self) -> &[(String, Part)] {
        &self.form_fields
    }

    pub fn form_url_body(&self) -> Option<&str> {
        self.form_url.as_deref()
    }

    pub fn cache_ttl(&self) -> Option<Ttl> {
        self.cache_ttl
    }

    pub fn is_enriched(&self) -> bool {
        self.enrich
    }

    /// The URL this builder would dispatch to.
    pub fn url(&self) -> String {
        encode::build_url(&self.path, &self.params)
    }

    pub async fn get(self) -> Result<Reply, Error> {
        self.send("GET", RequestBody::Empty).await
    }

    pub async fn post(self, body: impl Into<RequestBody>) -> Result<Reply, Error> {
        self.send("POST", body).await
    }

    pub async fn put(self, body: impl Into<RequestBody>) -> Result<Reply, Error> {
        self.send("PUT", body).await
    }

    pub async fn patch(self, body: impl Into<RequestBody>) -> Result<Reply, Error> {
        self.send("PATCH", body).await
    }

    pub async fn delete(self) -> Result<Reply, Error> {
        self.send("DELETE", RequestBody::Empty).await
    }

    pub async fn head(self) -> Result<Reply, Error> {
        self.send("HEAD", RequestBody::Empty).await
    }

    /// Dispatch the request.
    ///
    /// Resolves with the response data, or the whole envelope after
    /// [`enrich_response`](Self::enrich_response). Fails with
    /// [`Error::CacheNonGet`] before any I/O when caching was requested for
    /// another method.
    pub async fn send<M: AsRef<str>>(
        self,
        method: M,
        body: impl Into<RequestBody>,
    ) -> Result<Reply, Error> {
        let enrich = self.enrich;
        let envelope = self.exchange(method.as_ref(), body.into(), false).await?;
        Ok(if enrich {
            Reply::Envelope(envelope)
        } else {
            Reply::Data(envelope.data)
        })
    }

    /// GET the resource and hand the body to the file saver.
    ///
    /// The file name comes from the `Content-Disposition` header, else the
    /// last path segment.
    pub async fn download(self) -> Result<PathBuf, Error> {
        self.download_file(None).await
    }

    /// GET the resource and save it under `file_name`.
    pub async fn download_as(self, file_name: &str) -> Result<PathBuf, Error> {
        self.download_file(Some(file_name)).await
    }

    async fn download_file(self, file_name: Option<&str>) -> Result<PathBuf, Error> {
        let saver = self.saver.clone();
        let segments = self.path.clone();
        let envelope = self.exchange("GET", RequestBody::Empty, true).await?;

        let name = download::resolve_file_name(file_name, &envelope.headers, &segments);
        let path = saver.save(&name, envelope.data.to_bytes()).await?;
        Ok(path)
    }

    async fn exchange(
        self,
        method: &str,
        body: RequestBody,
        binary: bool,
    ) -> Result<Envelope, Error> {
        let Self {
            transport,
            cache,
            path,
            params,
            mut headers,
            form_fields,
            form_url,
            cache_ttl,
            hooks,
            ..
        } = self;

        let url = encode::build_url(&path, &params);

        if !headers.contains_key(CONTENT_TYPE) {
            let default = if body.is_present() { JSON } else { TEXT };
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(default));
        }
        if !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static(JSON));
        }

        let is_json = headers
            .get(CONTENT_TYPE)
            .is_some_and(|v| v.as_bytes() == JSON.as_bytes());
        let body = if body.is_present() && is_json {
            body.into_json_text()
        } else {
            body
        };

        let method_name = method.to_ascii_uppercase();
        let method = Method::from_bytes(method_name.as_bytes())
            .map_err(|_| Error::InvalidMethod(method.to_string()))?;

        let call = Call {
            transport,
            outgoing: Outgoing {
                method,
                url: url.clone(),
                headers,
                body,
            },
            form_fields,
            form_url,
            hooks,
            binary,
        };

        let result = match cache_ttl {
            Some(_) if call.outgoing.method != Method::GET => {
                return Err(Error::CacheNonGet {
                    method: method_name,
                });
            }
            Some(ttl) => {
                // Hooks and the transport start on first poll, once the store
                // has released the key's shard.
                let (pending, _hit) = cache.get_or_insert_with(&url, ttl, move || {
                    async move { call.dispatch().await }.boxed().shared()
                });
                pending.await
            }
            None => call.dispatch().await,
        };

        result.map_err(Error::from)
    }
}

/// Everything needed to run hooks and hit the transport.
struct Call {
    transport: Arc<dyn Transport>,
    outgoing: Outgoing,
    form_fields: Vec<(String, Part)>,
    form_url: Option<String>,
    hooks: Vec<BeforeSend>,
    binary: bool,
}

impl Call {
    /// Run the hooks, encode the body and start the transport call.
    fn dispatch(self) -> BoxFuture<'static, TransportResult> {
        let Call {
            transport,
            mut outgoing,
            form_fields,
            form_url,
            mut hooks,
            binary,
        } = self;

        for (index, hook) in hooks.iter_mut().enumerate() {
            tracing::trace!(index, url = %outgoing.url, "running before-send hook");
            hook(&mut outgoing);
        }

        let Outgoing {
            method,
            url,
            mut headers,
            body,
        } = outgoing;

        let body = if !form_fields.is_empty() {
            let form = multipart::build_multipart(form_fields);
            let is_multipart = headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map_or(true, |v| v.starts_with(MULTIPART));
            if is_multipart {
                match HeaderValue::from_str(&form.content_type()) {
                    Ok(value) => {
                        headers.insert(CONTENT_TYPE, value);
                    }
                    Err(_) => tracing::warn!("invalid multipart content type"),
                }
            }
            Some(form.into_body())
        } else if let Some(encoded) = form_url.filter(|s| !s.is_empty()) {
            Some(encoded.into())
        } else {
            body.into_bytes()
        };

        tracing::debug!(method = %method, url = %url, "dispatching request");
        transport.send(TransportRequest {
            url,
            method,
            body,
            headers,
            binary,
        })
    }
}
