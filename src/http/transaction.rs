//! Default transport: one HTTP/1.1 exchange per request over hyper.

use crate::base::neterror::NetError;
use crate::http::response::{Envelope, Failure, Payload};
use crate::http::transport::{Transport, TransportRequest, TransportResult};
use crate::socket::connectjob::ConnectJob;
use crate::socket::tls::TlsConfig;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use http::{HeaderMap, HeaderValue, Request, Response};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use url::{Position, Url};

#[derive(Debug)]
struct Inner {
    base_url: Option<Url>,
    timeout: Option<Duration>,
    tls: TlsConfig,
}

impl Inner {
    fn resolve(&self, url: &str) -> Result<Url, NetError> {
        match &self.base_url {
            Some(base) => base.join(url).map_err(|_| NetError::InvalidUrl),
            None => Url::parse(url).map_err(|_| NetError::InvalidUrl),
        }
    }
}

/// Transport built on hyper's HTTP/1.1 client connection.
///
/// Every request opens its own connection. Relative URLs are resolved
/// against the configured base URL.
#[derive(Debug, Clone)]
pub struct HyperTransport {
    inner: Arc<Inner>,
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransport {
    pub fn new() -> Self {
        Self::with_options(None, None, TlsConfig::default())
    }

    pub fn with_options(base_url: Option<Url>, timeout: Option<Duration>, tls: TlsConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                base_url,
                timeout,
                tls,
            }),
        }
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.inner.base_url.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    /// Resolve a request URL against the base URL.
    pub fn resolve(&self, url: &str) -> Result<Url, NetError> {
        self.inner.resolve(url)
    }

    async fn execute(inner: Arc<Inner>, request: TransportRequest) -> TransportResult {
        let url = inner.resolve(&request.url)?;
        tracing::debug!(method = %request.method, url = %url, "dispatching request");

        let socket = ConnectJob::connect(&url, &inner.tls).await?;
        let response = exchange(socket, &url, &request).await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|_| NetError::HttpBodyError)?
            .to_bytes();

        tracing::debug!(status = status.as_u16(), bytes = body.len(), "response received");

        let data = decode_payload(&headers, body, request.binary);
        let envelope = Envelope::new(status, headers, data);
        if status.is_success() {
            Ok(envelope)
        } else {
            Err(Failure::from_envelope(envelope))
        }
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: TransportRequest) -> BoxFuture<'static, TransportResult> {
        let inner = self.inner.clone();
        let timeout = inner.timeout;
        let fut = Self::execute(inner, request);

        match timeout {
            Some(limit) => async move {
                tokio::time::timeout(limit, fut)
                    .await
                    .unwrap_or_else(|_| Err(Failure::network(NetError::TimedOut)))
            }
            .boxed(),
            None => fut.boxed(),
        }
    }
}

/// Run one request/response exchange over an established socket.
async fn exchange<S>(
    socket: S,
    url: &Url,
    request: &TransportRequest,
) -> Result<Response<Incoming>, NetError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(socket);
    let (mut sender, conn) = http1::handshake(io)
        .await
        .map_err(|_| NetError::ConnectionFailed)?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!(error = %e, "connection closed with error");
        }
    });

    let body = request.body.clone().unwrap_or_default();
    let mut req = Request::builder()
        .method(request.method.clone())
        .uri(&url[Position::BeforePath..])
        .body(Full::new(body.clone()))
        .map_err(|_| NetError::InvalidUrl)?;

    let headers = req.headers_mut();
    *headers = request.headers.clone();
    if !headers.contains_key(HOST) {
        headers.insert(HOST, host_header(url)?);
    }
    if !body.is_empty() {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    }

    sender.send_request(req).await.map_err(|e| {
        tracing::debug!(error = %e, "request failed");
        if e.is_incomplete_message() || e.is_closed() {
            NetError::EmptyResponse
        } else if e.is_parse() {
            NetError::InvalidHttpResponse
        } else {
            NetError::ConnectionClosed
        }
    })
}

fn host_header(url: &Url) -> Result<HeaderValue, NetError> {
    let host = url.host_str().ok_or(NetError::InvalidUrl)?;
    let value = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    HeaderValue::from_str(&value).map_err(|_| NetError::InvalidUrl)
}

/// Decode a response body by its Content-Type.
///
/// Empty bodies become `Null`. JSON that fails to parse falls back to text.
pub fn decode_payload(headers: &HeaderMap, body: Bytes, binary: bool) -> Payload {
    if body.is_empty() {
        return Payload::Null;
    }
    if binary {
        return Payload::Binary(body);
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if is_json_type(&content_type) {
        match serde_json::from_slice(&body) {
            Ok(value) => return Payload::Json(value),
            Err(e) => tracing::warn!(error = %e, "response declared JSON but did not parse"),
        }
    }

    match String::from_utf8(body.to_vec()) {
        Ok(text) => Payload::Text(text),
        Err(_) => Payload::Binary(body),
    }
}

fn is_json_type(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    mime == "application/json" || mime.ends_with("+json")
}
