//! Shared test transports.

#![allow(dead_code)]

use flynet::http::{Envelope, Failure, Payload, Transport, TransportRequest, TransportResult};
use futures::future::BoxFuture;
use futures::FutureExt;
use http::{HeaderMap, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

type Responder = Box<dyn Fn(&TransportRequest) -> TransportResult + Send + Sync>;

/// Records every request it is handed and answers through a responder.
///
/// Calls are counted when `send` is invoked, not when the future settles.
pub struct RecordingTransport {
    requests: Mutex<Vec<TransportRequest>>,
    calls: AtomicUsize,
    responder: Responder,
    gate: Option<Arc<Notify>>,
}

impl RecordingTransport {
    /// Answers every request with `200` and the given JSON data.
    pub fn ok(data: serde_json::Value) -> Arc<Self> {
        Self::with(move |_| Ok(envelope(StatusCode::OK, Payload::Json(data.clone()))))
    }

    /// Answers every request with `200` and no body.
    pub fn empty() -> Arc<Self> {
        Self::with(|_| Ok(envelope(StatusCode::OK, Payload::Null)))
    }

    /// Answers every request with a failed response of the given status.
    pub fn status(status: StatusCode) -> Arc<Self> {
        Self::with(move |_| Err(Failure::from_envelope(envelope(status, Payload::Null))))
    }

    pub fn with<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&TransportRequest) -> TransportResult + Send + Sync + 'static,
    {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            responder: Box::new(responder),
            gate: None,
        })
    }

    /// Like [`ok`](Self::ok), but responses are held until the returned
    /// `Notify` is signalled.
    pub fn gated(data: serde_json::Value) -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            responder: Box::new(move |_| {
                Ok(envelope(StatusCode::OK, Payload::Json(data.clone())))
            }),
            gate: Some(gate.clone()),
        });
        (transport, gate)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> TransportRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request recorded")
    }
}

impl Transport for RecordingTransport {
    fn send(&self, request: TransportRequest) -> BoxFuture<'static, TransportResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);

        match self.gate.clone() {
            Some(gate) => async move {
                gate.notified().await;
                result
            }
            .boxed(),
            None => futures::future::ready(result).boxed(),
        }
    }
}

pub fn envelope(status: StatusCode, data: Payload) -> Envelope {
    Envelope::new(status, HeaderMap::new(), data)
}
