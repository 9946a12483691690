//! Handlers and transports shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use plait::{
    Arguments, BoxHandler, CancellationToken, Construct, Error, Handler, HandlerFuture, Inject,
    Method, Request, RequestParts, Resolver, Response, Result, ServiceTransport,
};

/// Shared event log.
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().expect("recorder lock").push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().expect("recorder lock").clone()
    }
}

/// Records `<label>:request` before delegating and `<label>:response` after.
///
/// Constructed from `(next, Recorder, String)`.
pub struct Recording {
    next: BoxHandler,
    recorder: Recorder,
    label: String,
}

impl Handler for Recording {
    fn send(&self, request: Request<Bytes>, cancellation: CancellationToken) -> HandlerFuture {
        let next = Arc::clone(&self.next);
        let recorder = self.recorder.clone();
        let label = self.label.clone();
        Box::pin(async move {
            recorder.push(format!("{label}:request"));
            let result = next.send(request, cancellation).await;
            recorder.push(format!("{label}:response"));
            result
        })
    }
}

impl Construct for Recording {
    fn construct(arguments: &mut Arguments) -> Result<Self> {
        Ok(Self {
            next: arguments.next_handler()?,
            recorder: arguments.value()?,
            label: arguments.value()?,
        })
    }
}

impl Inject for Recording {
    fn inject(resolver: &mut Resolver<'_>) -> Result<Self> {
        Ok(Self {
            next: resolver.handler()?,
            recorder: resolver.get()?,
            label: resolver.get()?,
        })
    }
}

/// Answers every request itself without delegating.
///
/// Constructed from `(next, u16)`.
pub struct Stub {
    status: u16,
}

impl Handler for Stub {
    fn send(&self, _request: Request<Bytes>, _cancellation: CancellationToken) -> HandlerFuture {
        let status = self.status;
        Box::pin(async move { Ok(Response::with_status(status)) })
    }
}

impl Construct for Stub {
    fn construct(arguments: &mut Arguments) -> Result<Self> {
        let _next = arguments.next_handler()?;
        Ok(Self {
            status: arguments.value()?,
        })
    }
}

/// Tags each request with a fresh `x-request-id`.
pub struct RequestId {
    next: BoxHandler,
}

impl Handler for RequestId {
    fn send(&self, mut request: Request<Bytes>, cancellation: CancellationToken) -> HandlerFuture {
        request
            .headers_mut()
            .insert("x-request-id".to_string(), uuid::Uuid::new_v4().to_string());
        self.next.send(request, cancellation)
    }
}

impl Construct for RequestId {
    fn construct(arguments: &mut Arguments) -> Result<Self> {
        Ok(Self {
            next: arguments.next_handler()?,
        })
    }
}

/// Transport answering with `status` and recording `transport`.
pub fn status_transport(status: u16, recorder: Recorder) -> impl Handler {
    ServiceTransport::new(tower::service_fn(move |_request: Request| {
        let recorder = recorder.clone();
        async move {
            recorder.push("transport");
            Ok::<_, Error>(Response::with_status(status))
        }
    }))
}

/// Transport returning the request headers as response headers.
pub fn echo_transport() -> impl Handler {
    ServiceTransport::new(tower::service_fn(|request: Request| async move {
        let RequestParts { headers, body, .. } = request.into_parts();
        Ok::<_, Error>(Response::new(200, headers, body.unwrap_or_default()))
    }))
}

pub fn request(url: &str) -> Request {
    Request::builder(Method::Get, url::Url::parse(url).expect("valid URL")).build()
}
