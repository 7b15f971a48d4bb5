//! Access logging for plain HTTP routes.
//!
//! One line per request with method, URI, status, bytes sent and duration.
//! The line is written once the response body has been fully streamed or
//! dropped, so `size` is what actually went out and `dur` covers the
//! transfer.

use axum::{
    body::{Body, HttpBody},
    http::{header, HeaderValue, Method, Request, StatusCode, Uri},
    response::Response,
};
use std::task::{Context, Poll};
use std::time::Instant;
use tokio_stream::StreamExt;
use tower::{Layer, Service};
use tracing::info;

/// Layer that logs every request passing through it
#[derive(Clone, Default)]
pub struct HttpLoggingLayer;

impl HttpLoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for HttpLoggingLayer {
    type Service = HttpLoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpLoggingService { inner }
    }
}

/// Logging service
#[derive(Clone)]
pub struct HttpLoggingService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for HttpLoggingService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let method = req.method().clone();
        let uri = req.uri().clone();
        let start = Instant::now();

        Box::pin(async move {
            let response = inner.call(req).await?;
            let (mut parts, body) = response.into_parts();

            // The counting stream hides the size hint, so keep the framing.
            let bodiless = parts.status == StatusCode::NO_CONTENT
                || parts.status == StatusCode::NOT_MODIFIED
                || parts.status.is_informational();
            if !bodiless && !parts.headers.contains_key(header::CONTENT_LENGTH) {
                if let Some(exact) = body.size_hint().exact() {
                    parts
                        .headers
                        .insert(header::CONTENT_LENGTH, HeaderValue::from(exact));
                }
            }

            let mut log = TransferLog {
                method,
                uri,
                status: parts.status,
                start,
                bytes: 0,
            };
            let counted = body.into_data_stream().map(move |chunk| {
                if let Ok(data) = &chunk {
                    log.bytes += data.len() as u64;
                }
                chunk
            });

            Ok(Response::from_parts(parts, Body::from_stream(counted)))
        })
    }
}

/// Writes the access log line when the response body is dropped.
struct TransferLog {
    method: Method,
    uri: Uri,
    status: StatusCode,
    start: Instant,
    bytes: u64,
}

impl Drop for TransferLog {
    fn drop(&mut self) {
        info!(
            method = %self.method,
            uri = %self.uri,
            status = self.status.as_u16(),
            size = self.bytes,
            dur = ?self.start.elapsed(),
            "http"
        );
    }
}
