//! `/state`: serves the resolver state blob from disk with ETag support.
//!
//! The ETag is derived from the file's modification time (whole seconds) and
//! size, so it changes whenever the file is replaced. The body is streamed
//! from the open file handle and never buffered whole.

use crate::middleware::HttpLoggingLayer;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_stream::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::{error, warn};

pub const STATE_PATH: &str = "/state";

const NOT_CONFIGURED: &str = "resolver state not configured";
const READ_FAILED: &str = "failed to read state";

/// Location of the state blob; `None` when not configured.
#[derive(Debug, Clone, Default)]
pub struct StateFile {
    path: Option<PathBuf>,
}

impl StateFile {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

/// Router exposing [`STATE_PATH`]
pub fn router(state: StateFile, request_logging: bool) -> Router {
    let router = Router::new()
        .route(STATE_PATH, any(serve_state))
        .with_state(Arc::new(state));

    if request_logging {
        router.layer(HttpLoggingLayer::new())
    } else {
        router
    }
}

/// Quoted ETag for a file with the given mtime (unix seconds) and size.
pub fn entity_tag(mtime_secs: i64, size: u64) -> String {
    let mtime = if mtime_secs < 0 {
        format!("-{:x}", mtime_secs.unsigned_abs())
    } else {
        format!("{:x}", mtime_secs)
    };
    format!("\"{}-{:x}\"", mtime, size)
}

fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_secs() as i64,
        Err(before) => {
            let d = before.duration();
            // Truncate toward negative infinity like a unix timestamp.
            let secs = d.as_secs() as i64;
            if d.subsec_nanos() > 0 {
                -secs - 1
            } else {
                -secs
            }
        }
    }
}

async fn serve_state(State(state): State<Arc<StateFile>>, headers: HeaderMap) -> Response {
    let Some(path) = state.path() else {
        return (StatusCode::NOT_FOUND, NOT_CONFIGURED).into_response();
    };

    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) => {
            error!(path = %path.display(), error = %e, "open state");
            return (StatusCode::INTERNAL_SERVER_ERROR, READ_FAILED).into_response();
        }
    };
    let metadata = match file.metadata().await {
        Ok(metadata) => metadata,
        Err(e) => {
            error!(path = %path.display(), error = %e, "stat state");
            return (StatusCode::INTERNAL_SERVER_ERROR, READ_FAILED).into_response();
        }
    };

    let mtime = metadata.modified().map(unix_seconds).unwrap_or(0);
    let size = metadata.len();
    let etag = entity_tag(mtime, size);

    let matches = headers
        .get(header::IF_NONE_MATCH)
        .is_some_and(|v| v.as_bytes() == etag.as_bytes());
    let etag = match HeaderValue::from_str(&etag) {
        Ok(value) => value,
        Err(e) => {
            error!(error = %e, "invalid etag");
            return (StatusCode::INTERNAL_SERVER_ERROR, READ_FAILED).into_response();
        }
    };

    if matches {
        return (StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response();
    }

    let shown = path.display().to_string();
    let stream = ReaderStream::new(file).map(move |chunk| {
        if let Err(e) = &chunk {
            warn!(path = %shown, error = %e, "stream state");
        }
        chunk
    });

    (
        StatusCode::OK,
        [
            (header::ETAG, etag),
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_LENGTH, HeaderValue::from(size)),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}
