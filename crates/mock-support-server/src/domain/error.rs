//! Error types shared by the handlers and both transports.
//!
//! Handlers return [`ApiError`], which carries a gRPC status code. The gRPC
//! transport turns it into a [`tonic::Status`]; the HTTP gateway maps the code
//! onto an HTTP status and renders the gateway JSON error body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use std::net::SocketAddr;
use tonic::Code;

/// Handler error with a gRPC status code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// gRPC status code
    pub code: Code,
    /// Error message returned to the caller
    pub message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Internal error
    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(Code::Internal, details)
    }

    /// Request body could not be decoded
    pub fn invalid_argument(details: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, details)
    }

    /// No route for the requested path
    pub fn not_found() -> Self {
        Self::new(Code::NotFound, "Not Found")
    }

    /// Route exists but not for this HTTP verb
    pub fn method_not_allowed() -> Self {
        Self::new(Code::Unimplemented, "Method Not Allowed")
    }

    /// HTTP status the gateway answers with for this error.
    pub fn http_status(&self) -> StatusCode {
        http_status_from_code(self.code)
    }
}

/// Map a gRPC code onto the HTTP status used by REST gateways.
pub fn http_status_from_code(code: Code) -> StatusCode {
    match code {
        Code::Ok => StatusCode::OK,
        // 499 Client Closed Request has no named constant
        Code::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
        Code::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        Code::InvalidArgument => StatusCode::BAD_REQUEST,
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists => StatusCode::CONFLICT,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::FailedPrecondition => StatusCode::BAD_REQUEST,
        Code::Aborted => StatusCode::CONFLICT,
        Code::OutOfRange => StatusCode::BAD_REQUEST,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ApiError", 3)?;
        state.serialize_field("code", &(self.code as i32))?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("details", &[] as &[serde_json::Value])?;
        state.end()
    }
}

impl From<ApiError> for tonic::Status {
    fn from(e: ApiError) -> Self {
        tonic::Status::new(e.code, e.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.http_status(), Json(self)).into_response()
    }
}

/// Result type for handler operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Server-level errors (startup and serving, not returned to callers)
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Listener could not be bound
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// gRPC transport failed
    #[error("gRPC serve error: {0}")]
    Grpc(#[from] tonic::transport::Error),

    /// HTTP gateway failed
    #[error("http serve error: {0}")]
    Http(#[source] std::io::Error),

    /// A server task panicked or was cancelled
    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Logging could not be installed
    #[error("telemetry error: {0}")]
    Telemetry(String),
}
