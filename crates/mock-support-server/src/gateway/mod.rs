//! REST gateway: translates HTTP/JSON (and HTTP/protobuf) calls into calls on
//! the same [`RpcHandlers`] the gRPC server uses.
//!
//! Route table:
//!
//! | Verb | Path | RPC |
//! |------|------|-----|
//! | POST | `/v1/oauth/token` | `AuthService/RequestAccessToken` |
//! | GET  | `/v1/resolverState:resolverStateUri` | `ResolverStateService/ResolverStateUri` |
//! | POST | `/v1/flagLogs:write` | `InternalFlagLoggerService/WriteFlagLogs` |
//!
//! The RPC paths use custom-verb suffixes (`:write`), which the path router
//! cannot express, so they are dispatched from the fallback by exact match.

pub mod codec;

pub use codec::{Marshaler, Marshalers};

use crate::domain::config::ServerConfig;
use crate::domain::error::{ApiError, ApiResult};
use crate::rpc::RpcHandlers;
use crate::state_file::{self, StateFile};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    Router,
};
use mock_proto::iam::RequestAccessTokenRequest;
use mock_proto::resolver::{ResolverStateUriRequest, WriteFlagLogsRequest};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;

pub const TOKEN_PATH: &str = "/v1/oauth/token";
pub const RESOLVER_STATE_URI_PATH: &str = "/v1/resolverState:resolverStateUri";
pub const WRITE_FLAG_LOGS_PATH: &str = "/v1/flagLogs:write";

/// Application state shared across gateway handlers
#[derive(Clone)]
pub struct GatewayState {
    pub handlers: RpcHandlers,
}

/// Build the full HTTP router: RPC gateway at the root plus `/state`.
pub fn build_router(handlers: &RpcHandlers, config: &ServerConfig) -> Router {
    let gateway = Router::new()
        .fallback(dispatch)
        .with_state(GatewayState {
            handlers: handlers.clone(),
        })
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_request_bytes));

    let state = state_file::router(
        StateFile::new(config.resolver_state_path.clone()),
        config.request_logging,
    );

    state.merge(gateway)
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Route a gateway request to the matching handler.
async fn dispatch(
    State(state): State<GatewayState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let marshalers = Marshalers::for_request(&headers);
    let result = match (&method, uri.path()) {
        (&Method::POST, TOKEN_PATH) => request_access_token(&state, marshalers, &body).await,
        (&Method::GET, RESOLVER_STATE_URI_PATH) => resolver_state_uri(&state, marshalers).await,
        (&Method::POST, WRITE_FLAG_LOGS_PATH) => write_flag_logs(&state, marshalers, &body).await,
        (_, TOKEN_PATH | RESOLVER_STATE_URI_PATH | WRITE_FLAG_LOGS_PATH) => {
            Err(ApiError::method_not_allowed())
        }
        _ => Err(ApiError::not_found()),
    };

    result.unwrap_or_else(IntoResponse::into_response)
}

async fn request_access_token(
    state: &GatewayState,
    marshalers: Marshalers,
    body: &[u8],
) -> ApiResult<Response> {
    let request: RequestAccessTokenRequest = marshalers.inbound.decode(body)?;
    let token = state.handlers.auth.request_access_token(request).await?;
    Ok(marshalers.outbound.respond(&token))
}

async fn resolver_state_uri(state: &GatewayState, marshalers: Marshalers) -> ApiResult<Response> {
    let response = state
        .handlers
        .resolver_state
        .resolver_state_uri(ResolverStateUriRequest::default())
        .await?;
    Ok(marshalers.outbound.respond(&response))
}

async fn write_flag_logs(
    state: &GatewayState,
    marshalers: Marshalers,
    body: &[u8],
) -> ApiResult<Response> {
    let request: WriteFlagLogsRequest = marshalers.inbound.decode(body)?;
    let logger = &state.handlers.flag_logger;
    let response = match marshalers.inbound {
        Marshaler::Protobuf => {
            logger
                .write_flag_logs_sized(request, body.len() as u64)
                .await?
        }
        Marshaler::Json => logger.write_flag_logs(request).await?,
    };
    Ok(marshalers.outbound.respond(&response))
}
