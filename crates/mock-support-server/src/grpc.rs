//! gRPC transport: tonic services wrapping the shared [`RpcHandlers`].
//!
//! With request logging enabled every unary call is logged with its full
//! method name, resulting status code and duration.
//!
//! The flag logger service sits behind [`WireSized`], which counts the
//! request body as it arrives so the counters see the size the client sent,
//! unknown fields included.

use crate::domain::error::ApiResult;
use crate::rpc::{AuthRpc, FlagLoggerRpc, ResolverStateRpc, RpcHandlers};
use axum::body::Body;
use axum::http;
use mock_proto::iam::auth_service_server::{AuthService, AuthServiceServer};
use mock_proto::iam::{AccessToken, RequestAccessTokenRequest};
use mock_proto::resolver::internal_flag_logger_service_server::{
    InternalFlagLoggerService, InternalFlagLoggerServiceServer,
};
use mock_proto::resolver::resolver_state_service_server::{
    ResolverStateService, ResolverStateServiceServer,
};
use mock_proto::resolver::{
    ResolverStateUriRequest, ResolverStateUriResponse, WriteFlagLogsRequest,
    WriteFlagLogsResponse,
};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_stream::StreamExt;
use tonic::body::BoxBody;
use tonic::server::NamedService;
use tonic::transport::Server;
use tonic::{Code, Request, Response, Status};
use tower::Service;
use tracing::info;

pub const REQUEST_ACCESS_TOKEN_METHOD: &str = "/confidence.iam.v1.AuthService/RequestAccessToken";
pub const RESOLVER_STATE_URI_METHOD: &str =
    "/confidence.flags.resolver.v1.ResolverStateService/ResolverStateUri";
pub const WRITE_FLAG_LOGS_METHOD: &str =
    "/confidence.flags.resolver.v1.InternalFlagLoggerService/WriteFlagLogs";

/// Compression flag plus big-endian length ahead of each message.
const GRPC_FRAME_HEADER_LEN: u64 = 5;

/// Request body bytes received so far, attached to the request by [`WireSized`].
#[derive(Clone, Debug, Default)]
pub struct WireBytes(Arc<AtomicU64>);

impl WireBytes {
    pub fn total(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Size of the single message of a unary call.
    pub fn message_len(&self) -> u64 {
        self.total().saturating_sub(GRPC_FRAME_HEADER_LEN)
    }
}

/// Counts request body bytes on their way into the wrapped tonic service.
#[derive(Clone, Debug)]
pub struct WireSized<S> {
    inner: S,
}

impl<S> WireSized<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S> Service<http::Request<BoxBody>> for WireSized<S>
where
    S: Service<http::Request<BoxBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<BoxBody>) -> Self::Future {
        let (mut parts, body) = req.into_parts();
        let wire = WireBytes::default();
        parts.extensions.insert(wire.clone());

        let counted = Body::new(body).into_data_stream().map(move |chunk| {
            if let Ok(data) = &chunk {
                wire.0.fetch_add(data.len() as u64, Ordering::Relaxed);
            }
            chunk
        });
        let body = tonic::body::boxed(Body::from_stream(counted));
        self.inner.call(http::Request::from_parts(parts, body))
    }
}

impl<S: NamedService> NamedService for WireSized<S> {
    const NAME: &'static str = S::NAME;
}

/// Unary call decorator; logs method, code and duration when enabled.
#[derive(Clone, Copy, Debug)]
pub struct CallLogger {
    enabled: bool,
}

impl CallLogger {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub async fn observe<T, F>(&self, method: &'static str, call: F) -> Result<Response<T>, Status>
    where
        F: Future<Output = ApiResult<T>>,
    {
        let start = Instant::now();
        let result = call.await.map(Response::new).map_err(Status::from);
        if self.enabled {
            let code = match &result {
                Ok(_) => Code::Ok,
                Err(status) => status.code(),
            };
            info!(method, code = ?code, dur = ?start.elapsed(), "grpc unary");
        }
        result
    }
}

/// AuthService backed by [`AuthRpc`]
pub struct AuthGrpc {
    handler: Arc<AuthRpc>,
    logger: CallLogger,
}

#[tonic::async_trait]
impl AuthService for AuthGrpc {
    async fn request_access_token(
        &self,
        request: Request<RequestAccessTokenRequest>,
    ) -> Result<Response<AccessToken>, Status> {
        self.logger
            .observe(
                REQUEST_ACCESS_TOKEN_METHOD,
                self.handler.request_access_token(request.into_inner()),
            )
            .await
    }
}

/// ResolverStateService backed by [`ResolverStateRpc`]
pub struct ResolverStateGrpc {
    handler: Arc<ResolverStateRpc>,
    logger: CallLogger,
}

#[tonic::async_trait]
impl ResolverStateService for ResolverStateGrpc {
    async fn resolver_state_uri(
        &self,
        request: Request<ResolverStateUriRequest>,
    ) -> Result<Response<ResolverStateUriResponse>, Status> {
        self.logger
            .observe(
                RESOLVER_STATE_URI_METHOD,
                self.handler.resolver_state_uri(request.into_inner()),
            )
            .await
    }
}

/// InternalFlagLoggerService backed by [`FlagLoggerRpc`]
pub struct FlagLoggerGrpc {
    handler: Arc<FlagLoggerRpc>,
    logger: CallLogger,
}

#[tonic::async_trait]
impl InternalFlagLoggerService for FlagLoggerGrpc {
    async fn write_flag_logs(
        &self,
        request: Request<WriteFlagLogsRequest>,
    ) -> Result<Response<WriteFlagLogsResponse>, Status> {
        let wire = request.extensions().get::<WireBytes>().map(WireBytes::message_len);
        let request = request.into_inner();
        let call = async {
            match wire {
                Some(bytes) => self.handler.write_flag_logs_sized(request, bytes).await,
                None => self.handler.write_flag_logs(request).await,
            }
        };
        self.logger.observe(WRITE_FLAG_LOGS_METHOD, call).await
    }
}

/// The three tonic services, sharing the given handler instances
pub struct GrpcServices {
    pub auth: AuthServiceServer<AuthGrpc>,
    pub resolver_state: ResolverStateServiceServer<ResolverStateGrpc>,
    pub flag_logger: WireSized<InternalFlagLoggerServiceServer<FlagLoggerGrpc>>,
}

impl GrpcServices {
    pub fn new(handlers: &RpcHandlers, request_logging: bool) -> Self {
        let logger = CallLogger::new(request_logging);
        Self {
            auth: AuthServiceServer::new(AuthGrpc {
                handler: Arc::clone(&handlers.auth),
                logger,
            }),
            resolver_state: ResolverStateServiceServer::new(ResolverStateGrpc {
                handler: Arc::clone(&handlers.resolver_state),
                logger,
            }),
            flag_logger: WireSized::new(InternalFlagLoggerServiceServer::new(FlagLoggerGrpc {
                handler: Arc::clone(&handlers.flag_logger),
                logger,
            })),
        }
    }
}

/// Serve the gRPC services on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    services: GrpcServices,
    shutdown: F,
) -> Result<(), tonic::transport::Error>
where
    F: Future<Output = ()>,
{
    Server::builder()
        .add_service(services.auth)
        .add_service(services.resolver_state)
        .add_service(services.flag_logger)
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await
}
