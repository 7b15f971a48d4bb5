//! Server lifecycle: binds both listeners, runs the gRPC server, the HTTP
//! gateway and the metrics reporter until shutdown or the first failure.

use crate::domain::config::ServerConfig;
use crate::domain::error::ServerError;
use crate::gateway;
use crate::grpc::{self, GrpcServices};
use crate::metrics::MetricsReporter;
use crate::rpc::RpcHandlers;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{debug, info};

/// Mock support server
pub struct MockSupportServer {
    config: ServerConfig,
    handlers: RpcHandlers,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

/// Stops a running [`MockSupportServer`]
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Trigger graceful shutdown of both listeners and the reporter
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }
}

impl MockSupportServer {
    /// Create the server and its handlers
    pub fn new(config: ServerConfig) -> Self {
        let handlers = RpcHandlers::new(&config);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            handlers,
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    /// Handlers shared by both transports
    pub fn handlers(&self) -> &RpcHandlers {
        &self.handlers
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Bind the configured ports and serve.
    pub async fn run(self) -> Result<(), ServerError> {
        let grpc_listener = bind(self.config.grpc_addr()).await?;
        info!(addr = %self.config.grpc_addr(), "gRPC listening");

        let http_listener = bind(self.config.http_addr()).await?;
        info!(addr = %self.config.http_addr(), "HTTP gateway listening");

        self.run_with_listeners(grpc_listener, http_listener).await
    }

    /// Serve on already-bound listeners.
    ///
    /// Returns when shut down through a [`ShutdownHandle`] or when either
    /// server fails; in the latter case the other one is stopped first.
    pub async fn run_with_listeners(
        self,
        grpc_listener: TcpListener,
        http_listener: TcpListener,
    ) -> Result<(), ServerError> {
        let reporter = MetricsReporter::new(self.handlers.flag_logger.counters());
        let metrics_task = tokio::spawn(reporter.run(self.shutdown_tx.subscribe()));

        let router = gateway::build_router(&self.handlers, &self.config);
        let mut http_task = tokio::spawn(gateway::serve(
            http_listener,
            router,
            wait_for_shutdown(self.shutdown_tx.subscribe()),
        ));

        let services = GrpcServices::new(&self.handlers, self.config.request_logging);
        let grpc = grpc::serve(
            grpc_listener,
            services,
            wait_for_shutdown(self.shutdown_tx.subscribe()),
        );
        tokio::pin!(grpc);

        let result = tokio::select! {
            grpc_result = &mut grpc => {
                self.shutdown_tx.send_replace(true);
                let http_result = http_outcome(http_task.await);
                grpc_result.map_err(ServerError::from).and(http_result)
            }
            http_result = &mut http_task => {
                self.shutdown_tx.send_replace(true);
                let grpc_result = grpc.await;
                http_outcome(http_result).and(grpc_result.map_err(ServerError::from))
            }
        };

        let reports = metrics_task.await?;
        debug!(reports, "servers stopped");
        result
    }
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

fn http_outcome(joined: Result<std::io::Result<()>, JoinError>) -> Result<(), ServerError> {
    joined?.map_err(ServerError::Http)
}

/// Resolves once the flag is set or the sender is gone.
async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
