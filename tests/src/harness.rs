//! Test server bound to ephemeral localhost ports.

use mock_support_server::domain::config::default_state_uri;
use mock_support_server::{
    MockSupportServer, RpcHandlers, ServerConfig, ServerError, ShutdownHandle,
};
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A running server plus the addresses and handlers behind it
pub struct TestServer {
    pub grpc_addr: SocketAddr,
    pub http_addr: SocketAddr,
    pub config: ServerConfig,
    pub handlers: RpcHandlers,
    handle: ShutdownHandle,
    task: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    /// Bind both listeners, let `configure` adjust the config, then serve.
    ///
    /// Ports and the advertised state URI are preset from the bound
    /// listeners before `configure` runs.
    pub async fn start<F>(configure: F) -> std::io::Result<Self>
    where
        F: FnOnce(&mut ServerConfig),
    {
        let grpc_listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let http_listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let grpc_addr = grpc_listener.local_addr()?;
        let http_addr = http_listener.local_addr()?;

        let mut config = ServerConfig {
            host: Ipv4Addr::LOCALHOST.into(),
            http_port: http_addr.port(),
            grpc_port: grpc_addr.port(),
            signed_state_uri: default_state_uri(http_addr.port()),
            request_logging: true,
            ..ServerConfig::default()
        };
        configure(&mut config);

        let server = MockSupportServer::new(config.clone());
        let handlers = server.handlers().clone();
        let handle = server.shutdown_handle();
        let task = tokio::spawn(server.run_with_listeners(grpc_listener, http_listener));

        Ok(Self {
            grpc_addr,
            http_addr,
            config,
            handlers,
            handle,
            task,
        })
    }

    /// `http://` endpoint for tonic clients
    pub fn grpc_endpoint(&self) -> String {
        format!("http://{}", self.grpc_addr)
    }

    /// Absolute URL on the HTTP listener
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.http_addr, path)
    }

    /// Shut down and wait for both listeners to stop.
    pub async fn stop(self) -> Result<(), ServerError> {
        self.handle.shutdown();
        self.task.await?
    }
}
