//! # Mock Support Server
//!
//! Serves the token, resolver-state and flag-log RPCs over gRPC and the
//! REST/JSON gateway until Ctrl+C.

use anyhow::{Context, Result};
use mock_support_server::{init_logging, LogConfig, MockSupportServer, ServerConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(&LogConfig::from_env()).context("initialize logging")?;

    let config = ServerConfig::from_env();
    info!(
        http = %config.http_addr(),
        grpc = %config.grpc_addr(),
        account = %config.account_id,
        state = ?config.resolver_state_path,
        signed_state_uri = %config.signed_state_uri,
        request_logging = config.request_logging,
        "Starting mock support server"
    );

    let server = MockSupportServer::new(config);
    let handle = server.shutdown_handle();
    let mut running = tokio::spawn(server.run());

    tokio::select! {
        joined = &mut running => {
            let result = joined.context("server task")?;
            if let Err(e) = &result {
                error!(error = %e, "server failed");
            }
            result.context("serve")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("listen for ctrl-c")?;
            info!("Received Ctrl+C, shutting down");
            handle.shutdown();
            running.await.context("server task")?.context("serve")?;
        }
    }

    info!("Mock support server stopped");
    Ok(())
}
