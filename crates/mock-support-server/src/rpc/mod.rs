//! RPC method handlers shared by the gRPC server and the HTTP gateway.

pub mod auth;
pub mod flag_logger;
pub mod resolver_state;

pub use auth::AuthRpc;
pub use flag_logger::{FlagLogCounters, FlagLogSnapshot, FlagLoggerRpc};
pub use resolver_state::ResolverStateRpc;

use crate::domain::config::ServerConfig;
use std::sync::Arc;

/// All RPC handlers. Cloning shares the same instances.
#[derive(Clone)]
pub struct RpcHandlers {
    pub auth: Arc<AuthRpc>,
    pub resolver_state: Arc<ResolverStateRpc>,
    pub flag_logger: Arc<FlagLoggerRpc>,
}

impl RpcHandlers {
    /// Create all RPC handlers from config
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            auth: Arc::new(AuthRpc::new(config.account_id.clone())),
            resolver_state: Arc::new(ResolverStateRpc::new(
                config.signed_state_uri.clone(),
                config.account_id.clone(),
            )),
            flag_logger: Arc::new(FlagLoggerRpc::new(Arc::new(FlagLogCounters::new()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock_proto::resolver::WriteFlagLogsRequest;

    #[tokio::test]
    async fn test_clones_share_state() {
        let handlers = RpcHandlers::new(&ServerConfig::default());
        let clone = handlers.clone();

        clone
            .flag_logger
            .write_flag_logs(WriteFlagLogsRequest::default())
            .await
            .unwrap();

        assert_eq!(handlers.flag_logger.counters().snapshot().requests_total, 1);
        assert!(Arc::ptr_eq(&handlers.auth, &clone.auth));
    }
}
