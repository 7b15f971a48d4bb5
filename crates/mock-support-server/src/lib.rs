//! Mock Support Server - token, resolver-state and flag-log backend for
//! exercising feature-flag client libraries.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       MOCK SUPPORT SERVER                        │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────┐          ┌──────────────────────────────┐  │
//! │  │   gRPC (tonic)   │          │      HTTP (axum)             │  │
//! │  │    Port 9091     │          │      Port 8081               │  │
//! │  └────────┬─────────┘          │  REST gateway   │  /state    │  │
//! │           │                    └───────┬─────────┴─────┬──────┘  │
//! │           │                            │               │         │
//! │  ┌────────┴────────────────────────────┴───────┐  ┌────┴──────┐  │
//! │  │                 RpcHandlers                  │  │ StateFile │  │
//! │  │  AuthRpc │ ResolverStateRpc │ FlagLoggerRpc  │  │ (ETag)    │  │
//! │  └───────────────────────────────────┬─────────┘  └───────────┘  │
//! │                                      │                           │
//! │                              FlagLogCounters ──→ MetricsReporter │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use mock_support_server::{MockSupportServer, ServerConfig};
//!
//! let server = MockSupportServer::new(ServerConfig::from_env());
//! server.run().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod gateway;
pub mod grpc;
pub mod metrics;
pub mod middleware;
pub mod rpc;
pub mod service;
pub mod state_file;
pub mod telemetry;

pub use domain::{ApiError, ApiResult, ServerConfig, ServerError};
pub use metrics::MetricsReporter;
pub use rpc::{FlagLogCounters, FlagLogSnapshot, RpcHandlers};
pub use service::{MockSupportServer, ShutdownHandle};
pub use telemetry::{init_logging, LogConfig};
