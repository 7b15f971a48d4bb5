//! Server configuration loaded once from the environment.
//!
//! Every setting is optional. Malformed numbers, addresses and booleans fall
//! back to their defaults instead of failing startup.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tracing::warn;

/// Default HTTP (gateway + `/state`) port
pub const DEFAULT_HTTP_PORT: u16 = 8081;
/// Default gRPC port
pub const DEFAULT_GRPC_PORT: u16 = 9091;
/// Default account identifier embedded in tokens and state references
pub const DEFAULT_ACCOUNT_ID: &str = "confidence-test";
/// Default gateway request body limit (16 MiB)
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024;

/// Main server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address for both listeners
    pub host: IpAddr,
    /// HTTP gateway port
    pub http_port: u16,
    /// gRPC port
    pub grpc_port: u16,
    /// Account identifier
    pub account_id: String,
    /// Local resolver state blob served at `/state` (None = unconfigured)
    pub resolver_state_path: Option<PathBuf>,
    /// URI advertised by ResolverStateUri
    pub signed_state_uri: String,
    /// Log every gRPC call and every `/state` request
    pub request_logging: bool,
    /// Maximum accepted gateway request body
    pub max_request_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: DEFAULT_HTTP_PORT,
            grpc_port: DEFAULT_GRPC_PORT,
            account_id: DEFAULT_ACCOUNT_ID.to_string(),
            resolver_state_path: None,
            signed_state_uri: default_state_uri(DEFAULT_HTTP_PORT),
            request_logging: false,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PORT_HTTP`: HTTP port (default: 8081)
    /// - `PORT_GRPC`: gRPC port (default: 9091)
    /// - `ACCOUNT_ID`: Account identifier (default: confidence-test)
    /// - `RESOLVER_STATE_PB`: Path of the state blob (default: unset)
    /// - `SIGNED_STATE_URI`: Advertised state URI (default: http://localhost:{PORT_HTTP}/state)
    /// - `REQUEST_LOGGING`: Enable request logging (default: false)
    /// - `BIND_HOST`: Listener address (default: 0.0.0.0)
    /// - `MAX_REQUEST_BYTES`: Gateway body limit (default: 16 MiB)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let http_port = parse_or(get("PORT_HTTP"), "PORT_HTTP", defaults.http_port);
        let signed_state_uri =
            get("SIGNED_STATE_URI").unwrap_or_else(|| default_state_uri(http_port));

        Self {
            host: parse_or(get("BIND_HOST"), "BIND_HOST", defaults.host),
            http_port,
            grpc_port: parse_or(get("PORT_GRPC"), "PORT_GRPC", defaults.grpc_port),
            account_id: get("ACCOUNT_ID").unwrap_or(defaults.account_id),
            resolver_state_path: get("RESOLVER_STATE_PB").map(PathBuf::from),
            signed_state_uri,
            request_logging: get("REQUEST_LOGGING")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.request_logging),
            max_request_bytes: parse_or(
                get("MAX_REQUEST_BYTES"),
                "MAX_REQUEST_BYTES",
                defaults.max_request_bytes,
            ),
        }
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.http_port)
    }

    /// Get gRPC server bind address
    pub fn grpc_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.grpc_port)
    }
}

/// State URI advertised when none is configured.
pub fn default_state_uri(http_port: u16) -> String {
    format!("http://localhost:{}/state", http_port)
}

/// Parse the common boolean spellings.
///
/// Trimmed and case-insensitive; returns `None` for anything unrecognized.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> T {
    match value {
        Some(raw) => match raw.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(key, value = %raw, "ignoring malformed setting, using default");
                default
            }
        },
        None => default,
    }
}
