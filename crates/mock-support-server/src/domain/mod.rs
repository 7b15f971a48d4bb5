//! Domain types: configuration and errors.

pub mod config;
pub mod error;

pub use config::{parse_bool, ServerConfig};
pub use error::{ApiError, ApiResult, ServerError};
