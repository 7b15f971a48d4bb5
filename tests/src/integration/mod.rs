//! Integration tests: the same handlers reached over gRPC and HTTP.

pub mod dual_transport;
