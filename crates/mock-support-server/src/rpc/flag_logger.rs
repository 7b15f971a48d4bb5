//! WriteFlagLogs: counts what resolvers report and drops the payload.

use crate::domain::error::ApiResult;
use mock_proto::resolver::{WriteFlagLogsRequest, WriteFlagLogsResponse};
use prost::Message;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Process-lifetime flag log counters. Only ever incremented.
#[derive(Debug, Default)]
pub struct FlagLogCounters {
    bytes_total: AtomicU64,
    applied_total: AtomicU64,
    requests_total: AtomicU64,
}

/// Point-in-time copy of [`FlagLogCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagLogSnapshot {
    pub bytes_total: u64,
    pub applied_total: u64,
    pub requests_total: u64,
}

impl FlagLogCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one write request.
    pub fn record(&self, bytes: u64, applied: u64) {
        self.bytes_total.fetch_add(bytes, Ordering::Relaxed);
        self.applied_total.fetch_add(applied, Ordering::Relaxed);
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FlagLogSnapshot {
        FlagLogSnapshot {
            bytes_total: self.bytes_total.load(Ordering::Relaxed),
            applied_total: self.applied_total.load(Ordering::Relaxed),
            requests_total: self.requests_total.load(Ordering::Relaxed),
        }
    }
}

/// Flag logger RPC methods handler
pub struct FlagLoggerRpc {
    counters: Arc<FlagLogCounters>,
}

impl FlagLoggerRpc {
    pub fn new(counters: Arc<FlagLogCounters>) -> Self {
        Self { counters }
    }

    /// WriteFlagLogs - Adds the request's encoded size and entry count to the counters.
    ///
    /// The re-encoded size leaves out unknown fields; transports that still
    /// hold the received bytes use [`Self::write_flag_logs_sized`].
    pub async fn write_flag_logs(
        &self,
        request: WriteFlagLogsRequest,
    ) -> ApiResult<WriteFlagLogsResponse> {
        let bytes = request.encoded_len() as u64;
        self.write_flag_logs_sized(request, bytes).await
    }

    /// WriteFlagLogs for a request that arrived as `wire_bytes` bytes of protobuf.
    pub async fn write_flag_logs_sized(
        &self,
        request: WriteFlagLogsRequest,
        wire_bytes: u64,
    ) -> ApiResult<WriteFlagLogsResponse> {
        let applied = request.flag_assigned.len() as u64;
        self.counters.record(wire_bytes, applied);
        debug!(bytes = wire_bytes, applied, "flag logs received");
        Ok(WriteFlagLogsResponse {})
    }

    /// Shared counters, for the metrics reporter
    pub fn counters(&self) -> Arc<FlagLogCounters> {
        Arc::clone(&self.counters)
    }
}
