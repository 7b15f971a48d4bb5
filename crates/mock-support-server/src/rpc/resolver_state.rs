//! ResolverStateUri: tells resolvers where to download the signed state.

use crate::domain::error::ApiResult;
use mock_proto::resolver::{ResolverStateUriRequest, ResolverStateUriResponse};
use std::time::{Duration, SystemTime};

/// How long an advertised state URI stays valid
pub const STATE_URI_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Resolver state RPC methods handler
pub struct ResolverStateRpc {
    signed_uri: String,
    account: String,
}

impl ResolverStateRpc {
    pub fn new(signed_uri: String, account: String) -> Self {
        Self { signed_uri, account }
    }

    /// ResolverStateUri - Returns the configured URI, expiring 24h from now.
    pub async fn resolver_state_uri(
        &self,
        _request: ResolverStateUriRequest,
    ) -> ApiResult<ResolverStateUriResponse> {
        Ok(self.locate_at(SystemTime::now()))
    }

    /// Reference as served at `now`.
    pub fn locate_at(&self, now: SystemTime) -> ResolverStateUriResponse {
        ResolverStateUriResponse {
            signed_uri: self.signed_uri.clone(),
            expire_time: Some(prost_types::Timestamp::from(now + STATE_URI_TTL)),
            account: self.account.clone(),
        }
    }
}
