//! RequestAccessToken: issues HS256-signed bearer tokens.
//!
//! The signing secret is a fixed literal. Tokens are never verified by this
//! server; clients only need something shaped like a real access token.

use crate::domain::error::{ApiError, ApiResult};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header};
use mock_proto::iam::{AccessToken, RequestAccessTokenRequest};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::error;

/// Token lifetime
pub const TOKEN_TTL: Duration = Duration::from_secs(60 * 60);
/// Shared HMAC secret used to sign every token
pub const SIGNING_SECRET: &[u8] = b"jwt-secret";
/// `iss` claim
pub const TOKEN_ISSUER: &str = "mock-support-server";
/// `sub` claim
pub const TOKEN_SUBJECT: &str = "mock-client";
/// Private claim carrying the account name
pub const ACCOUNT_NAME_CLAIM: &str = "https://confidence.dev/account_name";

/// Claims embedded in every issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(rename = "https://confidence.dev/account_name")]
    pub account_name: String,
}

/// Auth RPC methods handler
pub struct AuthRpc {
    account_id: String,
    encoding_key: EncodingKey,
}

impl AuthRpc {
    pub fn new(account_id: String) -> Self {
        Self {
            account_id,
            encoding_key: EncodingKey::from_secret(SIGNING_SECRET),
        }
    }

    /// RequestAccessToken - Returns a freshly signed token valid for one hour.
    ///
    /// The request is accepted as-is; credentials are not checked.
    pub async fn request_access_token(
        &self,
        _request: RequestAccessTokenRequest,
    ) -> ApiResult<AccessToken> {
        self.issue_at(Utc::now().timestamp())
    }

    /// Build and sign a token issued at `now` (unix seconds).
    pub fn issue_at(&self, now: i64) -> ApiResult<AccessToken> {
        let ttl = TOKEN_TTL.as_secs() as i64;
        let claims = TokenClaims {
            iss: TOKEN_ISSUER.to_string(),
            sub: TOKEN_SUBJECT.to_string(),
            iat: now,
            exp: now + ttl,
            account_name: self.account_id.clone(),
        };

        let signed = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| {
                error!(error = %e, "failed to sign jwt");
                ApiError::internal(format!("failed to sign jwt: {}", e))
            })?;

        Ok(AccessToken {
            access_token: signed,
            expires_in: ttl,
        })
    }
}
