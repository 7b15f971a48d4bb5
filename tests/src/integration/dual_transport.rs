//! # Dual-Transport Tests
//!
//! Drives one server through tonic clients and through the HTTP gateway and
//! checks that both reach the same handler instances:
//!
//! 1. Tokens carry the same claims and lifetime on both transports
//! 2. The resolver state reference is identical apart from its expiry
//! 3. Flag-log counters add up across gRPC, JSON and protobuf writes
//! 4. `/state` serves the blob and honours `If-None-Match`

#[cfg(test)]
mod tests {
    use crate::harness::TestServer;
    use jsonwebtoken::{Algorithm, DecodingKey, Validation};
    use mock_proto::iam::auth_service_client::AuthServiceClient;
    use mock_proto::iam::RequestAccessTokenRequest;
    use mock_proto::resolver::events::{AppliedFlag, FlagAssigned};
    use mock_proto::resolver::internal_flag_logger_service_client::InternalFlagLoggerServiceClient;
    use mock_proto::resolver::resolver_state_service_client::ResolverStateServiceClient;
    use mock_proto::resolver::{ResolverStateUriRequest, WriteFlagLogsRequest};
    use mock_support_server::rpc::auth::{ACCOUNT_NAME_CLAIM, SIGNING_SECRET};
    use prost::Message;
    use serde_json::Value;
    use std::io::Write;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    const PROTOBUF: &str = "application/x-protobuf";

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn claims(token: &str) -> Value {
        jsonwebtoken::decode::<Value>(
            token,
            &DecodingKey::from_secret(SIGNING_SECRET),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap()
        .claims
    }

    fn batch(resolve_id: &str, flags: usize) -> FlagAssigned {
        FlagAssigned {
            resolve_id: resolve_id.to_string(),
            client_info: None,
            flags: (0..flags)
                .map(|i| AppliedFlag {
                    flag: format!("flags/flag-{i}"),
                    targeting_key: "user-1".to_string(),
                    ..Default::default()
                })
                .collect(),
        }
    }

    fn now_secs() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    // =============================================================================
    // TOKENS
    // =============================================================================

    #[tokio::test]
    async fn test_token_on_both_transports() {
        let server = TestServer::start(|c| c.account_id = "acct-42".to_string())
            .await
            .unwrap();

        let mut client = AuthServiceClient::connect(server.grpc_endpoint())
            .await
            .unwrap();
        let grpc_token = client
            .request_access_token(RequestAccessTokenRequest::default())
            .await
            .unwrap()
            .into_inner();
        assert_eq!(grpc_token.expires_in, 3600);

        let http: Value = reqwest::Client::new()
            .post(server.http_url("/v1/oauth/token"))
            .json(&serde_json::json!({"clientId": "c", "grantType": "client_credentials"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(http["expiresIn"], "3600");

        for token in [
            grpc_token.access_token.as_str(),
            http["accessToken"].as_str().unwrap(),
        ] {
            let claims = claims(token);
            assert_eq!(claims["iss"], "mock-support-server");
            assert_eq!(claims["sub"], "mock-client");
            assert_eq!(claims[ACCOUNT_NAME_CLAIM], "acct-42");
            assert_eq!(
                claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap(),
                3600
            );
        }

        drop(client);
        server.stop().await.unwrap();
    }

    // =============================================================================
    // RESOLVER STATE
    // =============================================================================

    #[tokio::test]
    async fn test_resolver_state_on_both_transports() {
        let server = TestServer::start(|c| {
            c.signed_state_uri = "https://storage.example/state?sig=abc".to_string()
        })
        .await
        .unwrap();

        let mut client = ResolverStateServiceClient::connect(server.grpc_endpoint())
            .await
            .unwrap();
        let grpc = client
            .resolver_state_uri(ResolverStateUriRequest::default())
            .await
            .unwrap()
            .into_inner();
        assert_eq!(grpc.signed_uri, "https://storage.example/state?sig=abc");
        assert_eq!(grpc.account, "confidence-test");
        let expiry = grpc.expire_time.unwrap().seconds;
        let expected = now_secs() + 24 * 60 * 60;
        assert!((expiry - expected).abs() <= 5, "expiry {expiry} vs {expected}");

        let http: Value = reqwest::get(server.http_url("/v1/resolverState:resolverStateUri"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(http["signedUri"], grpc.signed_uri);
        assert_eq!(http["account"], grpc.account);
        assert!(http["expireTime"].as_str().unwrap().ends_with('Z'));

        drop(client);
        server.stop().await.unwrap();
    }

    // =============================================================================
    // FLAG LOGS
    // =============================================================================

    #[tokio::test]
    async fn test_counters_shared_across_transports() {
        let server = TestServer::start(|_| {}).await.unwrap();
        let http = reqwest::Client::new();

        let grpc_request = WriteFlagLogsRequest {
            flag_assigned: vec![batch("r1", 2), batch("r2", 0)],
        };
        let mut client = InternalFlagLoggerServiceClient::connect(server.grpc_endpoint())
            .await
            .unwrap();
        client.write_flag_logs(grpc_request.clone()).await.unwrap();

        let json_response = http
            .post(server.http_url("/v1/flagLogs:write"))
            .json(&serde_json::json!({"flagAssigned": [{"resolveId": "r3"}]}))
            .send()
            .await
            .unwrap();
        assert!(json_response.status().is_success());
        let json_equivalent = WriteFlagLogsRequest {
            flag_assigned: vec![batch("r3", 0)],
        };

        let proto_request = WriteFlagLogsRequest {
            flag_assigned: vec![batch("r4", 1), batch("r5", 3), batch("r6", 1)],
        };
        let proto_response = http
            .post(server.http_url("/v1/flagLogs:write"))
            .header("content-type", PROTOBUF)
            .body(proto_request.encode_to_vec())
            .send()
            .await
            .unwrap();
        assert!(proto_response.status().is_success());
        assert_eq!(proto_response.headers()["content-type"], PROTOBUF);

        let snapshot = server.handlers.flag_logger.counters().snapshot();
        assert_eq!(snapshot.requests_total, 3);
        assert_eq!(snapshot.applied_total, 2 + 1 + 3);
        let expected_bytes = grpc_request.encoded_len()
            + json_equivalent.encoded_len()
            + proto_request.encoded_len();
        assert_eq!(snapshot.bytes_total, expected_bytes as u64);

        drop(client);
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_grpc_writes() {
        let server = TestServer::start(|_| {}).await.unwrap();
        let endpoint = server.grpc_endpoint();

        let mut tasks = Vec::new();
        let mut expected_bytes = 0u64;
        let mut expected_applied = 0u64;
        for i in 0..8 {
            let request = WriteFlagLogsRequest {
                flag_assigned: (0..i).map(|j| batch(&format!("r{i}-{j}"), 1)).collect(),
            };
            expected_bytes += request.encoded_len() as u64;
            expected_applied += i as u64;

            let endpoint = endpoint.clone();
            tasks.push(tokio::spawn(async move {
                let mut client = InternalFlagLoggerServiceClient::connect(endpoint)
                    .await
                    .unwrap();
                client.write_flag_logs(request).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let snapshot = server.handlers.flag_logger.counters().snapshot();
        assert_eq!(snapshot.requests_total, 8);
        assert_eq!(snapshot.applied_total, expected_applied);
        assert_eq!(snapshot.bytes_total, expected_bytes);

        server.stop().await.unwrap();
    }

    // =============================================================================
    // STATE BLOB
    // =============================================================================

    #[tokio::test]
    async fn test_state_etag_round_trip() {
        let mut blob = tempfile::NamedTempFile::new().unwrap();
        blob.write_all(b"\x0a\x03abc").unwrap();
        blob.flush().unwrap();
        let path = blob.path().to_path_buf();

        let server = TestServer::start(move |c| c.resolver_state_path = Some(path))
            .await
            .unwrap();
        let http = reqwest::Client::new();

        let first = http.get(server.http_url("/state")).send().await.unwrap();
        assert_eq!(first.status().as_u16(), 200);
        let etag = first.headers()["etag"].to_str().unwrap().to_string();
        assert!(etag.starts_with('"') && etag.ends_with('"'));
        assert_eq!(&first.bytes().await.unwrap()[..], b"\x0a\x03abc");

        let second = http
            .get(server.http_url("/state"))
            .header("if-none-match", &etag)
            .send()
            .await
            .unwrap();
        assert_eq!(second.status().as_u16(), 304);
        assert!(second.bytes().await.unwrap().is_empty());

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_state_unconfigured() {
        let server = TestServer::start(|_| {}).await.unwrap();

        let response = reqwest::get(server.http_url("/state")).await.unwrap();
        assert_eq!(response.status().as_u16(), 404);
        assert_eq!(
            response.text().await.unwrap(),
            "resolver state not configured"
        );

        server.stop().await.unwrap();
    }

    // =============================================================================
    // GATEWAY ERRORS
    // =============================================================================

    #[tokio::test]
    async fn test_unknown_gateway_path() {
        let server = TestServer::start(|_| {}).await.unwrap();

        let response = reqwest::get(server.http_url("/v1/flags:resolve"))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], 5);
        assert_eq!(body["details"], serde_json::json!([]));

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_is_clean_with_idle_metrics() {
        let server = TestServer::start(|_| {}).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        server.stop().await.unwrap();
    }
}
