//! End-to-end tests through the gateway's HTTP surface, driven with the
//! typed client.

use gateway_client::{Error, ExecuteRequest, PositionSelector};
use gateway_tests::{create_test_client, spawn_gateway, spawn_mock_upstream, test_config};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_health_reports_session_and_cache() {
    let mock = spawn_mock_upstream().await;
    let gateway = spawn_gateway(test_config(&mock.base_url)).await;
    let client = create_test_client(&gateway, None);

    let health = client.health_check().await.expect("health check");
    assert_eq!(health.status, "healthy");
    assert!(!health.version.is_empty());
    assert_eq!(health.session.state, "unauthenticated");
    assert_eq!(health.cache.shared, "disabled");
    assert_eq!(health.cache.local_entries, 0);
}

#[tokio::test]
async fn test_user_fetch_cold_then_cached() {
    let mock = spawn_mock_upstream().await;
    let gateway = spawn_gateway(test_config(&mock.base_url)).await;
    let client = create_test_client(&gateway, None);

    let first = client.get_user("46108").await.expect("first fetch");
    assert!(first.success);
    assert!(!first.cached);
    assert_eq!(first.data["answer"]["Login"], "46108");

    let second = client.get_user("46108").await.expect("second fetch");
    assert!(second.cached);
    assert_eq!(second.data, first.data);

    // One handshake, one upstream fetch for both requests.
    assert_eq!(mock.state.auth_start_calls.load(Ordering::SeqCst), 1);
    assert_eq!(mock.state.user_get_calls.load(Ordering::SeqCst), 1);

    let health = client.health_check().await.expect("health check");
    assert_eq!(health.session.state, "authenticated");
    assert!(health.cache.local_entries >= 1);
}

#[tokio::test]
async fn test_positions_by_group() {
    let mock = spawn_mock_upstream().await;
    let gateway = spawn_gateway(test_config(&mock.base_url)).await;
    let client = create_test_client(&gateway, None);

    let positions = client
        .get_positions(PositionSelector::Group("demo*".to_string()), Some("EURUSD"))
        .await
        .expect("positions");
    assert!(!positions.cached);
    assert!(positions.data["answer"].is_array());
    assert_eq!(mock.state.position_get_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_positions_selector_rule_enforced_over_http() {
    let mock = spawn_mock_upstream().await;
    let gateway = spawn_gateway(test_config(&mock.base_url)).await;

    // The typed client cannot express an invalid selector combination, so
    // drive the raw endpoint directly.
    let http = reqwest::Client::new();

    let resp = http
        .get(format!("{}/api/v1/positions", gateway.base_url))
        .query(&[("login", "46108"), ("group", "demo*")])
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await.expect("error body");
    assert_eq!(body["code"], "INVALID_PARAMETERS");

    let resp = http
        .get(format!("{}/api/v1/positions", gateway.base_url))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status().as_u16(), 400);

    // Rejected before any upstream traffic.
    assert_eq!(mock.state.auth_start_calls.load(Ordering::SeqCst), 0);
    assert_eq!(mock.state.position_get_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_session_refresh_forces_handshake() {
    let mock = spawn_mock_upstream().await;
    let gateway = spawn_gateway(test_config(&mock.base_url)).await;
    let client = create_test_client(&gateway, None);

    let refreshed = client.refresh_session().await.expect("refresh");
    assert!(refreshed.success);
    assert_eq!(refreshed.session.state, "authenticated");
    assert_eq!(mock.state.auth_start_calls.load(Ordering::SeqCst), 1);

    // A second refresh does not reuse the live session.
    client.refresh_session().await.expect("second refresh");
    assert_eq!(mock.state.auth_start_calls.load(Ordering::SeqCst), 2);

    let status = client.session_status().await.expect("status");
    assert_eq!(status.session.state, "authenticated");
    assert!(status.session.expires_in_secs.is_some());
}

#[tokio::test]
async fn test_execute_passthrough() {
    let mock = spawn_mock_upstream().await;
    let gateway = spawn_gateway(test_config(&mock.base_url)).await;
    let client = create_test_client(&gateway, None);

    let result = client
        .execute(&ExecuteRequest {
            endpoint: "time/server".to_string(),
            params: BTreeMap::new(),
        })
        .await
        .expect("execute");
    assert!(result.success);
    assert!(!result.cached);
    assert_eq!(result.data["retcode"], "0 Done");
    assert_eq!(mock.state.time_server_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_create_user_and_cache_invalidation() {
    let mock = spawn_mock_upstream().await;
    let gateway = spawn_gateway(test_config(&mock.base_url)).await;
    let client = create_test_client(&gateway, None);

    // Cache the user, then mutate it through the gateway.
    client.get_user("777").await.expect("populate cache");
    assert!(client.get_user("777").await.expect("cached").cached);

    let mut params = BTreeMap::new();
    params.insert("login".to_string(), json!("777"));
    params.insert("group".to_string(), json!("demo\\usd"));
    let created = client.create_user(&params).await.expect("create");
    assert!(created.success);
    assert_eq!(mock.state.user_add_calls.load(Ordering::SeqCst), 1);

    // Mutation dropped the entry; the next read goes upstream.
    let after = client.get_user("777").await.expect("read after create");
    assert!(!after.cached);
}

#[tokio::test]
async fn test_explicit_cache_invalidation() {
    let mock = spawn_mock_upstream().await;
    let gateway = spawn_gateway(test_config(&mock.base_url)).await;
    let client = create_test_client(&gateway, None);

    client.get_user("46108").await.expect("populate cache");
    assert!(client.get_user("46108").await.expect("cached").cached);

    let invalidated = client
        .invalidate_cache("user:login=46108")
        .await
        .expect("invalidate");
    assert_eq!(invalidated.key, "user:login=46108");

    assert!(!client.get_user("46108").await.expect("refetch").cached);
    assert_eq!(mock.state.user_get_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_api_key_enforcement() {
    let mock = spawn_mock_upstream().await;
    let mut config = test_config(&mock.base_url);
    config.auth.api_keys = vec!["k1".to_string()];
    let gateway = spawn_gateway(config).await;

    // Wrong key is rejected before the handler runs.
    let anonymous = create_test_client(&gateway, None);
    let err = anonymous.get_user("46108").await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));

    let wrong = create_test_client(&gateway, Some("nope"));
    assert!(matches!(
        wrong.get_user("46108").await.unwrap_err(),
        Error::Unauthorized(_)
    ));

    // Health stays open for monitoring.
    anonymous.health_check().await.expect("health is exempt");

    // The right key goes through.
    let authed = create_test_client(&gateway, Some("k1"));
    assert!(authed.get_user("46108").await.expect("fetch").success);
}

#[tokio::test]
async fn test_auth_rejection_maps_to_bad_gateway() {
    let mock = spawn_mock_upstream().await;
    mock.state.reject_credentials.store(true, Ordering::SeqCst);
    let gateway = spawn_gateway(test_config(&mock.base_url)).await;
    let client = create_test_client(&gateway, None);

    let err = client.get_user("46108").await.unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 502);
            assert!(message.contains("AUTH_REJECTED"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
}
