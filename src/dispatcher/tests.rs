//! Unit tests for dispatch-time validation. Network behavior is covered by
//! the integration suite in `crates/gateway-tests`.

use super::*;

fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
        .collect()
}

#[test]
fn test_user_lookup_requires_login() {
    assert!(Dispatcher::validate_params(ResourceKind::User, &params(&[("login", "46108")])).is_ok());

    let err =
        Dispatcher::validate_params(ResourceKind::User, &BTreeMap::new()).unwrap_err();
    assert!(matches!(err, GatewayError::InvalidParameters(_)));
}

#[test]
fn test_position_lookup_accepts_exactly_one_selector() {
    for selector in ["login", "group", "ticket"] {
        assert!(
            Dispatcher::validate_params(ResourceKind::Position, &params(&[(selector, "x")]))
                .is_ok(),
            "selector {selector} alone should be accepted"
        );
    }
}

#[test]
fn test_position_lookup_rejects_multiple_selectors() {
    let err = Dispatcher::validate_params(
        ResourceKind::Position,
        &params(&[("login", "46108"), ("group", "demo*")]),
    )
    .unwrap_err();

    match err {
        GatewayError::InvalidParameters(msg) => {
            assert!(msg.contains("login"));
            assert!(msg.contains("group"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_position_lookup_rejects_no_selector() {
    let err =
        Dispatcher::validate_params(ResourceKind::Position, &BTreeMap::new()).unwrap_err();
    assert!(matches!(err, GatewayError::InvalidParameters(_)));

    // Unrelated params do not count as selectors.
    let err = Dispatcher::validate_params(ResourceKind::Position, &params(&[("symbol", "EURUSD")]))
        .unwrap_err();
    assert!(matches!(err, GatewayError::InvalidParameters(_)));
}

#[test]
fn test_mutation_endpoint_list() {
    assert!(USER_MUTATION_ENDPOINTS.contains(&"user/add"));
    assert!(USER_MUTATION_ENDPOINTS.contains(&"user/update"));
    assert!(!USER_MUTATION_ENDPOINTS.contains(&"user/get"));
}

#[test]
fn test_unwrap_passes_success_through() {
    let resp = UpstreamResponse {
        status: 200,
        body: serde_json::json!({"retcode": "0 Done"}),
    };
    assert!(Dispatcher::unwrap("user/get", resp).is_ok());
}

#[test]
fn test_unwrap_surfaces_upstream_status() {
    let resp = UpstreamResponse {
        status: 500,
        body: serde_json::Value::String("boom".to_string()),
    };
    let err = Dispatcher::unwrap("user/get", resp).unwrap_err();
    match err {
        GatewayError::Upstream { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("user/get"));
            assert!(message.contains("boom"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
