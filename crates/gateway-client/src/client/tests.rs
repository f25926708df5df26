//! Unit tests for client module.

use super::*;

// ============================================================================
// ClientConfig Tests
// ============================================================================

#[test]
fn test_client_config_default() {
    let config = ClientConfig::default();

    assert_eq!(config.base_url, "http://localhost:8000");
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert!(config.api_key.is_none());
}

#[test]
fn test_client_config_custom() {
    let config = ClientConfig {
        base_url: "http://gateway.example.com:9000".to_string(),
        timeout: Duration::from_secs(60),
        api_key: Some("k1".to_string()),
    };

    assert_eq!(config.base_url, "http://gateway.example.com:9000");
    assert_eq!(config.api_key.as_deref(), Some("k1"));
}

// ============================================================================
// GatewayClient Creation Tests
// ============================================================================

#[test]
fn test_gateway_client_new() {
    let client = GatewayClient::new(ClientConfig::default());
    assert!(client.is_ok());
}

#[test]
fn test_gateway_client_with_base_url() {
    let client = GatewayClient::with_base_url("http://localhost:3000");
    assert!(client.is_ok());
}

#[test]
fn test_gateway_client_base_url_trimmed() {
    let client = GatewayClient::with_base_url("http://localhost:8000/").unwrap();
    assert_eq!(client.base_url(), "http://localhost:8000");
}

#[test]
fn test_gateway_client_rejects_invalid_url() {
    let err = GatewayClient::with_base_url("not a url").unwrap_err();
    assert!(matches!(err, Error::InvalidUrl(_)));
}

#[test]
fn test_gateway_client_custom_timeout() {
    let config = ClientConfig {
        base_url: "http://localhost:8000".to_string(),
        timeout: Duration::from_secs(5),
        api_key: None,
    };

    assert!(GatewayClient::new(config).is_ok());
}
