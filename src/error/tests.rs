//! Unit tests for error types.

use super::*;

#[test]
fn test_auth_error_converts_to_gateway_error() {
    let err: GatewayError = AuthError::ProtocolViolation("no srv_rand".to_string()).into();
    assert!(matches!(err, GatewayError::ProtocolViolation(_)));

    let err: GatewayError = AuthError::Rejected("3 Invalid password".to_string()).into();
    match err {
        GatewayError::AuthRejected(code) => assert_eq!(code, "3 Invalid password"),
        other => panic!("unexpected error: {other:?}"),
    }

    let err: GatewayError = AuthError::Upstream("timeout".to_string()).into();
    assert!(matches!(err, GatewayError::UpstreamUnavailable(_)));
}

#[test]
fn test_status_mapping() {
    let cases = [
        (
            GatewayError::ProtocolViolation("x".into()),
            StatusCode::BAD_GATEWAY,
            "PROTOCOL_VIOLATION",
        ),
        (
            GatewayError::AuthRejected("x".into()),
            StatusCode::BAD_GATEWAY,
            "AUTH_REJECTED",
        ),
        (
            GatewayError::UpstreamUnavailable("x".into()),
            StatusCode::GATEWAY_TIMEOUT,
            "UPSTREAM_UNAVAILABLE",
        ),
        (
            GatewayError::Upstream {
                status: 500,
                message: "x".into(),
            },
            StatusCode::BAD_GATEWAY,
            "UPSTREAM_ERROR",
        ),
        (
            GatewayError::InvalidParameters("x".into()),
            StatusCode::BAD_REQUEST,
            "INVALID_PARAMETERS",
        ),
        (
            GatewayError::InvalidApiKey,
            StatusCode::UNAUTHORIZED,
            "INVALID_API_KEY",
        ),
        (
            GatewayError::Internal("x".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
        ),
    ];

    for (err, status, code) in cases {
        let (s, c) = err.status_and_code();
        assert_eq!(s, status, "status for {err}");
        assert_eq!(c, code, "code for {err}");
    }
}

#[test]
fn test_rate_limit_response_has_headers() {
    let err = GatewayError::RateLimitExceeded {
        limit: 100,
        reset: 1_700_000_000,
        retry_after: 60,
    };

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response.headers().get("X-RateLimit-Limit").unwrap(),
        "100"
    );
    assert_eq!(response.headers().get("Retry-After").unwrap(), "60");
}

#[test]
fn test_error_display_carries_detail() {
    let err = GatewayError::Upstream {
        status: 503,
        message: "maintenance".to_string(),
    };
    assert_eq!(err.to_string(), "upstream error (503): maintenance");

    let err = GatewayError::AuthRejected("13".to_string());
    assert!(err.to_string().contains("13"));
}
