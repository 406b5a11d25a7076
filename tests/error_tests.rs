//! Error handling module unit tests

use chatprobe::utils::error::helpers::*;
use chatprobe::utils::error::*;
use std::time::Duration;

#[test]
fn test_probe_error_kinds() {
    let test_cases = vec![
        (ProbeError::Config(anyhow::anyhow!("test")), FailureKind::Config),
        (protocol_error("test"), FailureKind::Protocol),
        (assertion_error("test"), FailureKind::Assertion),
        (status_error(502, "bad gateway"), FailureKind::Protocol),
        (ProbeError::Timeout(Duration::from_secs(60)), FailureKind::Timeout),
        (ProbeError::Cancelled, FailureKind::Cancelled),
    ];

    for (error, expected_kind) in test_cases {
        assert_eq!(error.kind(), expected_kind, "{}", error);
    }
}

#[test]
fn test_probe_error_display() {
    assert_eq!(
        status_error(400, "Unsupported model").to_string(),
        "Endpoint returned 400: Unsupported model"
    );
    assert_eq!(protocol_error("response has no choices").to_string(), "Protocol error: response has no choices");
    assert_eq!(assertion_error("reply content is empty").to_string(), "Assertion failed: reply content is empty");
    assert_eq!(ProbeError::Timeout(Duration::from_secs(5)).to_string(), "Timed out after 5s");
    assert_eq!(ProbeError::Cancelled.to_string(), "Cancelled");
}

#[test]
fn test_serialization_error_is_protocol() {
    let err: ProbeError = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err().into();
    assert_eq!(err.kind(), FailureKind::Protocol);
    assert!(err.to_string().starts_with("Serialization error"));
}

#[test]
fn test_should_log_details() {
    assert!(protocol_error("x").should_log_details());
    assert!(status_error(500, "x").should_log_details());
    assert!(!assertion_error("x").should_log_details());
    assert!(!ProbeError::Cancelled.should_log_details());
}

#[test]
fn test_failure_kind_rendering() {
    assert_eq!(FailureKind::Transport.to_string(), "transport");
    assert_eq!(FailureKind::Timeout.to_string(), "timeout");
    assert_eq!(serde_json::to_string(&FailureKind::Assertion).unwrap(), "\"assertion\"");

    let kind: FailureKind = serde_json::from_str("\"cancelled\"").unwrap();
    assert_eq!(kind, FailureKind::Cancelled);
}

#[test]
fn test_protocol_context() {
    let parsed: Result<u32, _> = "abc".parse::<u32>();
    let err = parsed.protocol_context("Invalid token count").unwrap_err();

    assert_eq!(err.kind(), FailureKind::Protocol);
    assert!(err.to_string().contains("Invalid token count"));
}
