//! Error handling tests for paysheet

use paysheet::{
    ConfirmationOutcome, FailureKind, PaymentFlowState, PaymentIntentResult, PaymentRequest,
    PaysheetError,
};

#[test]
fn test_api_error_keeps_body() {
    let error = PaysheetError::api(400, r#"{"error":{"code":"parameter_missing"}}"#);

    let error_msg = error.to_string();
    assert!(
        error_msg.contains("Failed to create payment intent"),
        "Error message MUST contain 'Failed to create payment intent' - actual: {}",
        error_msg
    );
    assert!(
        error_msg.contains(r#"{"error":{"code":"parameter_missing"}}"#),
        "Error message MUST contain the raw response body - actual: {}",
        error_msg
    );
}

#[test]
fn test_decode_error() {
    let error = PaysheetError::decode("expected value at line 1 column 1");

    let error_msg = error.to_string();
    assert!(
        error_msg.contains("Invalid payment intent response"),
        "Error message MUST contain 'Invalid payment intent response' - actual: {}",
        error_msg
    );
    assert!(!error.is_transport());
}

#[test]
fn test_missing_client_secret_error() {
    let error = PaysheetError::missing_client_secret("pi_123");

    let error_msg = error.to_string();
    assert!(
        error_msg.contains("pi_123") && error_msg.contains("no client secret"),
        "Error message MUST name the intent and the missing secret - actual: {}",
        error_msg
    );
}

#[test]
fn test_timeout_error() {
    let error = PaysheetError::Timeout;

    let error_msg = error.to_string();
    assert!(
        error_msg.contains("timeout"),
        "Error message MUST contain 'timeout' - actual: {}",
        error_msg
    );
    assert!(error.is_transport());
}

#[test]
fn test_confirmation_failure_status_line() {
    let state = PaymentFlowState::from(ConfirmationOutcome::failed("Your card was declined."));

    let status = state.status_message();
    assert_eq!(
        status, "Failed: Your card was declined.",
        "Status line MUST contain the surface's message - actual: {}",
        status
    );
}

#[test]
fn test_flow_guard_errors() {
    assert_eq!(
        PaysheetError::PaymentInProgress.to_string(),
        "A payment is already in progress"
    );
    assert_eq!(
        PaysheetError::Disposed.to_string(),
        "Payment flow has been disposed"
    );
}

#[test]
fn test_invalid_request_payload_is_rejected() {
    let error = serde_json::from_str::<PaymentRequest>(r#"{"amount":0,"currency":"usd"}"#)
        .unwrap_err();

    let error_msg = error.to_string();
    assert!(
        error_msg.contains("Invalid payment request"),
        "Error message MUST contain 'Invalid payment request' - actual: {}",
        error_msg
    );
}

#[test]
fn test_errors_fold_into_failure_result() {
    let errors = vec![
        PaysheetError::api(500, "internal"),
        PaysheetError::decode("bad body"),
        PaysheetError::missing_client_secret("pi_1"),
        PaysheetError::Timeout,
        PaysheetError::config("missing key"),
    ];

    for error in errors {
        let expected = PaymentIntentResult::Failure {
            kind: FailureKind::of(&error),
            reason: error.to_string(),
        };
        let result: PaymentIntentResult = Err(error).into();
        assert_eq!(result, expected);
    }
}

#[test]
fn test_failed_state_status_line() {
    let error = PaysheetError::api(402, "card_declined");
    let state = PaymentFlowState::failed(FailureKind::of(&error), error.to_string());

    let status = state.status_message();
    assert!(
        status.starts_with("Error: ") && status.contains("card_declined"),
        "Status line MUST report the failure - actual: {}",
        status
    );
}

#[test]
fn test_transport_failure_status_line_is_generic() {
    let error = PaysheetError::Timeout;
    let state = PaymentFlowState::failed(FailureKind::of(&error), error.to_string());

    let status = state.status_message();
    assert!(
        status.starts_with("Error: ") && !status.contains("Request timeout"),
        "Status line MUST hide transport details - actual: {}",
        status
    );
    assert_eq!(state.failure_message(), Some("Request timeout"));
}

#[test]
fn test_error_debug_format() {
    let error = PaysheetError::InvalidRequest {
        message: "Test error".to_string(),
    };

    let debug_str = format!("{:?}", error);
    assert!(
        debug_str.contains("InvalidRequest"),
        "Debug format MUST contain variant name 'InvalidRequest' - actual: {}",
        debug_str
    );
    assert!(
        debug_str.contains("Test error"),
        "Debug format MUST contain error message 'Test error' - actual: {}",
        debug_str
    );
}
