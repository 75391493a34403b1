//! Error types for the paysheet library

use thiserror::Error;

/// Result type alias for paysheet operations
pub type Result<T> = std::result::Result<T, PaysheetError>;

/// Main error type for paysheet operations
#[derive(Error, Debug)]
pub enum PaysheetError {
    /// Network, TLS or connection failure while talking to the processor
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout
    #[error("Request timeout")]
    Timeout,

    /// Non-2xx response from the processor; the body is kept verbatim
    #[error("Failed to create payment intent: {body}")]
    Api { status: u16, body: String },

    /// Success response whose body is not a payment intent
    #[error("Invalid payment intent response: {message}")]
    Decode { message: String },

    /// Success response that decoded but carried no client secret
    #[error("Payment intent {intent_id} has no client secret")]
    MissingClientSecret { intent_id: String },

    /// Invalid payment request
    #[error("Invalid payment request: {message}")]
    InvalidRequest { message: String },

    /// A payment attempt is already in flight
    #[error("A payment is already in progress")]
    PaymentInProgress,

    /// The owning screen was torn down
    #[error("Payment flow has been disposed")]
    Disposed,

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PaysheetError {
    /// Create an API error from a response status and body
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a missing client secret error
    pub fn missing_client_secret(intent_id: impl Into<String>) -> Self {
        Self::MissingClientSecret {
            intent_id: intent_id.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Map a reqwest error, splitting out timeouts
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(error)
        }
    }

    /// Whether the failure happened below the HTTP layer
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }
}
