//! Core types for payment-intent creation and confirmation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{PaysheetError, Result};

/// Amount charged by the checkout screen, in minor units ($20.00)
pub const DEFAULT_AMOUNT: u64 = 2000;

/// Supported currency codes
pub mod currencies {
    /// US dollar
    pub const USD: &str = "usd";
    /// Euro
    pub const EUR: &str = "eur";
    /// Pound sterling
    pub const GBP: &str = "gbp";
    /// Japanese yen
    pub const JPY: &str = "jpy";

    /// Currencies whose minor unit equals the major unit
    pub const ZERO_DECIMAL: &[&str] = &[
        "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd",
        "vuv", "xaf", "xof", "xpf",
    ];

    /// Number of fractional digits used by a currency
    pub fn minor_unit_scale(currency: &str) -> u32 {
        if ZERO_DECIMAL.contains(&currency) {
            0
        } else {
            2
        }
    }
}

/// Payment method type filters
pub mod payment_method_types {
    /// Card payments
    pub const CARD: &str = "card";
}

/// A single payment attempt: amount in minor units plus a lowercase ISO 4217 code.
///
/// Deserialization goes through [`PaymentRequest::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPaymentRequest")]
pub struct PaymentRequest {
    amount: u64,
    currency: String,
}

#[derive(Deserialize)]
struct RawPaymentRequest {
    amount: u64,
    currency: String,
}

impl TryFrom<RawPaymentRequest> for PaymentRequest {
    type Error = PaysheetError;

    fn try_from(raw: RawPaymentRequest) -> Result<Self> {
        Self::new(raw.amount, raw.currency)
    }
}

impl PaymentRequest {
    /// Create a validated payment request
    pub fn new(amount: u64, currency: impl AsRef<str>) -> Result<Self> {
        if amount == 0 {
            return Err(PaysheetError::invalid_request(
                "amount must be at least 1 minor unit",
            ));
        }

        let currency = currency.as_ref().trim().to_ascii_lowercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PaysheetError::invalid_request(format!(
                "currency must be a three-letter ISO 4217 code, got '{}'",
                currency
            )));
        }

        Ok(Self { amount, currency })
    }

    /// Create a request in US dollars
    pub fn usd(amount: u64) -> Result<Self> {
        Self::new(amount, currencies::USD)
    }

    /// Amount in minor currency units
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Lowercase currency code
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Human-readable amount, e.g. `$20.00`
    pub fn display_amount(&self) -> String {
        format_amount(self.amount, &self.currency)
    }
}

/// Lifecycle status reported by the processor for a payment intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    /// Any status this version does not know about
    #[serde(other)]
    Unknown,
}

/// Payment intent resource as returned by the processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub amount: u64,
    pub currency: String,
    pub status: PaymentIntentStatus,
    /// Unix timestamp of creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
}

impl PaymentIntent {
    /// Creation time, when the processor reported one
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }

    /// Take the client secret, failing closed when it is absent or empty
    pub fn into_client_secret(self) -> Result<String> {
        match self.client_secret {
            Some(secret) if !secret.is_empty() => Ok(secret),
            _ => Err(PaysheetError::missing_client_secret(self.id)),
        }
    }
}

/// Where a payment attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The payment service could not be reached
    Network,
    /// The service answered but no client secret came back
    Request,
    /// The confirmation surface reported a failure
    Confirmation,
}

impl FailureKind {
    /// Classify an error raised while creating an intent
    pub fn of(error: &PaysheetError) -> Self {
        if error.is_transport() {
            Self::Network
        } else {
            Self::Request
        }
    }
}

/// Outcome of one create-intent call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentIntentResult {
    Success { client_secret: String },
    Failure { kind: FailureKind, reason: String },
}

impl PaymentIntentResult {
    /// A request-level failure
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            kind: FailureKind::Request,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The client secret on success
    pub fn client_secret(&self) -> Option<&str> {
        match self {
            Self::Success { client_secret } => Some(client_secret),
            Self::Failure { .. } => None,
        }
    }
}

impl From<Result<String>> for PaymentIntentResult {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(client_secret) => Self::Success { client_secret },
            Err(error) => Self::Failure {
                kind: FailureKind::of(&error),
                reason: error.to_string(),
            },
        }
    }
}

/// Processor API keys, loaded once at startup
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub publishable_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("publishable_key", &self.publishable_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Create a new credential pair
    pub fn new(publishable_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            publishable_key: publishable_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Check key prefixes
    pub fn validate(&self) -> Result<()> {
        if !self.publishable_key.is_empty() && !self.publishable_key.starts_with("pk_") {
            return Err(PaysheetError::config(
                "publishable key must start with 'pk_'",
            ));
        }

        if self.secret_key.is_empty() {
            return Err(PaysheetError::config("secret key is required"));
        }

        if !self.secret_key.starts_with("sk_") && !self.secret_key.starts_with("rk_") {
            return Err(PaysheetError::config(
                "secret key must start with 'sk_' or 'rk_'",
            ));
        }

        Ok(())
    }

    /// Whether the secret key targets the processor's test mode
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_") || self.secret_key.starts_with("rk_test_")
    }
}

/// Display options handed to the confirmation surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    pub merchant_display_name: String,
    pub allows_delayed_payment_methods: bool,
}

impl ConfirmationConfig {
    /// Create a configuration for the given merchant
    pub fn new(merchant_display_name: impl Into<String>) -> Self {
        Self {
            merchant_display_name: merchant_display_name.into(),
            allows_delayed_payment_methods: false,
        }
    }

    /// Allow payment methods that settle after confirmation
    pub fn with_delayed_payment_methods(mut self, allowed: bool) -> Self {
        self.allows_delayed_payment_methods = allowed;
        self
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self::new("Test Store")
    }
}

/// Result reported by the confirmation surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Completed,
    Canceled,
    Failed { message: String },
}

impl ConfirmationOutcome {
    /// Build a failure outcome from any error
    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self::Failed {
            message: error.to_string(),
        }
    }
}

/// Format a minor-unit amount for display
pub fn format_amount(amount: u64, currency: &str) -> String {
    let currency = currency.to_ascii_lowercase();
    let scale = currencies::minor_unit_scale(&currency);
    let value = Decimal::from_i128_with_scale(i128::from(amount), scale);

    let symbol = match currency.as_str() {
        "usd" => "$",
        "eur" => "€",
        "gbp" => "£",
        "jpy" => "¥",
        _ => return format!("{:.*} {}", scale as usize, value, currency.to_uppercase()),
    };

    format!("{}{:.*}", symbol, scale as usize, value)
}
