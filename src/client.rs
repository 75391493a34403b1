//! HTTP clients that create payment intents

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{validate_base_url, ClientConfig, DEFAULT_TIMEOUT};
use crate::types::*;
use crate::{PaysheetError, Result};

/// Anything that can turn a payment request into a client secret.
///
/// Implementations never fail with an error: every failure is folded into
/// [`PaymentIntentResult::Failure`] at this boundary.
#[async_trait]
pub trait PaymentIntentService: Send + Sync {
    async fn create_payment_intent(&self, request: &PaymentRequest) -> PaymentIntentResult;
}

#[async_trait]
impl<T: PaymentIntentService + ?Sized> PaymentIntentService for Arc<T> {
    async fn create_payment_intent(&self, request: &PaymentRequest) -> PaymentIntentResult {
        (**self).create_payment_intent(request).await
    }
}

/// Form-encode a create-intent request body
pub fn encode_form(request: &PaymentRequest) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("amount", &request.amount().to_string())
        .append_pair("currency", request.currency())
        .append_pair("payment_method_types[]", payment_method_types::CARD)
        .finish()
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

async fn read_body(response: Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await.map_err(PaysheetError::from_transport)?;

    if !status.is_success() {
        return Err(PaysheetError::api(status.as_u16(), body));
    }

    Ok(body)
}

/// Client for the processor's payment intent API, authenticated with the secret key
#[derive(Clone)]
pub struct PaymentIntentClient {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl std::fmt::Debug for PaymentIntentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentIntentClient")
            .field("base_url", &self.base_url)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl PaymentIntentClient {
    /// Create a new client from a validated configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaysheetError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url,
            secret_key: config.credentials.secret_key,
        })
    }

    /// Base URL of the processor API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a payment intent and return the decoded resource.
    ///
    /// One attempt only. Each call sends its own idempotency key.
    pub async fn try_create_payment_intent(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentIntent> {
        let url = endpoint(&self.base_url, "payment_intents");
        let idempotency_key = Uuid::new_v4().to_string();

        debug!("POST {} (idempotency key {})", url, idempotency_key);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("Idempotency-Key", idempotency_key)
            .body(encode_form(request))
            .send()
            .await
            .map_err(PaysheetError::from_transport)?;

        let body = read_body(response).await?;

        serde_json::from_str(&body).map_err(|e| PaysheetError::decode(e.to_string()))
    }

    /// Create a payment intent and extract its client secret
    pub async fn create_client_secret(&self, request: &PaymentRequest) -> Result<String> {
        let intent = self.try_create_payment_intent(request).await?;
        info!(
            "Created payment intent {} ({} {}, status {:?})",
            intent.id, intent.amount, intent.currency, intent.status
        );
        intent.into_client_secret()
    }
}

#[async_trait]
impl PaymentIntentService for PaymentIntentClient {
    async fn create_payment_intent(&self, request: &PaymentRequest) -> PaymentIntentResult {
        let result = self.create_client_secret(request).await;
        if let Err(e) = &result {
            warn!("Failed to create payment intent: {}", e);
        }
        result.into()
    }
}

/// Response body of the backend's create-intent endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSecretResponse {
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

/// Client for a trusted merchant backend that creates intents on our behalf.
///
/// Holds no processor credentials; it only ever sees the client secret.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new backend client with the default timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a new backend client with a custom timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        validate_base_url(&base_url)?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaysheetError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Base URL of the backend
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the backend for a client secret
    pub async fn request_client_secret(&self, request: &PaymentRequest) -> Result<String> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "payment-intents"))
            .json(request)
            .send()
            .await
            .map_err(PaysheetError::from_transport)?;

        let body = read_body(response).await?;

        let decoded: ClientSecretResponse =
            serde_json::from_str(&body).map_err(|e| PaysheetError::decode(e.to_string()))?;

        if decoded.client_secret.is_empty() {
            return Err(PaysheetError::decode("empty client secret"));
        }

        Ok(decoded.client_secret)
    }
}

#[async_trait]
impl PaymentIntentService for BackendClient {
    async fn create_payment_intent(&self, request: &PaymentRequest) -> PaymentIntentResult {
        let result = self.request_client_secret(request).await;
        if let Err(e) = &result {
            warn!("Backend failed to provide a client secret: {}", e);
        }
        result.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_form_matches_processor_format() {
        let request = PaymentRequest::usd(2000).unwrap();
        assert_eq!(
            encode_form(&request),
            "amount=2000&currency=usd&payment_method_types%5B%5D=card"
        );
    }

    #[test]
    fn test_encode_form_keeps_amount_exact() {
        for amount in [1u64, 99, 100, 1_999_999, u64::MAX] {
            let request = PaymentRequest::new(amount, "eur").unwrap();
            let body = encode_form(&request);
            assert!(
                body.starts_with(&format!("amount={}&", amount)),
                "Body MUST carry the exact amount {} - actual: {}",
                amount,
                body
            );
        }
    }

    #[test]
    fn test_endpoint_joins_paths() {
        assert_eq!(
            endpoint("https://api.stripe.com/v1/", "payment_intents"),
            "https://api.stripe.com/v1/payment_intents"
        );
        assert_eq!(
            endpoint("http://localhost:4242", "payment-intents"),
            "http://localhost:4242/payment-intents"
        );
    }

    #[test]
    fn test_client_debug_redacts_secret() {
        let config = ClientConfig::new(Credentials::new("pk_test_a", "sk_test_secret"));
        let client = PaymentIntentClient::new(config).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("sk_test_secret"));
        assert_eq!(client.base_url(), "https://api.stripe.com/v1");
    }

    #[test]
    fn test_client_rejects_invalid_config() {
        let config = ClientConfig::new(Credentials::new("pk_test_a", ""));
        assert!(PaymentIntentClient::new(config).is_err());
    }

    #[test]
    fn test_backend_client_rejects_bad_url() {
        assert!(BackendClient::new("localhost:4242").is_err());
        assert!(BackendClient::new("http://localhost:4242").is_ok());
    }
}
