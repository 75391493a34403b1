//! Client, server and process-wide configuration

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use crate::types::Credentials;
use crate::{PaysheetError, Result};

/// Default processor API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com/v1";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default backend listen address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:4242";

static PUBLISHABLE_KEY: OnceLock<String> = OnceLock::new();

/// Install the process-wide publishable key. Only the first call succeeds.
pub fn init_publishable_key(key: impl Into<String>) -> Result<()> {
    let key = key.into();
    if !key.starts_with("pk_") {
        return Err(PaysheetError::config(
            "publishable key must start with 'pk_'",
        ));
    }

    PUBLISHABLE_KEY
        .set(key)
        .map_err(|_| PaysheetError::config("publishable key already initialized"))
}

/// The publishable key installed at startup, if any
pub fn publishable_key() -> Option<&'static str> {
    PUBLISHABLE_KEY.get().map(String::as_str)
}

/// Configuration for talking to the processor API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the processor API
    pub api_base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// API keys
    pub credentials: Credentials,
}

impl ClientConfig {
    /// Create a new client config with default endpoint and timeout
    pub fn new(credentials: Credentials) -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            credentials,
        }
    }

    /// Point the client at another API base URL
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("PAYSHEET_SECRET_KEY")
            .map_err(|_| PaysheetError::config("PAYSHEET_SECRET_KEY is required"))?;
        let publishable_key = std::env::var("PAYSHEET_PUBLISHABLE_KEY").unwrap_or_default();

        let mut config = Self::new(Credentials::new(publishable_key, secret_key));

        if let Ok(url) = std::env::var("PAYSHEET_API_BASE_URL") {
            config.api_base_url = url;
        }

        if let Ok(timeout) = std::env::var("PAYSHEET_TIMEOUT_SECS") {
            let secs: u64 = timeout.parse().map_err(|e| {
                PaysheetError::config(format!("Invalid PAYSHEET_TIMEOUT_SECS: {}", e))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_base_url(&self.api_base_url)?;

        if self.timeout.is_zero() {
            return Err(PaysheetError::config("timeout must be greater than zero"));
        }

        self.credentials.validate()
    }
}

/// Configuration for the backend server binary
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind_addr: SocketAddr,
    /// Processor client settings
    pub client: ClientConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("PAYSHEET_BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|e| PaysheetError::config(format!("Invalid PAYSHEET_BIND_ADDR: {}", e)))?;

        Ok(Self {
            bind_addr,
            client: ClientConfig::from_env()?,
        })
    }
}

/// Check that a base URL parses and uses http or https
pub(crate) fn validate_base_url(base_url: &str) -> Result<()> {
    let url = url::Url::parse(base_url)
        .map_err(|e| PaysheetError::config(format!("Invalid base URL '{}': {}", base_url, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(PaysheetError::config(format!(
            "base URL must use http or https, got '{}'",
            scheme
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("pk_test_abc", "sk_test_def")
    }

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::new(credentials());
        assert_eq!(config.api_base_url, "https://api.stripe.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::new(credentials())
            .with_api_base_url("http://localhost:12111/v1")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.api_base_url, "http://localhost:12111/v1");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_client_config_rejects_bad_url() {
        let config = ClientConfig::new(credentials()).with_api_base_url("ftp://example.com");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http or https"));

        let config = ClientConfig::new(credentials()).with_api_base_url("not a url");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_config_rejects_zero_timeout() {
        let config = ClientConfig::new(credentials()).with_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_publishable_key_is_set_once() {
        assert!(init_publishable_key("not-a-key").is_err());

        init_publishable_key("pk_test_once").unwrap();
        assert_eq!(publishable_key(), Some("pk_test_once"));

        let err = init_publishable_key("pk_test_twice").unwrap_err();
        assert!(err.to_string().contains("already initialized"));
        assert_eq!(publishable_key(), Some("pk_test_once"));
    }
}
