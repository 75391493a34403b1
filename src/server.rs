//! Backend server that creates payment intents on behalf of checkout clients
//!
//! The processor secret key stays on this side. Clients call
//! `POST /payment-intents` and only ever receive a client secret.

use crate::client::{ClientSecretResponse, PaymentIntentClient};
use crate::config::{ClientConfig, ServerConfig};
use crate::types::{currencies, PaymentRequest, DEFAULT_AMOUNT};
use crate::{PaysheetError, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state of the backend
#[derive(Debug, Clone)]
pub struct ServerState {
    client: PaymentIntentClient,
    publishable_key: String,
}

impl ServerState {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let publishable_key = config.credentials.publishable_key.clone();
        let client = PaymentIntentClient::new(config)?;

        Ok(Self {
            client,
            publishable_key,
        })
    }
}

/// Body of `POST /payment-intents`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIntentBody {
    #[serde(default = "default_amount")]
    pub amount: u64,
    #[serde(default)]
    pub currency: Option<String>,
}

fn default_amount() -> u64 {
    DEFAULT_AMOUNT
}

/// HTTP status used to report a failed intent creation
pub fn status_for(error: &PaysheetError) -> StatusCode {
    match error {
        PaysheetError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
        PaysheetError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        PaysheetError::Api { .. }
        | PaysheetError::Transport(_)
        | PaysheetError::Decode { .. }
        | PaysheetError::MissingClientSecret { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &PaysheetError) -> Response {
    (status_for(error), Json(json!({ "error": error.to_string() }))).into_response()
}

async fn create_payment_intent(
    State(state): State<ServerState>,
    payload: std::result::Result<Json<CreateIntentBody>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(&PaysheetError::invalid_request(rejection.body_text()));
        }
    };

    let currency = body.currency.as_deref().unwrap_or(currencies::USD);
    let request = match PaymentRequest::new(body.amount, currency) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    match state.client.create_client_secret(&request).await {
        Ok(client_secret) => Json(ClientSecretResponse { client_secret }).into_response(),
        Err(e) => {
            warn!("Failed to create payment intent: {}", e);
            error_response(&e)
        }
    }
}

async fn publishable_config(State(state): State<ServerState>) -> impl IntoResponse {
    Json(json!({ "publishableKey": state.publishable_key }))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "paysheet",
        "version": crate::VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Build the backend router
pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/payment-intents", post(create_payment_intent))
        .route("/config", get(publishable_config))
        .route("/health", get(health))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Run the backend until the listener fails
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let app = create_router(ServerState::new(config.client)?);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| {
            PaysheetError::config(format!("Failed to bind to {}: {}", config.bind_addr, e))
        })?;

    info!("Payment intent backend listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| PaysheetError::config(format!("Server error: {}", e)))?;

    Ok(())
}
