//! Payment flow controller
//!
//! Drives a single checkout screen through
//! `Idle -> Requesting -> AwaitingConfirmation -> {Succeeded, Canceled, Failed}`.
//! State lives in a [`watch`] cell so a UI can subscribe to it, but it is only
//! ever written through the transitions below.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use crate::client::PaymentIntentService;
use crate::types::{
    ConfirmationConfig, ConfirmationOutcome, FailureKind, PaymentIntentResult, PaymentRequest,
};
use crate::{PaysheetError, Result};

/// Message used when a surface drops its callback without reporting
pub const SURFACE_CLOSED_MESSAGE: &str = "confirmation surface closed without a result";

/// Message used when a `pay()` future is dropped before it finishes
pub const ABANDONED_MESSAGE: &str = "payment attempt abandoned";

/// Status line shown for network failures; transport details stay in the logs
pub const NETWORK_ERROR_MESSAGE: &str = "Could not reach the payment service. Please try again.";

/// UI state of the checkout screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PaymentFlowState {
    #[default]
    Idle,
    Requesting,
    AwaitingConfirmation(String),
    Succeeded,
    Canceled,
    Failed { kind: FailureKind, message: String },
}

impl PaymentFlowState {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    /// Whether the pay action may start a new attempt from this state
    pub fn accepts_pay(&self) -> bool {
        matches!(
            self,
            Self::Idle | Self::Succeeded | Self::Canceled | Self::Failed { .. }
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Canceled | Self::Failed { .. })
    }

    /// Whether an attempt is in flight
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Requesting | Self::AwaitingConfirmation(_))
    }

    pub fn client_secret(&self) -> Option<&str> {
        match self {
            Self::AwaitingConfirmation(secret) => Some(secret),
            _ => None,
        }
    }

    /// The raw failure message, including transport details
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Self::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Status line shown to the user
    pub fn status_message(&self) -> String {
        match self {
            Self::Idle => "Ready to pay".to_string(),
            Self::Requesting => "Creating payment...".to_string(),
            Self::AwaitingConfirmation(_) => "Opening payment sheet...".to_string(),
            Self::Succeeded => "✓ Payment Successful!".to_string(),
            Self::Canceled => "Payment Canceled".to_string(),
            Self::Failed { kind, message } => match kind {
                FailureKind::Network => format!("Error: {}", NETWORK_ERROR_MESSAGE),
                FailureKind::Request => format!("Error: {}", message),
                FailureKind::Confirmation => format!("Failed: {}", message),
            },
        }
    }
}

impl From<ConfirmationOutcome> for PaymentFlowState {
    fn from(outcome: ConfirmationOutcome) -> Self {
        match outcome {
            ConfirmationOutcome::Completed => Self::Succeeded,
            ConfirmationOutcome::Canceled => Self::Canceled,
            ConfirmationOutcome::Failed { message } => {
                Self::failed(FailureKind::Confirmation, message)
            }
        }
    }
}

/// One-shot completion handle given to a confirmation surface.
///
/// Consumed by [`ConfirmationCallback::complete`], so a surface can report at
/// most once. May be moved to and fired from any task.
#[derive(Debug)]
pub struct ConfirmationCallback {
    sender: oneshot::Sender<ConfirmationOutcome>,
}

impl ConfirmationCallback {
    fn new() -> (Self, oneshot::Receiver<ConfirmationOutcome>) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, receiver)
    }

    /// Report the outcome of the confirmation
    pub fn complete(self, outcome: ConfirmationOutcome) {
        if self.sender.send(outcome).is_err() {
            debug!("Confirmation outcome arrived after the flow stopped listening");
        }
    }
}

/// Vendor UI that collects payment details and confirms an intent
pub trait ConfirmationSurface: Send + Sync {
    /// Start confirming `client_secret`. The outcome is reported through `callback`,
    /// possibly long after this returns.
    fn present(
        &self,
        client_secret: &str,
        configuration: &ConfirmationConfig,
        callback: ConfirmationCallback,
    );
}

impl<T: ConfirmationSurface + ?Sized> ConfirmationSurface for Arc<T> {
    fn present(
        &self,
        client_secret: &str,
        configuration: &ConfirmationConfig,
        callback: ConfirmationCallback,
    ) {
        (**self).present(client_secret, configuration, callback)
    }
}

/// Fails an in-flight attempt whose `pay()` future is dropped early
struct AttemptGuard<'a> {
    state: &'a watch::Sender<PaymentFlowState>,
    disposed: &'a watch::Sender<bool>,
    armed: bool,
}

impl<'a> AttemptGuard<'a> {
    fn new(state: &'a watch::Sender<PaymentFlowState>, disposed: &'a watch::Sender<bool>) -> Self {
        Self {
            state,
            disposed,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if !self.armed || *self.disposed.borrow() {
            return;
        }

        let abandoned = self.state.send_if_modified(|state| {
            if state.is_loading() {
                *state = PaymentFlowState::failed(FailureKind::Request, ABANDONED_MESSAGE);
                true
            } else {
                false
            }
        });

        if abandoned {
            warn!("Payment attempt dropped before it finished");
        }
    }
}

/// Owns the flow state of one checkout screen
pub struct PaymentFlowController<S, C> {
    service: S,
    surface: C,
    request: PaymentRequest,
    configuration: ConfirmationConfig,
    state: watch::Sender<PaymentFlowState>,
    disposed: watch::Sender<bool>,
}

impl<S, C> std::fmt::Debug for PaymentFlowController<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentFlowController")
            .field("request", &self.request)
            .field("configuration", &self.configuration)
            .field("state", &*self.state.borrow())
            .field("disposed", &*self.disposed.borrow())
            .finish()
    }
}

impl<S, C> PaymentFlowController<S, C>
where
    S: PaymentIntentService,
    C: ConfirmationSurface,
{
    /// Create a controller that charges `request` on every pay action
    pub fn new(service: S, surface: C, request: PaymentRequest) -> Self {
        let (state, _) = watch::channel(PaymentFlowState::Idle);
        let (disposed, _) = watch::channel(false);

        Self {
            service,
            surface,
            request,
            configuration: ConfirmationConfig::default(),
            state,
            disposed,
        }
    }

    /// Set the display options passed to the surface
    pub fn with_configuration(mut self, configuration: ConfirmationConfig) -> Self {
        self.configuration = configuration;
        self
    }

    /// Snapshot of the current state
    pub fn state(&self) -> PaymentFlowState {
        self.state.borrow().clone()
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<PaymentFlowState> {
        self.state.subscribe()
    }

    pub fn request(&self) -> &PaymentRequest {
        &self.request
    }

    pub fn configuration(&self) -> &ConfirmationConfig {
        &self.configuration
    }

    /// Run one payment attempt to its terminal state.
    ///
    /// Rejected with [`PaysheetError::PaymentInProgress`] unless the current
    /// state accepts a pay action; a rejected call never reaches the service.
    /// Dropping the returned future mid-attempt moves the state to `Failed`
    /// with [`ABANDONED_MESSAGE`], so the screen can pay again.
    pub async fn pay(&self) -> Result<PaymentFlowState> {
        if self.is_disposed() {
            return Err(PaysheetError::Disposed);
        }

        let started = self.state.send_if_modified(|state| {
            if state.accepts_pay() {
                *state = PaymentFlowState::Requesting;
                true
            } else {
                false
            }
        });

        if !started {
            debug!("Ignoring pay action while a payment is in progress");
            return Err(PaysheetError::PaymentInProgress);
        }

        let mut guard = AttemptGuard::new(&self.state, &self.disposed);

        info!(
            "Starting payment of {} {}",
            self.request.amount(),
            self.request.currency()
        );

        let result = self
            .until_disposed(self.service.create_payment_intent(&self.request))
            .await?;

        let client_secret = match result {
            PaymentIntentResult::Success { client_secret } => client_secret,
            PaymentIntentResult::Failure { kind, reason } => {
                guard.disarm();
                return self.transition(PaymentFlowState::failed(kind, reason));
            }
        };

        let (callback, outcome) = ConfirmationCallback::new();
        self.transition(PaymentFlowState::AwaitingConfirmation(client_secret.clone()))?;
        self.surface.present(&client_secret, &self.configuration, callback);

        let outcome = self
            .until_disposed(outcome)
            .await?
            .unwrap_or_else(|_| {
                warn!("Confirmation surface dropped its callback");
                ConfirmationOutcome::failed(SURFACE_CLOSED_MESSAGE)
            });

        guard.disarm();
        self.transition(outcome.into())
    }

    /// Tear the flow down. In-flight attempts stop without touching state.
    pub fn dispose(&self) {
        if !self.disposed.send_replace(true) {
            debug!("Payment flow disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        *self.disposed.borrow()
    }

    fn transition(&self, next: PaymentFlowState) -> Result<PaymentFlowState> {
        if self.is_disposed() {
            return Err(PaysheetError::Disposed);
        }

        debug!("Payment flow -> {:?}", next);
        self.state.send_replace(next.clone());
        Ok(next)
    }

    async fn until_disposed<F: Future>(&self, future: F) -> Result<F::Output> {
        let mut disposed = self.disposed.subscribe();

        tokio::select! {
            biased;
            _ = disposed.wait_for(|disposed| *disposed) => Err(PaysheetError::Disposed),
            output = future => Ok(output),
        }
    }
}
