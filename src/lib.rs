//! # paysheet - card checkout flow
//!
//! Creates a payment intent with the processor, hands its client secret to a
//! vendor confirmation surface and reconciles the outcome into screen state.
//!
//! - [`client`]: create-intent clients, either directly against the processor
//!   or through a trusted backend
//! - [`flow`]: the checkout state machine
//! - [`server`]: the trusted backend that holds the secret key

pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod types;

#[cfg(feature = "axum")]
pub mod server;

// Re-exports for convenience
pub use client::{BackendClient, PaymentIntentClient, PaymentIntentService};
pub use error::{PaysheetError, Result};
pub use flow::{
    ConfirmationCallback, ConfirmationSurface, PaymentFlowController, PaymentFlowState,
};
pub use types::*;

/// Current version of the paysheet library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_checkout_amount() {
        let request = PaymentRequest::usd(DEFAULT_AMOUNT).unwrap();
        assert_eq!(request.amount(), 2000);
        assert_eq!(request.display_amount(), "$20.00");
    }

    #[test]
    fn test_constants() {
        assert_eq!(currencies::USD, "usd");
        assert_eq!(payment_method_types::CARD, "card");
        assert_eq!(currencies::minor_unit_scale("jpy"), 0);
        assert_eq!(currencies::minor_unit_scale("usd"), 2);
    }
}
