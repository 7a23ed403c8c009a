//! # pay-stripe
//!
//! Stripe implementation of the `PaymentGateway` trait for stripe-facade.
//!
//! - **StripeClient** - REST client over `/v1` resources
//!   - Bearer auth with the secret key of the configured mode
//!   - Bracketed form encoding for nested parameters
//!   - Idempotency keys on every create
//!   - Typed error mapping from Stripe error bodies
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pay_core::{GatewayConfig, PaymentFacade};
//! use pay_stripe::StripeClient;
//! use std::sync::Arc;
//!
//! let config = GatewayConfig::from_env()?;
//! let client = StripeClient::new(config.clone())?;
//! let facade = PaymentFacade::new(config, Arc::new(client))?;
//!
//! let envelope = facade.list_plans(Default::default()).await?;
//! ```

pub mod client;
pub mod errors;
pub mod form;

// Re-exports
pub use client::StripeClient;
pub use form::form_params;
