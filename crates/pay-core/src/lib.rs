//! # pay-core
//!
//! Core of the stripe-facade payment engine.
//!
//! This crate provides:
//! - `GatewayConfig` for mode, secret key, default currency and log policy
//! - `PaymentGateway` trait for implementing remote payment clients
//! - `GatewayObject` and `GatewayValue`, the self-describing response model
//! - `ObjectFlattener` for turning responses into plain JSON maps
//! - `ErrorClassifier` and `ResultEnvelope`, the uniform result contract
//! - `OperationDispatcher` and `PaymentFacade`, the operation surface
//! - `PaymentError` / `GatewayError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use pay_core::{GatewayConfig, PaymentFacade};
//! use serde_json::json;
//!
//! let config = GatewayConfig::from_env()?;
//! let facade = PaymentFacade::new(config, Arc::new(StripeClient::new(&config)?))?;
//!
//! // Typed call
//! let envelope = facade.retrieve_customer("cus_123").await?;
//!
//! // Or by name
//! let envelope = facade
//!     .execute("createSubscription", json!({"customer_id": "cus_123", "subscription": {"plan": "gold"}}))
//!     .await?;
//!
//! match envelope.into_result() {
//!     Ok(subscription) => println!("{}", subscription["id"]),
//!     Err(detail) => eprintln!("{}: {:?}", detail.kind, detail.message),
//! }
//! ```

pub mod classify;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod facade;
pub mod flatten;
pub mod gateway;
pub mod object;
pub mod operation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exports for convenience
pub use classify::{ErrorClassifier, ErrorDetail, ErrorKind};
pub use config::{GatewayConfig, LogPolicy, Mode};
pub use dispatch::OperationDispatcher;
pub use envelope::ResultEnvelope;
pub use error::{GatewayError, GatewayResult, PaymentError, PaymentResult};
pub use facade::PaymentFacade;
pub use flatten::ObjectFlattener;
pub use gateway::{Action, BoxedPaymentGateway, PaymentGateway};
pub use object::{Collection, GatewayObject, GatewayValue, ObjectKind, Payload};
pub use operation::{Handler, Operation, OperationRegistry};
