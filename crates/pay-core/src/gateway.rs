//! # Payment Gateway Trait
//!
//! The capability set the dispatcher needs from a remote payment API client.
//! Transport, authentication, timeouts and retries belong to the
//! implementation; the dispatcher only awaits these calls one after another.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   PaymentGateway (trait)                    │
//! │  ├── create() / retrieve() / list()      on a Collection    │
//! │  └── save() / delete() / perform()       on a GatewayObject │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!             ┌──────────────┴──────────────┐
//!     ┌───────┴───────┐             ┌───────┴───────┐
//!     │  StripeClient │             │  test doubles │
//!     │  (pay-stripe) │             │               │
//!     └───────────────┘             └───────────────┘
//! ```

use crate::error::GatewayResult;
use crate::object::{Collection, GatewayObject, Payload};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Instance actions beyond plain save/delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Capture an authorized charge
    Capture,
    /// Refund a charge (fully or by `amount`)
    Refund,
    /// Cancel a subscription
    Cancel,
    /// Remove the discount applied to a customer
    DeleteDiscount,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Capture => "capture",
            Action::Refund => "refund",
            Action::Cancel => "cancel",
            Action::DeleteDiscount => "delete_discount",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource-scoped operations offered by a remote payment gateway.
///
/// Objects returned from `create` and `retrieve` must carry their instance
/// URL so follow-up calls can address them.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a resource in the collection
    async fn create(&self, collection: &Collection, params: &Payload) -> GatewayResult<GatewayObject>;

    /// Fetch one resource of the collection by id
    async fn retrieve(&self, collection: &Collection, id: &str) -> GatewayResult<GatewayObject>;

    /// Persist the keys changed on `object` since retrieval
    async fn save(&self, object: &GatewayObject) -> GatewayResult<GatewayObject>;

    /// Delete the resource
    async fn delete(&self, object: &GatewayObject, params: &Payload) -> GatewayResult<GatewayObject>;

    /// Run an instance action (capture, refund, cancel, ...)
    async fn perform(
        &self,
        object: &GatewayObject,
        action: Action,
        params: &Payload,
    ) -> GatewayResult<GatewayObject>;

    /// Fetch one page of the collection. Returns a `list` object.
    async fn list(&self, collection: &Collection, params: &Payload) -> GatewayResult<GatewayObject>;

    /// Gateway name (for logging)
    fn gateway_name(&self) -> &'static str;
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;
