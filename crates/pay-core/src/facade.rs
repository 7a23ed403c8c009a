//! # Payment Facade
//!
//! One method per operation. Each validates its identifiers and payload,
//! shapes the routing payload and hands it to the `OperationDispatcher`.
//!
//! ```rust,ignore
//! let facade = PaymentFacade::new(GatewayConfig::from_env()?, gateway)?;
//!
//! let envelope = facade.retrieve_charge("ch_1").await?;
//! if envelope.is_success() {
//!     let refunds = &envelope.response().unwrap()["refunds"];
//! }
//! ```

use crate::config::GatewayConfig;
use crate::dispatch::OperationDispatcher;
use crate::envelope::ResultEnvelope;
use crate::error::{PaymentError, PaymentResult};
use crate::gateway::BoxedPaymentGateway;
use crate::object::Payload;
use crate::operation::{
    Operation, CARD_ID, CHARGE_ID, COUPON_ID, CUSTOMER_ID, EVENT_ID, FIELDS, PLAN_ID,
    SUBSCRIPTION_ID,
};
use serde_json::Value;

/// Typed entry points over the dispatcher
pub struct PaymentFacade {
    dispatcher: OperationDispatcher,
}

impl PaymentFacade {
    pub fn new(config: GatewayConfig, gateway: BoxedPaymentGateway) -> PaymentResult<Self> {
        Ok(Self::from_dispatcher(OperationDispatcher::new(config, gateway)?))
    }

    pub fn from_dispatcher(dispatcher: OperationDispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &OperationDispatcher {
        &self.dispatcher
    }

    pub fn config(&self) -> &GatewayConfig {
        self.dispatcher.config()
    }

    /// Loosely-typed entry point, by operation name
    pub async fn execute(&self, operation: &str, payload: Value) -> PaymentResult<ResultEnvelope> {
        self.dispatcher.execute(operation, payload).await
    }

    async fn call(&self, operation: Operation, payload: Payload) -> PaymentResult<ResultEnvelope> {
        self.dispatcher.execute_operation(operation, payload).await
    }

    // Charges

    pub async fn charge(&self, params: Payload) -> PaymentResult<ResultEnvelope> {
        require_params(Operation::Charge, "params", &params)?;
        self.call(Operation::Charge, params).await
    }

    pub async fn retrieve_charge(&self, charge_id: &str) -> PaymentResult<ResultEnvelope> {
        let op = Operation::RetrieveCharge;
        let payload = Route::new(op).id(CHARGE_ID, charge_id)?.finish();
        self.call(op, payload).await
    }

    pub async fn update_charge(
        &self,
        charge_id: &str,
        fields: Payload,
    ) -> PaymentResult<ResultEnvelope> {
        let op = Operation::UpdateCharge;
        let payload = Route::new(op).id(CHARGE_ID, charge_id)?.fields(fields)?.finish();
        self.call(op, payload).await
    }

    /// Full refund with empty `params`, or partial with an `amount`
    pub async fn refund_charge(
        &self,
        charge_id: &str,
        params: Payload,
    ) -> PaymentResult<ResultEnvelope> {
        let op = Operation::RefundCharge;
        let payload = Route::new(op).id(CHARGE_ID, charge_id)?.with(params).finish();
        self.call(op, payload).await
    }

    pub async fn capture_charge(
        &self,
        charge_id: &str,
        params: Payload,
    ) -> PaymentResult<ResultEnvelope> {
        let op = Operation::CaptureCharge;
        let payload = Route::new(op).id(CHARGE_ID, charge_id)?.with(params).finish();
        self.call(op, payload).await
    }

    pub async fn list_charges(&self, params: Payload) -> PaymentResult<ResultEnvelope> {
        self.call(Operation::ListCharges, params).await
    }

    // Customers

    /// A customer may be created without any parameters
    pub async fn create_customer(&self, params: Payload) -> PaymentResult<ResultEnvelope> {
        self.call(Operation::CreateCustomer, params).await
    }

    pub async fn retrieve_customer(&self, customer_id: &str) -> PaymentResult<ResultEnvelope> {
        let op = Operation::RetrieveCustomer;
        let payload = Route::new(op).id(CUSTOMER_ID, customer_id)?.finish();
        self.call(op, payload).await
    }

    pub async fn update_customer(
        &self,
        customer_id: &str,
        fields: Payload,
    ) -> PaymentResult<ResultEnvelope> {
        let op = Operation::UpdateCustomer;
        let payload = Route::new(op)
            .id(CUSTOMER_ID, customer_id)?
            .fields(fields)?
            .finish();
        self.call(op, payload).await
    }

    pub async fn delete_customer(&self, customer_id: &str) -> PaymentResult<ResultEnvelope> {
        let op = Operation::DeleteCustomer;
        let payload = Route::new(op).id(CUSTOMER_ID, customer_id)?.finish();
        self.call(op, payload).await
    }

    pub async fn list_customers(&self, params: Payload) -> PaymentResult<ResultEnvelope> {
        self.call(Operation::ListCustomers, params).await
    }

    pub async fn delete_customer_discount(
        &self,
        customer_id: &str,
    ) -> PaymentResult<ResultEnvelope> {
        let op = Operation::DeleteCustomerDiscount;
        let payload = Route::new(op).id(CUSTOMER_ID, customer_id)?.finish();
        self.call(op, payload).await
    }

    // Cards

    /// `card` is a token (`tok_...`) or a map of card details
    pub async fn create_card(
        &self,
        customer_id: &str,
        card: impl Into<Value>,
    ) -> PaymentResult<ResultEnvelope> {
        let op = Operation::CreateCard;
        let card = card.into();
        let empty = match &card {
            Value::String(token) => token.trim().is_empty(),
            Value::Object(details) => details.is_empty(),
            _ => true,
        };
        if empty {
            return Err(invalid(op, "card"));
        }
        let mut payload = Route::new(op).id(CUSTOMER_ID, customer_id)?.finish();
        payload.insert("card".to_string(), card);
        self.call(op, payload).await
    }

    pub async fn retrieve_card(
        &self,
        customer_id: &str,
        card_id: &str,
    ) -> PaymentResult<ResultEnvelope> {
        let op = Operation::RetrieveCard;
        let payload = Route::new(op)
            .id(CUSTOMER_ID, customer_id)?
            .id(CARD_ID, card_id)?
            .finish();
        self.call(op, payload).await
    }

    pub async fn update_card(
        &self,
        customer_id: &str,
        card_id: &str,
        fields: Payload,
    ) -> PaymentResult<ResultEnvelope> {
        let op = Operation::UpdateCard;
        let payload = Route::new(op)
            .id(CUSTOMER_ID, customer_id)?
            .id(CARD_ID, card_id)?
            .fields(fields)?
            .finish();
        self.call(op, payload).await
    }

    pub async fn delete_card(
        &self,
        customer_id: &str,
        card_id: &str,
    ) -> PaymentResult<ResultEnvelope> {
        let op = Operation::DeleteCard;
        let payload = Route::new(op)
            .id(CUSTOMER_ID, customer_id)?
            .id(CARD_ID, card_id)?
            .finish();
        self.call(op, payload).await
    }

    pub async fn list_cards(
        &self,
        customer_id: &str,
        params: Payload,
    ) -> PaymentResult<ResultEnvelope> {
        let op = Operation::ListCards;
        let payload = Route::new(op).id(CUSTOMER_ID, customer_id)?.with(params).finish();
        self.call(op, payload).await
    }

    // Subscriptions

    /// `subscription` holds the create parameters, e.g. `{"plan": "gold"}`
    pub async fn create_subscription(
        &self,
        customer_id: &str,
        subscription: Payload,
    ) -> PaymentResult<ResultEnvelope> {
        let op = Operation::CreateSubscription;
        require_params(op, "subscription", &subscription)?;
        let mut payload = Route::new(op).id(CUSTOMER_ID, customer_id)?.finish();
        payload.insert("subscription".to_string(), Value::Object(subscription));
        self.call(op, payload).await
    }

    pub async fn retrieve_subscription(
        &self,
        customer_id: &str,
        subscription_id: &str,
    ) -> PaymentResult<ResultEnvelope> {
        let op = Operation::RetrieveSubscription;
        let payload = Route::new(op)
            .id(CUSTOMER_ID, customer_id)?
            .id(SUBSCRIPTION_ID, subscription_id)?
            .finish();
        self.call(op, payload).await
    }

    pub async fn update_subscription(
        &self,
        customer_id: &str,
        subscription_id: &str,
        fields: Payload,
    ) -> PaymentResult<ResultEnvelope> {
        let op = Operation::UpdateSubscription;
        let payload = Route::new(op)
            .id(CUSTOMER_ID, customer_id)?
            .id(SUBSCRIPTION_ID, subscription_id)?
            .fields(fields)?
            .finish();
        self.call(op, payload).await
    }

    /// `params` may carry `at_period_end`
    pub async fn cancel_subscription(
        &self,
        customer_id: &str,
        subscription_id: &str,
        params: Payload,
    ) -> PaymentResult<ResultEnvelope> {
        let op = Operation::CancelSubscription;
        let payload = Route::new(op)
            .id(CUSTOMER_ID, customer_id)?
            .id(SUBSCRIPTION_ID, subscription_id)?
            .with(params)
            .finish();
        self.call(op, payload).await
    }

    pub async fn list_subscriptions(
        &self,
        customer_id: &str,
        params: Payload,
    ) -> PaymentResult<ResultEnvelope> {
        let op = Operation::ListSubscriptions;
        let payload = Route::new(op).id(CUSTOMER_ID, customer_id)?.with(params).finish();
        self.call(op, payload).await
    }

    // Plans

    pub async fn create_plan(&self, params: Payload) -> PaymentResult<ResultEnvelope> {
        require_params(Operation::CreatePlan, "params", &params)?;
        self.call(Operation::CreatePlan, params).await
    }

    pub async fn retrieve_plan(&self, plan_id: &str) -> PaymentResult<ResultEnvelope> {
        let op = Operation::RetrievePlan;
        let payload = Route::new(op).id(PLAN_ID, plan_id)?.finish();
        self.call(op, payload).await
    }

    pub async fn update_plan(&self, plan_id: &str, fields: Payload) -> PaymentResult<ResultEnvelope> {
        let op = Operation::UpdatePlan;
        let payload = Route::new(op).id(PLAN_ID, plan_id)?.fields(fields)?.finish();
        self.call(op, payload).await
    }

    pub async fn delete_plan(&self, plan_id: &str) -> PaymentResult<ResultEnvelope> {
        let op = Operation::DeletePlan;
        let payload = Route::new(op).id(PLAN_ID, plan_id)?.finish();
        self.call(op, payload).await
    }

    pub async fn list_plans(&self, params: Payload) -> PaymentResult<ResultEnvelope> {
        self.call(Operation::ListPlans, params).await
    }

    // Coupons

    pub async fn create_coupon(&self, params: Payload) -> PaymentResult<ResultEnvelope> {
        require_params(Operation::CreateCoupon, "params", &params)?;
        self.call(Operation::CreateCoupon, params).await
    }

    pub async fn retrieve_coupon(&self, coupon_id: &str) -> PaymentResult<ResultEnvelope> {
        let op = Operation::RetrieveCoupon;
        let payload = Route::new(op).id(COUPON_ID, coupon_id)?.finish();
        self.call(op, payload).await
    }

    pub async fn delete_coupon(&self, coupon_id: &str) -> PaymentResult<ResultEnvelope> {
        let op = Operation::DeleteCoupon;
        let payload = Route::new(op).id(COUPON_ID, coupon_id)?.finish();
        self.call(op, payload).await
    }

    pub async fn list_coupons(&self, params: Payload) -> PaymentResult<ResultEnvelope> {
        self.call(Operation::ListCoupons, params).await
    }

    // Events

    pub async fn retrieve_event(&self, event_id: &str) -> PaymentResult<ResultEnvelope> {
        let op = Operation::RetrieveEvent;
        let payload = Route::new(op).id(EVENT_ID, event_id)?.finish();
        self.call(op, payload).await
    }

    pub async fn list_events(&self, params: Payload) -> PaymentResult<ResultEnvelope> {
        self.call(Operation::ListEvents, params).await
    }
}

/// Builds a routing payload, rejecting empty identifiers
struct Route {
    operation: Operation,
    payload: Payload,
}

impl Route {
    fn new(operation: Operation) -> Self {
        Self {
            operation,
            payload: Payload::new(),
        }
    }

    fn id(mut self, key: &'static str, value: &str) -> PaymentResult<Self> {
        if value.trim().is_empty() {
            return Err(invalid(self.operation, key));
        }
        self.payload
            .insert(key.to_string(), Value::String(value.to_string()));
        Ok(self)
    }

    fn fields(mut self, fields: Payload) -> PaymentResult<Self> {
        require_params(self.operation, FIELDS, &fields)?;
        self.payload.insert(FIELDS.to_string(), Value::Object(fields));
        Ok(self)
    }

    /// Merge auxiliary parameters. Routing keys already set take precedence.
    fn with(mut self, params: Payload) -> Self {
        for (key, value) in params {
            self.payload.entry(key).or_insert(value);
        }
        self
    }

    fn finish(self) -> Payload {
        self.payload
    }
}

fn require_params(operation: Operation, name: &str, params: &Payload) -> PaymentResult<()> {
    if params.is_empty() {
        return Err(invalid(operation, name));
    }
    Ok(())
}

fn invalid(operation: Operation, name: &str) -> PaymentError {
    PaymentError::InvalidRequest(format!("{}: {} must not be empty", operation, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::object::{Collection, GatewayObject, ObjectKind};
    use crate::testing::MockGateway;
    use serde_json::json;
    use std::sync::Arc;

    fn facade() -> (PaymentFacade, Arc<MockGateway>) {
        let gateway = Arc::new(MockGateway::new());
        let facade =
            PaymentFacade::new(GatewayConfig::new(Mode::Test, "sk_test_facade1234"), gateway.clone())
                .unwrap();
        (facade, gateway)
    }

    fn params(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn test_charge_requires_params() {
        let (facade, gateway) = facade();
        let err = facade.charge(Payload::new()).await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidRequest(_)));
        assert!(gateway.calls().is_empty());

        let envelope = facade
            .charge(params(json!({"amount": 500, "source": "tok_visa"})))
            .await
            .unwrap();
        assert!(envelope.is_success());
        assert_eq!(envelope.response().unwrap()["currency"], json!("usd"));
    }

    #[tokio::test]
    async fn test_empty_identifiers_rejected() {
        let (facade, gateway) = facade();

        assert!(facade.retrieve_charge("").await.is_err());
        assert!(facade.retrieve_card("cus_1", "  ").await.is_err());
        assert!(facade.delete_customer_discount("").await.is_err());
        assert!(facade
            .update_plan("gold", Payload::new())
            .await
            .is_err());
        assert!(facade.create_card("cus_1", "").await.is_err());
        assert!(facade.create_subscription("cus_1", Payload::new()).await.is_err());
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_card_routes_through_customer() {
        let (facade, gateway) = facade();
        gateway.insert(
            &Collection::top_level(ObjectKind::Customer),
            GatewayObject::with_id(ObjectKind::Customer, "cus_1"),
        );
        gateway.insert(
            &Collection {
                kind: ObjectKind::Card,
                url: "/v1/customers/cus_1/sources".into(),
            },
            GatewayObject::with_id(ObjectKind::Card, "card_1"),
        );

        let envelope = facade
            .update_card("cus_1", "card_1", params(json!({"exp_year": 2030})))
            .await
            .unwrap();

        assert_eq!(envelope.response().unwrap()["exp_year"], json!(2030));
        let calls = gateway.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].method, "save");
        assert_eq!(calls[2].url, "/v1/customers/cus_1/sources/card_1");
    }

    #[tokio::test]
    async fn test_routing_keys_win_over_params() {
        let (facade, gateway) = facade();
        gateway.insert(
            &Collection::top_level(ObjectKind::Customer),
            GatewayObject::with_id(ObjectKind::Customer, "cus_1"),
        );

        facade
            .list_cards("cus_1", params(json!({"customer_id": "cus_other", "limit": 5})))
            .await
            .unwrap();

        let calls = gateway.calls();
        assert_eq!(calls[0].url, "/v1/customers/cus_1");
        assert_eq!(Value::Object(calls[1].params.clone()), json!({"limit": 5}));
    }

    #[tokio::test]
    async fn test_create_subscription_wraps_body() {
        let (facade, gateway) = facade();
        gateway.insert(
            &Collection::top_level(ObjectKind::Customer),
            GatewayObject::with_id(ObjectKind::Customer, "cus_1"),
        );

        let envelope = facade
            .create_subscription("cus_1", params(json!({"plan": "gold"})))
            .await
            .unwrap();

        assert_eq!(envelope.response().unwrap()["plan"], json!("gold"));
        assert_eq!(
            Value::Object(gateway.calls()[1].params.clone()),
            json!({"plan": "gold"})
        );
    }

    #[tokio::test]
    async fn test_execute_by_name() {
        let (facade, _gateway) = facade();
        let envelope = facade.execute("listEvents", json!({})).await.unwrap();
        assert_eq!(envelope.response(), Some(&json!([])));
        assert_eq!(facade.config().mode, Mode::Test);
    }
}
