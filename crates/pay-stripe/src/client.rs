//! # Stripe REST Client
//!
//! `PaymentGateway` over the Stripe v1 REST API. Requests are form-encoded,
//! responses are decoded as self-describing objects.

use crate::errors;
use crate::form::form_params;
use async_trait::async_trait;
use pay_core::{
    Action, Collection, GatewayConfig, GatewayError, GatewayObject, GatewayResult, PaymentError,
    PaymentGateway, PaymentResult, Payload,
};
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// Stripe API client
///
/// Holds the secret key of the configured mode and a pooled HTTP client.
/// Cheap to share behind an `Arc`.
pub struct StripeClient {
    config: GatewayConfig,
    client: Client,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(config: GatewayConfig) -> PaymentResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(GatewayConfig::from_env()?)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    /// Send one request and decode the returned object.
    ///
    /// GET and DELETE carry `params` in the query string, POST in the body.
    async fn request(
        &self,
        method: Method,
        path: &str,
        params: &Payload,
        idempotent: bool,
    ) -> GatewayResult<GatewayObject> {
        let url = self.url(path);
        let pairs = form_params(params);

        debug!(%method, path, params = pairs.len(), "Stripe request");

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .header("Authorization", self.config.auth_header());

        if let Some(version) = &self.config.api_version {
            builder = builder.header("Stripe-Version", version);
        }
        if idempotent {
            builder = builder.header("Idempotency-Key", Uuid::new_v4().to_string());
        }
        builder = if method == Method::POST {
            builder.form(&pairs)
        } else {
            builder.query(&pairs)
        };

        let response = builder.send().await.map_err(errors::from_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(errors::from_transport)?;

        if !status.is_success() {
            error!(status = status.as_u16(), path, "Stripe API error");
            return Err(errors::from_response(status.as_u16(), &body));
        }

        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| GatewayError::Api {
                message: format!("Failed to parse Stripe response: {}", e),
                http_status: Some(status.as_u16()),
            })?;

        GatewayObject::from_json(value)
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    #[instrument(skip(self, collection, params), fields(url = %collection.url))]
    async fn create(&self, collection: &Collection, params: &Payload) -> GatewayResult<GatewayObject> {
        let created = self
            .request(Method::POST, &collection.url, params, true)
            .await?;

        // Created members stay addressable through the collection they came from
        match created.id().map(|id| collection.instance_url(id)) {
            Some(url) => Ok(created.with_url(url)),
            None => Ok(created),
        }
    }

    #[instrument(skip(self, collection), fields(url = %collection.url))]
    async fn retrieve(&self, collection: &Collection, id: &str) -> GatewayResult<GatewayObject> {
        let url = collection.instance_url(id);
        let object = self.request(Method::GET, &url, &Payload::new(), false).await?;
        Ok(object.with_url(url))
    }

    #[instrument(skip(self, object), fields(kind = %object.kind()))]
    async fn save(&self, object: &GatewayObject) -> GatewayResult<GatewayObject> {
        let url = object.instance_url()?;
        let saved = self
            .request(Method::POST, &url, &object.unsaved_params(), false)
            .await?;
        Ok(saved.with_url(url))
    }

    #[instrument(skip(self, object, params), fields(kind = %object.kind()))]
    async fn delete(&self, object: &GatewayObject, params: &Payload) -> GatewayResult<GatewayObject> {
        let url = object.instance_url()?;
        self.request(Method::DELETE, &url, params, false).await
    }

    #[instrument(skip(self, object, params), fields(kind = %object.kind(), action = %action))]
    async fn perform(
        &self,
        object: &GatewayObject,
        action: Action,
        params: &Payload,
    ) -> GatewayResult<GatewayObject> {
        let url = object.instance_url()?;
        match action {
            Action::Capture => {
                self.request(Method::POST, &format!("{}/capture", url), params, false)
                    .await
            }
            Action::Refund => {
                self.request(Method::POST, &format!("{}/refund", url), params, false)
                    .await
            }
            // Deleting a subscription cancels it
            Action::Cancel => self.request(Method::DELETE, &url, params, false).await,
            Action::DeleteDiscount => {
                self.request(Method::DELETE, &format!("{}/discount", url), params, false)
                    .await
            }
        }
    }

    #[instrument(skip(self, collection, params), fields(url = %collection.url))]
    async fn list(&self, collection: &Collection, params: &Payload) -> GatewayResult<GatewayObject> {
        self.request(Method::GET, &collection.url, params, false).await
    }

    fn gateway_name(&self) -> &'static str {
        "stripe"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pay_core::{Mode, ObjectKind};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> StripeClient {
        let config = GatewayConfig::new(Mode::Test, "sk_test_client1234").with_api_base_url(server.uri());
        StripeClient::new(config).unwrap()
    }

    fn params(value: serde_json::Value) -> Payload {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_create_posts_form_with_idempotency_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/charges"))
            .and(header("Authorization", "Bearer sk_test_client1234"))
            .and(header_exists("Idempotency-Key"))
            .and(body_string_contains("amount=500"))
            .and(body_string_contains("metadata%5Border_id%5D=ord_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "ch_1", "object": "charge", "amount": 500
            })))
            .expect(1)
            .mount(&server)
            .await;

        let charge = client(&server)
            .create(
                &Collection::top_level(ObjectKind::Charge),
                &params(json!({"amount": 500, "metadata": {"order_id": "ord_1"}})),
            )
            .await
            .unwrap();

        assert_eq!(charge.kind(), &ObjectKind::Charge);
        assert_eq!(charge.url(), Some("/v1/charges/ch_1"));
    }

    #[tokio::test]
    async fn test_retrieve_decodes_nested_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/customers/cus_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cus_1",
                "object": "customer",
                "sources": {"object": "list", "url": "/v1/customers/cus_1/sources", "data": []}
            })))
            .mount(&server)
            .await;

        let customer = client(&server)
            .retrieve(&Collection::top_level(ObjectKind::Customer), "cus_1")
            .await
            .unwrap();

        let sources = customer
            .nested_collection("sources", ObjectKind::Card)
            .unwrap();
        assert_eq!(sources.url, "/v1/customers/cus_1/sources");
        assert_eq!(customer.url(), Some("/v1/customers/cus_1"));
    }

    #[tokio::test]
    async fn test_save_sends_only_changed_keys() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/customers/cus_1"))
            .and(body_string_contains("email=new%40example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cus_1", "object": "customer", "email": "new@example.com"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut customer = GatewayObject::with_id(ObjectKind::Customer, "cus_1")
            .with("description", "unchanged");
        customer.set("email", "new@example.com");

        let saved = client(&server).save(&customer).await.unwrap();
        assert_eq!(saved.get("email").and_then(|v| v.as_str()), Some("new@example.com"));
    }

    #[tokio::test]
    async fn test_list_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/plans"))
            .and(query_param("limit", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [{"id": "gold", "object": "plan"}],
                "has_more": false
            })))
            .mount(&server)
            .await;

        let page = client(&server)
            .list(&Collection::top_level(ObjectKind::Plan), &params(json!({"limit": 3})))
            .await
            .unwrap();

        assert_eq!(page.list_data().map(|d| d.len()), Some(1));
    }

    #[tokio::test]
    async fn test_actions_hit_sub_resources() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/charges/ch_1/refund"))
            .and(body_string_contains("amount=100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "ch_1", "object": "charge", "refunded": false, "amount_refunded": 100
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/customers/cus_1/discount"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "discount", "deleted": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let stripe = client(&server);
        let charge = GatewayObject::with_id(ObjectKind::Charge, "ch_1");
        let refunded = stripe
            .perform(&charge, Action::Refund, &params(json!({"amount": 100})))
            .await
            .unwrap();
        assert_eq!(refunded.id(), Some("ch_1"));

        let customer = GatewayObject::with_id(ObjectKind::Customer, "cus_1");
        let discount = stripe
            .perform(&customer, Action::DeleteDiscount, &Payload::new())
            .await
            .unwrap();
        assert_eq!(discount.kind(), &ObjectKind::Discount);
    }

    #[tokio::test]
    async fn test_delete_and_cancel_use_delete_verb() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/customers/cus_1"))
            .and(header("Authorization", "Bearer sk_test_client1234"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cus_1", "object": "customer", "deleted": true
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/customers/cus_1/subscriptions/sub_1"))
            .and(query_param("at_period_end", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "sub_1", "object": "subscription", "status": "active",
                "cancel_at_period_end": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let stripe = client(&server);
        let customer = GatewayObject::with_id(ObjectKind::Customer, "cus_1");
        let deleted = stripe.delete(&customer, &Payload::new()).await.unwrap();
        assert_eq!(deleted.id(), Some("cus_1"));
        assert_eq!(deleted.get("deleted").map(|v| v.to_param()), Some(json!(true)));

        let subscription = GatewayObject::with_id(ObjectKind::Subscription, "sub_1")
            .with_url("/v1/customers/cus_1/subscriptions/sub_1");
        let canceled = stripe
            .perform(&subscription, Action::Cancel, &params(json!({"at_period_end": true})))
            .await
            .unwrap();
        assert_eq!(canceled.kind(), &ObjectKind::Subscription);
        assert_eq!(
            canceled.get("cancel_at_period_end").map(|v| v.to_param()),
            Some(json!(true))
        );
    }

    #[tokio::test]
    async fn test_capture_posts_to_sub_resource() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/charges/ch_1/capture"))
            .and(body_string_contains("amount=5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "ch_1", "object": "charge", "captured": true, "amount_captured": 5
            })))
            .expect(1)
            .mount(&server)
            .await;

        let stripe = client(&server);
        let charge = GatewayObject::with_id(ObjectKind::Charge, "ch_1");
        let captured = stripe
            .perform(&charge, Action::Capture, &params(json!({"amount": 5})))
            .await
            .unwrap();
        assert_eq!(captured.id(), Some("ch_1"));
        assert_eq!(captured.get("captured").map(|v| v.to_param()), Some(json!(true)));
    }

    #[tokio::test]
    async fn test_card_decline_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/charges"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": {
                    "type": "card_error",
                    "code": "card_declined",
                    "message": "Your card was declined."
                }
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .create(
                &Collection::top_level(ObjectKind::Charge),
                &params(json!({"amount": 500, "source": "tok_chargeDeclined"})),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Card { .. }));
        assert_eq!(err.http_status(), Some(402));
    }

    #[tokio::test]
    async fn test_api_version_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/events/evt_1"))
            .and(header("Stripe-Version", "2015-10-16"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "evt_1", "object": "event"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config =
            GatewayConfig::new(Mode::Test, "sk_test_client1234").with_api_base_url(server.uri());
        config.api_version = Some("2015-10-16".to_string());

        StripeClient::new(config)
            .unwrap()
            .retrieve(&Collection::top_level(ObjectKind::Event), "evt_1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_untagged_body_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/coupons/co_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "co_1"})))
            .mount(&server)
            .await;

        let err = client(&server)
            .retrieve(&Collection::top_level(ObjectKind::Coupon), "co_1")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Api { .. }));
    }

    #[tokio::test]
    async fn test_connection_failure() {
        let config = GatewayConfig::new(Mode::Test, "sk_test_client1234")
            .with_api_base_url("http://127.0.0.1:1");
        let err = StripeClient::new(config)
            .unwrap()
            .retrieve(&Collection::top_level(ObjectKind::Charge), "ch_1")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Connection { .. }));
    }
}
