//! # Routes
//!
//! Axum router configuration for the payment API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
///   - GET  /health - Liveness and active mode
///   - GET  /api/v1/operations - Supported operation names
///   - POST /api/v1/{operation} - Execute an operation, body is the payload
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/operations", get(handlers::list_operations))
        .route("/{operation}", post(handlers::execute_operation));

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // API v1
        .nest("/api/v1", api_routes)
        // Middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        // State
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use pay_core::testing::MockGateway;
    use pay_core::{Collection, GatewayConfig, GatewayError, GatewayObject, Mode, ObjectKind};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn server() -> (TestServer, Arc<MockGateway>) {
        let gateway = Arc::new(MockGateway::new());
        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            stripe_config_file: None,
        };
        let state = AppState::with_gateway(
            config,
            GatewayConfig::new(Mode::Test, "sk_test_router1234"),
            gateway.clone(),
        )
        .unwrap();
        (TestServer::new(create_router(state)).unwrap(), gateway)
    }

    #[tokio::test]
    async fn test_health_reports_mode_without_key() {
        let (server, _) = server();
        let response = server.get("/health").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["status"], json!("healthy"));
        assert_eq!(body["mode"], json!("Test"));
        assert!(!response.text().contains("sk_test_"));
    }

    #[tokio::test]
    async fn test_list_operations() {
        let (server, _) = server();
        let body: Value = server.get("/api/v1/operations").await.json();
        let operations = body["operations"].as_array().unwrap();
        assert_eq!(operations.len(), 33);
        assert!(operations.contains(&json!("deleteCustomerDiscount")));
    }

    #[tokio::test]
    async fn test_retrieve_charge_envelope() {
        let (server, gateway) = server();
        gateway.insert(
            &Collection::top_level(ObjectKind::Charge),
            GatewayObject::from_json(json!({
                "id": "ch_1",
                "object": "charge",
                "refunds": {"object": "list", "data": [
                    {"id": "re_1", "object": "refund"},
                    {"id": "re_2", "object": "refund"}
                ]}
            }))
            .unwrap(),
        );

        let response = server
            .post("/api/v1/retrieveCharge")
            .json(&json!({"charge_id": "ch_1"}))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["status"], json!("success"));
        assert_eq!(body["message"], json!("Success"));
        assert_eq!(body["response"]["refunds"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_gateway_failure_is_envelope() {
        let (server, gateway) = server();
        gateway.fail_next(GatewayError::Authentication {
            message: "Invalid API Key provided".into(),
            http_status: Some(401),
        });

        let response = server
            .post("/api/v1/listCharges")
            .json(&json!({}))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["status"], json!("error"));
        assert_eq!(body["message"], json!(false));
        assert_eq!(body["response"]["kind"], json!("AuthenticationError"));
    }

    #[tokio::test]
    async fn test_raised_errors_map_to_status() {
        let (server, gateway) = server();

        let response = server.post("/api/v1/payEverything").json(&json!({})).await;
        response.assert_status(StatusCode::NOT_FOUND);

        let response = server
            .post("/api/v1/retrieveCustomer")
            .json(&json!({"customer_id": ""}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("customer_id"));

        let response = server.post("/api/v1/listPlans").text("[1, 2]").await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server.post("/api/v1/listPlans").await;
        response.assert_status(StatusCode::BAD_REQUEST);

        assert!(gateway.calls().is_empty());
    }
}
