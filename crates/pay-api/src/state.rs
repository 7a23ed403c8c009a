//! # Application State
//!
//! Shared state for the Axum application.
//! Holds the payment facade and the host configuration.

use pay_core::{BoxedPaymentGateway, GatewayConfig, PaymentFacade};
use pay_stripe::StripeClient;
use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Optional TOML file with a `[stripe]` table, used instead of `STRIPE_*` vars
    pub stripe_config_file: Option<String>,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            stripe_config_file: std::env::var("STRIPE_CONFIG_FILE").ok(),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Resolve the gateway configuration from the file if set, else the environment
    pub fn gateway_config(&self) -> anyhow::Result<GatewayConfig> {
        let config = match &self.stripe_config_file {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path, e))?;
                tracing::info!("Loaded Stripe configuration from {}", path);
                GatewayConfig::from_toml_str(&content)?
            }
            None => GatewayConfig::from_env()?,
        };
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Operation facade over the configured gateway
    pub facade: Arc<PaymentFacade>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState backed by the Stripe REST client
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let gateway_config = config.gateway_config()?;

        let client = StripeClient::new(gateway_config.clone())
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;

        Self::with_gateway(config, gateway_config, Arc::new(client))
    }

    /// Create an AppState over any gateway
    pub fn with_gateway(
        config: AppConfig,
        gateway_config: GatewayConfig,
        gateway: BoxedPaymentGateway,
    ) -> anyhow::Result<Self> {
        let facade = PaymentFacade::new(gateway_config, gateway)?;
        Ok(Self {
            facade: Arc::new(facade),
            config,
        })
    }
}
