//! # Stripe Facade
//!
//! JSON-over-HTTP host for the payment facade.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_MODE=Test
//! export STRIPE_TEST_SECRET=sk_test_...
//! export STRIPE_CURRENCY=usd
//!
//! # Run the server
//! stripe-facade
//!
//! # Call an operation
//! curl -X POST localhost:8080/api/v1/retrieveCharge -d '{"charge_id": "ch_123"}'
//! ```

use pay_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();
    let gateway = state.facade.config();

    info!("Environment: {}", state.config.environment);
    info!(
        "Stripe mode: {}, key: {}, default currency: {}",
        gateway.mode,
        gateway.masked_key(),
        gateway.default_currency
    );
    info!(
        "Operations registered: {}",
        state.facade.dispatcher().registry().operations().len()
    );

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("stripe-facade v{} starting on http://{}", env!("CARGO_PKG_VERSION"), addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Operations: http://{}/api/v1/operations", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
