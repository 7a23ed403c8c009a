//! # pay-api
//!
//! HTTP API layer for stripe-facade.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - One JSON endpoint per operation, answering with the result envelope
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/operations` | Supported operation names |
//! | POST | `/api/v1/{operation}` | Execute an operation |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
