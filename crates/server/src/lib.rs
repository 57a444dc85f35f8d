//! leadflow server - HTTP receiver for voice-AI call webhooks
//!
//! Exposes the [`leadflow`] pipeline over HTTP. The voice platform posts
//! every call event to a single endpoint; `call_analyzed` events become
//! leads in the configured store.
//!
//! # Features
//!
//! - **Middleware**: Compression, CORS, request ID tracking, structured logging
//! - **Configuration**: `.env`, optional `leadflow.*` file, `LEADFLOW__*` env vars
//! - **Error Handling**: Flat `{"error": ...}` bodies the sender can log
//! - **Graceful Shutdown**: Drains requests and stops the idempotency sweeper
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `POST /webhook` - Call events (path configurable via `webhook_path`)
//! - `GET /` - Service information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics (when enabled)

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::{ServerConfig, StoreBackend};
pub use error::{ServerError, ServerResult};
pub use server::{build_pipeline, build_router, start_server};
pub use state::ServerState;
