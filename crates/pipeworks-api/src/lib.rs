//! Axum HTTP surface for the pipeline orchestrator: episode discovery,
//! job submission/status, clip discovery and rendering, queue stats.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
