//! HTTP API handlers: food analysis submission, task polling, and status.

pub mod food;
pub mod status;

use axum::http::{HeaderMap, StatusCode};

use platescan_core::config::ApiConfig;
use platescan_services::{FoodAnalyzer, FoodLogStore, TaskEngine};

/// Header carrying the authenticated caller's id, set by the front proxy.
pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct ApiState {
    pub analyzer: FoodAnalyzer,
    pub engine: TaskEngine,
    pub food_logs: FoodLogStore,
    pub config: ApiConfig,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Read the caller's user id from the identity header.
fn caller_id(headers: &HeaderMap) -> Result<u64, (StatusCode, String)> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .ok_or((
            StatusCode::UNAUTHORIZED,
            format!("missing or invalid {} header", USER_HEADER),
        ))
}

// Re-export handler functions for use in router setup.
pub use food::{handle_analyze, handle_logs, handle_task};
pub use status::handle_status;
