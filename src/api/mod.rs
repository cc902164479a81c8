pub mod auth;
pub mod error;
pub mod goals;
pub mod planner;
mod state;
pub mod stats;
pub mod subtasks;
pub mod sections;
pub mod tasks;
#[cfg(test)]
pub mod tests;
pub mod titles;
pub mod user;

pub use error::ApiError;
pub use state::{build_pool, AppState, Pool};
pub use user::CurrentUser;

use axum::{extract::DefaultBodyLimit, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Builds the full router over a connection pool.
///
/// The rollover scheduler is not started here; see
/// [`crate::rollover::spawn_scheduler`].
pub fn create_router(pool: Pool) -> Router {
    router(AppState::new(pool))
}

pub fn router(state: AppState) -> Router {
    let max_body_size = 1024 * 1024; // 1 MB

    Router::new()
        .merge(tasks::create_router())
        .merge(subtasks::create_router())
        .merge(sections::create_router())
        .merge(goals::create_router())
        .merge(titles::create_router())
        .merge(planner::create_router())
        .merge(stats::create_router())
        .merge(auth::create_router())
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_size))
        .with_state(state)
}
