pub mod health;
pub mod orchestrate;
pub mod reports;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route(
            "/api/pms-orchestrate-report",
            post(orchestrate::orchestrate_report),
        )
        .route("/api/steps", get(orchestrate::list_steps))
        .route("/api/reports", post(reports::create_report))
        .route(
            "/api/reports/{id}",
            get(reports::get_report).delete(reports::delete_report),
        )
        .with_state(state)
}
