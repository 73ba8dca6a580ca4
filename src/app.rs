use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/incentives", get(handlers::get_incentives).post(handlers::post_incentive))
        .route("/api/activity", get(handlers::get_activity))
        .route("/api/contributions", post(handlers::post_contribution))
        .with_state(state)
}
