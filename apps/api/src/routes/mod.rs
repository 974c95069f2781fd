pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::advice::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::health_handler))
        .route("/calculate-tax", post(handlers::handle_calculate_tax))
        .route("/ask-question", post(handlers::handle_ask_question))
        .with_state(state)
}
