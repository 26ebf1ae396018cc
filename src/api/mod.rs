//! HTTP API module
//!
//! This module contains the control surface that stands in for the timer
//! UI: endpoint handlers and their request and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timers", post(start_new_timer_handler))
        .route("/timer", get(active_timer_handler).delete(stop_handler))
        .route("/timer/pause", post(pause_handler))
        .route("/timer/resume", post(resume_handler))
        .route("/popular", get(popular_handler))
        .route("/popular/:minutes", delete(forget_handler))
        .route("/display/foreground", post(foreground_handler))
        .route("/display/background", post(background_handler))
        .route("/display/resume", post(display_resume_handler))
        .route("/display/pause", post(display_pause_handler))
        .route("/countdown", get(countdown_handler))
        .route("/alarm/dismiss", post(dismiss_alarm_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
