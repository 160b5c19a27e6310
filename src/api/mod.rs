//! HTTP API module
//!
//! This module contains the HTTP endpoint handlers, the admin session gate,
//! the embedded pages and the response structures.

pub mod auth;
pub mod handlers;
pub mod pages;
pub mod responses;

use std::sync::Arc;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::state::AppState;
use auth::{login_page_handler, login_submit_handler, logout_handler, require_admin};
use handlers::*;
use pages::{admin_page, viewer_page};

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/admin", get(admin_page))
        .route("/api/control_timer/:timer_id", post(control_timer_handler))
        .route("/api/upload_logo", post(upload_logo_handler))
        .route("/api/get_logos", get(get_logos_handler))
        .route("/api/delete_logo/:filename", delete(delete_logo_handler))
        .route("/api/change_pin", post(change_pin_handler))
        .route("/api/theme", get(get_theme_handler).post(set_theme_handler))
        .route_layer(middleware::from_fn_with_state(Arc::clone(&state), require_admin));

    Router::new()
        .route("/", get(viewer_page))
        .route("/login", get(login_page_handler).post(login_submit_handler))
        .route("/logout", get(logout_handler))
        .route("/api/timer_status", get(timer_status_handler))
        .route("/health", get(health_handler))
        .merge(admin)
        .nest_service("/static/uploads", ServeDir::new(state.assets.upload_dir()))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
