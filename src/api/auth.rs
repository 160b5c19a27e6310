//! Admin login, logout and the session gate for protected routes

use std::sync::Arc;
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    error::AppError,
    state::{
        sessions::{expired_session_cookie, session_cookie, token_from_cookie_header},
        AppState,
    },
};
use super::pages::login_page_html;

const ADMIN_HOME: &str = "/admin";

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub pin: String,
}

/// Session token carried by the request, if any
fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(token_from_cookie_header)
        .map(str::to_string)
}

fn is_logged_in(state: &AppState, headers: &HeaderMap) -> bool {
    session_token(headers)
        .map(|token| state.sessions.is_valid(&token))
        .unwrap_or(false)
}

/// Only local absolute paths are accepted as post-login targets
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(target)
            if target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\") =>
        {
            target
        }
        _ => ADMIN_HOME,
    }
}

/// Percent-encode a path for use as a query value
fn encode_query_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Gate for admin routes: pages redirect to the login form, API calls get 403
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if is_logged_in(&state, request.headers()) {
        return next.run(request).await;
    }

    let path = request.uri().path();
    if path.starts_with("/api/") {
        debug!("Rejected unauthenticated API call to {}", path);
        return AppError::auth("Admin login required").into_response();
    }

    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or(path);
    Redirect::to(&format!("/login?next={}", encode_query_value(target))).into_response()
}

/// Handle GET /login - Show the PIN form
pub async fn login_page_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Response {
    if is_logged_in(&state, &headers) {
        return Redirect::to(safe_next(query.next.as_deref())).into_response();
    }
    Html(login_page_html(None)).into_response()
}

/// Handle POST /login - Check the PIN and open a session
pub async fn login_submit_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
    Form(form): Form<LoginForm>,
) -> Response {
    if !state.config.check_pin(&form.pin) {
        warn!("Failed admin login attempt");
        return (StatusCode::UNAUTHORIZED, Html(login_page_html(Some("Invalid PIN")))).into_response();
    }

    let token = state.sessions.create();
    let cookie = session_cookie(&token, state.sessions.lifetime());
    let target = safe_next(query.next.as_deref()).to_string();
    info!("Admin logged in");

    ([(header::SET_COOKIE, cookie)], Redirect::to(&target)).into_response()
}

/// Handle GET /logout - Close the session
pub async fn logout_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        state.sessions.revoke(&token);
    }
    ([(header::SET_COOKIE, expired_session_cookie())], Redirect::to("/login")).into_response()
}
