//! Embedded HTML pages

use axum::response::Html;

const VIEWER_HTML: &str = include_str!("../web/viewer.html");
const ADMIN_HTML: &str = include_str!("../web/admin.html");
const LOGIN_HTML: &str = include_str!("../web/login.html");

const ERROR_SLOT: &str = "<!-- login-error -->";

/// Serve the public viewer page
pub async fn viewer_page() -> Html<&'static str> {
    Html(VIEWER_HTML)
}

/// Serve the admin dashboard
pub async fn admin_page() -> Html<&'static str> {
    Html(ADMIN_HTML)
}

/// Login form, optionally showing an error line
pub fn login_page_html(error: Option<&str>) -> String {
    match error {
        Some(message) => LOGIN_HTML.replace(
            ERROR_SLOT,
            &format!("<p class=\"error\">{}</p>", escape_html(message)),
        ),
        None => LOGIN_HTML.to_string(),
    }
}

fn escape_html(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '&' => "&amp;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#39;".to_string(),
            other => other.to_string(),
        })
        .collect()
}
