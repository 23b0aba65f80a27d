//! HTML pages.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use spid_handshake::HandshakeError;

/// Identity provider selection page.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    /// Provider short names.
    pub providers: Vec<&'a str>,
    /// Login route.
    pub login_path: &'a str,
    /// Logout route.
    pub logout_path: &'a str,
}

/// Error page template.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    /// Message shown to the user.
    pub message: &'a str,
    /// Link back to the selection page.
    pub home_path: &'a str,
}

/// Renders a template with the given status.
pub fn render(status: StatusCode, template: &impl Template) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Template render error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

/// Renders the error page for a failed handshake.
pub fn handshake_error(err: &HandshakeError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    render(
        status,
        &ErrorTemplate {
            message: err.user_message(),
            home_path: "/",
        },
    )
}
