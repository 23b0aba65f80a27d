//! SPID handshake endpoints.
//!
//! Each handler reads the correlation cookie, runs one orchestrator
//! operation and returns either the auto-submitting form addressed to the
//! IdP or an error page. The cookie change is applied in both cases, so a
//! failed logout still clears the client's record.

use axum::{
    extract::{Query, State},
    http::{header::CACHE_CONTROL, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use spid_handshake::{BeginAuthentication, CorrelationCarrier, HandshakeResult, ProtocolRequest};

use crate::cookies::{apply_carrier, carrier_from_headers};
use crate::pages::{self, IndexTemplate};
use crate::state::AppState;

/// Login route.
pub const LOGIN_PATH: &str = "/spid/login";

/// Logout route.
pub const LOGOUT_PATH: &str = "/spid/logout";

/// Query parameters of the login route.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Short name of the chosen identity provider.
    pub idp: Option<String>,
}

/// Identity provider selection page.
pub async fn index(State(state): State<AppState>) -> Response {
    let template = IndexTemplate {
        providers: state.orchestrator().directory().names(),
        login_path: LOGIN_PATH,
        logout_path: LOGOUT_PATH,
    };
    pages::render(StatusCode::OK, &template)
}

/// Starts authentication with the IdP named by `?idp=`.
pub async fn spid_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Response {
    let config = state.config();
    let mut carrier = carrier_from_headers(&headers, &config.cookie_name);
    let result = state.orchestrator().begin_authentication(
        &mut carrier,
        &BeginAuthentication {
            provider_name: query.idp.as_deref().unwrap_or_default(),
            security_level: config.security_level,
            reply_to: &config.reply_to,
            environment: config.environment,
        },
    );
    respond(&state, carrier, result)
}

/// Starts single logout of the session in the correlation cookie.
pub async fn spid_logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut carrier = carrier_from_headers(&headers, &state.config().cookie_name);
    let result = state.orchestrator().begin_logout(&mut carrier);
    respond(&state, carrier, result)
}

fn respond(
    state: &AppState,
    carrier: CorrelationCarrier,
    result: HandshakeResult<ProtocolRequest>,
) -> Response {
    let mut response = match result {
        Ok(request) => Html(request.post_form(None)).into_response(),
        Err(e) => pages::handshake_error(&e),
    };

    let config = state.config();
    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    apply_carrier(headers, &config.cookie_name, carrier, config.cookie_secure);
    response
}
