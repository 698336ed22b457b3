//! Token gate for private pages.
//!
//! Public paths pass straight through. Everything else needs a valid token
//! from the `Authorization: Bearer` header or the `token` cookie; the verified
//! email is forwarded to the handler as `x-user-email`. Failures redirect to
//! `/?error=unauthorized`, carrying the original query string along.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::AppState;

pub const USER_EMAIL_HEADER: &str = "x-user-email";

const PUBLIC_PATHS: [&str; 4] = ["/", "/api/health", "/api/auth", "/favicon.ico"];
const PUBLIC_PREFIXES: [&str; 2] = ["/_next", "/assets"];

pub fn is_public_path(path: &str) -> bool {
    if PUBLIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return true;
    }
    // The root only matches exactly; as a prefix it would cover every path.
    PUBLIC_PATHS.iter().any(|public| {
        path == *public || (*public != "/" && path.starts_with(&format!("{public}/")))
    })
}

/// Bearer token first, then the `token` cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if let Some(token) = bearer {
        return Some(token.to_string());
    }
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == "token")
        .map(|(_, value)| value.to_string())
}

fn unauthorized(query: Option<&str>) -> Response {
    let target = match query {
        Some(query) if !query.is_empty() => format!("/?error=unauthorized&{query}"),
        _ => "/?error=unauthorized".to_string(),
    };
    Redirect::temporary(&target).into_response()
}

pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if is_public_path(&path) {
        return next.run(request).await;
    }

    let query = request.uri().query().map(str::to_string);
    let Some(token) = extract_token(request.headers()) else {
        debug!(%path, "no token presented");
        return unauthorized(query.as_deref());
    };

    match state.auth.verify(&token) {
        Ok(claims) => {
            if let Ok(email) = HeaderValue::from_str(&claims.email) {
                request.headers_mut().insert(USER_EMAIL_HEADER, email);
            }
            next.run(request).await
        }
        Err(err) => {
            debug!(%path, error = %err, "token rejected");
            unauthorized(query.as_deref())
        }
    }
}
