//! Mock of the starter's API surface.
//!
//! Serves the health probe, token issue/verify endpoints and a token-gated
//! dashboard. Integration tests start it on an ephemeral port and drive it
//! with the request client.

pub mod auth;
pub mod gate;

use std::{sync::Arc, time::Instant};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::AuthConfig;
use crate::gate::{require_auth, USER_EMAIL_HEADER};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthConfig>,
    started: Instant,
    region: String,
}

impl AppState {
    pub fn new(auth: AuthConfig, region: impl Into<String>) -> Self {
        Self {
            auth: Arc::new(auth),
            started: Instant::now(),
            region: region.into(),
        }
    }

    pub fn from_env() -> Self {
        let region = std::env::var("VERCEL_REGION").unwrap_or_else(|_| "local".to_string());
        Self::new(AuthConfig::from_env(), region)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub uptime: f64,
    pub timestamp: u64,
    pub region: String,
}

pub fn app(state: AppState) -> Router {
    let private = Router::new()
        .route("/dashboard", get(dashboard))
        .route("/dashboard/{*rest}", get(dashboard))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth", get(verify_session).post(create_session))
        .merge(private)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock server listening");
    }
    axum::serve(listener, app(state)).await
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    Json(Health {
        status: "ok".to_string(),
        uptime: state.started.elapsed().as_secs_f64(),
        timestamp,
        region: state.region.clone(),
    })
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.starts_with('.') && domain.contains('.') && !email.contains(' ')
        }
        None => false,
    }
}

/// Field errors in the `{formErrors, fieldErrors}` layout the frontend expects.
fn credential_issues(body: &Value) -> Option<Value> {
    let mut fields = Map::new();
    match body.get("email").and_then(Value::as_str) {
        Some(email) if looks_like_email(email) => {}
        Some(_) => {
            fields.insert("email".to_string(), json!(["Invalid email"]));
        }
        None => {
            fields.insert("email".to_string(), json!(["Required"]));
        }
    }
    match body.get("password").and_then(Value::as_str) {
        Some(password) if password.chars().count() >= MIN_PASSWORD_LEN => {}
        Some(_) => {
            fields.insert(
                "password".to_string(),
                json!([format!("String must contain at least {MIN_PASSWORD_LEN} character(s)")]),
            );
        }
        None => {
            fields.insert("password".to_string(), json!(["Required"]));
        }
    }
    let form_errors: Vec<&str> = if body.is_object() { Vec::new() } else { vec!["Expected object"] };

    if fields.is_empty() && form_errors.is_empty() {
        None
    } else {
        Some(json!({"formErrors": form_errors, "fieldErrors": fields}))
    }
}

async fn create_session(State(state): State<AppState>, body: Bytes) -> Response {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    if let Some(issues) = credential_issues(&body) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Invalid payload", "issues": issues})),
        )
            .into_response();
    }

    let email = body["email"].as_str().unwrap_or_default().to_string();
    let token = match state.auth.issue(&email) {
        Ok(token) => token,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": err.to_string()})),
            )
                .into_response()
        }
    };
    let cookie = state.auth.session_cookie(&token);
    (
        [(header::SET_COOKIE, cookie)],
        Json(Session {
            token,
            user: User { email },
        }),
    )
        .into_response()
}

async fn verify_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let Some(token) = token else {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Missing token"}))).into_response();
    };

    match state.auth.verify(token) {
        Ok(claims) => Json(json!({"user": {"email": claims.email}})).into_response(),
        Err(err) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid token", "detail": err.to_string()})),
        )
            .into_response(),
    }
}

async fn dashboard(headers: HeaderMap) -> Json<Value> {
    let email = headers
        .get(USER_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    Json(json!({"user": {"email": email}}))
}
