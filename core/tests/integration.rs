//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port and exercises the client
//! over real HTTP, once through the bundled reqwest transport and once through
//! a host-provided ureq transport plugged in behind the `Transport` trait.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use api_core::{
    normalize_api_error, ApiError, Client, ClientConfig, HttpMethod, HttpRequest, HttpResponse,
    RequestBody, RequestOptions, RequestSpec, RetryPolicy, Transport, TransportError,
};
use async_trait::async_trait;
use mock_server::auth::AuthConfig;
use mock_server::{AppState, Health, Session};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(AuthConfig::new("integration-secret"), "local");
    tokio::spawn(mock_server::run(listener, state));
    addr
}

fn client_for(addr: SocketAddr) -> Client {
    let config = ClientConfig::new().with_base_url(&format!("http://{addr}")).unwrap();
    Client::new(config)
}

fn credentials(password: &str) -> Option<RequestBody> {
    Some(json!({"email": "dev@example.com", "password": password}).into())
}

#[tokio::test]
async fn health_is_decoded() {
    let client = client_for(start_server().await);

    let response = client
        .request_json::<Health>(RequestSpec::new("/api/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.data().status, "ok");
    assert!(response.header("content-type").unwrap().contains("application/json"));
}

#[tokio::test]
async fn session_lifecycle() {
    let client = client_for(start_server().await);

    // Step 1: issue a token.
    let issued = client
        .post("/api/auth", credentials("supersecret"), RequestOptions::new())
        .await
        .unwrap()
        .decode::<Session>()
        .unwrap();
    let token = issued.data().token.clone();
    assert_eq!(issued.data().user.email, "dev@example.com");
    assert!(issued.header("set-cookie").unwrap().starts_with("token="));

    // Step 2: verify it.
    let bearer = RequestOptions::new().header("Authorization", format!("Bearer {token}"));
    let verified = client.get("/api/auth", bearer.clone()).await.unwrap();
    assert_eq!(verified.data()["user"]["email"], "dev@example.com");

    // Step 3: the gated dashboard sees the forwarded email.
    let dashboard = client.get("/dashboard", bearer).await.unwrap();
    assert_eq!(dashboard.data()["user"]["email"], "dev@example.com");
}

#[tokio::test]
async fn invalid_payload_surfaces_server_error_field() {
    let client = client_for(start_server().await);

    let err = client
        .post("/api/auth", credentials("short"), RequestOptions::new())
        .await
        .unwrap_err();

    let normalized = normalize_api_error(&err);
    assert_eq!(normalized.message, "Invalid payload");
    assert_eq!(normalized.status, Some(400));
    let info = normalized.info.unwrap();
    assert!(info["issues"]["fieldErrors"]["password"].is_array());
}

#[tokio::test]
async fn missing_token_is_401() {
    let client = client_for(start_server().await);

    let err = client.get("/api/auth", RequestOptions::new()).await.unwrap_err();

    assert!(matches!(err, ApiError::Http { status: 401, ref message, .. } if message == "Missing token"));
}

#[tokio::test]
async fn unknown_route_uses_status_text() {
    let client = client_for(start_server().await);

    let err = client.get("/api/nope", RequestOptions::new()).await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "Not Found");
}

#[tokio::test]
async fn silent_server_times_out_on_every_attempt() {
    // Accepts connections and never answers.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    let client = client_for(addr);
    let spec = RequestSpec::new("/slow")
        .timeout(Duration::from_millis(100))
        .retry(RetryPolicy::attempts(2).with_delay(Duration::from_millis(10)));
    let started = Instant::now();

    let err = client.request(spec).await.unwrap_err();

    assert!(started.elapsed() >= Duration::from_millis(200));
    let normalized = normalize_api_error(&err);
    assert_eq!(normalized.message, "Request timed out");
    assert_eq!(normalized.status, Some(408));
}

#[tokio::test]
async fn refused_connection_is_a_plain_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client = client_for(addr);
    let spec = RequestSpec::new("/api/health")
        .retry(RetryPolicy::attempts(3).with_delay(Duration::from_millis(5)));

    let err = client.request(spec).await.unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
    let normalized = normalize_api_error(&err);
    assert_eq!(normalized.status, None);
    assert_eq!(normalized.info, None);
}

/// Runs each exchange on a blocking thread with ureq.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses come back as data and the client decides what they mean.
struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

fn execute(agent: &ureq::Agent, req: HttpRequest) -> Result<HttpResponse, TransportError> {
    let url = req.url.as_str();
    let result = match (req.method, req.body) {
        (HttpMethod::Get, _) => req
            .headers
            .iter()
            .fold(agent.get(url), |b, (k, v)| b.header(k.as_str(), v.as_str()))
            .call(),
        (HttpMethod::Delete, _) => req
            .headers
            .iter()
            .fold(agent.delete(url), |b, (k, v)| b.header(k.as_str(), v.as_str()))
            .call(),
        (method, body) => {
            let builder = match method {
                HttpMethod::Put => agent.put(url),
                HttpMethod::Patch => agent.patch(url),
                _ => agent.post(url),
            };
            let builder = req
                .headers
                .iter()
                .fold(builder, |b, (k, v)| b.header(k.as_str(), v.as_str()));
            match body {
                Some(body) => builder.send(body.as_slice()),
                None => builder.send_empty(),
            }
        }
    };
    let mut response = result.map_err(|e| TransportError::Other(e.to_string()))?;

    let status = response.status();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();
    let body = response
        .body_mut()
        .read_to_vec()
        .map_err(|e| TransportError::Body(e.to_string()))?;

    Ok(HttpResponse {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        headers,
        body,
    })
}

#[async_trait]
impl Transport for UreqTransport {
    async fn send(
        &self,
        request: HttpRequest,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        let exchange = tokio::task::spawn_blocking(move || execute(&agent, request));
        tokio::select! {
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            joined = exchange => joined.map_err(|e| TransportError::Other(e.to_string()))?,
        }
    }
}

#[tokio::test]
async fn host_transport_drives_the_same_flow() {
    let addr = start_server().await;
    let config = ClientConfig::new().with_base_url(&format!("http://{addr}")).unwrap();
    let client = Client::with_transport(config, UreqTransport::new());

    let issued = client
        .post("/api/auth", credentials("supersecret"), RequestOptions::new())
        .await
        .unwrap();
    let token = issued.data()["token"].as_str().unwrap().to_string();

    let options = RequestOptions::new().header("authorization", format!("Bearer {token}"));
    let verified = client.get("/api/auth", options).await.unwrap();
    assert_eq!(verified.data()["user"]["email"], "dev@example.com");

    let err = client
        .post("/api/auth", credentials("short"), RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
}
