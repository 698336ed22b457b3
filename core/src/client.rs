//! Resilient request execution.
//!
//! # Design
//! `Client` holds immutable configuration and a shared transport, nothing
//! else, so clones are cheap and unrelated calls never interfere. One call to
//! `request` runs up to `retry.attempts` strictly sequential attempts. Each
//! attempt is bounded by the request's timeout through its own cancellation
//! token; the timer and token die with the attempt. Any failure is retried
//! the same way and only the last one is returned.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::endpoint::build_url;
use crate::error::{ApiError, TransportError};
use crate::http::{set_header, HttpMethod, HttpRequest};
use crate::request::{RequestBody, RequestOptions, RequestSpec};
use crate::response::{parse_response, ApiResponse};
use crate::transport::{ReqwestTransport, Transport};

#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Client on the default `reqwest` transport.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, ReqwestTransport::new())
    }

    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolve a `RequestSpec` into the wire request every attempt will send.
    ///
    /// Header precedence, lowest first: the JSON content type added for
    /// structured bodies, the configured default headers, the request's own headers.
    pub fn build_request(&self, spec: &RequestSpec) -> Result<HttpRequest, ApiError> {
        let url = build_url(self.config.base_url(), &spec.path, &spec.options.params)?;
        let body = spec.body.clone().and_then(RequestBody::encode);

        let mut headers = Vec::new();
        for (name, value) in self.config.default_headers().iter().chain(&spec.options.headers) {
            set_header(&mut headers, name, value);
        }
        if body.as_ref().is_some_and(|b| b.is_json)
            && !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        {
            headers.insert(0, ("content-type".to_string(), "application/json".to_string()));
        }

        Ok(HttpRequest {
            method: spec.method,
            url,
            headers,
            body: body.map(|b| b.bytes),
            hints: spec.options.hints(),
        })
    }

    pub async fn request(&self, spec: RequestSpec) -> Result<ApiResponse, ApiError> {
        spec.validate()?;
        let request = self.build_request(&spec)?;
        let retry = spec.options.retry;
        let timeout = spec.options.timeout;

        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(method = %request.method, url = %request.url, attempt, "sending request");
            match self.request_once(request.clone(), timeout).await {
                Ok(response) => return Ok(response),
                Err(err) if attempt < retry.attempts => {
                    let delay = retry.delay_after(attempt);
                    warn!(
                        url = %request.url,
                        attempt,
                        max_attempts = retry.attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "request attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Like `request`, then decode the payload into `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        spec: RequestSpec,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(spec).await?.decode()
    }

    async fn request_once(
        &self,
        request: HttpRequest,
        timeout: Duration,
    ) -> Result<ApiResponse<Value>, ApiError> {
        let cancel = CancellationToken::new();
        let outcome = tokio::time::timeout(timeout, self.transport.send(request, cancel.clone())).await;
        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(TransportError::Cancelled)) => return Err(ApiError::Timeout),
            Ok(Err(err)) => return Err(err.into()),
            Err(_elapsed) => {
                cancel.cancel();
                debug!(timeout_ms = timeout.as_millis() as u64, "request attempt timed out");
                return Err(ApiError::Timeout);
            }
        };
        parse_response(response)
    }

    pub async fn get(
        &self,
        path: impl Into<String>,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        self.request(RequestSpec::shorthand(HttpMethod::Get, path, None, options))
            .await
    }

    pub async fn post(
        &self,
        path: impl Into<String>,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        self.request(RequestSpec::shorthand(HttpMethod::Post, path, body, options))
            .await
    }

    pub async fn put(
        &self,
        path: impl Into<String>,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        self.request(RequestSpec::shorthand(HttpMethod::Put, path, body, options))
            .await
    }

    pub async fn patch(
        &self,
        path: impl Into<String>,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        self.request(RequestSpec::shorthand(HttpMethod::Patch, path, body, options))
            .await
    }

    pub async fn delete(
        &self,
        path: impl Into<String>,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        self.request(RequestSpec::shorthand(HttpMethod::Delete, path, None, options))
            .await
    }
}
