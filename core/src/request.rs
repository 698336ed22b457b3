//! Declarative description of one outgoing request.
//!
//! # Design
//! A `RequestSpec` is built per call site and consumed once by the client.
//! Everything except path, method and body lives in `RequestOptions`, which
//! is what the per-method shorthands accept. `PartialRequest` mirrors every
//! field as optional so a base request can be merged with an override before
//! it is validated into a `RequestSpec`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{FetchHints, HttpMethod, Revalidate};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Per-attempt step of the default linear backoff.
pub const BACKOFF_STEP: Duration = Duration::from_millis(300);

pub(crate) const MISSING_PATH_MESSAGE: &str = "Request configuration requires a path.";

/// Scalar query parameter value. `Null` entries are dropped from the URL.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl QueryValue {
    /// String form used in the query string, or `None` for `Null`.
    pub fn render(&self) -> Option<String> {
        match self {
            QueryValue::Str(s) => Some(s.clone()),
            QueryValue::Int(n) => Some(n.to_string()),
            QueryValue::Float(n) => Some(n.to_string()),
            QueryValue::Bool(b) => Some(b.to_string()),
            QueryValue::Null => None,
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Str(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Int(value)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        QueryValue::Int(value.into())
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Int(value.into())
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(QueryValue::Null, Into::into)
    }
}

/// Request payload.
///
/// `Json` objects and arrays are serialized and tagged as JSON. `null`,
/// `false`, zero and empty strings send no body. Everything else goes out
/// as raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
}

/// Body bytes ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EncodedBody {
    pub bytes: Vec<u8>,
    pub is_json: bool,
}

impl RequestBody {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| ApiError::Serialization(e.to_string()))
    }

    /// `None` means no body is sent at all.
    pub(crate) fn encode(self) -> Option<EncodedBody> {
        match self {
            RequestBody::Json(Value::Null | Value::Bool(false)) => None,
            RequestBody::Json(Value::Number(n)) if n.as_f64() == Some(0.0) => None,
            RequestBody::Json(value @ (Value::Object(_) | Value::Array(_))) => Some(EncodedBody {
                bytes: value.to_string().into_bytes(),
                is_json: true,
            }),
            RequestBody::Json(Value::String(text)) | RequestBody::Text(text) => {
                (!text.is_empty()).then(|| EncodedBody {
                    bytes: text.into_bytes(),
                    is_json: false,
                })
            }
            RequestBody::Json(scalar) => Some(EncodedBody {
                bytes: scalar.to_string().into_bytes(),
                is_json: false,
            }),
            RequestBody::Bytes(bytes) => Some(EncodedBody {
                bytes,
                is_json: false,
            }),
        }
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<String> for RequestBody {
    fn from(value: String) -> Self {
        RequestBody::Text(value)
    }
}

impl From<&str> for RequestBody {
    fn from(value: &str) -> Self {
        RequestBody::Text(value.to_string())
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(value: Vec<u8>) -> Self {
        RequestBody::Bytes(value)
    }
}

/// How many times to try and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Fixed wait between attempts. `None` selects linear backoff of
    /// `BACKOFF_STEP * attempt`.
    pub delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            delay: Some(Duration::ZERO),
        }
    }
}

impl RetryPolicy {
    /// `attempts` tries with the default linear backoff between them.
    pub fn attempts(attempts: u32) -> Self {
        Self {
            attempts,
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Wait after the failed `attempt` (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.delay.unwrap_or(BACKOFF_STEP * attempt)
    }
}

/// Everything about a request except its path, method and body.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub params: BTreeMap<String, QueryValue>,
    pub headers: BTreeMap<String, String>,
    pub cache: Option<String>,
    pub revalidate: Option<Revalidate>,
    pub retry: RetryPolicy,
    pub timeout: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
            cache: None,
            revalidate: None,
            retry: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn cache(mut self, directive: impl Into<String>) -> Self {
        self.cache = Some(directive.into());
        self
    }

    pub fn revalidate(mut self, revalidate: Revalidate) -> Self {
        self.revalidate = Some(revalidate);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn hints(&self) -> FetchHints {
        FetchHints {
            cache: self.cache.clone(),
            revalidate: self.revalidate.clone(),
        }
    }
}

/// One logical request: what to send and how hard to try.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub path: String,
    pub method: HttpMethod,
    pub body: Option<RequestBody>,
    pub options: RequestOptions,
}

impl RequestSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: HttpMethod::Get,
            body: None,
            options: RequestOptions::default(),
        }
    }

    /// The `RequestSpec` every per-method shorthand on `Client` sends.
    pub fn shorthand(
        method: HttpMethod,
        path: impl Into<String>,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Self {
        Self {
            path: path.into(),
            method,
            body,
            options,
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.options = self.options.param(key, value);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options = self.options.header(name, value);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.options.retry = retry;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Reject specs that can never be sent.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.path.is_empty() {
            return Err(ApiError::Config(MISSING_PATH_MESSAGE.to_string()));
        }
        if self.options.retry.attempts == 0 {
            return Err(ApiError::Config(
                "retry attempts must be at least 1".to_string(),
            ));
        }
        if self.options.timeout.is_zero() {
            return Err(ApiError::Config("timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// A `RequestSpec` with every field optional, for base + override merging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRequest {
    pub path: Option<String>,
    pub method: Option<HttpMethod>,
    pub body: Option<RequestBody>,
    pub params: Option<BTreeMap<String, QueryValue>>,
    pub headers: Option<BTreeMap<String, String>>,
    pub cache: Option<String>,
    pub revalidate: Option<Revalidate>,
    pub retry: Option<RetryPolicy>,
    pub timeout: Option<Duration>,
}

impl PartialRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.params
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Field-by-field merge where `overrides` wins. Maps are replaced whole,
    /// not combined.
    pub fn merge(self, overrides: PartialRequest) -> PartialRequest {
        PartialRequest {
            path: overrides.path.or(self.path),
            method: overrides.method.or(self.method),
            body: overrides.body.or(self.body),
            params: overrides.params.or(self.params),
            headers: overrides.headers.or(self.headers),
            cache: overrides.cache.or(self.cache),
            revalidate: overrides.revalidate.or(self.revalidate),
            retry: overrides.retry.or(self.retry),
            timeout: overrides.timeout.or(self.timeout),
        }
    }

    /// Fill defaults and require a path.
    pub fn into_spec(self) -> Result<RequestSpec, ApiError> {
        let path = self
            .path
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::Config(MISSING_PATH_MESSAGE.to_string()))?;
        let defaults = RequestOptions::default();
        Ok(RequestSpec {
            path,
            method: self.method.unwrap_or_default(),
            body: self.body,
            options: RequestOptions {
                params: self.params.unwrap_or_default(),
                headers: self.headers.unwrap_or_default(),
                cache: self.cache,
                revalidate: self.revalidate,
                retry: self.retry.unwrap_or(defaults.retry),
                timeout: self.timeout.unwrap_or(defaults.timeout),
            },
        })
    }
}

impl From<RequestSpec> for PartialRequest {
    fn from(spec: RequestSpec) -> Self {
        let RequestSpec {
            path,
            method,
            body,
            options,
        } = spec;
        PartialRequest {
            path: Some(path),
            method: Some(method),
            body,
            params: Some(options.params),
            headers: Some(options.headers),
            cache: options.cache,
            revalidate: options.revalidate,
            retry: Some(options.retry),
            timeout: Some(options.timeout),
        }
    }
}
