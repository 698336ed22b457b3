//! Stateful execution of a base request with per-call overrides.
//!
//! # Design
//! `TrackedRequest` keeps the outcome of the most recent `execute`: data on
//! success, a `NormalizedError` on failure. A failed call leaves previously
//! fetched data in place. Merging and path validation happen before the
//! client is involved, so a request without a path never touches the network.

use serde::de::DeserializeOwned;

use crate::client::Client;
use crate::normalize::NormalizedError;
use crate::request::PartialRequest;
use crate::response::ApiResponse;

type SuccessHook<T> = Box<dyn FnMut(&T) + Send>;
type ErrorHook = Box<dyn FnMut(&NormalizedError) + Send>;

pub struct TrackedRequest<T> {
    base: PartialRequest,
    data: Option<T>,
    error: Option<NormalizedError>,
    on_success: Option<SuccessHook<T>>,
    on_error: Option<ErrorHook>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for TrackedRequest<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedRequest")
            .field("base", &self.base)
            .field("data", &self.data)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T: DeserializeOwned> TrackedRequest<T> {
    pub fn new(base: PartialRequest) -> Self {
        Self {
            base,
            data: None,
            error: None,
            on_success: None,
            on_error: None,
        }
    }

    pub fn on_success(mut self, hook: impl FnMut(&T) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl FnMut(&NormalizedError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&NormalizedError> {
        self.error.as_ref()
    }

    /// Run the base request merged with `overrides`.
    ///
    /// Returns the fresh data, or `None` when the call failed; the failure is
    /// then available from `error`.
    pub async fn execute(
        &mut self,
        client: &Client,
        overrides: Option<PartialRequest>,
    ) -> Option<&T> {
        self.error = None;
        let merged = match overrides {
            Some(overrides) => self.base.clone().merge(overrides),
            None => self.base.clone(),
        };
        let outcome = match merged.into_spec() {
            Ok(spec) => client
                .request_json::<T>(spec)
                .await
                .map(ApiResponse::into_data),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(data) => {
                if let Some(hook) = self.on_success.as_mut() {
                    hook(&data);
                }
                self.data = Some(data);
                self.data.as_ref()
            }
            Err(err) => {
                let normalized = NormalizedError::from(&err);
                if let Some(hook) = self.on_error.as_mut() {
                    hook(&normalized);
                }
                self.error = Some(normalized);
                None
            }
        }
    }

    pub fn reset(&mut self) {
        self.data = None;
        self.error = None;
    }
}
