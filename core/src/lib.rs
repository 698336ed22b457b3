//! Resilient HTTP request client.
//!
//! # Overview
//! Turns a declarative `RequestSpec` into HTTP attempts over a pluggable
//! `Transport`, bounding every attempt with a timeout, retrying failures with
//! linear backoff, parsing bodies by content type, and reducing every failure
//! to one `NormalizedError` shape at the boundary.
//!
//! # Design
//! - `Client` is stateless between calls: configuration plus a shared
//!   transport. Retry and cancellation state live only inside one call.
//! - The network sits behind the `Transport` trait. `ReqwestTransport` is the
//!   default; tests drive the client through scripted transports.
//! - `build_request` and `parse_response` are plain functions of data, so URL,
//!   header and parsing rules are testable without I/O.
//! - `TrackedRequest` layers base/override merging and last-outcome tracking
//!   on top of the client.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod normalize;
pub mod request;
pub mod response;
pub mod tracked;
pub mod transport;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{ApiError, TransportError};
pub use http::{FetchHints, HttpMethod, HttpRequest, HttpResponse, Revalidate, RevalidateAfter};
pub use normalize::{normalize_api_error, NormalizedError};
pub use request::{PartialRequest, QueryValue, RequestBody, RequestOptions, RequestSpec, RetryPolicy};
pub use response::{parse_response, ApiResponse};
pub use tracked::TrackedRequest;
pub use transport::{ReqwestTransport, Transport};
