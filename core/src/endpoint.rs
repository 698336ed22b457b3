//! Target URL construction.
//!
//! Paths are resolved against the base URL with WHATWG join rules, so a
//! leading `/` replaces any path on the base. Without a base the path is
//! resolved against a placeholder origin that is stripped again afterwards,
//! which keeps the result relative.

use std::collections::BTreeMap;

use url::{Position, Url};

use crate::error::ApiError;
use crate::request::QueryValue;

const PLACEHOLDER_BASE: &str = "http://localhost";

pub fn build_url(
    base: Option<&Url>,
    path: &str,
    params: &BTreeMap<String, QueryValue>,
) -> Result<String, ApiError> {
    let placeholder;
    let root = match base {
        Some(base) => base,
        None => {
            placeholder = Url::parse(PLACEHOLDER_BASE)
                .map_err(|e| ApiError::Config(format!("placeholder base: {e}")))?;
            &placeholder
        }
    };
    let mut url = root
        .join(path)
        .map_err(|e| ApiError::Config(format!("invalid request path {path:?}: {e}")))?;

    let rendered: BTreeMap<&str, String> = params
        .iter()
        .filter_map(|(key, value)| value.render().map(|v| (key.as_str(), v)))
        .collect();
    if !rendered.is_empty() {
        // Setting a key replaces whatever the path already carried for it.
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !rendered.contains_key(key.as_ref()))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .extend_pairs(rendered);
    }

    if base.is_none() && url.origin() == root.origin() {
        return Ok(url[Position::BeforePath..].to_string());
    }
    Ok(url.into())
}
