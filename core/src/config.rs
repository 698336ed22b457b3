//! Client configuration.
//!
//! # Design
//! The base URL and default headers are resolved once, when the client is
//! constructed, instead of being read from the process environment on every
//! call. `from_env` is the only place that touches environment variables.

use std::collections::BTreeMap;

use url::Url;

use crate::error::ApiError;

/// Environment variables consulted by `ClientConfig::from_env`, in order.
pub const BASE_URL_ENV_VARS: [&str; 2] = ["NEXT_PUBLIC_API_URL", "API_URL"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientConfig {
    base_url: Option<Url>,
    default_headers: BTreeMap<String, String>,
}

impl ClientConfig {
    /// No base URL: request paths stay relative.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// First non-blank value among `BASE_URL_ENV_VARS`, as returned by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let base = BASE_URL_ENV_VARS
            .iter()
            .filter_map(|&var| lookup(var))
            .find(|value| !value.trim().is_empty());
        match base {
            Some(base) => Self::new().with_base_url(&base),
            None => Ok(Self::new()),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ApiError::Config(format!("invalid base URL {base_url:?}: {e}")))?;
        self.base_url = Some(parsed);
        Ok(self)
    }

    /// Header sent with every request unless the request sets it itself.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn default_headers(&self) -> &BTreeMap<String, String> {
        &self.default_headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_has_no_base_url() {
        assert!(ClientConfig::new().base_url().is_none());
    }

    #[test]
    fn base_url_must_parse() {
        let config = ClientConfig::new().with_base_url("https://api.example.com").unwrap();
        assert_eq!(config.base_url().unwrap().as_str(), "https://api.example.com/");

        let err = ClientConfig::new().with_base_url("not a url").unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
    }

    #[test]
    fn public_api_url_wins() {
        let config = ClientConfig::from_lookup(vars(&[
            ("NEXT_PUBLIC_API_URL", "https://public.example.com"),
            ("API_URL", "https://server.example.com"),
        ]))
        .unwrap();
        assert_eq!(config.base_url().unwrap().host_str(), Some("public.example.com"));
    }

    #[test]
    fn blank_public_api_url_falls_through() {
        let config = ClientConfig::from_lookup(vars(&[
            ("NEXT_PUBLIC_API_URL", "  "),
            ("API_URL", "https://server.example.com"),
        ]))
        .unwrap();
        assert_eq!(config.base_url().unwrap().host_str(), Some("server.example.com"));
    }

    #[test]
    fn no_variables_means_relative_paths() {
        let config = ClientConfig::from_lookup(vars(&[("API_URL", "")])).unwrap();
        assert!(config.base_url().is_none());
    }

    #[test]
    fn unparsable_env_base_is_a_config_error() {
        let err = ClientConfig::from_lookup(vars(&[("API_URL", "nope")])).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn default_headers_accumulate() {
        let config = ClientConfig::new()
            .with_default_header("accept", "application/json")
            .with_default_header("x-client", "api-core");
        assert_eq!(config.default_headers().len(), 2);
    }
}
