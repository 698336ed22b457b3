//! HS256 JSON Web Tokens for the mock auth endpoints.
//!
//! # Design
//! Tokens are `base64url(header).base64url(claims).base64url(hmac)` with no
//! padding. Only `HS256` is accepted on the way back in. Issue and verify take
//! the current Unix time explicitly so expiry is testable; `AuthConfig` wraps
//! them with the wall clock.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(2 * 60 * 60);
pub const FALLBACK_SECRET: &str = "dev-insecure-secret-change-me";
pub const SECRET_ENV_VARS: [&str; 2] = ["AUTH_SECRET", "NEXT_PUBLIC_AUTH_SECRET"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("token is malformed")]
    Malformed,

    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,

    #[error("signature verification failed")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("invalid signing key")]
    InvalidKey,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: u64,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<Uuid>,
}

fn mac(secret: &[u8], signing_input: &str) -> Result<HmacSha256, AuthError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| AuthError::InvalidKey)?;
    mac.update(signing_input.as_bytes());
    Ok(mac)
}

fn encode_part<T: Serialize>(value: &T) -> Result<String, AuthError> {
    let bytes = serde_json::to_vec(value).map_err(|_| AuthError::Malformed)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

fn decode_part<T: for<'de> Deserialize<'de>>(part: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD.decode(part).map_err(|_| AuthError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::Malformed)
}

pub fn sign_token(email: &str, secret: &[u8], now: u64, ttl: Duration) -> Result<String, AuthError> {
    let header = Header {
        alg: "HS256".to_string(),
        typ: Some("JWT".to_string()),
    };
    let claims = Claims {
        sub: email.to_string(),
        email: email.to_string(),
        iat: now,
        exp: now + ttl.as_secs(),
        jti: Some(Uuid::new_v4()),
    };
    let signing_input = format!("{}.{}", encode_part(&header)?, encode_part(&claims)?);
    let signature = mac(secret, &signing_input)?.finalize().into_bytes();
    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

pub fn verify_token(token: &str, secret: &[u8], now: u64) -> Result<Claims, AuthError> {
    let mut parts = token.split('.');
    let (Some(header_part), Some(claims_part), Some(sig_part), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::Malformed);
    };

    let header: Header = decode_part(header_part)?;
    if header.alg != "HS256" {
        return Err(AuthError::UnsupportedAlgorithm);
    }

    let signature = URL_SAFE_NO_PAD
        .decode(sig_part)
        .map_err(|_| AuthError::Malformed)?;
    mac(secret, &format!("{header_part}.{claims_part}"))?
        .verify_slice(&signature)
        .map_err(|_| AuthError::BadSignature)?;

    let claims: Claims = decode_part(claims_part)?;
    if claims.exp <= now {
        return Err(AuthError::Expired);
    }
    Ok(claims)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Signing secret, token lifetime and cookie policy.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    secret: Vec<u8>,
    ttl: Duration,
    secure_cookie: bool,
}

impl AuthConfig {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            ttl: DEFAULT_TOKEN_TTL,
            secure_cookie: false,
        }
    }

    /// First non-empty secret variable, else the development fallback.
    /// Cookies are marked `Secure` when `APP_ENV` is `production`.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secret = SECRET_ENV_VARS
            .iter()
            .filter_map(|&var| lookup(var))
            .find(|value| !value.is_empty())
            .unwrap_or_else(|| FALLBACK_SECRET.to_string());
        let production = lookup("APP_ENV").is_some_and(|env| env == "production");
        Self::new(secret).with_secure_cookie(production)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }

    pub fn issue(&self, email: &str) -> Result<String, AuthError> {
        sign_token(email, &self.secret, unix_now(), self.ttl)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        verify_token(token, &self.secret, unix_now())
    }

    pub fn session_cookie(&self, token: &str) -> String {
        let secure = if self.secure_cookie { "; Secure" } else { "" };
        format!("token={token}; HttpOnly; SameSite=Lax; Path=/{secure}")
    }
}
