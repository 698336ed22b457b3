//! Response parsing.
//!
//! # Design
//! Content type decides the payload shape: JSON bodies become a
//! `serde_json::Value` (a malformed JSON body becomes `Value::Null` rather
//! than an error), everything else becomes a `Value::String` with the body
//! text. Non-2xx responses turn into `ApiError::Http` carrying the best
//! message the payload offers.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{find_header, HttpResponse};

/// A successful response. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T = Value> {
    data: T,
    status: u16,
    headers: Vec<(String, String)>,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, status: u16, headers: Vec<(String, String)>) -> Self {
        Self {
            data,
            status,
            headers,
        }
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

impl ApiResponse<Value> {
    /// Decode the payload into a concrete type, keeping status and headers.
    pub fn decode<T: DeserializeOwned>(self) -> Result<ApiResponse<T>, ApiError> {
        let data = serde_json::from_value(self.data).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(ApiResponse {
            data,
            status: self.status,
            headers: self.headers,
        })
    }
}

fn is_json(response: &HttpResponse) -> bool {
    response
        .header("content-type")
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
}

/// Prefer a non-empty `message`, then `error`, from a JSON error payload.
fn payload_message(payload: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .filter_map(|key| payload.get(key).and_then(Value::as_str))
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

pub fn parse_response(response: HttpResponse) -> Result<ApiResponse<Value>, ApiError> {
    let json = is_json(&response);
    let payload = if json {
        serde_json::from_slice(&response.body).unwrap_or(Value::Null)
    } else {
        Value::String(String::from_utf8_lossy(&response.body).into_owned())
    };

    if !response.is_success() {
        let message = json
            .then(|| payload_message(&payload))
            .flatten()
            .unwrap_or(response.status_text);
        return Err(ApiError::Http {
            message,
            status: response.status,
            info: Some(payload),
        });
    }

    Ok(ApiResponse::new(payload, response.status, response.headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn response(status: u16, status_text: &str, content_type: Option<&str>, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            status_text: status_text.to_string(),
            headers: content_type
                .map(|ct| vec![("content-type".to_string(), ct.to_string())])
                .unwrap_or_default(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn json_success_is_decoded() {
        let resp = response(200, "OK", Some("application/json; charset=utf-8"), r#"{"ok":true}"#);
        let parsed = parse_response(resp).unwrap();
        assert_eq!(parsed.status(), 200);
        assert_eq!(parsed.data(), &json!({"ok": true}));
        assert_eq!(parsed.header("Content-Type"), Some("application/json; charset=utf-8"));
    }

    #[test]
    fn json_error_uses_message_field() {
        let resp = response(400, "Bad Request", Some("application/json"), r#"{"message":"bad"}"#);
        let err = parse_response(resp).unwrap_err();
        match err {
            ApiError::Http {
                message,
                status,
                info,
            } => {
                assert_eq!(message, "bad");
                assert_eq!(status, 400);
                assert_eq!(info, Some(json!({"message": "bad"})));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn json_error_falls_back_to_error_field_then_status_text() {
        let resp = response(401, "Unauthorized", Some("application/json"), r#"{"error":"Missing token"}"#);
        assert_eq!(parse_response(resp).unwrap_err().to_string(), "Missing token");

        let resp = response(500, "Internal Server Error", Some("application/json"), r#"{"code":7}"#);
        assert_eq!(parse_response(resp).unwrap_err().to_string(), "Internal Server Error");
    }

    #[test]
    fn text_error_uses_status_text_and_keeps_body_as_info() {
        let resp = response(502, "Bad Gateway", Some("text/html"), "<h1>upstream down</h1>");
        let err = parse_response(resp).unwrap_err();
        assert_eq!(err.to_string(), "Bad Gateway");
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.info(), Some(&json!("<h1>upstream down</h1>")));
    }

    #[test]
    fn no_content_yields_empty_text() {
        let parsed = parse_response(response(204, "No Content", None, "")).unwrap();
        assert_eq!(parsed.status(), 204);
        assert_eq!(parsed.data(), &json!(""));
    }

    // Malformed JSON is read as null on purpose; it is not surfaced as an error.
    #[test]
    fn malformed_json_body_becomes_null() {
        let parsed = parse_response(response(200, "OK", Some("application/json"), "{not json")).unwrap();
        assert_eq!(parsed.data(), &Value::Null);

        let err = parse_response(response(503, "Service Unavailable", Some("application/json"), "oops"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Service Unavailable");
        assert_eq!(err.info(), Some(&Value::Null));
    }

    #[test]
    fn decode_into_typed_payload() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Health {
            status: String,
        }

        let parsed = parse_response(response(200, "OK", Some("application/json"), r#"{"status":"ok"}"#))
            .unwrap()
            .decode::<Health>()
            .unwrap();
        assert_eq!(parsed.data(), &Health { status: "ok".to_string() });
        assert_eq!(parsed.status(), 200);

        let err = parse_response(response(200, "OK", Some("text/plain"), "ok"))
            .unwrap()
            .decode::<Health>()
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
