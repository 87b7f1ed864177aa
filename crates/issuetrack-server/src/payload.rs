//! Request body extraction.
//!
//! Bodies arrive as JSON objects or as `application/x-www-form-urlencoded`
//! forms. Both decode to the same loosely typed [`Fields`] map; form values
//! are always strings.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use issuetrack::service::{Fields, Rejection, Reply};
use serde_json::Value;
use tracing::debug;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A decoded request body.
///
/// An empty body decodes to an empty map. A body that cannot be decoded is
/// answered with `{"error": "invalid request body"}` and status 200, like
/// every other logical error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload(pub Fields);

impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = is_form(req.headers());

        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            debug!(error = %e, "Failed to read request body");
            invalid_body()
        })?;

        decode(&bytes, is_form).map(Payload).map_err(|reason| {
            debug!(%reason, "Rejected request body");
            invalid_body()
        })
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(FORM_CONTENT_TYPE))
}

/// Decode a body as a form or, otherwise, as a JSON object.
fn decode(bytes: &[u8], is_form: bool) -> Result<Fields, String> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Fields::new());
    }

    if is_form {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_bytes(bytes).map_err(|e| e.to_string())?;
        return Ok(pairs
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect());
    }

    match serde_json::from_slice(bytes).map_err(|e| e.to_string())? {
        Value::Object(fields) => Ok(fields),
        other => Err(format!("expected a JSON object, got {other}")),
    }
}

fn invalid_body() -> Response {
    Json(Reply::<()>::rejected(Rejection::InvalidBody, None)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(b"" as &[u8], false)]
    #[case(b"  \n", false)]
    #[case(b"", true)]
    fn test_empty_body_is_empty_object(#[case] body: &[u8], #[case] is_form: bool) {
        assert_eq!(decode(body, is_form).unwrap(), Fields::new());
    }

    #[test]
    fn test_decode_json_object() {
        let fields = decode(br#"{"_id": "abc", "open": false}"#, false).unwrap();

        assert_eq!(fields.get("_id"), Some(&json!("abc")));
        assert_eq!(fields.get("open"), Some(&json!(false)));
    }

    #[test]
    fn test_decode_form() {
        let fields = decode(b"issue_title=Fix+it&created_by=Joe%20B&assigned_to=", true).unwrap();

        assert_eq!(fields.get("issue_title"), Some(&json!("Fix it")));
        assert_eq!(fields.get("created_by"), Some(&json!("Joe B")));
        assert_eq!(fields.get("assigned_to"), Some(&json!("")));
    }

    #[rstest]
    #[case(b"{not json" as &[u8])]
    #[case(b"[1, 2]")]
    #[case(b"\"text\"")]
    fn test_decode_rejects_non_objects(#[case] body: &[u8]) {
        assert!(decode(body, false).is_err());
    }

    #[rstest]
    #[case("application/x-www-form-urlencoded", true)]
    #[case("application/x-www-form-urlencoded; charset=utf-8", true)]
    #[case("application/json", false)]
    fn test_is_form(#[case] content_type: &str, #[case] expected: bool) {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        assert_eq!(is_form(&headers), expected);
    }
}
