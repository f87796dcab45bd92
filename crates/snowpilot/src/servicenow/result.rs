use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{json, Value};

use crate::errors::AgentError;

/// Acknowledgement returned in place of a body for `204 No Content`
pub const NO_CONTENT_MESSAGE: &str = "Operation completed (no content returned)";

/// Number of characters of a non-JSON error body kept as the failure detail
pub const ERROR_DETAIL_SNIPPET: usize = 500;

/// The normalized outcome of a ServiceNow call.
///
/// Serializes to `{"success": true, "data": ...}` or
/// `{"success": false, "error": ..., "detail": ..., "status_code": ...}`,
/// which is the text the model sees as a tool result.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCallResult {
    Success {
        data: Value,
    },
    Failure {
        error: String,
        detail: Option<String>,
        /// HTTP status of the response; absent for failures raised before
        /// or instead of a request
        status_code: Option<u16>,
    },
}

impl RemoteCallResult {
    pub fn success(data: Value) -> Self {
        RemoteCallResult::Success { data }
    }

    /// A failure that did not come from an HTTP response
    pub fn failure<S: Into<String>>(error: S) -> Self {
        RemoteCallResult::Failure {
            error: error.into(),
            detail: None,
            status_code: None,
        }
    }

    pub fn http_failure<S: Into<String>>(status: u16, error: S, detail: Option<String>) -> Self {
        RemoteCallResult::Failure {
            error: error.into(),
            detail: detail.filter(|d| !d.is_empty()),
            status_code: Some(status),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RemoteCallResult::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            RemoteCallResult::Success { data } => Some(data),
            RemoteCallResult::Failure { .. } => None,
        }
    }

    /// The returned records when the payload is a list
    pub fn records(&self) -> &[Value] {
        self.data()
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RemoteCallResult::Failure { error, .. } => Some(error),
            RemoteCallResult::Success { .. } => None,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            RemoteCallResult::Failure { detail, .. } => detail.as_deref(),
            RemoteCallResult::Success { .. } => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            RemoteCallResult::Failure { status_code, .. } => *status_code,
            RemoteCallResult::Success { .. } => None,
        }
    }

    /// Pretty printed JSON, the form handed back to the model
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            json!({"success": false, "error": format!("Could not serialize result: {}", e)})
                .to_string()
        })
    }
}

impl From<AgentError> for RemoteCallResult {
    fn from(error: AgentError) -> Self {
        RemoteCallResult::failure(error.to_string())
    }
}

impl Serialize for RemoteCallResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RemoteCallResult::Success { data } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("data", data)?;
                map.end()
            }
            RemoteCallResult::Failure {
                error,
                detail,
                status_code,
            } => {
                let len = 2 + usize::from(detail.is_some()) + usize::from(status_code.is_some());
                let mut map = serializer.serialize_map(Some(len))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
                if let Some(detail) = detail {
                    map.serialize_entry("detail", detail)?;
                }
                if let Some(status_code) = status_code {
                    map.serialize_entry("status_code", status_code)?;
                }
                map.end()
            }
        }
    }
}

/// Turn a Table API response into a [`RemoteCallResult`].
///
/// 204 is acknowledged, 200/201 unwrap the `result` envelope, anything else
/// becomes a failure carrying the status code.
pub fn normalize_response(status: u16, body: &str) -> RemoteCallResult {
    match status {
        204 => RemoteCallResult::success(json!({ "message": NO_CONTENT_MESSAGE })),
        200 | 201 => match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(mut envelope)) => match envelope.remove("result") {
                Some(result) => RemoteCallResult::success(result),
                None => RemoteCallResult::success(Value::Object(envelope)),
            },
            Ok(other) => RemoteCallResult::success(other),
            Err(_) => RemoteCallResult::success(Value::String(body.to_string())),
        },
        _ => {
            let fallback = format!("HTTP {}", status);
            let envelope = serde_json::from_str::<Value>(body).ok();
            match envelope.as_ref().and_then(|e| e.get("error")).and_then(Value::as_object) {
                Some(error) => {
                    let message = error
                        .get("message")
                        .and_then(Value::as_str)
                        .map(String::from)
                        .unwrap_or(fallback);
                    let detail = match error.get("detail") {
                        Some(Value::String(detail)) => Some(detail.clone()),
                        Some(Value::Null) | None => None,
                        Some(other) => Some(other.to_string()),
                    };
                    RemoteCallResult::http_failure(status, message, detail)
                }
                // not a Table API error envelope; keep the raw body
                None => {
                    let snippet: String = body.chars().take(ERROR_DETAIL_SNIPPET).collect();
                    RemoteCallResult::http_failure(status, fallback, Some(snippet))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_server_error() {
        let result = normalize_response(
            500,
            r#"{"error":{"message":"Internal error","detail":"x"},"status":"failure"}"#,
        );
        assert!(!result.is_success());
        assert_eq!(result.error(), Some("Internal error"));
        assert_eq!(result.detail(), Some("x"));
        assert_eq!(result.status_code(), Some(500));
        assert!(result.data().is_none());
    }

    #[test]
    fn test_unstructured_json_error_keeps_body() {
        for body in [r#"{"error":"Too many requests"}"#, r#"["denied"]"#, r#""Forbidden""#] {
            let result = normalize_response(429, body);
            assert_eq!(result.error(), Some("HTTP 429"));
            assert_eq!(result.detail(), Some(body));
            assert_eq!(result.status_code(), Some(429));
        }
    }

    #[test]
    fn test_no_content_is_acknowledged() {
        let result = normalize_response(204, "");
        assert!(result.is_success());
        assert_eq!(result.data(), Some(&json!({ "message": NO_CONTENT_MESSAGE })));
        assert!(result.error().is_none());
    }

    #[test]
    fn test_result_envelope_is_unwrapped() {
        let result = normalize_response(201, r#"{"result":{"sys_id":"abc","name":"x"}}"#);
        assert_eq!(result.data(), Some(&json!({"sys_id": "abc", "name": "x"})));

        let list = normalize_response(200, r#"{"result":[{"sys_id":"1"},{"sys_id":"2"}]}"#);
        assert_eq!(list.records().len(), 2);
    }

    #[test]
    fn test_body_without_envelope_is_returned_whole() {
        let result = normalize_response(200, r#"{"count": 3}"#);
        assert_eq!(result.data(), Some(&json!({"count": 3})));
    }

    #[test]
    fn test_undecodable_success_body_is_raw_text() {
        let result = normalize_response(200, "<html>ok</html>");
        assert_eq!(result.data(), Some(&json!("<html>ok</html>")));
    }

    #[test]
    fn test_unstructured_error_falls_back_to_status() {
        let body = "x".repeat(ERROR_DETAIL_SNIPPET + 100);
        let result = normalize_response(502, &body);
        assert_eq!(result.error(), Some("HTTP 502"));
        assert_eq!(result.detail().map(str::len), Some(ERROR_DETAIL_SNIPPET));
        assert_eq!(result.status_code(), Some(502));
    }

    #[test]
    fn test_json_error_without_message_uses_status() {
        let result = normalize_response(404, r#"{"error":{"detail":null}}"#);
        assert_eq!(result.error(), Some("HTTP 404"));
        assert_eq!(result.detail(), None);
        assert_eq!(result.status_code(), Some(404));
    }

    #[test]
    fn test_serialized_shapes() {
        let success = serde_json::to_value(RemoteCallResult::success(json!([1])))
            .expect("serializable");
        assert_eq!(success, json!({"success": true, "data": [1]}));

        let failure = serde_json::to_value(RemoteCallResult::http_failure(
            403,
            "Insufficient rights",
            Some(String::new()),
        ))
        .expect("serializable");
        assert_eq!(
            failure,
            json!({"success": false, "error": "Insufficient rights", "status_code": 403})
        );

        let synthetic = serde_json::to_value(RemoteCallResult::from(AgentError::ToolNotFound(
            "frobnicate".into(),
        )))
        .expect("serializable");
        assert_eq!(synthetic, json!({"success": false, "error": "Unknown tool: frobnicate"}));
    }

    #[test]
    fn test_exactly_one_of_data_or_error() {
        let samples = [
            normalize_response(200, r#"{"result":[]}"#),
            normalize_response(201, "not json"),
            normalize_response(204, ""),
            normalize_response(400, r#"{"error":{"message":"bad"}}"#),
            normalize_response(503, "unavailable"),
            RemoteCallResult::failure("Invalid parameters: missing 'table'"),
        ];
        for result in samples {
            assert_ne!(result.data().is_some(), result.error().is_some());
            assert_eq!(result.is_success(), result.data().is_some());
        }
    }
}
