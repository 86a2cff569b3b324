// Captured request descriptors supplied by the traffic capture layer

use crate::error::{AnalysisError, Result};
use fieldhound_scanner::OutboundRequest;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Immutable snapshot of one captured HTTP exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CapturedRequest {
    pub origin: String,
    pub path: String,
    pub method: String,
    pub request_body: Option<String>,
    pub request_headers: Map<String, Value>,
    pub request_cookies: Vec<Value>,
    pub response_status: Option<u16>,
    pub response_headers: Map<String, Value>,
    pub response_body: Option<String>,
}

impl CapturedRequest {
    pub fn new(origin: &str, path: &str, method: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            path: path.to_string(),
            method: method.to_string(),
            ..Default::default()
        }
    }

    pub fn with_request_body(mut self, body: &str) -> Self {
        self.request_body = Some(body.to_string());
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.request_headers
            .insert(name.to_string(), Value::String(value.to_string()));
        self
    }

    pub fn with_response_body(mut self, body: &str) -> Self {
        self.response_body = Some(body.to_string());
        self
    }

    /// Origin joined with path.
    pub fn url(&self) -> String {
        if self.path.is_empty() || self.path.starts_with('/') {
            format!("{}{}", self.origin, self.path)
        } else {
            format!("{}/{}", self.origin, self.path)
        }
    }

    pub fn method(&self) -> String {
        if self.method.trim().is_empty() {
            "GET".to_string()
        } else {
            self.method.trim().to_uppercase()
        }
    }

    /// Methods whose parameters travel in the body rather than the query string.
    pub fn is_body_method(&self) -> bool {
        matches!(self.method().as_str(), "POST" | "PUT" | "PATCH")
    }

    /// The request body parsed as a JSON object.
    pub fn body_object(&self) -> Result<Map<String, Value>> {
        let body = self
            .request_body
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| AnalysisError::InvalidTemplate("request body is empty".to_string()))?;

        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(AnalysisError::InvalidTemplate(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
            Err(e) => Err(AnalysisError::InvalidTemplate(e.to_string())),
        }
    }

    pub fn response_json(&self) -> Result<Value> {
        let body = self.response_body.as_deref().unwrap_or_default();
        serde_json::from_str(body)
            .map_err(|e| AnalysisError::InvalidTemplate(format!("captured response is not JSON: {}", e)))
    }

    /// Header pairs with non-string values rendered as JSON.
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.request_headers
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name.clone(), value)
            })
            .collect()
    }

    /// `Cookie` header value built from the captured cookies, if any.
    pub fn cookie_header(&self) -> Option<String> {
        let pairs: Vec<String> = self
            .request_cookies
            .iter()
            .filter_map(|cookie| {
                let name = cookie.get("name")?.as_str()?;
                let value = cookie.get("value").and_then(Value::as_str).unwrap_or("");
                Some(format!("{}={}", name, value))
            })
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    /// Replay this capture against `url` with the given body.
    pub fn to_outbound(&self, url: &str, body: Option<String>) -> OutboundRequest {
        let mut request =
            OutboundRequest::new(&self.method(), url).with_header("Content-Type", "application/json");
        for (name, value) in self.header_pairs() {
            request = request.with_header(&name, &value);
        }
        if let Some(cookies) = self.cookie_header() {
            request = request.with_header("Cookie", &cookies);
        }
        request.with_body(body)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Where the item array and pagination metadata live in a list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListConfig {
    pub list_path: String,
    #[serde(default)]
    pub total_path: Option<String>,
    #[serde(default)]
    pub page_path: Option<String>,
    #[serde(default)]
    pub page_size_path: Option<String>,
}

impl ListConfig {
    pub fn new(list_path: &str) -> Self {
        Self {
            list_path: list_path.to_string(),
            total_path: None,
            page_path: None,
            page_size_path: None,
        }
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self::new("data.list")
    }
}

/// Load a capture from a JSON file.
pub fn load_capture(path: &Path) -> Result<CapturedRequest> {
    let content = fs::read_to_string(path).map_err(|e| AnalysisError::CaptureLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let capture: CapturedRequest =
        serde_json::from_str(&content).map_err(|e| AnalysisError::CaptureLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    if capture.origin.is_empty() {
        return Err(AnalysisError::CaptureLoad {
            path: path.display().to_string(),
            reason: "capture has no origin".to_string(),
        });
    }

    Ok(capture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_capture_json() {
        let raw = json!({
            "origin": "https://api.example.com",
            "path": "/v1/detail",
            "method": "post",
            "requestBody": "{\"userId\":\"\"}",
            "requestHeaders": {"Authorization": "Bearer x", "X-Count": 3},
            "requestCookies": [{"name": "sid", "value": "abc"}],
            "responseStatus": 200,
            "responseBody": "{}"
        });

        let capture: CapturedRequest = serde_json::from_value(raw).unwrap();

        assert_eq!(capture.url(), "https://api.example.com/v1/detail");
        assert_eq!(capture.method(), "POST");
        assert!(capture.is_body_method());
        assert_eq!(capture.body_object().unwrap().len(), 1);
        assert_eq!(capture.cookie_header().as_deref(), Some("sid=abc"));
        assert!(capture.header_pairs().contains(&("X-Count".to_string(), "3".to_string())));
    }

    #[test]
    fn test_url_joins_relative_path() {
        let capture = CapturedRequest::new("http://h/", "detail", "GET");
        assert_eq!(capture.url(), "http://h/detail");
    }

    #[test]
    fn test_body_object_rejects_non_objects() {
        let capture = CapturedRequest::new("http://h", "/d", "GET").with_request_body("[1,2]");
        assert!(matches!(
            capture.body_object(),
            Err(AnalysisError::InvalidTemplate(_))
        ));

        let capture = CapturedRequest::new("http://h", "/d", "GET");
        assert!(capture.body_object().is_err());
    }

    #[test]
    fn test_to_outbound_sends_json_content_type_and_cookies() {
        let mut capture = CapturedRequest::new("http://h", "/d", "GET").with_header("X-Trace", "1");
        capture.request_cookies = vec![json!({"name": "a", "value": "1"}), json!({"name": "b", "value": "2"})];

        let request = capture.to_outbound("http://h/d?x=1", None);

        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("x-trace"), Some("1"));
        assert_eq!(request.header("cookie"), Some("a=1; b=2"));
    }
}
