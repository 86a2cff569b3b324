use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub response_time: Duration,
    pub body: String,
}

impl FetchResult {
    pub fn new(url: String) -> Self {
        Self {
            url,
            status_code: 0,
            content_type: None,
            content_length: None,
            response_time: Duration::from_secs(0),
            body: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Parse the body as JSON, treating any non-2xx status as a failure.
    pub fn into_json(self) -> Result<Value> {
        if !self.is_success() {
            return Err(ScanError::Status {
                status: self.status_code,
                url: self.url,
            });
        }

        serde_json::from_str(&self.body).map_err(|e| {
            ScanError::ParseError(format!("Response from {} is not JSON: {}", self.url, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(status_code: u16, body: &str) -> FetchResult {
        let mut result = FetchResult::new("http://example.com/detail".to_string());
        result.status_code = status_code;
        result.body = body.to_string();
        result
    }

    #[test]
    fn test_into_json_success() {
        let value = result_with(200, r#"{"status":"active"}"#).into_json().unwrap();
        assert_eq!(value["status"], "active");
    }

    #[test]
    fn test_into_json_rejects_error_status() {
        let err = result_with(404, "{}").into_json().unwrap_err();
        assert!(matches!(err, ScanError::Status { status: 404, .. }));
    }

    #[test]
    fn test_into_json_rejects_non_json_body() {
        let err = result_with(200, "<html></html>").into_json().unwrap_err();
        assert!(matches!(err, ScanError::ParseError(_)));
    }
}
