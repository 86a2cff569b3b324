use serde::{Deserialize, Serialize};

/// Headers that describe the captured connection rather than the request itself.
const SKIPPED_HEADERS: &[&str] = &[
    "host",
    "content-length",
    "connection",
    "accept-encoding",
    "transfer-encoding",
];

/// A fully resolved request handed to a [`crate::Transport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl OutboundRequest {
    pub fn new(method: &str, url: &str) -> Self {
        let method = if method.trim().is_empty() {
            "GET".to_string()
        } else {
            method.trim().to_uppercase()
        };

        Self {
            method,
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if SKIPPED_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
            return self;
        }
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Option<String>) -> Self {
        self.body = body.filter(|b| !b.is_empty());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_defaults_to_get() {
        assert_eq!(OutboundRequest::new("", "http://x").method, "GET");
        assert_eq!(OutboundRequest::new("post", "http://x").method, "POST");
    }

    #[test]
    fn test_with_header_replaces_case_insensitively() {
        let request = OutboundRequest::new("GET", "http://x")
            .with_header("Content-Type", "text/plain")
            .with_header("content-type", "application/json");

        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_connection_headers_are_skipped() {
        let request = OutboundRequest::new("GET", "http://x")
            .with_header("Host", "example.com")
            .with_header("Content-Length", "12");

        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_empty_body_is_dropped() {
        let request = OutboundRequest::new("POST", "http://x").with_body(Some(String::new()));
        assert!(request.body.is_none());
    }
}
