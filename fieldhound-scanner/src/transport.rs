use crate::error::{Result, ScanError};
use crate::request::OutboundRequest;
use crate::result::FetchResult;
use reqwest::{Client, Method};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Performs one HTTP exchange. Timeouts and connection handling are the
/// implementation's business; callers only see the outcome.
pub trait Transport: Send + Sync {
    fn send(&self, request: OutboundRequest) -> impl Future<Output = Result<FetchResult>> + Send;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let timeout_secs = timeout_secs.max(1);
        let client = Client::builder()
            .user_agent(concat!("Fieldhound/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(50) // Connection pooling
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ScanError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: OutboundRequest) -> Result<FetchResult> {
        let url = Url::parse(&request.url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", request.url, e)))?;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| ScanError::InvalidRequest(format!("Unknown method {}", request.method)))?;

        debug!("{} {}", method, url);

        let mut builder = self.client.request(method, url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let start = Instant::now();
        let response = builder.send().await?;
        let response_time = start.elapsed();

        let status_code = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let content_length = response.content_length();

        let body = response.text().await?;

        let mut result = FetchResult::new(request.url);
        result.status_code = status_code;
        result.content_type = content_type;
        result.content_length = content_length;
        result.response_time = response_time;
        result.body = body;

        debug!(
            "{} answered {} in {}ms",
            result.url,
            status_code,
            response_time.as_millis()
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string, header, method, path, query_param},
    };

    #[tokio::test]
    async fn test_get_with_query_and_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/detail"))
            .and(query_param("userId", "u1"))
            .and(header("x-token", "abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"status":"active"}"#, "application/json"),
            )
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::new().unwrap();
        let request = OutboundRequest::new(
            "GET",
            &format!("{}/api/detail?userId=u1", mock_server.uri()),
        )
        .with_header("x-token", "abc");

        let result = transport.send(request).await.unwrap();

        assert_eq!(result.status_code, 200);
        assert_eq!(result.content_type.as_deref(), Some("application/json"));
        assert_eq!(result.into_json().unwrap()["status"], "active");
    }

    #[tokio::test]
    async fn test_post_forwards_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/detail"))
            .and(body_string(r#"{"userId":"u2"}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::new().unwrap();
        let request = OutboundRequest::new("POST", &format!("{}/api/detail", mock_server.uri()))
            .with_body(Some(r#"{"userId":"u2"}"#.to_string()));

        let result = transport.send(request).await.unwrap();
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_error_status_is_reported_not_raised() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::new().unwrap();
        let request = OutboundRequest::new("GET", &format!("{}/missing", mock_server.uri()));

        let result = transport.send(request).await.unwrap();
        assert_eq!(result.status_code, 500);
        assert!(result.into_json().is_err());
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let transport = HttpTransport::new().unwrap();
        let err = transport
            .send(OutboundRequest::new("GET", "not a url"))
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::InvalidUrl(_)));
    }
}
