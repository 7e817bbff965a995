/*
[INPUT]:  HTTP configuration (timeouts) and prepared requests
[OUTPUT]: Raw transport responses (status, headers, body)
[POS]:    HTTP layer - transport abstraction and reqwest implementation
[UPDATE]: When adding connection options or changing transport behavior
*/

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::http::Result;

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl HttpConfig {
    pub fn build_client(&self) -> Result<Client> {
        Ok(Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()?)
    }
}

/// A fully described request, replayable across retries
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl PreparedRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post<B: Serialize>(url: impl Into<String>, body: &B) -> Result<Self> {
        Ok(Self {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body: Some(serde_json::to_value(body)?),
        })
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Sends one request attempt; retries and status mapping live above this seam
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &PreparedRequest) -> Result<TransportResponse>;
}

/// Transport backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: config.build_client()?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &PreparedRequest) -> Result<TransportResponse> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_prepared_post_serializes_body() {
        let request = PreparedRequest::post(
            "https://example.invalid/x",
            &serde_json::json!({"is_active": true}),
        )
        .unwrap()
        .header("Cookie", "gravity=t");

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body, Some(serde_json::json!({"is_active": true})));
        assert_eq!(request.headers, vec![("Cookie".to_string(), "gravity=t".to_string())]);
    }

    #[tokio::test]
    async fn test_reqwest_transport_sends_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(header("x-grvt-account-id", "ACC-1"))
            .and(body_json(serde_json::json!({"a": 1})))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(&HttpConfig::default()).unwrap();
        let request = PreparedRequest::post(
            format!("{}/echo", server.uri()),
            &serde_json::json!({"a": 1}),
        )
        .unwrap()
        .header("X-Grvt-Account-Id", "ACC-1");

        let response = transport.execute(&request).await.unwrap();
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.body, "created");
    }
}
