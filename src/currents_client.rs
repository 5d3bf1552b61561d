use std::time::Instant;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::{config::CurrentsSettings, errors::ApiError};

/// Upstream endpoint families exposed by the Currents API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Search,
    LatestNews,
    AvailableRegions,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::LatestNews => "latest-news",
            Self::AvailableRegions => "available/regions",
        }
    }
}

pub type QueryParams = Vec<(&'static str, String)>;

/// Source of raw Currents API payloads. Each call issues at most one request.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch(&self, endpoint: Endpoint, params: &QueryParams) -> Result<Value, ApiError>;
}

#[derive(Debug, Clone)]
pub struct CurrentsClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl CurrentsClient {
    pub fn new(settings: &CurrentsSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
            timeout_secs: settings.timeout_secs,
        })
    }

    fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url, ApiError> {
        self.base_url.join(endpoint.path()).map_err(|err| {
            ApiError::NetworkFailure(format!("invalid endpoint url for {}: {err}", endpoint.path()))
        })
    }

    fn classify_transport_error(&self, err: reqwest::Error) -> ApiError {
        // The request URL carries the API key; never let it reach a message.
        let err = err.without_url();
        if err.is_timeout() {
            ApiError::Timeout {
                seconds: self.timeout_secs,
            }
        } else if err.is_connect() {
            ApiError::NetworkFailure(format!("connection failed: {err}"))
        } else {
            ApiError::NetworkFailure(err.to_string())
        }
    }
}

#[async_trait]
impl NewsProvider for CurrentsClient {
    async fn fetch(&self, endpoint: Endpoint, params: &QueryParams) -> Result<Value, ApiError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ApiError::missing_api_key());
        };

        let url = self.endpoint_url(endpoint)?;
        let started_at = Instant::now();
        debug!(endpoint = endpoint.path(), "currents request");

        let result = async {
            let response = self
                .client
                .get(url)
                .query(&[("apiKey", api_key)])
                .query(params)
                .send()
                .await
                .map_err(|err| self.classify_transport_error(err))?;

            let status = response.status();
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let body = response
                .bytes()
                .await
                .map_err(|err| self.classify_transport_error(err))?;

            classify_response(status, retry_after, &body)
        }
        .await;

        let elapsed_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(_) => info!(
                endpoint = endpoint.path(),
                duration_ms = elapsed_ms,
                "currents request succeeded"
            ),
            Err(err) => warn!(
                endpoint = endpoint.path(),
                duration_ms = elapsed_ms,
                kind = err.kind(),
                error = %err,
                "currents request failed"
            ),
        }

        result
    }
}

/// Maps an HTTP outcome onto the upstream error taxonomy.
pub fn classify_response(
    status: StatusCode,
    retry_after: Option<String>,
    body: &[u8],
) -> Result<Value, ApiError> {
    match status.as_u16() {
        200 => serde_json::from_slice(body)
            .map_err(|err| ApiError::MalformedResponse(format!("invalid json body: {err}"))),
        401 | 403 => Err(ApiError::AuthFailure {
            detail: format!(
                "Currents API rejected the API key (HTTP {}); check CURRENTS_API_KEY",
                status.as_u16()
            ),
        }),
        429 => Err(ApiError::RateLimited { retry_after }),
        code if status.is_success() => Err(ApiError::MalformedResponse(format!(
            "expected HTTP 200 with a json body, got HTTP {code}"
        ))),
        code => Err(ApiError::UpstreamError {
            status: code,
            detail: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_ascii_lowercase(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn settings(base_url: &str, api_key: Option<&str>) -> CurrentsSettings {
        CurrentsSettings {
            api_key: api_key.map(str::to_string),
            base_url: Url::parse(&format!("{base_url}/v1/")).expect("valid base url"),
            ..CurrentsSettings::default()
        }
    }

    fn client(server: &MockServer) -> CurrentsClient {
        CurrentsClient::new(&settings(&server.uri(), Some("test-key-123456"))).expect("client")
    }

    #[tokio::test]
    async fn sends_api_key_and_params_as_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("apiKey", "test-key-123456"))
            .and(query_param("keywords", "rust lang"))
            .and(query_param("language", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "news": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let body = client(&server)
            .fetch(
                Endpoint::Search,
                &vec![("keywords", "rust lang".to_string()), ("language", "en".to_string())],
            )
            .await
            .expect("successful fetch");
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/latest-news"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch(Endpoint::LatestNews, &vec![])
            .await
            .expect_err("expected auth failure");
        assert_eq!(err.kind(), "AuthFailure");
        assert!(!err.to_string().contains("test-key-123456"));
    }

    #[tokio::test]
    async fn rate_limit_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "60"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch(Endpoint::Search, &vec![])
            .await
            .expect_err("expected rate limit");
        assert_eq!(
            err,
            ApiError::RateLimited {
                retry_after: Some("60".to_string())
            }
        );
    }

    #[tokio::test]
    async fn server_error_maps_to_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch(Endpoint::Search, &vec![])
            .await
            .expect_err("expected upstream error");
        assert!(matches!(err, ApiError::UpstreamError { status: 503, .. }));
    }

    #[tokio::test]
    async fn invalid_json_maps_to_malformed_response() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/latest-news"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch(Endpoint::LatestNews, &vec![])
            .await
            .expect_err("expected malformed response");
        assert_eq!(err.kind(), "MalformedResponse");
    }

    #[tokio::test]
    async fn no_content_maps_to_malformed_response() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch(Endpoint::Search, &vec![])
            .await
            .expect_err("expected malformed response");
        assert_eq!(
            err,
            ApiError::MalformedResponse(
                "expected HTTP 200 with a json body, got HTTP 204".to_string()
            )
        );
    }

    #[test]
    fn status_classification_covers_each_family() {
        assert!(classify_response(StatusCode::OK, None, b"{}").is_ok());
        assert_eq!(
            classify_response(StatusCode::ACCEPTED, None, b"{}")
                .expect_err("accepted")
                .kind(),
            "MalformedResponse"
        );
        assert_eq!(
            classify_response(StatusCode::FORBIDDEN, None, b"")
                .expect_err("forbidden")
                .kind(),
            "AuthFailure"
        );
        assert_eq!(
            classify_response(StatusCode::NOT_FOUND, None, b"")
                .expect_err("not found"),
            ApiError::UpstreamError {
                status: 404,
                detail: "not found".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn slow_upstream_maps_to_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/latest-news"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "ok", "news": []}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let mut client = client(&server);
        client.client = Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .expect("client");

        let err = client
            .fetch(Endpoint::LatestNews, &vec![])
            .await
            .expect_err("expected timeout");
        assert_eq!(err, ApiError::Timeout { seconds: 15 });
    }

    #[tokio::test]
    async fn unreachable_host_maps_to_network_failure() {
        let client = CurrentsClient::new(&settings("http://127.0.0.1:1", Some("test-key-123456")))
            .expect("client");

        let err = client
            .fetch(Endpoint::LatestNews, &vec![])
            .await
            .expect_err("expected network failure");
        assert_eq!(err.kind(), "NetworkFailure");
        assert!(!err.to_string().contains("test-key-123456"));
    }

    #[tokio::test]
    async fn missing_key_short_circuits_without_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = CurrentsClient::new(&settings(&server.uri(), None)).expect("client");
        let err = client
            .fetch(Endpoint::LatestNews, &vec![])
            .await
            .expect_err("expected missing key");
        assert_eq!(err, ApiError::missing_api_key());
    }
}
