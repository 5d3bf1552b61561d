use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Transport-level failures surfaced to HTTP or JSON-RPC callers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest {
        code: &'static str,
        message: &'static str,
    },
    #[error("unauthorized: {message}")]
    Unauthorized {
        code: &'static str,
        message: &'static str,
    },
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: &'static str) -> Self {
        Self::BadRequest { code, message }
    }

    pub fn unauthorized(code: &'static str, message: &'static str) -> Self {
        Self::Unauthorized { code, message }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            Self::Unauthorized { code, message } => (StatusCode::UNAUTHORIZED, code, message),
        };

        (
            status,
            Json(ErrorResponse {
                code: code.to_string(),
                message: message.to_string(),
                details: json!({}),
            }),
        )
            .into_response()
    }
}

/// Client-input faults. Raised before any upstream request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported language code '{0}'; see get_available_languages")]
    UnknownLanguage(String),
    #[error("unsupported category '{0}'; see get_available_categories")]
    UnknownCategory(String),
    #[error("country must be a two-letter code, got '{0}'")]
    InvalidCountry(String),
    #[error("{0}")]
    InvalidDateRange(String),
}

impl ValidationError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownLanguage(_) => "UnknownLanguage",
            Self::UnknownCategory(_) => "UnknownCategory",
            Self::InvalidCountry(_) => "InvalidCountry",
            Self::InvalidDateRange(_) => "InvalidDateRange",
        }
    }
}

/// Upstream faults from the Currents API.
///
/// Messages are built from status codes and static text only, so the API key
/// carried in the request query can never end up in them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{detail}")]
    AuthFailure { detail: String },
    #[error("rate limit exceeded{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<String> },
    #[error("upstream error (HTTP {status}): {detail}")]
    UpstreamError { status: u16, detail: String },
    #[error("request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthFailure { .. } => "AuthFailure",
            Self::RateLimited { .. } => "RateLimited",
            Self::UpstreamError { .. } => "UpstreamError",
            Self::Timeout { .. } => "Timeout",
            Self::NetworkFailure(_) => "NetworkFailure",
            Self::MalformedResponse(_) => "MalformedResponse",
        }
    }

    pub fn missing_api_key() -> Self {
        Self::AuthFailure {
            detail: "CURRENTS_API_KEY is not configured".to_string(),
        }
    }
}

fn retry_hint(retry_after: &Option<String>) -> String {
    match retry_after {
        Some(value) => format!("; retry after {value} seconds"),
        None => String::new(),
    }
}

/// Any fault a news tool can report in its error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NewsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl NewsError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(err) => err.kind(),
            Self::Api(err) => err.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiError, NewsError, ValidationError};

    #[test]
    fn rate_limited_message_mentions_retry_after_when_known() {
        let err = ApiError::RateLimited {
            retry_after: Some("120".to_string()),
        };
        assert_eq!(err.to_string(), "rate limit exceeded; retry after 120 seconds");

        let err = ApiError::RateLimited { retry_after: None };
        assert_eq!(err.to_string(), "rate limit exceeded");
    }

    #[test]
    fn news_error_kind_delegates_to_inner_error() {
        let err = NewsError::from(ValidationError::InvalidCountry("usa".to_string()));
        assert_eq!(err.kind(), "InvalidCountry");

        let err = NewsError::from(ApiError::Timeout { seconds: 15 });
        assert_eq!(err.kind(), "Timeout");
        assert_eq!(err.to_string(), "request timed out after 15 seconds");
    }
}
