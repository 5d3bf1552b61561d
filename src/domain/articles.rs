//! Article normalization and the uniform result envelope

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::{ApiError, NewsError};

pub const ARTICLE_SOURCE: &str = "Currents API";

/// Article as returned to MCP clients. `author` and `image` serialize as
/// `null` when the upstream record has no usable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub author: Option<String>,
    pub image: Option<String>,
    pub language: String,
    pub category: Vec<String>,
    pub published: String,
    pub source: &'static str,
}

/// Upstream record. Every field is optional and loosely typed: numeric ids
/// become strings and a bare category string becomes a one-element list.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawArticle {
    #[serde(deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    description: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    author: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    image: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    language: Option<String>,
    #[serde(deserialize_with = "lenient_categories")]
    category: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient_string")]
    published: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn lenient_categories<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        Some(Value::String(single)) if !single.trim().is_empty() => Some(vec![single]),
        _ => None,
    })
}

impl From<RawArticle> for Article {
    fn from(raw: RawArticle) -> Self {
        Self {
            id: raw.id.unwrap_or_default(),
            title: trimmed(raw.title),
            description: trimmed(raw.description),
            url: raw.url.unwrap_or_default(),
            author: present(raw.author),
            image: present(raw.image),
            language: raw.language.unwrap_or_default(),
            category: raw.category.unwrap_or_default(),
            published: raw.published.unwrap_or_default(),
            source: ARTICLE_SOURCE,
        }
    }
}

fn trimmed(value: Option<String>) -> String {
    value.map(|value| value.trim().to_string()).unwrap_or_default()
}

// Upstream sends the literal string "None" for missing images.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty() && value != "None")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResultEnvelope {
    Success {
        total_results: usize,
        articles: Vec<Article>,
        retrieved_at: String,
    },
    Error {
        message: String,
        kind: &'static str,
    },
}

impl ResultEnvelope {
    pub fn success(articles: Vec<Article>) -> Self {
        Self::Success {
            total_results: articles.len(),
            articles,
            retrieved_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn failure(err: &NewsError) -> Self {
        Self::Error {
            message: err.to_string(),
            kind: err.kind(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn summary(&self) -> String {
        match self {
            Self::Success { total_results: 1, .. } => "Returned 1 article".to_string(),
            Self::Success { total_results, .. } => format!("Returned {total_results} articles"),
            Self::Error { message, .. } => message.clone(),
        }
    }
}

/// Turns an upstream outcome into the envelope returned to clients.
pub fn normalize(outcome: Result<Value, ApiError>, limit: usize) -> ResultEnvelope {
    match outcome.and_then(|body| parse_articles(&body, limit)) {
        Ok(articles) => ResultEnvelope::success(articles),
        Err(err) => ResultEnvelope::failure(&NewsError::Api(err)),
    }
}

/// Rejects bodies that are not objects or whose `status` is anything but `"ok"`.
///
/// Currents answers some failures with HTTP 200 and `{"status": "error", "msg": ...}`.
pub fn ensure_ok_status(body: &Value) -> Result<&Map<String, Value>, ApiError> {
    let Some(object) = body.as_object() else {
        return Err(ApiError::MalformedResponse(
            "response body is not a json object".to_string(),
        ));
    };

    match object.get("status").and_then(Value::as_str) {
        Some(status) if status != "ok" => {
            let detail = object
                .get("msg")
                .or_else(|| object.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("upstream reported a non-ok status");
            Err(ApiError::UpstreamError {
                status: 200,
                detail: detail.to_string(),
            })
        }
        _ => Ok(object),
    }
}

/// Extracts at most `limit` articles from a `{"status": "ok", "news": [...]}` body.
/// Records that are not JSON objects are skipped.
pub fn parse_articles(body: &Value, limit: usize) -> Result<Vec<Article>, ApiError> {
    let object = ensure_ok_status(body)?;

    let records = match object.get("news") {
        None | Some(Value::Null) => return Ok(vec![]),
        Some(Value::Array(records)) => records,
        Some(_) => {
            return Err(ApiError::MalformedResponse(
                "news field is not an array".to_string(),
            ))
        }
    };

    let articles = records
        .iter()
        .filter_map(|record| match RawArticle::deserialize(record) {
            Ok(raw) => Some(Article::from(raw)),
            Err(err) => {
                warn!(error = %err, "skipping unreadable article record");
                None
            }
        })
        .take(limit)
        .collect();
    Ok(articles)
}
