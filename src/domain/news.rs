//! News operations composed from validation, the upstream client, the
//! reference cache and the normalizer. Every method returns a value; faults
//! are folded into envelopes instead of being propagated.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::CurrentsSettings;
use crate::currents_client::{Endpoint, NewsProvider};
use crate::domain::articles::{ensure_ok_status, normalize, ResultEnvelope};
use crate::domain::reference::{ReferenceCache, ReferenceKind};
use crate::domain::validation::{normalize_language, validate_search, SearchParams};
use crate::errors::{ApiError, NewsError};

pub struct NewsService {
    provider: Arc<dyn NewsProvider>,
    references: Arc<ReferenceCache>,
    settings: CurrentsSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub status: &'static str,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    pub configuration: Value,
    pub cache_status: Value,
    pub checked_at: String,
}

impl StatusReport {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

impl NewsService {
    pub fn new(
        provider: Arc<dyn NewsProvider>,
        references: Arc<ReferenceCache>,
        settings: CurrentsSettings,
    ) -> Self {
        Self {
            provider,
            references,
            settings,
        }
    }

    pub fn settings(&self) -> &CurrentsSettings {
        &self.settings
    }

    pub fn references(&self) -> &ReferenceCache {
        &self.references
    }

    pub async fn search_news(&self, params: SearchParams) -> ResultEnvelope {
        let query = match validate_search(
            params,
            &self.references,
            &self.settings.default_language,
            self.settings.max_results,
        ) {
            Ok(query) => query,
            Err(err) => {
                debug!(kind = err.kind(), "search_news rejected before upstream call");
                return ResultEnvelope::failure(&NewsError::Validation(err));
            }
        };

        let outcome = self
            .provider
            .fetch(Endpoint::Search, &query.to_query_params())
            .await;
        normalize(outcome, query.limit)
    }

    pub async fn latest_news(&self, language: Option<String>) -> ResultEnvelope {
        let language =
            match normalize_language(language, &self.references, &self.settings.default_language) {
                Ok(language) => language,
                Err(err) => return ResultEnvelope::failure(&NewsError::Validation(err)),
            };

        let outcome = self
            .provider
            .fetch(Endpoint::LatestNews, &vec![("language", language)])
            .await;
        normalize(outcome, self.settings.max_results)
    }

    /// Reference payload for the `get_available_*` tools.
    pub async fn reference(&self, kind: ReferenceKind) -> Value {
        match self.references.get(kind, self.provider.as_ref()).await {
            Ok((set, source)) => json!({
                "status": "success",
                "name": set.name,
                "total": set.len(),
                "entries": set.entries,
                "source": source,
            }),
            Err(err) => {
                warn!(set = kind.as_str(), kind = err.kind(), "reference lookup failed");
                json!(ResultEnvelope::failure(&NewsError::Api(err)))
            }
        }
    }

    /// Checks the key locally, then probes `latest-news` with a single-article limit.
    pub async fn api_status(&self) -> StatusReport {
        let outcome = if self.settings.has_api_key() {
            self.provider
                .fetch(
                    Endpoint::LatestNews,
                    &vec![
                        ("language", self.settings.default_language.clone()),
                        ("limit", "1".to_string()),
                    ],
                )
                .await
                .and_then(|body| ensure_ok_status(&body).map(|_| ()))
        } else {
            Err(ApiError::missing_api_key())
        };

        let (status, detail, kind) = match outcome {
            Ok(()) => ("ok", "Currents API connection successful".to_string(), None),
            Err(err) => ("error", err.to_string(), Some(err.kind())),
        };

        StatusReport {
            status,
            detail,
            kind,
            configuration: self.configuration_summary(),
            cache_status: json!({
                "caching_enabled": self.references.caching_enabled(),
                "languages_cached": self.references.is_cached(ReferenceKind::Languages),
                "categories_cached": self.references.is_cached(ReferenceKind::Categories),
                "regions_cached": self.references.is_cached(ReferenceKind::Regions),
            }),
            checked_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Effective configuration, safe to expose: the key itself is never included.
    pub fn configuration_summary(&self) -> Value {
        json!({
            "api_key_set": self.settings.has_api_key(),
            "api_key_masked": self.settings.masked_api_key(),
            "base_url": self.settings.base_url.as_str(),
            "timeout": self.settings.timeout_secs,
            "default_language": self.settings.default_language,
            "max_results": self.settings.max_results,
            "caching_enabled": self.settings.enable_caching,
        })
    }
}
