//! Reference sets (languages, categories, regions) used for input validation
//!
//! Languages and categories are compiled-in tables. Regions come from the
//! upstream `available/regions` endpoint and are fetched at most once per
//! process when caching is enabled.

use std::sync::{Arc, LazyLock};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::currents_client::{Endpoint, NewsProvider};
use crate::domain::articles::ensure_ok_status;
use crate::errors::ApiError;

const LANGUAGES: [(&str, &str); 15] = [
    ("ar", "Arabic"),
    ("zh", "Chinese"),
    ("nl", "Dutch"),
    ("en", "English"),
    ("fi", "Finnish"),
    ("fr", "French"),
    ("de", "German"),
    ("hi", "Hindi"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("msa", "Malay"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("es", "Spanish"),
];

const CATEGORIES: [(&str, &str); 17] = [
    ("general", "General news and current events"),
    ("technology", "Technology, innovation, and digital trends"),
    ("business", "Business news, markets, and economy"),
    ("sports", "Sports news and events"),
    ("entertainment", "Entertainment, celebrity news, and pop culture"),
    ("health", "Health, medical news, and wellness"),
    ("science", "Scientific discoveries and research"),
    ("politics", "Political news and government"),
    ("world", "International news and global events"),
    ("regional", "Regional and local news"),
    ("lifestyle", "Lifestyle, culture, and society"),
    ("programming", "Programming, software development"),
    ("academia", "Academic and educational news"),
    ("opinion", "Opinion pieces and editorials"),
    ("food", "Food, cooking, and culinary news"),
    ("finance", "Financial markets and investment news"),
    ("game", "Gaming news and industry updates"),
];

static LANGUAGE_SET: LazyLock<Arc<ReferenceSet>> =
    LazyLock::new(|| Arc::new(ReferenceSet::from_table(ReferenceKind::Languages, &LANGUAGES)));

static CATEGORY_SET: LazyLock<Arc<ReferenceSet>> =
    LazyLock::new(|| Arc::new(ReferenceSet::from_table(ReferenceKind::Categories, &CATEGORIES)));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Languages,
    Categories,
    Regions,
}

impl ReferenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Languages => "languages",
            Self::Categories => "categories",
            Self::Regions => "regions",
        }
    }
}

/// Where a reference set was served from on a particular read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceSource {
    Builtin,
    Cache,
    Api,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceEntry {
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceSet {
    pub name: ReferenceKind,
    pub entries: Vec<ReferenceEntry>,
}

impl ReferenceSet {
    fn from_table(name: ReferenceKind, table: &[(&str, &str)]) -> Self {
        Self {
            name,
            entries: table
                .iter()
                .map(|(code, label)| ReferenceEntry {
                    code: (*code).to_string(),
                    label: (*label).to_string(),
                })
                .collect(),
        }
    }

    /// Parses the `{"regions": {"<label>": "<code>", ...}}` upstream payload.
    pub fn regions_from_payload(body: &Value) -> Result<Self, ApiError> {
        let regions = ensure_ok_status(body)?
            .get("regions")
            .and_then(Value::as_object)
            .ok_or_else(|| ApiError::MalformedResponse("missing regions object".to_string()))?;

        let mut entries = regions
            .iter()
            .map(|(label, code)| {
                code.as_str()
                    .map(|code| ReferenceEntry {
                        code: code.to_string(),
                        label: label.clone(),
                    })
                    .ok_or_else(|| {
                        ApiError::MalformedResponse(format!("region '{label}' has no string code"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by(|left, right| left.label.cmp(&right.label));

        Ok(Self {
            name: ReferenceKind::Regions,
            entries,
        })
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.iter().any(|entry| entry.code == code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn is_builtin_language(code: &str) -> bool {
    LANGUAGE_SET.contains(code)
}

/// Process-lifetime store for reference sets. Never evicts.
#[derive(Debug)]
pub struct ReferenceCache {
    caching_enabled: bool,
    regions: OnceCell<Arc<ReferenceSet>>,
}

impl ReferenceCache {
    pub fn new(caching_enabled: bool) -> Self {
        Self {
            caching_enabled,
            regions: OnceCell::new(),
        }
    }

    /// Cache pre-filled with a regions set, for callers that already hold one.
    pub fn with_regions(regions: ReferenceSet) -> Self {
        Self {
            caching_enabled: true,
            regions: OnceCell::new_with(Some(Arc::new(regions))),
        }
    }

    pub fn caching_enabled(&self) -> bool {
        self.caching_enabled
    }

    pub fn languages(&self) -> Arc<ReferenceSet> {
        Arc::clone(&LANGUAGE_SET)
    }

    pub fn categories(&self) -> Arc<ReferenceSet> {
        Arc::clone(&CATEGORY_SET)
    }

    pub async fn regions(
        &self,
        provider: &dyn NewsProvider,
    ) -> Result<(Arc<ReferenceSet>, ReferenceSource), ApiError> {
        if !self.caching_enabled {
            let set = fetch_regions(provider).await?;
            return Ok((Arc::new(set), ReferenceSource::Api));
        }

        if let Some(set) = self.regions.get() {
            return Ok((Arc::clone(set), ReferenceSource::Cache));
        }

        // Concurrent first readers wait on the same fill and share its result.
        let set = self
            .regions
            .get_or_try_init(move || async move { fetch_regions(provider).await.map(Arc::new) })
            .await?;
        Ok((Arc::clone(set), ReferenceSource::Api))
    }

    pub async fn get(
        &self,
        kind: ReferenceKind,
        provider: &dyn NewsProvider,
    ) -> Result<(Arc<ReferenceSet>, ReferenceSource), ApiError> {
        match kind {
            ReferenceKind::Languages => Ok((self.languages(), ReferenceSource::Builtin)),
            ReferenceKind::Categories => Ok((self.categories(), ReferenceSource::Builtin)),
            ReferenceKind::Regions => self.regions(provider).await,
        }
    }

    pub fn is_cached(&self, kind: ReferenceKind) -> bool {
        match kind {
            ReferenceKind::Languages | ReferenceKind::Categories => true,
            ReferenceKind::Regions => self.regions.initialized(),
        }
    }
}

async fn fetch_regions(provider: &dyn NewsProvider) -> Result<ReferenceSet, ApiError> {
    let body = provider.fetch(Endpoint::AvailableRegions, &vec![]).await?;
    ReferenceSet::regions_from_payload(&body)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::currents_client::QueryParams;

    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NewsProvider for CountingProvider {
        async fn fetch(&self, endpoint: Endpoint, _params: &QueryParams) -> Result<Value, ApiError> {
            assert_eq!(endpoint, Endpoint::AvailableRegions);
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(json!({
                "status": "ok",
                "regions": {
                    "United States": "US",
                    "France": "FR",
                    "Asia": "asia"
                }
            }))
        }
    }

    #[test]
    fn builtin_tables_are_stable_across_reads() {
        let cache = ReferenceCache::new(true);
        let first = serde_json::to_vec(&*cache.languages()).expect("serialize");
        let second = serde_json::to_vec(&*cache.languages()).expect("serialize");
        assert_eq!(first, second);
        assert_eq!(cache.languages().len(), 15);
        assert_eq!(cache.categories().len(), 17);
        assert!(cache.languages().contains("msa"));
        assert!(cache.categories().contains("programming"));
    }

    #[test]
    fn builtin_tables_ignore_caching_flag() {
        let cache = ReferenceCache::new(false);
        assert!(cache.languages().contains("en"));
        assert!(cache.is_cached(ReferenceKind::Categories));
    }

    #[tokio::test]
    async fn regions_are_fetched_once_and_sorted_by_label() {
        let provider = CountingProvider::default();
        let cache = ReferenceCache::new(true);
        assert!(!cache.is_cached(ReferenceKind::Regions));

        let (first, first_source) = cache.regions(&provider).await.expect("regions");
        let (second, second_source) = cache.regions(&provider).await.expect("regions");

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first_source, ReferenceSource::Api);
        assert_eq!(second_source, ReferenceSource::Cache);
        assert_eq!(first, second);
        assert_eq!(first.entries[0].label, "Asia");
        assert_eq!(first.entries[2].code, "US");
        assert!(cache.is_cached(ReferenceKind::Regions));
    }

    #[tokio::test]
    async fn disabled_cache_refetches_regions() {
        let provider = CountingProvider::default();
        let cache = ReferenceCache::new(false);

        cache.regions(&provider).await.expect("regions");
        cache.regions(&provider).await.expect("regions");

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert!(!cache.is_cached(ReferenceKind::Regions));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_reads_observe_one_value() {
        let provider = Arc::new(CountingProvider::default());
        let cache = Arc::new(ReferenceCache::new(true));

        let handles = (0..16)
            .map(|_| {
                let provider = Arc::clone(&provider);
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    let (set, _) = cache.regions(provider.as_ref()).await.expect("regions");
                    set
                })
            })
            .collect::<Vec<_>>();

        let mut sets = Vec::new();
        for handle in handles {
            sets.push(handle.await.expect("task join"));
        }

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(sets.iter().all(|set| Arc::ptr_eq(set, &sets[0])));
    }

    #[tokio::test]
    async fn prefilled_cache_never_calls_upstream() {
        let provider = CountingProvider::default();
        let cache = ReferenceCache::with_regions(ReferenceSet {
            name: ReferenceKind::Regions,
            entries: vec![ReferenceEntry {
                code: "DE".to_string(),
                label: "Germany".to_string(),
            }],
        });

        let (set, source) = cache
            .get(ReferenceKind::Regions, &provider)
            .await
            .expect("regions");
        assert_eq!(source, ReferenceSource::Cache);
        assert!(set.contains("DE"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn regions_payload_with_error_status_is_upstream_error() {
        let err = ReferenceSet::regions_from_payload(&json!({
            "status": "error",
            "msg": "invalid apiKey"
        }))
        .expect_err("expected upstream error");

        assert_eq!(
            err,
            ApiError::UpstreamError {
                status: 200,
                detail: "invalid apiKey".to_string(),
            }
        );
    }

    #[test]
    fn regions_payload_without_object_is_malformed() {
        let err = ReferenceSet::regions_from_payload(&json!({"status": "ok"}))
            .expect_err("expected malformed");
        assert_eq!(err.kind(), "MalformedResponse");
    }
}
