//! Search argument validation and normalization
//!
//! Everything here is pure: enumerations are read from the in-memory
//! reference tables and nothing touches the network.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat};
use regex::Regex;
use serde::Deserialize;

use crate::{domain::reference::ReferenceCache, errors::ValidationError};

static COUNTRY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2}$").expect("country code pattern is valid"));

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SearchParams {
    pub keywords: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub keywords: Option<String>,
    pub language: String,
    pub country: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<DateTime<FixedOffset>>,
    pub end_date: Option<DateTime<FixedOffset>>,
    pub limit: usize,
}

impl SearchQuery {
    /// Upstream query parameters, without the API key.
    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("language", self.language.clone())];
        if let Some(keywords) = &self.keywords {
            params.push(("keywords", keywords.clone()));
        }
        if let Some(country) = &self.country {
            params.push(("country", country.clone()));
        }
        if let Some(category) = &self.category {
            params.push(("category", category.clone()));
        }
        if let Some(start) = &self.start_date {
            params.push(("start_date", start.to_rfc3339_opts(SecondsFormat::Secs, false)));
        }
        if let Some(end) = &self.end_date {
            params.push(("end_date", end.to_rfc3339_opts(SecondsFormat::Secs, false)));
        }
        params.push(("limit", self.limit.to_string()));
        params
    }
}

pub fn validate_search(
    params: SearchParams,
    references: &ReferenceCache,
    default_language: &str,
    max_results: usize,
) -> Result<SearchQuery, ValidationError> {
    let start_date = parse_date_param("start_date", params.start_date.as_deref())?;
    let end_date = parse_date_param("end_date", params.end_date.as_deref())?;
    if let (Some(start), Some(end)) = (start_date.as_ref(), end_date.as_ref()) {
        if start > end {
            return Err(ValidationError::InvalidDateRange(
                "start_date must not be later than end_date".to_string(),
            ));
        }
    }

    Ok(SearchQuery {
        keywords: normalize_keywords(params.keywords),
        language: normalize_language(params.language, references, default_language)?,
        country: normalize_country(params.country)?,
        category: normalize_category(params.category, references)?,
        start_date,
        end_date,
        limit: clamp_limit(params.limit, max_results),
    })
}

pub fn normalize_keywords(keywords: Option<String>) -> Option<String> {
    keywords
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn normalize_language(
    language: Option<String>,
    references: &ReferenceCache,
    default_language: &str,
) -> Result<String, ValidationError> {
    let language = language
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default_language.to_string());

    if !references.languages().contains(&language) {
        return Err(ValidationError::UnknownLanguage(language));
    }

    Ok(language)
}

pub fn normalize_category(
    category: Option<String>,
    references: &ReferenceCache,
) -> Result<Option<String>, ValidationError> {
    let Some(value) = category else {
        return Ok(None);
    };

    let normalized = value.trim().to_ascii_lowercase();
    if !references.categories().contains(&normalized) {
        return Err(ValidationError::UnknownCategory(value));
    }

    Ok(Some(normalized))
}

pub fn normalize_country(country: Option<String>) -> Result<Option<String>, ValidationError> {
    let Some(value) = country else {
        return Ok(None);
    };

    let normalized = value.trim();
    if !COUNTRY_CODE.is_match(normalized) {
        return Err(ValidationError::InvalidCountry(value));
    }

    Ok(Some(normalized.to_ascii_uppercase()))
}

/// Out-of-range limits are clamped into `[1, max_results]`; absent means `max_results`.
pub fn clamp_limit(limit: Option<i64>, max_results: usize) -> usize {
    let max = max_results.max(1);
    match limit {
        None => max,
        Some(value) if value < 1 => 1,
        Some(value) => usize::try_from(value).map_or(max, |value| value.min(max)),
    }
}

fn parse_date_param(
    name: &str,
    value: Option<&str>,
) -> Result<Option<DateTime<FixedOffset>>, ValidationError> {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    parse_iso8601(value).map(Some).ok_or_else(|| {
        ValidationError::InvalidDateRange(format!(
            "{name} must be ISO 8601, e.g. 2024-01-31T00:00:00+00:00"
        ))
    })
}

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%dT%H:%M%:z",
];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Accepts RFC 3339, offsets with or without a colon, timestamps without
/// seconds and plain dates. A trailing `Z` or a missing offset means UTC.
pub fn parse_iso8601(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed);
    }

    let (local, utc_suffix) = match value.strip_suffix(['Z', 'z']) {
        Some(rest) => (rest, true),
        None => (value, false),
    };

    if !utc_suffix {
        if let Some(parsed) = OFFSET_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(value, format).ok())
        {
            return Some(parsed);
        }
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(local, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(local, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc().fixed_offset())
}
