//! Model Context Protocol static resource providers
//!
//! Exposes configuration and reference data as read-only JSON documents.

use rust_mcp_sdk::schema::{
    ReadResourceContent, ReadResourceRequestParams, ReadResourceResult, Resource,
    TextResourceContents,
};
use serde_json::{json, Value};

use crate::currents_client::Endpoint;
use crate::domain::news::NewsService;
use crate::mcp::rpc::{json_rpc_error, json_rpc_error_with_data, json_rpc_result};
use crate::AppState;

pub const CONFIG_RESOURCE_URI: &str = "config://news-api";
pub const LANGUAGES_RESOURCE_URI: &str = "data://supported-languages";
pub const CATEGORIES_RESOURCE_URI: &str = "data://news-categories";

pub fn build_resources_list() -> Vec<Resource> {
    vec![
        Resource {
            annotations: None,
            description: Some("Currents API configuration and setup information".to_string()),
            icons: vec![],
            meta: None,
            mime_type: Some("application/json".to_string()),
            name: "News API Configuration".to_string(),
            size: None,
            title: None,
            uri: CONFIG_RESOURCE_URI.to_string(),
        },
        Resource {
            annotations: None,
            description: Some("Supported language codes".to_string()),
            icons: vec![],
            meta: None,
            mime_type: Some("application/json".to_string()),
            name: "Supported Languages".to_string(),
            size: None,
            title: None,
            uri: LANGUAGES_RESOURCE_URI.to_string(),
        },
        Resource {
            annotations: None,
            description: Some("News categories with descriptions".to_string()),
            icons: vec![],
            meta: None,
            mime_type: Some("application/json".to_string()),
            name: "News Categories".to_string(),
            size: None,
            title: None,
            uri: CATEGORIES_RESOURCE_URI.to_string(),
        },
    ]
}

pub async fn handle_resources_read(
    state: &AppState,
    id: Option<Value>,
    params: Option<Value>,
) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, -32602, "Invalid params");
    };

    let resource_read: ReadResourceRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
    };

    let (uri, document) = match resource_read.uri.as_str() {
        CONFIG_RESOURCE_URI => (CONFIG_RESOURCE_URI, config_document(&state.news)),
        LANGUAGES_RESOURCE_URI => (LANGUAGES_RESOURCE_URI, languages_document(&state.news)),
        CATEGORIES_RESOURCE_URI => (CATEGORIES_RESOURCE_URI, categories_document(&state.news)),
        _ => {
            return json_rpc_error_with_data(
                id,
                -32601,
                "Method not found",
                Some(json!({
                    "code": "resource_not_found",
                    "message": "unknown resource uri",
                    "details": {
                        "uri": resource_read.uri,
                    },
                })),
            )
        }
    };

    let result = serde_json::to_value(ReadResourceResult {
        contents: vec![ReadResourceContent::from(TextResourceContents {
            meta: None,
            mime_type: Some("application/json".to_string()),
            text: document.to_string(),
            uri: uri.to_string(),
        })],
        meta: None,
    })
    .expect("read resource result serialization");

    json_rpc_result(id, result)
}

fn config_document(news: &NewsService) -> Value {
    let base_url = &news.settings().base_url;
    let endpoint = |endpoint: Endpoint| {
        base_url
            .join(endpoint.path())
            .map(|url| url.to_string())
            .unwrap_or_default()
    };

    json!({
        "api_info": {
            "name": "Currents API",
            "version": "v1",
            "provider": "https://currentsapi.services",
            "documentation": "https://currentsapi.services/docs",
        },
        "endpoints": {
            "search": endpoint(Endpoint::Search),
            "latest_news": endpoint(Endpoint::LatestNews),
            "regions": endpoint(Endpoint::AvailableRegions),
        },
        "authentication": {
            "type": "query parameter",
            "parameter": "apiKey",
            "environment_variable": "CURRENTS_API_KEY",
        },
        "rate_limits": {
            "free_tier": "600 requests per hour",
            "paid_tiers": "Higher limits available",
        },
        "setup_instructions": [
            "1. Sign up at https://currentsapi.services",
            "2. Get your API key from the dashboard",
            "3. Set CURRENTS_API_KEY environment variable",
            "4. Test connection with check_api_status tool",
        ],
        "configuration": news.configuration_summary(),
    })
}

fn languages_document(news: &NewsService) -> Value {
    json!({
        "languages": news.references().languages().entries,
        "usage_examples": [
            "language=en for English news",
            "language=fr for French news",
            "language=zh for Chinese news",
        ],
        "notes": [
            "Language codes are ISO 639-1, except msa for Malay",
            "Some languages may have limited news sources",
        ],
    })
}

fn categories_document(news: &NewsService) -> Value {
    let categories = news
        .references()
        .categories()
        .entries
        .iter()
        .map(|entry| json!({ "name": entry.code, "description": entry.label }))
        .collect::<Vec<_>>();

    json!({
        "categories": categories,
        "usage_examples": [
            "category=technology for tech news",
            "category=sports for sports updates",
            "category=business for market news",
        ],
        "filtering_tips": [
            "Combine with keywords for specific results",
            "Use with language parameter for localized content",
        ],
    })
}
