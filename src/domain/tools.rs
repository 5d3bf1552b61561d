//! Interactive tools exposed via Model Context Protocol
//!
//! Provides the news search, latest news, reference listing and status check
//! tools by delegating to the `NewsService`.

use rust_mcp_sdk::{
    macros,
    schema::{CallToolRequestParams, CallToolResult, ContentBlock, TextContent, Tool},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::reference::ReferenceKind;
use crate::domain::validation::SearchParams;
use crate::mcp::rpc::{json_rpc_error, json_rpc_error_with_data, json_rpc_result};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LatestNewsParams {
    pub language: Option<String>,
}

#[macros::mcp_tool(
    name = "search_news",
    description = "Search news articles by keywords, language, country, category and ISO 8601 date range"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct SearchNewsTool {
    /// Free-text search keywords
    pub keywords: Option<String>,
    /// Language code such as en, fr or de
    pub language: Option<String>,
    /// Two-letter country code such as US or GB
    pub country: Option<String>,
    /// News category such as technology or business
    pub category: Option<String>,
    /// Earliest publish time, ISO 8601
    pub start_date: Option<String>,
    /// Latest publish time, ISO 8601
    pub end_date: Option<String>,
    /// Maximum number of articles; clamped to the configured bounds
    pub limit: Option<i64>,
}

#[macros::mcp_tool(
    name = "get_latest_news",
    description = "Get the latest news articles in a language"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetLatestNewsTool {
    /// Language code; defaults to the configured language
    pub language: Option<String>,
}

#[macros::mcp_tool(
    name = "get_available_languages",
    description = "List supported language codes and names"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetAvailableLanguagesTool {}

#[macros::mcp_tool(
    name = "get_available_regions",
    description = "List supported country and region codes"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetAvailableRegionsTool {}

#[macros::mcp_tool(
    name = "get_available_categories",
    description = "List supported news categories"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetAvailableCategoriesTool {}

#[macros::mcp_tool(
    name = "check_api_status",
    description = "Check Currents API configuration and connectivity"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct CheckApiStatusTool {}

pub fn build_tools_list() -> Vec<Tool> {
    vec![
        SearchNewsTool::tool(),
        GetLatestNewsTool::tool(),
        GetAvailableLanguagesTool::tool(),
        GetAvailableRegionsTool::tool(),
        GetAvailableCategoriesTool::tool(),
        CheckApiStatusTool::tool(),
    ]
}

pub async fn handle_tools_call(
    state: &AppState,
    id: Option<Value>,
    params: Option<Value>,
) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, -32602, "Invalid params");
    };

    let tool_call: CallToolRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
    };
    let arguments = json!(tool_call.arguments.unwrap_or_default());
    let news = &state.news;

    let (summary, structured, is_error) = match tool_call.name.as_str() {
        "search_news" => {
            let search_params: SearchParams = match serde_json::from_value(arguments) {
                Ok(value) => value,
                Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
            };

            let envelope = news.search_news(search_params).await;
            (envelope.summary(), json!(envelope), envelope.is_error())
        }
        "get_latest_news" => {
            let latest_params: LatestNewsParams = match serde_json::from_value(arguments) {
                Ok(value) => value,
                Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
            };

            let envelope = news.latest_news(latest_params.language).await;
            (envelope.summary(), json!(envelope), envelope.is_error())
        }
        "get_available_languages" => reference_result(news.reference(ReferenceKind::Languages).await),
        "get_available_regions" => reference_result(news.reference(ReferenceKind::Regions).await),
        "get_available_categories" => {
            reference_result(news.reference(ReferenceKind::Categories).await)
        }
        "check_api_status" => {
            let report = news.api_status().await;
            (report.detail.clone(), json!(report), !report.is_ok())
        }
        _ => {
            return json_rpc_error_with_data(
                id,
                -32601,
                "Method not found",
                Some(json!({
                    "code": "tool_not_found",
                    "message": "unknown tool name",
                    "details": {
                        "name": tool_call.name,
                    },
                })),
            )
        }
    };

    json_rpc_result(
        id,
        serde_json::to_value(CallToolResult {
            content: vec![ContentBlock::from(TextContent::new(summary, None, None))],
            is_error: is_error.then_some(true),
            meta: None,
            structured_content: structured.as_object().cloned(),
        })
        .expect("tool result serialization"),
    )
}

fn reference_result(payload: Value) -> (String, Value, bool) {
    let is_error = payload["status"] != "success";
    let summary = if is_error {
        payload["message"]
            .as_str()
            .unwrap_or("reference lookup failed")
            .to_string()
    } else {
        format!("Returned {} {}", payload["total"], payload["name"].as_str().unwrap_or("entries"))
    };
    (summary, payload, is_error)
}

#[cfg(test)]
mod tests {
    use super::{build_tools_list, reference_result};
    use serde_json::json;

    #[test]
    fn lists_all_six_tools_in_order() {
        let names = build_tools_list()
            .into_iter()
            .map(|tool| tool.name)
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "search_news",
                "get_latest_news",
                "get_available_languages",
                "get_available_regions",
                "get_available_categories",
                "check_api_status",
            ]
        );
    }

    #[test]
    fn reference_summary_names_the_set() {
        let (summary, _, is_error) = reference_result(json!({
            "status": "success",
            "name": "categories",
            "total": 17,
            "entries": [],
            "source": "builtin",
        }));
        assert!(!is_error);
        assert_eq!(summary, "Returned 17 categories");
    }

    #[test]
    fn reference_error_uses_envelope_message() {
        let (summary, _, is_error) = reference_result(json!({
            "status": "error",
            "message": "request timed out after 15 seconds",
            "kind": "Timeout",
        }));
        assert!(is_error);
        assert_eq!(summary, "request timed out after 15 seconds");
    }
}
