//! The central Model Context Protocol engine
//!
//! Decodes JSON-RPC messages, negotiates `initialize`, and routes tool and
//! resource calls into the news domain.

use std::time::Instant;

use rust_mcp_sdk::schema::{
    Implementation, InitializeResult, JsonrpcMessage, ListResourcesResult, ListToolsResult,
    ProtocolVersion, ServerCapabilities, ServerCapabilitiesResources, ServerCapabilitiesTools,
};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::domain::{
    resources::{build_resources_list, handle_resources_read},
    tools::{build_tools_list, handle_tools_call},
};
use crate::mcp::rpc::{
    app_error_to_json_rpc, is_json_rpc_error, json_rpc_error, json_rpc_result, request_id_to_value,
};
use crate::{errors::AppError, AppState};

pub const SUPPORTED_PROTOCOL_VERSION: &str = "2024-11-05";

const SERVER_INSTRUCTIONS: &str = "News search backed by the Currents API. \
Use get_available_languages and get_available_categories to discover valid filters, \
then search_news or get_latest_news. Every tool returns a JSON envelope with a status field.";

/// Parameter keys whose values never reach the audit log.
const SENSITIVE_KEY_MARKERS: [&str; 7] = [
    "token",
    "secret",
    "password",
    "credential",
    "apikey",
    "api_key",
    "authorization",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum McpMethod {
    Initialize,
    Ping,
    ToolsList,
    ToolsCall,
    ResourcesList,
    ResourcesRead,
}

impl McpMethod {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "initialize" => Some(Self::Initialize),
            "ping" => Some(Self::Ping),
            "tools/list" => Some(Self::ToolsList),
            "tools/call" => Some(Self::ToolsCall),
            "resources/list" => Some(Self::ResourcesList),
            "resources/read" => Some(Self::ResourcesRead),
            _ => None,
        }
    }
}

/// Handles one decoded JSON-RPC item. Returns `None` when no reply is owed.
pub async fn handle_json_rpc_value(state: &AppState, payload: Value) -> Option<Value> {
    if !payload.is_object() {
        return Some(json_rpc_error(None, -32600, "Invalid Request"));
    }

    let raw_id = payload.get("id").cloned();
    let message: JsonrpcMessage = match serde_json::from_value(payload) {
        Ok(message) => message,
        Err(_) => return Some(json_rpc_error(raw_id, -32600, "Invalid Request")),
    };

    match message {
        JsonrpcMessage::Request(request) => {
            let id = request_id_to_value(request.id);
            if request.method.trim().is_empty() {
                return Some(json_rpc_error(Some(id), -32600, "Invalid Request"));
            }

            Some(dispatch(state, id, &request.method, request.params.map(Value::Object)).await)
        }
        // Notifications get no reply, so nothing is executed for them either.
        JsonrpcMessage::Notification(notification) => {
            debug!(method = %notification.method, "mcp notification received");
            None
        }
        JsonrpcMessage::ResultResponse(_) | JsonrpcMessage::ErrorResponse(_) => {
            Some(json_rpc_error(raw_id, -32600, "Invalid Request"))
        }
    }
}

async fn dispatch(state: &AppState, id: Value, method: &str, params: Option<Value>) -> Value {
    let started_at = Instant::now();
    let audit_params = redact_audit_params(params.as_ref());
    let id = Some(id);

    let response = match McpMethod::parse(method) {
        Some(McpMethod::Initialize) => initialize(id, params.as_ref()),
        Some(McpMethod::Ping) => json_rpc_result(id, json!({})),
        Some(McpMethod::ToolsList) => json_rpc_result(
            id,
            serde_json::to_value(ListToolsResult {
                meta: None,
                next_cursor: None,
                tools: build_tools_list(),
            })
            .expect("tools list result serialization"),
        ),
        Some(McpMethod::ToolsCall) => handle_tools_call(state, id, params).await,
        Some(McpMethod::ResourcesList) => json_rpc_result(
            id,
            serde_json::to_value(ListResourcesResult {
                meta: None,
                next_cursor: None,
                resources: build_resources_list(),
            })
            .expect("resources list result serialization"),
        ),
        Some(McpMethod::ResourcesRead) => handle_resources_read(state, id, params).await,
        None => json_rpc_error(id, -32601, "Method not found"),
    };

    info!(
        method = %method,
        params = %audit_params,
        outcome = if is_json_rpc_error(&response) { "failure" } else { "success" },
        duration_ms = started_at.elapsed().as_millis(),
        "mcp request handled"
    );

    response
}

fn initialize(id: Option<Value>, params: Option<&Value>) -> Value {
    let protocol_version = match negotiate_protocol_version(params) {
        Ok(version) => version,
        Err(err) => return app_error_to_json_rpc(id, err),
    };

    let client = params
        .and_then(|params| params.pointer("/clientInfo/name"))
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    info!(client = %client, protocol_version = SUPPORTED_PROTOCOL_VERSION, "mcp session initialized");

    let result = InitializeResult {
        server_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: None,
            description: None,
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools {
                list_changed: Some(false),
            }),
            resources: Some(ServerCapabilitiesResources {
                subscribe: Some(false),
                list_changed: Some(false),
            }),
            ..Default::default()
        },
        protocol_version: protocol_version.into(),
        instructions: Some(SERVER_INSTRUCTIONS.to_string()),
        meta: None,
    };

    json_rpc_result(
        id,
        serde_json::to_value(result).expect("initialize result serialization"),
    )
}

fn negotiate_protocol_version(params: Option<&Value>) -> Result<ProtocolVersion, AppError> {
    let offered = params
        .and_then(|params| params.get("protocolVersion"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|version| !version.is_empty())
        .ok_or_else(|| {
            AppError::bad_request(
                "invalid_protocol_version",
                "initialize params.protocolVersion is required",
            )
        })?;

    if offered == SUPPORTED_PROTOCOL_VERSION {
        Ok(ProtocolVersion::V2024_11_05)
    } else {
        Err(AppError::bad_request(
            "unsupported_protocol_version",
            "unsupported initialize protocolVersion",
        ))
    }
}

fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact).unwrap_or(Value::Null)
}

fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    let item = if is_sensitive_key(key) {
                        Value::String("[REDACTED]".to_string())
                    } else {
                        redact(item)
                    };
                    (key.clone(), item)
                })
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase().replace('-', "_");
    normalized == "bearer"
        || SENSITIVE_KEY_MARKERS
            .iter()
            .any(|marker| normalized.contains(marker))
}
