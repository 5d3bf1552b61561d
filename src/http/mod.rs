//! HTTP surface of the news MCP server
//!
//! Routes the authenticated `/mcp` endpoint and the public health and discovery documents.

pub mod handlers;
