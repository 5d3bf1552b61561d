//! JSON-RPC message handling for the Model Context Protocol
//!
//! Validates and routes requests, negotiates the protocol version and formats error payloads.

pub mod rpc;
pub mod server;
