//! News domain: validation, reference data, normalization and the MCP surface
//!
//! Provides the Currents news operations exposed over the MCP protocol.

pub mod articles;
pub mod news;
pub mod reference;
pub mod resources;
pub mod tools;
pub mod validation;
