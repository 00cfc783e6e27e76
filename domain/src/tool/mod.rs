//! Tool definitions for native tool use.
//!
//! The delegating root stage sees each delegate stage as a tool. Definitions
//! are generated from the root's capability grant, invocations arrive as
//! [`ToolCall`]s carrying the provider-assigned call id.

pub mod entities;

pub use entities::{ToolCall, ToolDefinition, ToolParameter};
