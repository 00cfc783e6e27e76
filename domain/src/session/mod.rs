//! LLM session domain.
//!
//! - [`response::LlmResponse`]: a model reply mixing text and tool-use blocks

pub mod response;
