//! Ports (interfaces) the application layer depends on.
//!
//! Adapters live in the infrastructure and presentation layers.

pub mod answer;
pub mod llm_gateway;
pub mod progress;
pub mod run_logger;
pub mod search;
