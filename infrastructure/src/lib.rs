//! Infrastructure layer for atlance
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the Ollama model gateway, DuckDuckGo web search and
//! the JSONL run logger. It also loads configuration files and turns
//! command-line paths into an image batch.

pub mod batch;
pub mod config;
pub mod logging;
pub mod ollama;
pub mod search;

// Re-export commonly used types
pub use batch::{BatchLoadError, BatchLoader};
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use logging::JsonlRunLogger;
pub use ollama::{OllamaClient, OllamaError, OllamaGateway, OllamaSession};
pub use search::DuckDuckGoSearch;
