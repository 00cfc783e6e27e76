//! Ollama adapter: the model provider behind every stage.
//!
//! Talks to the `/api/chat` endpoint with base64 image attachments,
//! JSON-schema constrained output and native tool calls.

pub mod client;
pub mod error;
pub mod gateway;
pub mod session;
pub mod types;

pub use client::OllamaClient;
pub use error::OllamaError;
pub use gateway::OllamaGateway;
pub use session::OllamaSession;
