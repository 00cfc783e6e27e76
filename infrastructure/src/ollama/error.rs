//! Error types for the Ollama adapter

use atlance_application::GatewayError;
use thiserror::Error;

/// Result type alias for Ollama operations
pub type Result<T> = std::result::Result<T, OllamaError>;

/// Errors that can occur when talking to an Ollama server
#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("Cannot connect to Ollama at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Ollama returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Cannot read image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Model {0} does not accept images")]
    ImagesUnsupported(String),
}

impl From<OllamaError> for GatewayError {
    fn from(e: OllamaError) -> Self {
        match e {
            OllamaError::Connection(_) => GatewayError::ConnectionError(e.to_string()),
            OllamaError::Timeout(_) => GatewayError::Timeout,
            OllamaError::Api { status: 404, body } => GatewayError::ModelNotAvailable(body),
            OllamaError::ImagesUnsupported(_) => GatewayError::Unsupported(e.to_string()),
            other => GatewayError::RequestFailed(other.to_string()),
        }
    }
}
