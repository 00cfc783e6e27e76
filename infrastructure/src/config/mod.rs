//! Configuration file loading for atlance
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `ATLANCE_` environment variables (`__` separates sections)
//! 2. `--config <path>` specified file
//! 3. Project root: `./atlance.toml` or `./.atlance.toml`
//! 4. Global: `$XDG_CONFIG_HOME/atlance/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileCapabilitiesConfig, FileConfig, FileLoggingConfig,
    FileModelsConfig, FilePipelineConfig, FileProviderConfig,
};
pub use loader::ConfigLoader;
