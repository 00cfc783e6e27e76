//! Presentation layer for atlance
//!
//! This crate contains CLI definitions, output formatters, progress
//! reporters, and the terminal answerer for the question stage.

pub mod cli;
pub mod interaction;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, OutputFormat};
pub use interaction::console_answerer::ConsoleAnswerer;
pub use output::console::ConsoleFormatter;
pub use progress::reporter::{ProgressReporter, SimpleProgress};
