//! Logging infrastructure: structured run transcripts.
//!
//! Provides [`JsonlRunLogger`], a JSONL file writer that implements the
//! [`RunLogger`](atlance_application::RunLogger) port.

mod jsonl_run_logger;

pub use jsonl_run_logger::JsonlRunLogger;
