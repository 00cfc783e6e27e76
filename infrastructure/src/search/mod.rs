//! Web search adapters for the landmark stage.

mod duckduckgo;

pub use duckduckgo::DuckDuckGoSearch;
