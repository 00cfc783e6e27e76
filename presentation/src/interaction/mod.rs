//! Interactive adapters for ports that need the end user.

pub mod console_answerer;
