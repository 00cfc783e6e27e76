//! Core domain concepts shared across all subdomains.
//!
//! - [`model::Model`]: available vision models
//! - [`question::Question`]: a single follow-up question awaiting the user's answer
//! - [`string`]: UTF-8 safe string helpers

pub mod model;
pub mod question;
pub mod string;
