//! Back-Office Portal Shared Library
//!
//! This crate contains request/response types and input validation shared
//! between the backend and any future admin client.

pub mod types;
pub mod validation;

// Re-export commonly used items
pub use types::*;
