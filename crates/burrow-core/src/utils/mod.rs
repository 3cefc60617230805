//! Utility functions and helpers.
//!
//! Common functionality used across multiple Burrow crates.

pub mod hash;

// Re-export commonly used utilities
pub use hash::{fingerprint, is_fingerprint, verify_fingerprint};
