//! Weft Core — shared errors and utilities.
//!
//! This crate provides the foundational types used across all Weft crates.
//! It has no internal Weft dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`util`]: Identifier utilities

pub mod error;
pub mod util;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};

// Convenience re-exports from util
pub use util::ids::{qualified_key, split_qualified_key};
