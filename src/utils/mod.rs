//! Utility functions module
//!
//! Small helpers shared across modules.

pub mod env;

pub use env::*;
