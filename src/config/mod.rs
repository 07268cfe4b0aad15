//! Configuration management module
//!
//! This module handles configuration loading, validation, and persistence
//! from multiple sources including command-line flags, environment variables,
//! configuration files, and default values.

pub mod manager;
pub mod settings;

pub use manager::*;
pub use settings::*;
