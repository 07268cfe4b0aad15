//! Command runtime context assembly
//!
//! This module builds the runtime context every command runs with (streams,
//! logger, configuration, HTTP client, package and plugin managers) from an
//! ordered list of startup options.

pub mod options;

pub use options::*;
