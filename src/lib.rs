//! unictl - runtime context assembly for a command-line tool
//!
//! Startup applies an ordered list of options to build the context every
//! command runs with: I/O streams, logger, configuration, HTTP client,
//! package manager and plugin manager.

pub mod cli;
pub mod cmdfactory;
pub mod config;
pub mod error;
pub mod httpclient;
pub mod iostreams;
pub mod log;
pub mod packmanager;
pub mod plugins;
pub mod utils;

// Re-export commonly used types
pub use cmdfactory::{CliOption, CliOptions, Host};
pub use error::{Aspect, Result, UnictlError};
