//! CLI commands and argument parsing
//!
//! This module defines the command-line interface structure using clap and
//! runs each command against the runtime context built at startup.

use crate::cmdfactory::{CliOption, CliOptions};
use crate::config::{ConfigManager, ConfigOverrides};
use crate::error::{Aspect, Result, UnictlError};
use crate::iostreams::IoStreams;
use crate::log::LoggerType;
use crate::utils::env::Environment;
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Get the full version string with build information
fn get_version() -> &'static str {
    env!("VERSION_WITH_GIT")
}

#[derive(Parser)]
#[command(name = "unictl")]
#[command(about = "Build, package and run applications with plugins")]
#[command(version = get_version())]
pub struct Cli {
    /// Log style
    #[arg(long, global = true, value_name = "TYPE", value_parser = parse_log_type)]
    pub log_type: Option<LoggerType>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Show real timestamps in log lines
    #[arg(long, global = true)]
    pub log_timestamps: bool,

    /// Never prompt, answer with defaults instead
    #[arg(long, global = true)]
    pub no_prompt: bool,

    /// Use this configuration file instead of the default one
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

fn parse_log_type(value: &str) -> std::result::Result<LoggerType, String> {
    value.parse().map_err(|e: UnictlError| e.to_string())
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect and manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// List plugins found on the plugin search path
    Plugins,
    /// Show the runtime context commands run with
    Context,
    /// Send a GET request with the configured HTTP client
    Ping {
        /// URL to request
        url: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Write a configuration file with default values
    Init,
    /// Print the location of the configuration file
    Path,
}

impl Cli {
    /// Flags that override configuration file and environment values
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            log_type: self.log_type.map(|t| t.as_str().to_string()),
            log_level: self.log_level.clone(),
            log_timestamps: self.log_timestamps.then_some(true),
            no_prompt: self.no_prompt.then_some(true),
        }
    }

    /// The startup options for this invocation
    ///
    /// An explicit `--config` file is loaded up front; the default
    /// configuration option that follows it then has nothing left to do.
    pub fn startup_options(&self, env: &dyn Environment) -> Result<Vec<CliOption>> {
        let overrides = self.overrides();
        let mut options = Vec::new();

        if let Some(ref path) = self.config {
            let cfgm = ConfigManager::load_from(path, env)
                .map_err(|e| UnictlError::aspect(Aspect::Config, e))?
                .with_overrides(&overrides);
            options.push(CliOption::ConfigManager(Arc::new(cfgm)));
        }

        options.extend(CliOption::defaults(overrides));
        Ok(options)
    }

    pub async fn execute(self, opts: &CliOptions) -> Result<()> {
        match self.command {
            Commands::Config { command } => execute_config_command(command, opts),
            Commands::Plugins => execute_plugins_command(opts),
            Commands::Context => execute_context_command(opts),
            Commands::Ping { url } => execute_ping_command(opts, &url).await,
        }
    }
}

fn require<T>(value: Option<T>, aspect: Aspect) -> Result<T> {
    value.ok_or_else(|| UnictlError::config(format!("{aspect} is not set up")))
}

fn execute_config_command(command: ConfigCommands, opts: &CliOptions) -> Result<()> {
    let cfgm = require(opts.config_manager(), Aspect::Config)?;
    let io = require(opts.io_streams(), Aspect::IoStreams)?;
    let mut out = io.out();

    match command {
        ConfigCommands::Show => {
            let contents = cfgm.to_toml()?;
            io.start_pager()?;
            let written = write!(out, "{contents}");
            io.stop_pager()?;
            written?;
        }
        ConfigCommands::Path => match cfgm.path() {
            Some(path) => writeln!(out, "{}", path.display())?,
            None => writeln!(out, "(no configuration file)")?,
        },
        ConfigCommands::Init => {
            let path = require(cfgm.path(), Aspect::Config)?;
            if path.exists() {
                let message = format!(
                    "Configuration already exists at {}. Overwrite with defaults?",
                    path.display()
                );
                if !io.confirm(&message, false)? {
                    writeln!(out, "Kept existing configuration at {}", path.display())?;
                    return Ok(());
                }
            }

            ConfigManager::write_default(path)?;
            info!("Wrote default configuration to {}", path.display());
            writeln!(out, "Wrote default configuration to {}", path.display())?;
        }
    }

    Ok(())
}

fn execute_plugins_command(opts: &CliOptions) -> Result<()> {
    let plugins = require(opts.plugin_manager(), Aspect::PluginManager)?;
    let io = require(opts.io_streams(), Aspect::IoStreams)?;
    let mut out = io.out();

    let found = plugins.discover()?;
    if found.is_empty() {
        let searched: Vec<String> = plugins
            .search_paths()
            .map(|p| p.display().to_string())
            .collect();
        writeln!(out, "No plugins found in {}", searched.join(", "))?;
        return Ok(());
    }

    for plugin in found {
        writeln!(out, "{}\t{}", plugin.name, plugin.path.display())?;
    }

    Ok(())
}

fn execute_context_command(opts: &CliOptions) -> Result<()> {
    let io = require(opts.io_streams(), Aspect::IoStreams)?;
    let mut out = io.out();

    for (key, value) in context_summary(opts) {
        writeln!(out, "{}: {}", styled_key(io, &key), value)?;
    }

    Ok(())
}

fn styled_key(io: &IoStreams, key: &str) -> String {
    if io.color_enabled() {
        key.bold().to_string()
    } else {
        key.to_string()
    }
}

/// Key/value lines describing every aspect of the context
pub fn context_summary(opts: &CliOptions) -> Vec<(String, String)> {
    let mut lines = Vec::new();
    let unset = || "(not set)".to_string();

    let config_file = opts
        .config_manager()
        .and_then(|cfgm| cfgm.path().map(|p| p.display().to_string()))
        .unwrap_or_else(unset);
    lines.push(("config file".to_string(), config_file));

    let logger = opts
        .logger()
        .map(|l| format!("{:?} at {}", l.formatter().kind, l.level()))
        .unwrap_or_else(unset);
    lines.push(("logger".to_string(), logger));

    if let Some(io) = opts.io_streams() {
        lines.push((
            "pager".to_string(),
            io.pager().unwrap_or("(none)").to_string(),
        ));
        lines.push(("prompts".to_string(), io.can_prompt().to_string()));
        lines.push(("color".to_string(), io.color_enabled().to_string()));
        lines.push(("width".to_string(), io.terminal_width().to_string()));
    }

    let http = opts
        .http_client()
        .map(|c| match c.unix_socket() {
            Some(socket) => format!("unix socket {}", socket.display()),
            None => "tcp".to_string(),
        })
        .unwrap_or_else(unset);
    lines.push(("http".to_string(), http));

    let packages = opts
        .package_manager()
        .map(|pm| pm.format().to_string())
        .unwrap_or_else(unset);
    lines.push(("package manager".to_string(), packages));

    let plugins = opts
        .plugin_manager()
        .map(|pm| pm.path().display().to_string())
        .unwrap_or_else(unset);
    lines.push(("plugins".to_string(), plugins));

    lines
}

async fn execute_ping_command(opts: &CliOptions, url: &str) -> Result<()> {
    let http = require(opts.http_client(), Aspect::HttpClient)?;
    let io = require(opts.io_streams(), Aspect::IoStreams)?;

    if let Some(socket) = http.unix_socket() {
        return Err(UnictlError::network(format!(
            "ping cannot reach {url} through unix socket {}",
            socket.display()
        )));
    }

    debug!("GET {}", url);
    let response = http.client().get(url).send().await?;
    writeln!(io.out(), "{} {}", response.status(), url)?;

    Ok(())
}
