//! Configuration settings
//!
//! This module defines the configuration record, where it lives on disk,
//! and how environment variables and command-line flags are layered on top
//! of the file.

use crate::error::{Result, UnictlError};
use crate::utils::env::Environment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an alternative configuration file
pub const CONFIG_FILE_ENV: &str = "UNICTL_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log style: quiet, basic, fancy or json
    #[serde(rename = "type")]
    pub log_type: String,
    /// Verbosity name, e.g. "info" or "debug"
    pub level: String,
    /// Show real timestamps in log lines
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_type: "fancy".to_string(),
            level: "info".to_string(),
            timestamps: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory searched for `unictl-<name>` plugin executables
    pub plugins: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            plugins: base.join("unictl").join("plugins"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    /// Never prompt interactively, answer with defaults instead
    pub no_prompt: bool,
    /// Pager command for long output; empty means none
    pub pager: String,
    /// Unix socket the HTTP client connects through; empty means TCP
    pub http_unix_socket: String,
    pub paths: PathsConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.paths.plugins.as_os_str().is_empty() {
            return Err(UnictlError::config("paths.plugins must not be empty"));
        }

        Ok(())
    }

    /// The configured Unix socket, or `None` when HTTP goes over TCP
    pub fn http_unix_socket(&self) -> Option<&Path> {
        if self.http_unix_socket.is_empty() {
            None
        } else {
            Some(Path::new(&self.http_unix_socket))
        }
    }

    /// Resolve the configuration file location
    /// Priority: UNICTL_CONFIG > XDG_CONFIG_HOME > HOME/.config > platform dir
    pub fn get_config_path(env: &dyn Environment) -> Result<PathBuf> {
        if let Some(path) = env.non_empty(CONFIG_FILE_ENV) {
            return Ok(PathBuf::from(path));
        }

        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            let config_dir = if let Some(xdg_config_home) = env.non_empty("XDG_CONFIG_HOME") {
                PathBuf::from(xdg_config_home)
            } else {
                let home_dir = env
                    .non_empty("HOME")
                    .ok_or_else(|| UnictlError::config("HOME environment variable not set"))?;
                PathBuf::from(home_dir).join(".config")
            };
            Ok(config_dir.join("unictl").join("config.toml"))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            let config_dir = dirs::config_dir()
                .ok_or_else(|| UnictlError::config("Unable to determine config directory"))?;
            Ok(config_dir.join("unictl").join("config.toml"))
        }
    }
}

/// Read a configuration file, TOML first and JSON as a fallback
pub fn load_from_file(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)?;

    match toml::from_str::<Config>(&contents) {
        Ok(config) => Ok(config),
        Err(toml_err) => match serde_json::from_str::<Config>(&contents) {
            Ok(config) => Ok(config),
            // Report the TOML error; it is the primary format
            Err(_) => Err(toml_err.into()),
        },
    }
}

/// Override file values with `UNICTL_*` environment variables
pub fn load_from_env(config: &mut Config, env: &dyn Environment) {
    if let Some(value) = env.non_empty("UNICTL_LOG_TYPE") {
        config.log.log_type = value;
    }

    if let Some(value) = env.non_empty("UNICTL_LOG_LEVEL") {
        config.log.level = value;
    }

    if let Some(value) = env.flag("UNICTL_LOG_TIMESTAMPS") {
        config.log.timestamps = value;
    }

    if let Some(value) = env.flag("UNICTL_NO_PROMPT") {
        config.no_prompt = value;
    }

    if let Some(value) = env.var("UNICTL_HTTP_UNIX_SOCKET") {
        config.http_unix_socket = value;
    }

    if let Some(value) = env.non_empty("UNICTL_PLUGINS_PATH") {
        config.paths.plugins = PathBuf::from(value);
    }
}

/// Values given on the command line; these win over file and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub log_type: Option<String>,
    pub log_level: Option<String>,
    pub log_timestamps: Option<bool>,
    pub no_prompt: Option<bool>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref log_type) = self.log_type {
            config.log.log_type = log_type.clone();
        }
        if let Some(ref level) = self.log_level {
            config.log.level = level.clone();
        }
        if let Some(timestamps) = self.log_timestamps {
            config.log.timestamps = timestamps;
        }
        if let Some(no_prompt) = self.no_prompt {
            config.no_prompt = no_prompt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::env::MapEnv;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.log.log_type, "fancy");
        assert_eq!(config.log.level, "info");
        assert!(!config.log.timestamps);
        assert!(!config.no_prompt);
        assert!(config.pager.is_empty());
        assert!(config.http_unix_socket().is_none());
        assert!(config.paths.plugins.ends_with("unictl/plugins"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "pager = \"less -R\"\n\n[log]\ntype = \"json\"\ntimestamps = true"
        )
        .unwrap();

        let config = load_from_file(file.path()).unwrap();
        assert_eq!(config.pager, "less -R");
        assert_eq!(config.log.log_type, "json");
        assert!(config.log.timestamps);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_json_fallback() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"no_prompt": true, "http_unix_socket": "/tmp/x.sock"}}"#).unwrap();

        let config = load_from_file(file.path()).unwrap();
        assert!(config.no_prompt);
        assert_eq!(config.http_unix_socket(), Some(Path::new("/tmp/x.sock")));
    }

    #[test]
    fn test_invalid_file_reports_toml_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "log = [[[").unwrap();

        let err = load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, UnictlError::TomlError(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env = MapEnv::new()
            .with("UNICTL_LOG_TYPE", "quiet")
            .with("UNICTL_LOG_LEVEL", "debug")
            .with("UNICTL_LOG_TIMESTAMPS", "1")
            .with("UNICTL_NO_PROMPT", "true")
            .with("UNICTL_PLUGINS_PATH", "/opt/plugins");

        let mut config = Config::default();
        load_from_env(&mut config, &env);

        assert_eq!(config.log.log_type, "quiet");
        assert_eq!(config.log.level, "debug");
        assert!(config.log.timestamps);
        assert!(config.no_prompt);
        assert_eq!(config.paths.plugins, PathBuf::from("/opt/plugins"));
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = Config::default();
        config.log.level = "warn".to_string();

        ConfigOverrides {
            log_level: Some("trace".to_string()),
            no_prompt: Some(true),
            ..Default::default()
        }
        .apply(&mut config);

        assert_eq!(config.log.level, "trace");
        assert!(config.no_prompt);
        assert_eq!(config.log.log_type, "fancy");
    }

    #[test]
    fn test_config_path_resolution() {
        let env = MapEnv::new().with(CONFIG_FILE_ENV, "/etc/unictl.toml");
        assert_eq!(
            Config::get_config_path(&env).unwrap(),
            PathBuf::from("/etc/unictl.toml")
        );

        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            let env = MapEnv::new().with("XDG_CONFIG_HOME", "/xdg");
            assert_eq!(
                Config::get_config_path(&env).unwrap(),
                PathBuf::from("/xdg/unictl/config.toml")
            );

            let env = MapEnv::new().with("HOME", "/home/me");
            assert_eq!(
                Config::get_config_path(&env).unwrap(),
                PathBuf::from("/home/me/.config/unictl/config.toml")
            );

            assert!(Config::get_config_path(&MapEnv::new()).is_err());
        }
    }
}
