//! Configuration manager
//!
//! Owns the resolved [`Config`] together with the file it was read from.
//! This is the configuration source handle threaded through startup.

use crate::config::settings::{load_from_env, load_from_file, Config, ConfigOverrides};
use crate::error::{Result, UnictlError};
use crate::utils::env::Environment;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    pub config: Config,
    path: Option<PathBuf>,
}

impl ConfigManager {
    /// Wrap an already-built configuration that is not backed by a file
    pub fn new(config: Config) -> Self {
        Self { config, path: None }
    }

    /// Load from the default location: defaults, then file, then environment
    pub fn load(env: &dyn Environment) -> Result<Self> {
        let path = Config::get_config_path(env)?;
        Self::load_from(&path, env)
    }

    /// Load from `path`; a missing file leaves the defaults in place
    pub fn load_from(path: &Path, env: &dyn Environment) -> Result<Self> {
        let mut config = if path.exists() {
            debug!("Loading configuration from {}", path.display());
            load_from_file(path)?
        } else {
            debug!("No configuration file at {}, using defaults", path.display());
            Config::default()
        };

        load_from_env(&mut config, env);
        config.validate()?;

        Ok(Self {
            config,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        overrides.apply(&mut self.config);
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the configuration back to its file as TOML
    pub fn save(&self) -> Result<()> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| UnictlError::config("configuration has no backing file"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = self.to_toml()?;
        std::fs::write(path, contents)?;
        debug!("Saved configuration to {}", path.display());

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(&self.config)
            .map_err(|e| UnictlError::serialization(e.to_string()))
    }

    /// Write a default configuration file unless one already exists
    pub fn init_default(env: &dyn Environment) -> Result<PathBuf> {
        let path = Config::get_config_path(env)?;

        // Don't overwrite existing configuration
        if path.exists() {
            return Ok(path);
        }

        Self::write_default(&path)?;

        Ok(path)
    }

    /// Write a default configuration to `path`, replacing whatever is there
    pub fn write_default(path: &Path) -> Result<()> {
        let manager = Self {
            config: Config::default(),
            path: Some(path.to_path_buf()),
        };
        manager.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::CONFIG_FILE_ENV;
    use crate::utils::env::MapEnv;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let manager = ConfigManager::load_from(&path, &MapEnv::new()).unwrap();
        assert_eq!(manager.config, Config::default());
        assert_eq!(manager.path(), Some(path.as_path()));
    }

    #[test]
    fn test_env_applies_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[log]\nlevel = \"warn\"\n").unwrap();

        let env = MapEnv::new().with("UNICTL_LOG_LEVEL", "trace");
        let manager = ConfigManager::load_from(&path, &env).unwrap();
        assert_eq!(manager.config.log.level, "trace");
    }

    #[test]
    fn test_init_default_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let env = MapEnv::new().with(CONFIG_FILE_ENV, path.to_string_lossy());

        let written = ConfigManager::init_default(&env).unwrap();
        assert_eq!(written, path);
        assert!(path.exists());

        std::fs::write(&path, "pager = \"more\"\n").unwrap();
        // A second init must not clobber the edited file
        ConfigManager::init_default(&env).unwrap();

        let manager = ConfigManager::load(&env).unwrap();
        assert_eq!(manager.config.pager, "more");
    }

    #[test]
    fn test_save_without_path_fails() {
        let manager = ConfigManager::new(Config::default());
        assert!(matches!(manager.save(), Err(UnictlError::ConfigError(_))));
    }
}
