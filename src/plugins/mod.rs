//! Plugin discovery
//!
//! Plugins are standalone executables named `unictl-<name>` living in the
//! configured plugin directory or any of the extra search paths.

use crate::error::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PLUGIN_PREFIX: &str = "unictl-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plugin {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PluginManager {
    path: PathBuf,
    extra_paths: Vec<PathBuf>,
}

impl PluginManager {
    pub fn new<P: Into<PathBuf>>(path: P, extra_paths: Option<Vec<PathBuf>>) -> Self {
        Self {
            path: path.into(),
            extra_paths: extra_paths.unwrap_or_default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All directories searched, primary path first
    pub fn search_paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.path.as_path()).chain(self.extra_paths.iter().map(PathBuf::as_path))
    }

    /// List plugins sorted by name; earlier search paths shadow later ones
    pub fn discover(&self) -> Result<Vec<Plugin>> {
        let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();

        for dir in self.search_paths() {
            if !dir.is_dir() {
                debug!("Skipping missing plugin directory {}", dir.display());
                continue;
            }

            for entry in std::fs::read_dir(dir)? {
                let entry = entry?;
                let file_name = entry.file_name();
                let Some(name) = file_name
                    .to_str()
                    .and_then(|n| n.strip_prefix(PLUGIN_PREFIX))
                else {
                    continue;
                };
                let name = name.trim_end_matches(std::env::consts::EXE_SUFFIX);
                if name.is_empty() || !is_executable(&entry.path()) {
                    continue;
                }

                found
                    .entry(name.to_string())
                    .or_insert_with(|| entry.path());
            }
        }

        Ok(found
            .into_iter()
            .map(|(name, path)| Plugin { name, path })
            .collect())
    }

    pub fn find(&self, name: &str) -> Result<Option<Plugin>> {
        Ok(self.discover()?.into_iter().find(|p| p.name == name))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
