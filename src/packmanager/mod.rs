//! Package management
//!
//! Concrete package managers register with the [`UmbrellaManager`], which
//! fans requests out to whichever of them understands a given source.

use std::fmt;
use std::sync::Arc;

pub trait PackageManager: Send + Sync {
    /// Short name of the package format this manager handles
    fn format(&self) -> &str;

    /// Whether this manager can handle packages from `source`
    fn is_compatible(&self, source: &str) -> bool;
}

/// Aggregates every registered package manager behind one interface
#[derive(Clone, Default)]
pub struct UmbrellaManager {
    managers: Vec<Arc<dyn PackageManager>>,
}

impl UmbrellaManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a manager; one already registered for the same format is replaced
    pub fn register(&mut self, manager: Arc<dyn PackageManager>) {
        self.managers.retain(|m| m.format() != manager.format());
        self.managers.push(manager);
    }

    pub fn managers(&self) -> &[Arc<dyn PackageManager>] {
        &self.managers
    }

    pub fn formats(&self) -> Vec<&str> {
        self.managers.iter().map(|m| m.format()).collect()
    }

    /// The first registered manager able to handle `source`
    pub fn compatible(&self, source: &str) -> Option<Arc<dyn PackageManager>> {
        self.managers
            .iter()
            .find(|m| m.is_compatible(source))
            .cloned()
    }
}

impl PackageManager for UmbrellaManager {
    fn format(&self) -> &str {
        "umbrella"
    }

    fn is_compatible(&self, source: &str) -> bool {
        self.managers.iter().any(|m| m.is_compatible(source))
    }
}

impl fmt::Debug for UmbrellaManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UmbrellaManager")
            .field("formats", &self.formats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PrefixManager {
        format: &'static str,
        prefix: &'static str,
    }

    impl PackageManager for PrefixManager {
        fn format(&self) -> &str {
            self.format
        }

        fn is_compatible(&self, source: &str) -> bool {
            source.starts_with(self.prefix)
        }
    }

    #[test]
    fn test_empty_umbrella_is_compatible_with_nothing() {
        let umbrella = UmbrellaManager::new();
        assert_eq!(umbrella.format(), "umbrella");
        assert!(!umbrella.is_compatible("oci://example"));
        assert!(umbrella.compatible("oci://example").is_none());
    }

    #[test]
    fn test_dispatches_to_compatible_manager() {
        let mut umbrella = UmbrellaManager::new();
        umbrella.register(Arc::new(PrefixManager {
            format: "oci",
            prefix: "oci://",
        }));
        umbrella.register(Arc::new(PrefixManager {
            format: "manifest",
            prefix: "https://",
        }));

        assert!(umbrella.is_compatible("https://example.com/index.yaml"));
        let manager = umbrella.compatible("oci://registry/app:latest").unwrap();
        assert_eq!(manager.format(), "oci");
    }

    #[test]
    fn test_register_replaces_same_format() {
        let mut umbrella = UmbrellaManager::new();
        umbrella.register(Arc::new(PrefixManager {
            format: "oci",
            prefix: "oci://",
        }));
        umbrella.register(Arc::new(PrefixManager {
            format: "oci",
            prefix: "docker://",
        }));

        assert_eq!(umbrella.formats(), vec!["oci"]);
        assert!(umbrella.is_compatible("docker://app"));
        assert!(!umbrella.is_compatible("oci://app"));
    }
}
