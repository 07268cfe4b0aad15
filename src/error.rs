use std::fmt;
use thiserror::Error;

/// A named slice of runtime configuration assembled at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aspect {
    Logger,
    IoStreams,
    Config,
    HttpClient,
    PackageManager,
    PluginManager,
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aspect::Logger => "logger",
            Aspect::IoStreams => "IO streams",
            Aspect::Config => "config manager",
            Aspect::HttpClient => "HTTP client",
            Aspect::PackageManager => "package manager",
            Aspect::PluginManager => "plugin manager",
        };
        f.write_str(name)
    }
}

/// Main error type for unictl operations
#[derive(Debug, Error)]
pub enum UnictlError {
    #[error("cannot set up {aspect}: cannot access {dependency}")]
    MissingDependency { aspect: Aspect, dependency: Aspect },

    #[error("cannot set up {aspect}: {source}")]
    Aspect {
        aspect: Aspect,
        #[source]
        source: Box<UnictlError>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Pager error: {0}")]
    PagerError(String),

    #[error("Prompt error: {0}")]
    PromptError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl UnictlError {
    pub fn missing_dependency(aspect: Aspect, dependency: Aspect) -> Self {
        Self::MissingDependency { aspect, dependency }
    }

    /// Attach the aspect that was being set up when `source` occurred
    pub fn aspect(aspect: Aspect, source: UnictlError) -> Self {
        Self::Aspect {
            aspect,
            source: Box::new(source),
        }
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::NetworkError(msg.into())
    }

    pub fn pager<S: Into<String>>(msg: S) -> Self {
        Self::PagerError(msg.into())
    }

    pub fn prompt<S: Into<String>>(msg: S) -> Self {
        Self::PromptError(msg.into())
    }

    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::SerializationError(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// The dependency this error reports as missing, if it is one
    pub fn missing(&self) -> Option<Aspect> {
        match self {
            Self::MissingDependency { dependency, .. } => Some(*dependency),
            _ => None,
        }
    }
}

/// Result type alias for unictl operations
pub type Result<T> = std::result::Result<T, UnictlError>;
