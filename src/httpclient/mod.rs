//! HTTP client construction
//!
//! The startup pass asks an [`HttpClientFactory`] for the client; the
//! default factory builds a `reqwest` client with sane timeouts.

use crate::error::{Result, UnictlError};
use crate::iostreams::IoStreams;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Configuration for HTTP client timeouts and identification
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            user_agent: format!("unictl/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// A ready-to-use HTTP client and the transport settings it was built with
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    unix_socket: Option<PathBuf>,
    insecure_allowed: bool,
    show_progress: bool,
}

impl HttpClient {
    pub fn new(client: Client, unix_socket: Option<PathBuf>, insecure_allowed: bool) -> Self {
        Self {
            client,
            unix_socket,
            insecure_allowed,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Socket that requests should be routed through instead of TCP
    pub fn unix_socket(&self) -> Option<&Path> {
        self.unix_socket.as_deref()
    }

    pub fn insecure_allowed(&self) -> bool {
        self.insecure_allowed
    }

    /// Whether transfers may draw progress on the terminal
    pub fn show_progress(&self) -> bool {
        self.show_progress
    }
}

/// Builds the HTTP client for the runtime context
#[cfg_attr(test, mockall::automock)]
pub trait HttpClientFactory: Send + Sync {
    fn create(
        &self,
        io: &IoStreams,
        unix_socket: Option<PathBuf>,
        insecure_allowed: bool,
    ) -> Result<HttpClient>;
}

/// Factory producing `reqwest` clients
#[derive(Debug, Clone, Default)]
pub struct ReqwestClientFactory {
    pub config: NetworkConfig,
}

impl ReqwestClientFactory {
    pub fn new(config: NetworkConfig) -> Self {
        Self { config }
    }
}

impl HttpClientFactory for ReqwestClientFactory {
    fn create(
        &self,
        io: &IoStreams,
        unix_socket: Option<PathBuf>,
        insecure_allowed: bool,
    ) -> Result<HttpClient> {
        if let Some(ref socket) = unix_socket {
            check_unix_socket(socket)?;
            debug!("HTTP client will use unix socket {}", socket.display());
        }

        let client = Client::builder()
            .connect_timeout(self.config.connect_timeout)
            .timeout(self.config.request_timeout)
            .user_agent(&self.config.user_agent)
            .danger_accept_invalid_certs(insecure_allowed)
            .build()
            .map_err(|e| UnictlError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(HttpClient::new(client, unix_socket, insecure_allowed).with_progress(io.is_stderr_tty()))
    }
}

/// Reject a socket path that exists but is something else
#[cfg(unix)]
fn check_unix_socket(path: &Path) -> Result<()> {
    use std::os::unix::fs::FileTypeExt;

    match std::fs::metadata(path) {
        Ok(meta) if !meta.file_type().is_socket() => Err(UnictlError::network(format!(
            "{} is not a unix socket",
            path.display()
        ))),
        // A socket that does not exist yet may be created by the daemon later
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn check_unix_socket(path: &Path) -> Result<()> {
    Err(UnictlError::network(format!(
        "unix socket {} is not supported on this platform",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_network_config() {
        let config = NetworkConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("unictl/"));
    }

    #[test]
    fn test_factory_builds_tcp_client() {
        let (io, _, _) = IoStreams::test();
        let client = ReqwestClientFactory::default()
            .create(&io, None, true)
            .unwrap();
        assert!(client.unix_socket().is_none());
        assert!(client.insecure_allowed());
        assert!(!client.show_progress());
    }

    #[cfg(unix)]
    #[test]
    fn test_factory_keeps_socket_path() {
        let (io, _, _) = IoStreams::test();
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("daemon.sock");

        let client = ReqwestClientFactory::default()
            .create(&io, Some(socket.clone()), false)
            .unwrap();
        assert_eq!(client.unix_socket(), Some(socket.as_path()));
        assert!(!client.insecure_allowed());
    }

    #[cfg(unix)]
    #[test]
    fn test_factory_rejects_regular_file_as_socket() {
        let (io, _, _) = IoStreams::test();
        let file = tempfile::NamedTempFile::new().unwrap();

        let err = ReqwestClientFactory::default()
            .create(&io, Some(file.path().to_path_buf()), true)
            .unwrap_err();
        assert!(err.to_string().contains("is not a unix socket"));
    }
}
