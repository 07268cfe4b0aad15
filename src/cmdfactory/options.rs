//! Startup options
//!
//! A command's runtime context is assembled by applying an ordered list of
//! [`CliOption`]s to a [`CliOptions`]. Each option either supplies a value
//! for one aspect or synthesizes a default from the aspects set before it.
//! An aspect is written at most once: whichever option sets it first wins.

use crate::config::{Config, ConfigManager, ConfigOverrides};
use crate::error::{Aspect, Result, UnictlError};
use crate::httpclient::{HttpClient, HttpClientFactory, ReqwestClientFactory};
use crate::iostreams::IoStreams;
use crate::log::{resolve_level, Logger, LoggerType};
use crate::packmanager::{PackageManager, UmbrellaManager};
use crate::plugins::PluginManager;
use crate::utils::env::{Environment, ProcessEnv};
use std::io::IsTerminal;
use std::sync::Arc;
use tracing::debug;

/// Dedicated pager variable, checked before the configuration file
pub const PAGER_ENV: &str = "UNICTL_PAGER";

/// Conventional pager variable, checked after the configuration file
pub const GENERIC_PAGER_ENV: &str = "PAGER";

type StreamProvider = dyn Fn(&dyn Environment) -> IoStreams + Send + Sync;

/// What the host process provides to default options
pub struct Host {
    env: Arc<dyn Environment>,
    streams: Arc<StreamProvider>,
    http: Arc<dyn HttpClientFactory>,
    default_logger: Logger,
}

impl Host {
    /// The real process, with `default_logger` used when no configuration exists
    pub fn new(default_logger: Logger) -> Self {
        Self {
            env: Arc::new(ProcessEnv),
            streams: Arc::new(IoStreams::from_env),
            http: Arc::new(ReqwestClientFactory::default()),
            default_logger,
        }
    }

    pub fn system() -> Self {
        Self::new(Logger::fallback())
    }

    pub fn with_env<E: Environment + 'static>(mut self, env: E) -> Self {
        self.env = Arc::new(env);
        self
    }

    pub fn with_streams<F>(mut self, provider: F) -> Self
    where
        F: Fn(&dyn Environment) -> IoStreams + Send + Sync + 'static,
    {
        self.streams = Arc::new(provider);
        self
    }

    pub fn with_http_factory(mut self, factory: Arc<dyn HttpClientFactory>) -> Self {
        self.http = factory;
        self
    }

    pub fn env(&self) -> &dyn Environment {
        self.env.as_ref()
    }

    pub fn default_logger(&self) -> &Logger {
        &self.default_logger
    }
}

/// Pick the pager command
///
/// Precedence: `UNICTL_PAGER`, then the configured pager, then `PAGER`.
/// Empty values count as unset.
pub fn resolve_pager(env: &dyn Environment, config: Option<&Config>) -> Option<String> {
    env.non_empty(PAGER_ENV)
        .or_else(|| {
            config
                .map(|c| c.pager.clone())
                .filter(|pager| !pager.is_empty())
        })
        .or_else(|| env.non_empty(GENERIC_PAGER_ENV))
}

/// The runtime context under construction
///
/// If [`CliOptions::apply`] fails the context is only partly populated and
/// must not be used.
pub struct CliOptions {
    io_streams: Option<Arc<IoStreams>>,
    logger: Option<Logger>,
    config_manager: Option<Arc<ConfigManager>>,
    http_client: Option<HttpClient>,
    package_manager: Option<Arc<dyn PackageManager>>,
    plugin_manager: Option<Arc<PluginManager>>,
    host: Host,
}

impl CliOptions {
    pub fn new(host: Host) -> Self {
        Self {
            io_streams: None,
            logger: None,
            config_manager: None,
            http_client: None,
            package_manager: None,
            plugin_manager: None,
            host,
        }
    }

    /// Apply `options` in order, stopping at the first failure
    pub fn apply<I>(&mut self, options: I) -> Result<()>
    where
        I: IntoIterator<Item = CliOption>,
    {
        for option in options {
            let aspect = option.aspect();
            option.apply(self).map_err(|e| {
                debug!("Setting up {} failed: {}", aspect, e);
                e
            })?;
        }
        Ok(())
    }

    pub fn io_streams(&self) -> Option<&Arc<IoStreams>> {
        self.io_streams.as_ref()
    }

    pub fn logger(&self) -> Option<&Logger> {
        self.logger.as_ref()
    }

    pub fn config_manager(&self) -> Option<&Arc<ConfigManager>> {
        self.config_manager.as_ref()
    }

    pub fn http_client(&self) -> Option<&HttpClient> {
        self.http_client.as_ref()
    }

    pub fn package_manager(&self) -> Option<&Arc<dyn PackageManager>> {
        self.package_manager.as_ref()
    }

    pub fn plugin_manager(&self) -> Option<&Arc<PluginManager>> {
        self.plugin_manager.as_ref()
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn is_set(&self, aspect: Aspect) -> bool {
        match aspect {
            Aspect::Logger => self.logger.is_some(),
            Aspect::IoStreams => self.io_streams.is_some(),
            Aspect::Config => self.config_manager.is_some(),
            Aspect::HttpClient => self.http_client.is_some(),
            Aspect::PackageManager => self.package_manager.is_some(),
            Aspect::PluginManager => self.plugin_manager.is_some(),
        }
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, aspect: Aspect) {
    if slot.is_some() {
        debug!("{} already set, keeping the existing one", aspect);
        return;
    }
    *slot = Some(value);
}

/// One startup option
///
/// Each aspect has an explicit variant carrying a ready value and a
/// `Default*` variant that builds one from what is already set.
pub enum CliOption {
    Logger(Logger),
    DefaultLogger,
    ConfigManager(Arc<ConfigManager>),
    DefaultConfigManager(ConfigOverrides),
    IoStreams(Arc<IoStreams>),
    DefaultIoStreams,
    HttpClient(HttpClient),
    DefaultHttpClient,
    PackageManager(Arc<dyn PackageManager>),
    DefaultPackageManager,
    PluginManager(Arc<PluginManager>),
    DefaultPluginManager,
}

impl CliOption {
    /// The usual startup sequence, every aspect built from the host
    pub fn defaults(overrides: ConfigOverrides) -> Vec<CliOption> {
        vec![
            CliOption::DefaultConfigManager(overrides),
            CliOption::DefaultIoStreams,
            CliOption::DefaultLogger,
            CliOption::DefaultHttpClient,
            CliOption::DefaultPackageManager,
            CliOption::DefaultPluginManager,
        ]
    }

    pub fn aspect(&self) -> Aspect {
        match self {
            CliOption::Logger(_) | CliOption::DefaultLogger => Aspect::Logger,
            CliOption::ConfigManager(_) | CliOption::DefaultConfigManager(_) => Aspect::Config,
            CliOption::IoStreams(_) | CliOption::DefaultIoStreams => Aspect::IoStreams,
            CliOption::HttpClient(_) | CliOption::DefaultHttpClient => Aspect::HttpClient,
            CliOption::PackageManager(_) | CliOption::DefaultPackageManager => {
                Aspect::PackageManager
            }
            CliOption::PluginManager(_) | CliOption::DefaultPluginManager => Aspect::PluginManager,
        }
    }

    pub fn apply(self, opts: &mut CliOptions) -> Result<()> {
        let aspect = self.aspect();
        match self {
            CliOption::Logger(logger) => set_once(&mut opts.logger, logger, aspect),
            CliOption::ConfigManager(cfgm) => set_once(&mut opts.config_manager, cfgm, aspect),
            CliOption::IoStreams(io) => set_once(&mut opts.io_streams, io, aspect),
            CliOption::HttpClient(client) => set_once(&mut opts.http_client, client, aspect),
            CliOption::PackageManager(pm) => set_once(&mut opts.package_manager, pm, aspect),
            CliOption::PluginManager(pm) => set_once(&mut opts.plugin_manager, pm, aspect),
            CliOption::DefaultLogger => default_logger(opts),
            CliOption::DefaultConfigManager(overrides) => default_config_manager(opts, &overrides)?,
            CliOption::DefaultIoStreams => default_io_streams(opts),
            CliOption::DefaultHttpClient => default_http_client(opts)?,
            CliOption::DefaultPackageManager => default_package_manager(opts),
            CliOption::DefaultPluginManager => default_plugin_manager(opts)?,
        }
        Ok(())
    }
}

fn default_logger(opts: &mut CliOptions) {
    if opts.logger.is_some() {
        return;
    }

    let Some(cfgm) = opts.config_manager.as_ref() else {
        opts.logger = Some(opts.host.default_logger.clone());
        return;
    };

    let log = &cfgm.config.log;
    let mut formatter = LoggerType::from_name(&log.log_type).formatter(log.timestamps);
    if formatter.ansi {
        let color = match opts.io_streams.as_ref() {
            Some(io) => io.color_enabled(),
            None => std::io::stderr().is_terminal(),
        };
        formatter = formatter.with_ansi(color);
    }
    let level = resolve_level(&log.level);
    let output = opts.io_streams.as_ref().map(|io| io.out());

    opts.logger = Some(Logger::new(formatter, level, output));
}

fn default_config_manager(opts: &mut CliOptions, overrides: &ConfigOverrides) -> Result<()> {
    if opts.config_manager.is_some() {
        return Ok(());
    }

    let cfgm = ConfigManager::load(opts.host.env())
        .map_err(|e| UnictlError::aspect(Aspect::Config, e))?
        .with_overrides(overrides);

    opts.config_manager = Some(Arc::new(cfgm));
    Ok(())
}

fn default_io_streams(opts: &mut CliOptions) {
    if opts.io_streams.is_some() {
        return;
    }

    let env = opts.host.env();
    let mut io = (opts.host.streams)(env);
    let config = opts.config_manager.as_ref().map(|cfgm| &cfgm.config);

    if config.is_some_and(|c| c.no_prompt) {
        io.set_never_prompt(true);
    }

    if let Some(pager) = resolve_pager(env, config) {
        io.set_pager(pager);
    }

    opts.io_streams = Some(Arc::new(io));
}

fn default_http_client(opts: &mut CliOptions) -> Result<()> {
    if opts.http_client.is_some() {
        return Ok(());
    }

    let cfgm = opts
        .config_manager
        .as_ref()
        .ok_or_else(|| UnictlError::missing_dependency(Aspect::HttpClient, Aspect::Config))?;
    let io = opts
        .io_streams
        .as_ref()
        .ok_or_else(|| UnictlError::missing_dependency(Aspect::HttpClient, Aspect::IoStreams))?;

    let socket = cfgm.config.http_unix_socket().map(|path| path.to_path_buf());
    let client = opts
        .host
        .http
        .create(io, socket, true)
        .map_err(|e| UnictlError::aspect(Aspect::HttpClient, e))?;

    opts.http_client = Some(client);
    Ok(())
}

fn default_package_manager(opts: &mut CliOptions) {
    if opts.package_manager.is_some() {
        return;
    }

    // TODO: let the configuration name a preferred package manager
    opts.package_manager = Some(Arc::new(UmbrellaManager::new()));
}

fn default_plugin_manager(opts: &mut CliOptions) -> Result<()> {
    if opts.plugin_manager.is_some() {
        return Ok(());
    }

    let cfgm = opts
        .config_manager
        .as_ref()
        .ok_or_else(|| UnictlError::missing_dependency(Aspect::PluginManager, Aspect::Config))?;

    let manager = PluginManager::new(cfgm.config.paths.plugins.clone(), None);
    opts.plugin_manager = Some(Arc::new(manager));
    Ok(())
}
