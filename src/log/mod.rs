//! Logger construction
//!
//! A [`Logger`] is an ordinary value wrapping a `tracing` dispatcher, so it
//! can be built during startup, handed around, and only installed as the
//! global subscriber once the runtime context is complete.

use crate::error::{Result, UnictlError};
use crate::iostreams::OutputChannel;
use std::fmt::{self, Write as _};
use std::io::{self, IsTerminal};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Dispatch, Level};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;

/// Marker printed in place of the time when timestamps are turned off
pub const TIMESTAMP_PLACEHOLDER: &str = ">";

/// Log style selected in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoggerType {
    Quiet,
    Basic,
    Fancy,
    Json,
}

impl LoggerType {
    pub const ALL: [LoggerType; 4] = [
        LoggerType::Quiet,
        LoggerType::Basic,
        LoggerType::Fancy,
        LoggerType::Json,
    ];

    /// Parse a style tag, falling back to [`LoggerType::Basic`] for unknown tags
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or(LoggerType::Basic)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoggerType::Quiet => "quiet",
            LoggerType::Basic => "basic",
            LoggerType::Fancy => "fancy",
            LoggerType::Json => "json",
        }
    }

    fn formatter_ctor(self) -> fn(bool) -> Formatter {
        match self {
            LoggerType::Quiet => quiet_formatter,
            LoggerType::Basic => Formatter::text,
            LoggerType::Fancy => fancy_formatter,
            LoggerType::Json => Formatter::json,
        }
    }

    /// The formatter this style uses, given the timestamps setting
    pub fn formatter(self, timestamps: bool) -> Formatter {
        (self.formatter_ctor())(timestamps)
    }
}

impl FromStr for LoggerType {
    type Err = UnictlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "quiet" => Ok(LoggerType::Quiet),
            "basic" => Ok(LoggerType::Basic),
            "fancy" => Ok(LoggerType::Fancy),
            "json" => Ok(LoggerType::Json),
            other => Err(UnictlError::invalid_argument(format!(
                "unknown log type '{other}', expected one of quiet, basic, fancy, json"
            ))),
        }
    }
}

impl fmt::Display for LoggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    /// Level and message only
    Plain,
    /// Human-readable line with time, level and target
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Real,
    Placeholder(&'static str),
    Omitted,
}

/// How log lines are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Formatter {
    pub kind: FormatKind,
    pub timestamp: Timestamp,
    pub ansi: bool,
}

impl Formatter {
    pub fn plain() -> Self {
        Self {
            kind: FormatKind::Plain,
            timestamp: Timestamp::Omitted,
            ansi: false,
        }
    }

    pub fn text(timestamps: bool) -> Self {
        Self {
            kind: FormatKind::Text,
            timestamp: if timestamps {
                Timestamp::Real
            } else {
                Timestamp::Placeholder(TIMESTAMP_PLACEHOLDER)
            },
            ansi: false,
        }
    }

    pub fn json(timestamps: bool) -> Self {
        Self {
            kind: FormatKind::Json,
            timestamp: if timestamps {
                Timestamp::Real
            } else {
                Timestamp::Omitted
            },
            ansi: false,
        }
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi && self.kind != FormatKind::Json;
        self
    }
}

fn quiet_formatter(_timestamps: bool) -> Formatter {
    Formatter::plain()
}

fn fancy_formatter(timestamps: bool) -> Formatter {
    Formatter::text(timestamps).with_ansi(true)
}

static LEVELS: [(&str, Level); 8] = [
    ("panic", Level::ERROR),
    ("fatal", Level::ERROR),
    ("error", Level::ERROR),
    ("warning", Level::WARN),
    ("warn", Level::WARN),
    ("info", Level::INFO),
    ("debug", Level::DEBUG),
    ("trace", Level::TRACE),
];

/// The level names accepted in configuration
pub fn levels() -> &'static [(&'static str, Level)] {
    &LEVELS
}

pub fn level_from_name(name: &str) -> Option<Level> {
    let name = name.trim().to_lowercase();
    LEVELS
        .iter()
        .find(|(level_name, _)| *level_name == name)
        .map(|(_, level)| *level)
}

/// Look up a level name, treating unknown or empty names as `info`
pub fn resolve_level(name: &str) -> Level {
    level_from_name(name).unwrap_or(Level::INFO)
}

#[derive(Debug, Clone, Copy)]
struct PlaceholderTime(&'static str);

impl FormatTime for PlaceholderTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        w.write_str(self.0)
    }
}

fn build_dispatch<W>(formatter: Formatter, level: Level, writer: W) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(writer)
        .with_ansi(formatter.ansi);

    match (formatter.kind, formatter.timestamp) {
        (FormatKind::Plain, _) => Dispatch::new(
            builder
                .without_time()
                .with_target(false)
                .compact()
                .finish(),
        ),
        (FormatKind::Text, Timestamp::Real) => Dispatch::new(builder.finish()),
        (FormatKind::Text, Timestamp::Placeholder(marker)) => {
            Dispatch::new(builder.with_timer(PlaceholderTime(marker)).finish())
        }
        (FormatKind::Text, Timestamp::Omitted) => Dispatch::new(builder.without_time().finish()),
        (FormatKind::Json, Timestamp::Omitted) => {
            Dispatch::new(builder.json().without_time().finish())
        }
        (FormatKind::Json, _) => Dispatch::new(builder.json().finish()),
    }
}

struct LoggerInner {
    dispatch: Dispatch,
    formatter: Formatter,
    level: Level,
    output: Option<OutputChannel>,
}

/// A configured logger
///
/// Cloning is cheap and every clone shares the same dispatcher.
#[derive(Clone)]
pub struct Logger(Arc<LoggerInner>);

impl Logger {
    /// Build a logger; without an output channel it writes to stderr
    pub fn new(formatter: Formatter, level: Level, output: Option<OutputChannel>) -> Self {
        let dispatch = match output {
            Some(ref channel) => build_dispatch(formatter, level, channel.clone()),
            None => build_dispatch(formatter, level, io::stderr),
        };

        Self(Arc::new(LoggerInner {
            dispatch,
            formatter,
            level,
            output,
        }))
    }

    /// The logger used when no configuration is available
    pub fn fallback() -> Self {
        let formatter = LoggerType::Fancy
            .formatter(false)
            .with_ansi(io::stderr().is_terminal());
        Self::new(formatter, Level::INFO, None)
    }

    pub fn formatter(&self) -> Formatter {
        self.0.formatter
    }

    pub fn level(&self) -> Level {
        self.0.level
    }

    /// The channel log lines go to, `None` meaning stderr
    pub fn output(&self) -> Option<&OutputChannel> {
        self.0.output.as_ref()
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.0.dispatch
    }

    pub fn ptr_eq(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Run `f` with this logger as the current subscriber
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.0.dispatch, f)
    }

    /// Make this logger the process-wide subscriber
    pub fn install(&self) -> Result<()> {
        tracing::dispatcher::set_global_default(self.0.dispatch.clone())
            .map_err(|e| UnictlError::config(format!("cannot install logger: {e}")))
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("formatter", &self.0.formatter)
            .field("level", &self.0.level)
            .field("bound_to_output", &self.0.output.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iostreams::SharedBuffer;

    #[test]
    fn test_quiet_never_has_timestamp() {
        for timestamps in [true, false] {
            let formatter = LoggerType::Quiet.formatter(timestamps);
            assert_eq!(formatter.kind, FormatKind::Plain);
            assert_eq!(formatter.timestamp, Timestamp::Omitted);
        }
    }

    #[test]
    fn test_text_styles_use_placeholder_without_timestamps() {
        for style in [LoggerType::Basic, LoggerType::Fancy] {
            assert_eq!(style.formatter(true).kind, FormatKind::Text);
            assert_eq!(style.formatter(true).timestamp, Timestamp::Real);
            assert_eq!(
                style.formatter(false).timestamp,
                Timestamp::Placeholder(TIMESTAMP_PLACEHOLDER)
            );
        }
        assert!(LoggerType::Fancy.formatter(false).ansi);
        assert!(!LoggerType::Basic.formatter(false).ansi);
    }

    #[test]
    fn test_json_omits_timestamp_when_disabled() {
        assert_eq!(LoggerType::Json.formatter(true).timestamp, Timestamp::Real);
        assert_eq!(LoggerType::Json.formatter(false).timestamp, Timestamp::Omitted);
        assert!(!LoggerType::Json.formatter(false).with_ansi(true).ansi);
    }

    #[test]
    fn test_logger_type_parsing() {
        for style in LoggerType::ALL {
            assert_eq!(style.as_str().parse::<LoggerType>().unwrap(), style);
        }
        assert_eq!(LoggerType::from_name("JSON"), LoggerType::Json);
        assert_eq!(LoggerType::from_name("sparkly"), LoggerType::Basic);
        assert!("sparkly".parse::<LoggerType>().is_err());
    }

    #[test]
    fn test_level_lookup() {
        assert_eq!(resolve_level("debug"), Level::DEBUG);
        assert_eq!(resolve_level("Warning"), Level::WARN);
        assert_eq!(resolve_level("fatal"), Level::ERROR);
        assert_eq!(resolve_level("verbose"), Level::INFO);
        assert_eq!(resolve_level(""), Level::INFO);
        assert!(levels().iter().any(|(name, _)| *name == "trace"));
    }

    #[test]
    fn test_placeholder_marker_is_written() {
        let buffer = SharedBuffer::new();
        let logger = Logger::new(
            LoggerType::Basic.formatter(false),
            Level::INFO,
            Some(OutputChannel::new(buffer.clone())),
        );

        logger.in_scope(|| tracing::info!("placeholder check"));

        let line = buffer.contents();
        assert!(line.starts_with(TIMESTAMP_PLACEHOLDER), "got: {line}");
        assert!(line.contains("placeholder check"));
    }

    #[test]
    fn test_json_lines_respect_timestamp_flag() {
        for (timestamps, expect_time) in [(true, true), (false, false)] {
            let buffer = SharedBuffer::new();
            let logger = Logger::new(
                LoggerType::Json.formatter(timestamps),
                Level::INFO,
                Some(OutputChannel::new(buffer.clone())),
            );

            logger.in_scope(|| tracing::info!("json check"));

            let contents = buffer.contents();
            let line: serde_json::Value =
                serde_json::from_str(contents.lines().next().unwrap()).unwrap();
            assert_eq!(line.get("timestamp").is_some(), expect_time);
            assert_eq!(line["fields"]["message"], "json check");
        }
    }

    #[test]
    fn test_level_filters_output() {
        let buffer = SharedBuffer::new();
        let logger = Logger::new(
            Formatter::plain(),
            Level::WARN,
            Some(OutputChannel::new(buffer.clone())),
        );

        logger.in_scope(|| {
            tracing::info!("hidden");
            tracing::warn!("shown");
        });

        let contents = buffer.contents();
        assert!(!contents.contains("hidden"));
        assert!(contents.contains("shown"));
    }

    #[test]
    fn test_clones_share_identity() {
        let logger = Logger::fallback();
        assert!(logger.ptr_eq(&logger.clone()));
        assert!(!logger.ptr_eq(&Logger::fallback()));
        assert!(logger.output().is_none());
        assert_eq!(logger.level(), Level::INFO);
    }
}
