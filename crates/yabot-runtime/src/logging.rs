//! `tracing` subscriber setup.
//!
//! [`BotRuntime`](crate::BotRuntime) calls [`init_from_config`] with the
//! `[logging]` section unless the builder was told otherwise. Applications
//! that want their own setup install it first (or call
//! `RuntimeBuilder::without_logging`) and use [`LoggingBuilder`] directly:
//!
//! ```rust,ignore
//! LoggingBuilder::new()
//!     .level(tracing::Level::DEBUG)
//!     .directive("yabot_transport=trace")
//!     .span_events(SpanEvents::lifecycle())
//!     .init();
//! ```
//!
//! Filtering: `RUST_LOG` replaces the base level when set. Without it,
//! HTTP client internals are capped at `warn` so long polls do not flood
//! debug output. Explicit directives always apply last.
//!
//! Each event is handled inside a `dispatch` span (`update_id`, `sender`,
//! `kind`); [`SpanEvents::lifecycle`] logs one line when it opens and one when
//! it closes, with its duration.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{Level, warn};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, SpanEventConfig};

/// File name used when `file_path` names a directory only.
const DEFAULT_LOG_FILE: &str = "yabot.log";

/// Applied when `RUST_LOG` is unset.
const QUIET_DEPENDENCIES: [&str; 3] = ["hyper_util=warn", "reqwest=warn", "h2=warn"];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Span lifecycle events written by the fmt layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanEvents(FmtSpan);

impl SpanEvents {
    pub const NONE: Self = Self(FmtSpan::NONE);
    /// Every enter and exit. Async spans re-enter on each poll.
    pub const ACTIVE: Self = Self(FmtSpan::ACTIVE);
    pub const FULL: Self = Self(FmtSpan::FULL);

    /// Open and close only.
    pub fn lifecycle() -> Self {
        Self(FmtSpan::NEW | FmtSpan::CLOSE)
    }
}

impl Default for SpanEvents {
    fn default() -> Self {
        Self::NONE
    }
}

impl From<&SpanEventConfig> for SpanEvents {
    fn from(config: &SpanEventConfig) -> Self {
        [
            (config.new, FmtSpan::NEW),
            (config.enter, FmtSpan::ENTER),
            (config.exit, FmtSpan::EXIT),
            (config.close, FmtSpan::CLOSE),
        ]
        .into_iter()
        .filter(|(on, _)| *on)
        .fold(Self::NONE, |acc, (_, flag)| Self(acc.0 | flag))
    }
}

/// Installs the global subscriber described by `config`.
///
/// A subscriber that is already installed is left in place.
pub fn init_from_config(config: &LoggingConfig) {
    LoggingBuilder::from_config(config).init();
}

// =============================================================================
// LoggingBuilder
// =============================================================================

#[derive(Debug)]
pub struct LoggingBuilder {
    level: Level,
    directives: Vec<String>,
    span_events: SpanEvents,
    format: LogFormat,
    output: LogOutput,
    file_path: Option<PathBuf>,
    target: bool,
    thread_ids: bool,
    file_location: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    /// `info` level, compact lines on stdout, targets shown.
    pub fn new() -> Self {
        Self {
            level: Level::INFO,
            directives: Vec::new(),
            span_events: SpanEvents::NONE,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            target: true,
            thread_ids: false,
            file_location: false,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            level: config.level.to_tracing_level(),
            directives: config
                .filters
                .iter()
                .map(|(target, level)| format!("{target}={level}"))
                .collect(),
            span_events: SpanEvents::from(&config.span_events),
            format: config.format,
            output: config.output,
            file_path: config.file_path.clone(),
            thread_ids: config.thread_ids,
            file_location: config.file_location,
            ..Self::new()
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Adds a directive such as `yabot_framework=trace`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.span_events = events;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Log file for [`LogOutput::File`]. Also switches the output to it.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self.output = LogOutput::File;
        self
    }

    pub fn target(mut self, enabled: bool) -> Self {
        self.target = enabled;
        self
    }

    pub fn thread_ids(mut self, enabled: bool) -> Self {
        self.thread_ids = enabled;
        self
    }

    /// Source file and line on every record.
    pub fn file_location(mut self, enabled: bool) -> Self {
        self.file_location = enabled;
        self
    }

    /// Installs the subscriber unless one is already set.
    pub fn init(self) {
        let _ = self.try_init();
    }

    pub fn try_init(self) -> Result<(), TryInitError> {
        let (writer, missing_file) = self.writer();
        let layer = self.fmt_layer(writer);

        tracing_subscriber::registry()
            .with(layer)
            .with(self.filter())
            .try_init()?;

        if missing_file {
            warn!("Log output is 'file' but no file_path is set, logging to stdout");
        }
        Ok(())
    }

    fn filter(&self) -> EnvFilter {
        let mut filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => QUIET_DEPENDENCIES.iter().fold(
                EnvFilter::new(self.level.as_str().to_ascii_lowercase()),
                |filter, directive| match directive.parse() {
                    Ok(d) => filter.add_directive(d),
                    Err(_) => filter,
                },
            ),
        };

        for directive in &self.directives {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                // No subscriber is installed yet, so this cannot go through tracing.
                Err(e) => eprintln!("yabot: ignoring log directive {directive:?}: {e}"),
            }
        }
        filter
    }

    /// The writer, and whether a file was requested without a path.
    fn writer(&self) -> (BoxMakeWriter, bool) {
        match (self.output, &self.file_path) {
            (LogOutput::Stdout, _) => (BoxMakeWriter::new(std::io::stdout), false),
            (LogOutput::Stderr, _) => (BoxMakeWriter::new(std::io::stderr), false),
            (LogOutput::File, Some(path)) => {
                let (dir, name) = split_log_path(path);
                let appender = tracing_appender::rolling::never(dir, name);
                (BoxMakeWriter::new(appender), false)
            }
            (LogOutput::File, None) => (BoxMakeWriter::new(std::io::stdout), true),
        }
    }

    fn fmt_layer(&self, writer: BoxMakeWriter) -> BoxedLayer {
        let span_events = self.span_events.0.clone();

        macro_rules! decorated {
            ($layer:expr) => {
                $layer
                    .with_writer(writer)
                    .with_span_events(span_events)
                    .with_target(self.target)
                    .with_thread_ids(self.thread_ids)
                    .with_file(self.file_location)
                    .with_line_number(self.file_location)
                    .boxed()
            };
        }

        match self.format {
            LogFormat::Compact => decorated!(fmt::layer().compact()),
            LogFormat::Pretty => decorated!(fmt::layer().pretty()),
            #[cfg(feature = "json-log")]
            LogFormat::Json => decorated!(fmt::layer().json().with_current_span(true)),
            #[cfg(not(feature = "json-log"))]
            LogFormat::Json => decorated!(fmt::layer()),
            LogFormat::Full => decorated!(fmt::layer()),
        }
    }
}

/// Splits a log path into directory and file name for the appender.
fn split_log_path(path: &Path) -> (&Path, &OsStr) {
    if path.is_dir() {
        return (path, OsStr::new(DEFAULT_LOG_FILE));
    }
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE));
    (dir, name)
}
