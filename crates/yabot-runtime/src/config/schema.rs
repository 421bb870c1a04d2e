//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use yabot_framework::FallbackReplies;
use yabot_transport::{DEFAULT_BASE_URL, HttpTransportConfig};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BotConfig {
    /// Bot API connection settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Poll loop pacing.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Concurrency and shutdown settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Texts sent when no handler takes an event.
    #[serde(default)]
    pub replies: FallbackReplies,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// API
// =============================================================================

/// Bot API connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bot token. Also read from `YANDEX_BOT_API_KEY`.
    #[serde(default)]
    pub token: String,

    /// Authorization scheme placed before the token.
    #[serde(default = "default_auth_scheme")]
    pub auth_scheme: String,

    /// Timeout for ordinary calls in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Timeout for `getUpdates` in seconds.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Maximum updates fetched per poll.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
            auth_scheme: default_auth_scheme(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
            fetch_limit: default_fetch_limit(),
        }
    }
}

impl ApiConfig {
    /// Converts to the HTTP transport settings.
    pub fn to_transport_config(&self) -> HttpTransportConfig {
        HttpTransportConfig::new(self.token.clone())
            .with_base_url(self.base_url.clone())
            .with_auth_scheme(self.auth_scheme.clone())
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_poll_timeout(Duration::from_secs(self.poll_timeout_secs))
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &token)
            .field("auth_scheme", &self.auth_scheme)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("fetch_limit", &self.fetch_limit)
            .finish()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_auth_scheme() -> String {
    "OAuth".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_poll_timeout_secs() -> u64 {
    60
}

fn default_fetch_limit() -> u32 {
    10
}

// =============================================================================
// Polling
// =============================================================================

/// Pause after each poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Pause after a non-empty batch, in milliseconds.
    #[serde(default = "default_active_interval_ms")]
    pub active_interval_ms: u64,

    /// Pause after an empty batch, in milliseconds.
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            active_interval_ms: default_active_interval_ms(),
            idle_interval_ms: default_idle_interval_ms(),
        }
    }
}

impl PollingConfig {
    pub fn active_interval(&self) -> Duration {
        Duration::from_millis(self.active_interval_ms)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }
}

fn default_active_interval_ms() -> u64 {
    200
}

fn default_idle_interval_ms() -> u64 {
    1000
}

// =============================================================================
// Scheduler
// =============================================================================

/// Concurrency and shutdown settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of events processed at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// How long shutdown waits for running events, in seconds.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Process events of one sender one at a time.
    #[serde(default = "default_serialize_per_sender")]
    pub serialize_per_sender: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            serialize_per_sender: default_serialize_per_sender(),
        }
    }
}

impl SchedulerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn default_max_concurrency() -> usize {
    128
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

fn default_serialize_per_sender() -> bool {
    true
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` without it.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level; `RUST_LOG` takes precedence.
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Log file, used with `output = "file"`.
    pub file_path: Option<PathBuf>,
    /// Per-target levels, e.g. `yabot_transport = "debug"`.
    pub filters: BTreeMap<String, LogLevel>,
    pub span_events: SpanEventConfig,
    pub thread_ids: bool,
    /// Include file and line.
    pub file_location: bool,
}
