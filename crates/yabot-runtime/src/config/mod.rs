//! Configuration for the bot runtime.
//!
//! Layered loading with figment (files, `YABOT_*` environment variables,
//! programmatic overrides) and validation of the resulting [`BotConfig`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, TOKEN_ENV_VAR, load_config, load_config_from_file};
pub use schema::{
    ApiConfig, BotConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, PollingConfig,
    SchedulerConfig, SpanEventConfig,
};
pub use validation::{validate_config, validate_runtime_settings};
