//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ApiConfig, BotConfig, PollingConfig, SchedulerConfig};

/// Largest `fetch_limit` accepted.
const MAX_FETCH_LIMIT: u32 = 1000;

/// Validates the entire configuration.
pub fn validate_config(config: &BotConfig) -> ConfigResult<()> {
    validate_api_config(&config.api)?;
    validate_runtime_settings(config)
}

/// Validates everything but the HTTP connection settings.
///
/// Used when the runtime is given its own transport.
pub fn validate_runtime_settings(config: &BotConfig) -> ConfigResult<()> {
    validate_fetch_limit(config.api.fetch_limit)?;
    validate_polling_config(&config.polling)?;
    validate_scheduler_config(&config.scheduler)?;
    Ok(())
}

fn validate_api_config(api: &ApiConfig) -> ConfigResult<()> {
    if api.token.trim().is_empty() {
        return Err(ConfigError::missing_field("api.token"));
    }

    if api.auth_scheme.trim().is_empty() {
        return Err(ConfigError::missing_field("api.auth_scheme"));
    }

    validate_url(&api.base_url)?;

    if api.request_timeout_secs == 0 {
        return Err(ConfigError::invalid("Request timeout must be greater than 0"));
    }

    if api.poll_timeout_secs == 0 {
        return Err(ConfigError::invalid("Poll timeout must be greater than 0"));
    }

    Ok(())
}

fn validate_fetch_limit(limit: u32) -> ConfigResult<()> {
    if !(1..=MAX_FETCH_LIMIT).contains(&limit) {
        return Err(ConfigError::invalid(format!(
            "Fetch limit must be between 1 and {MAX_FETCH_LIMIT}, got {limit}"
        )));
    }
    Ok(())
}

fn validate_polling_config(polling: &PollingConfig) -> ConfigResult<()> {
    if polling.idle_interval_ms == 0 {
        return Err(ConfigError::invalid(
            "Idle poll interval must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_scheduler_config(scheduler: &SchedulerConfig) -> ConfigResult<()> {
    if scheduler.max_concurrency == 0 {
        return Err(ConfigError::invalid(
            "Max concurrency must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field("api.base_url"));
    }

    let valid_schemes = ["http://", "https://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {valid_schemes:?}"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> BotConfig {
        let mut config = BotConfig::default();
        config.api.token = "token".into();
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_missing_token() {
        let result = validate_config(&BotConfig::default());
        assert!(matches!(result, Err(ConfigError::MissingField { field }) if field == "api.token"));
    }

    #[test]
    fn test_bad_base_url() {
        let mut config = valid();
        config.api.base_url = "ftp://example.com".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_fetch_limit_bounds() {
        let mut config = valid();
        config.api.fetch_limit = 0;
        assert!(validate_config(&config).is_err());
        config.api.fetch_limit = 1001;
        assert!(validate_config(&config).is_err());
        config.api.fetch_limit = 1000;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_runtime_settings_ignore_token() {
        let mut config = BotConfig::default();
        assert!(validate_runtime_settings(&config).is_ok());
        config.api.fetch_limit = 0;
        assert!(validate_runtime_settings(&config).is_err());
    }

    #[test]
    fn test_zero_values_rejected() {
        let mut config = valid();
        config.scheduler.max_concurrency = 0;
        assert!(validate_config(&config).is_err());

        let mut config = valid();
        config.api.poll_timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = valid();
        config.polling.idle_interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }
}
