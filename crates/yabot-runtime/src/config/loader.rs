//! Layered configuration loading.
//!
//! Sources, lowest priority first:
//!
//! | # | Source | Example |
//! |---|--------|---------|
//! | 1 | [`BotConfig::default`] | |
//! | 2 | [`ConfigLoader::merge`] | values set in code |
//! | 3 | profile file | `yabot.production.toml` |
//! | 4 | main file | `yabot.toml`, `config.toml` |
//! | 5 | `YABOT_*` variables, `__` for nesting | `YABOT_SCHEDULER__MAX_CONCURRENCY=32` |
//! | 6 | [`TOKEN_ENV_VAR`] | `YANDEX_BOT_API_KEY=...` → `api.token` |
//!
//! Files are searched in each search path (the current directory and
//! `<user config dir>/yabot` by default). Only formats enabled by the
//! `toml-config` / `yaml-config` features are considered.
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./deploy/yabot.toml")
//!     .load()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Serialized};
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
use tracing::{debug, info, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::BotConfig;

/// Environment variable holding the bot token.
pub const TOKEN_ENV_VAR: &str = "YANDEX_BOT_API_KEY";

/// Environment variable selecting the [`Profile`].
const PROFILE_ENV_VAR: &str = "YABOT_PROFILE";

/// File stems searched in every search path, in order.
const FILE_STEMS: [&str; 2] = ["yabot", "config"];

// =============================================================================
// Profile
// =============================================================================

/// Selects the `<stem>.<profile>.<ext>` file merged under the main one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    /// Accepts `dev`/`prod` as short forms, case-insensitively.
    pub fn parse(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "dev" | "development" => Self::Development,
            "prod" | "production" => Self::Production,
            _ => Self::Custom(name),
        }
    }

    /// Reads `YABOT_PROFILE`; development when unset.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_ENV_VAR)
            .map(|name| Self::parse(&name))
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// File formats
// =============================================================================

/// A configuration file format enabled at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl FileFormat {
    /// Enabled formats with their extensions, in search order.
    const ENABLED: &'static [(FileFormat, &'static [&'static str])] = &[
        #[cfg(feature = "toml-config")]
        (FileFormat::Toml, &["toml"]),
        #[cfg(feature = "yaml-config")]
        (FileFormat::Yaml, &["yaml", "yml"]),
    ];

    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ENABLED
            .iter()
            .find(|(_, exts)| exts.contains(&ext))
            .map(|(format, _)| *format)
    }

    #[allow(unused_variables)]
    fn merge(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(figment::providers::Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(figment::providers::Yaml::file(path)),
        }
    }
}

// =============================================================================
// ConfigLoader
// =============================================================================

/// Builds a [`BotConfig`] from defaults, files and the environment.
pub struct ConfigLoader {
    /// Values from [`merge`](Self::merge), layered right above the defaults.
    base: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    /// Loaded instead of searching when set.
    file: Option<PathBuf>,
    read_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Profile from `YABOT_PROFILE`, environment enabled, default search paths.
    pub fn new() -> Self {
        Self {
            base: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            file: None,
            read_env: true,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a directory to search. Replaces the default search paths.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join("yabot")),
            None => self,
        }
    }

    /// Loads exactly `path`; it must exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.read_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Layers `config` above the defaults and below files and the environment.
    pub fn merge(mut self, config: BotConfig) -> Self {
        self.base = self.base.merge(Serialized::defaults(config));
        self
    }

    pub fn load(self) -> ConfigResult<BotConfig> {
        let profile = self.profile.clone();
        let config: BotConfig = self.figment()?.extract()?;

        debug!(
            %profile,
            level = %config.logging.level,
            token_set = !config.api.token.is_empty(),
            "Configuration loaded"
        );
        Ok(config)
    }

    fn figment(self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(BotConfig::default())).merge(self.base.clone());

        figment = match &self.file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path.clone()));
                }
                let format = FileFormat::from_path(path).ok_or_else(|| {
                    ConfigError::UnsupportedFormat {
                        extension: path
                            .extension()
                            .map(|e| e.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                    }
                })?;
                info!(path = %path.display(), "Loading configuration file");
                format.merge(figment, path)
            }
            None => self.search(figment),
        };

        if self.read_env {
            figment = figment
                .merge(Env::prefixed("YABOT_").split("__"))
                .merge(Env::raw().only(&[TOKEN_ENV_VAR]).map(|_| "api.token".into()));
        }
        Ok(figment)
    }

    fn search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("yabot")))
            .collect()
    }

    /// Merges the first main file found, preceded by its profile variant.
    fn search(&self, figment: Figment) -> Figment {
        for dir in self.search_paths() {
            for stem in FILE_STEMS {
                for (format, exts) in FileFormat::ENABLED {
                    for ext in exts.iter() {
                        let main = dir.join(format!("{stem}.{ext}"));
                        if !main.exists() {
                            continue;
                        }
                        let mut figment = figment;
                        let variant = dir.join(format!("{stem}.{}.{ext}", self.profile));
                        if variant.exists() {
                            debug!(path = %variant.display(), "Loading profile configuration");
                            figment = format.merge(figment, &variant);
                        }
                        info!(path = %main.display(), "Loading configuration file");
                        return format.merge(figment, &main);
                    }
                }
            }
        }
        warn!("No configuration file found, using defaults");
        figment
    }
}

/// Loads from the default locations and the environment.
pub fn load_config() -> ConfigResult<BotConfig> {
    ConfigLoader::new().load()
}

/// Loads `path` plus the environment.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<BotConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_default_config() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .without_env()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.logging.level, LogLevel::Info);
            assert_eq!(config.api.fetch_limit, 10);
            assert!(config.api.token.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "yabot.toml",
                r#"
                [api]
                token = "from-file"
                fetch_limit = 20

                [scheduler]
                max_concurrency = 16
                "#,
            )?;
            jail.set_env("YABOT_SCHEDULER__MAX_CONCURRENCY", "8");
            jail.set_env("YABOT_LOGGING__LEVEL", "debug");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.api.token, "from-file");
            assert_eq!(config.api.fetch_limit, 20);
            assert_eq!(config.scheduler.max_concurrency, 8);
            assert_eq!(config.logging.level, LogLevel::Debug);
            Ok(())
        });
    }

    #[test]
    fn test_token_env_var_wins() {
        Jail::expect_with(|jail| {
            jail.create_file("yabot.toml", "[api]\ntoken = \"from-file\"")?;
            jail.set_env("YANDEX_BOT_API_KEY", "from-env");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.api.token, "from-env");
            Ok(())
        });
    }

    #[test]
    fn test_profile_file_is_merged_under_main_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "yabot.production.toml",
                "[polling]\nidle_interval_ms = 5000\nactive_interval_ms = 50",
            )?;
            jail.create_file("yabot.toml", "[polling]\nactive_interval_ms = 100")?;

            let config = ConfigLoader::new()
                .without_env()
                .profile("prod")
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.polling.idle_interval_ms, 5000);
            assert_eq!(config.polling.active_interval_ms, 100);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        Jail::expect_with(|jail| {
            let result = ConfigLoader::new()
                .without_env()
                .file(jail.directory().join("nope.toml"))
                .load();
            assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
            Ok(())
        });
    }

    #[test]
    fn test_unsupported_extension() {
        Jail::expect_with(|jail| {
            jail.create_file("yabot.ini", "x=1")?;
            let result = ConfigLoader::new()
                .without_env()
                .file(jail.directory().join("yabot.ini"))
                .load();
            assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
            Ok(())
        });
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("PROD"), Profile::Production);
        assert_eq!(Profile::parse("dev"), Profile::Development);
        assert_eq!(Profile::parse("staging"), Profile::Custom("staging".into()));
    }
}
