//! Application environment mode and process settings.

use std::path::PathBuf;
use std::sync::OnceLock;

use crate::logging::LoggerLoader;

/// Environment variable selecting the [`AppEnv`].
pub const APP_ENV_VAR: &str = "APP_ENV";
/// Environment variable naming the application.
pub const APP_NAME_VAR: &str = "APP_NAME";
/// Comma-separated list of YAML config files.
pub const CONFIG_FILES_VAR: &str = "MOZI_CONFIG";
/// Base directory for log files, used when the config files don't set one.
pub const LOG_PATH_VAR: &str = "MOZI_LOG_PATH";

/// Default application name.
pub const DEFAULT_APP_NAME: &str = "mozi";
/// Config file used when [`CONFIG_FILES_VAR`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "config/config.yml";

/// Runtime mode of the application.
///
/// Only default values depend on the mode; behavior does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnv {
    Production,
    #[default]
    Development,
    Test,
}

impl AppEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "prod",
            Self::Development => "dev",
            Self::Test => "test",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "prod" | "production" => Some(Self::Production),
            "dev" | "development" => Some(Self::Development),
            "test" => Some(Self::Test),
            _ => None,
        }
    }

    /// Read the mode from `APP_ENV`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(APP_ENV_VAR)
            .ok()
            .and_then(|v| Self::parse(&v))
            .unwrap_or_default()
    }

    /// Mode of the running process, read once.
    pub fn current() -> Self {
        static CURRENT: OnceLock<AppEnv> = OnceLock::new();
        *CURRENT.get_or_init(Self::from_env)
    }

    pub fn is_prod(&self) -> bool {
        *self == Self::Production
    }

    pub fn is_dev(&self) -> bool {
        *self == Self::Development
    }

    pub fn is_test(&self) -> bool {
        *self == Self::Test
    }

    /// Debug output is enabled everywhere except production.
    pub fn is_debug(&self) -> bool {
        !self.is_prod()
    }
}

impl std::fmt::Display for AppEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process settings resolved from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub env: AppEnv,
    pub app_name: String,
    pub config_files: Vec<PathBuf>,
    pub log_path: Option<PathBuf>,
}

impl Settings {
    /// Load a `.env` file if present, then read the process environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = lookup(APP_ENV_VAR)
            .and_then(|v| AppEnv::parse(&v))
            .unwrap_or_default();

        let app_name = lookup(APP_NAME_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());

        let config_files = lookup(CONFIG_FILES_VAR)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .collect::<Vec<_>>()
            })
            .filter(|files| !files.is_empty())
            .unwrap_or_else(|| vec![PathBuf::from(DEFAULT_CONFIG_FILE)]);

        let log_path = lookup(LOG_PATH_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Self {
            env,
            app_name,
            config_files,
            log_path,
        }
    }

    pub fn is_debug(&self) -> bool {
        self.env.is_debug()
    }

    /// Logger loader over the configured files and log path.
    pub fn logger_loader(&self) -> LoggerLoader {
        let loader = LoggerLoader::new(self.config_files.clone());
        match &self.log_path {
            Some(path) => loader.with_log_path(path.clone()),
            None => loader,
        }
    }
}
