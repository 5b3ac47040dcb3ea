//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::profile::QuestionSet;
use crate::stage::DEFAULT_HISTORY_LIMIT;

/// Environment variable names.
pub mod env_keys {
    pub const BACKEND_URL: &str = "FITCHAT_BACKEND_URL";
    pub const REQUEST_TIMEOUT_SECS: &str = "FITCHAT_REQUEST_TIMEOUT_SECS";
    pub const QUESTIONS_PATH: &str = "FITCHAT_QUESTIONS_PATH";
    pub const STAGE_HISTORY_LIMIT: &str = "FITCHAT_STAGE_HISTORY_LIMIT";
}

/// Session configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Base URL of the backend that proxies chat requests.
    pub backend_url: String,
    /// How long a chat request may take before it is reported as failed.
    pub request_timeout: Duration,
    /// JSON question catalogue; the built-in fitness questions when unset.
    pub questions_path: Option<PathBuf>,
    /// Maximum number of stages kept for back navigation.
    pub stage_history_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:3000".to_string(),
            request_timeout: Duration::from_secs(60),
            questions_path: None,
            stage_history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for
    /// unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend_url = match get(env_keys::BACKEND_URL) {
            Some(url) => {
                let url = url.trim().to_string();
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::InvalidValue {
                        key: env_keys::BACKEND_URL.to_string(),
                        message: format!("expected an http(s) URL, got {url}"),
                    });
                }
                url
            }
            None => defaults.backend_url,
        };

        let request_timeout = match get(env_keys::REQUEST_TIMEOUT_SECS) {
            Some(raw) => Duration::from_secs(parse_positive(env_keys::REQUEST_TIMEOUT_SECS, &raw)?),
            None => defaults.request_timeout,
        };

        let stage_history_limit = match get(env_keys::STAGE_HISTORY_LIMIT) {
            Some(raw) => parse_positive(env_keys::STAGE_HISTORY_LIMIT, &raw)? as usize,
            None => defaults.stage_history_limit,
        };

        Ok(Self {
            backend_url,
            request_timeout,
            questions_path: get(env_keys::QUESTIONS_PATH).map(PathBuf::from),
            stage_history_limit,
        })
    }

    /// The configured question catalogue.
    pub fn load_questions(&self) -> Result<QuestionSet, ConfigError> {
        match &self.questions_path {
            Some(path) => QuestionSet::load(path),
            None => Ok(QuestionSet::fitness()),
        }
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a positive integer, got {raw}"),
        }),
    }
}
