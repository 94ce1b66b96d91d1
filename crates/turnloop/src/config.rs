use std::env;

use turnloop_core::{DEFAULT_MAX_ITERATIONS, SessionId};
use turnloop_openai_model::{OpenAIConfig, OpenAIConfigBuilder};

const API_KEY: &str = "OPENAI_API_KEY";
const BASE_URL: &str = "OPENAI_BASE_URL";
const MODEL: &str = "OPENAI_MODEL";
const SESSION_ID: &str = "TURNLOOP_SESSION_ID";
const MAX_ITERATIONS: &str = "TURNLOOP_MAX_ITERATIONS";

/// An error in the environment configuration.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    /// A variable has a value that can't be used.
    #[error("{name} must be a positive integer, got `{value}`")]
    Invalid {
        /// The variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Configuration of the console app.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// The model provider configuration.
    pub openai: OpenAIConfig,
    /// The session to resume, or `None` for a fresh one.
    pub session_id: Option<SessionId>,
    /// The bound on model invocations per turn.
    pub max_iterations: usize,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`. Empty values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let api_key = var(API_KEY).ok_or(ConfigError::Missing(API_KEY))?;
        let mut builder = OpenAIConfigBuilder::with_api_key(api_key);
        if let Some(base_url) = var(BASE_URL) {
            builder = builder.with_base_url(base_url);
        }
        if let Some(model) = var(MODEL) {
            builder = builder.with_model(model);
        }

        let max_iterations = match var(MAX_ITERATIONS) {
            Some(value) => match value.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: MAX_ITERATIONS,
                        value,
                    });
                }
            },
            None => DEFAULT_MAX_ITERATIONS,
        };

        Ok(Self {
            openai: builder.build(),
            session_id: var(SESSION_ID).map(SessionId::new),
            max_iterations,
        })
    }
}
