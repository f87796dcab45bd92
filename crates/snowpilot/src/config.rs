//! Process configuration, read from the environment.
//!
//! Every required variable is checked before anything touches the network,
//! and all missing ones are reported together.
use std::str::FromStr;
use thiserror::Error;

use crate::agent::DEFAULT_MAX_ITERATIONS;
use crate::providers::configs::{AnthropicProviderConfig, ANTHROPIC_HOST, ANTHROPIC_MODEL, DEFAULT_MAX_TOKENS};

pub const SNOW_INSTANCE: &str = "SNOW_INSTANCE";
pub const SNOW_USERNAME: &str = "SNOW_USERNAME";
pub const SNOW_PASSWORD: &str = "SNOW_PASSWORD";
pub const SNOW_BASE_URL: &str = "SNOW_BASE_URL";
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ANTHROPIC_HOST_VAR: &str = "ANTHROPIC_HOST";
pub const ANTHROPIC_MODEL_VAR: &str = "ANTHROPIC_MODEL";
pub const MAX_TOKENS_VAR: &str = "SNOWPILOT_MAX_TOKENS";
pub const MAX_ITERATIONS_VAR: &str = "SNOWPILOT_MAX_ITERATIONS";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceNowConfig {
    /// Instance name, e.g. `dev1234`; a full URL is accepted too
    pub instance: String,
    pub username: String,
    pub password: String,
    /// Overrides the URL derived from `instance`
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub servicenow: ServiceNowConfig,
    pub anthropic: AnthropicProviderConfig,
    pub max_iterations: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env = EnvReader::new(lookup);

        let instance = env.required(SNOW_INSTANCE);
        let username = env.required(SNOW_USERNAME);
        let password = env.required(SNOW_PASSWORD);
        let api_key = env.required(ANTHROPIC_API_KEY);
        env.check_missing()?;

        let servicenow = ServiceNowConfig {
            instance,
            username,
            password,
            base_url: env.optional(SNOW_BASE_URL),
        };

        let anthropic = AnthropicProviderConfig {
            host: env
                .optional(ANTHROPIC_HOST_VAR)
                .unwrap_or_else(|| ANTHROPIC_HOST.to_string()),
            api_key,
            model: env
                .optional(ANTHROPIC_MODEL_VAR)
                .unwrap_or_else(|| ANTHROPIC_MODEL.to_string()),
            max_tokens: env.parsed(MAX_TOKENS_VAR, DEFAULT_MAX_TOKENS)?,
            temperature: None,
        };

        let max_iterations = env.parsed(MAX_ITERATIONS_VAR, DEFAULT_MAX_ITERATIONS)?;
        if max_iterations == 0 {
            return Err(ConfigError::Invalid {
                key: MAX_ITERATIONS_VAR.to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            servicenow,
            anthropic,
            max_iterations,
        })
    }
}

struct EnvReader<F> {
    lookup: F,
    missing: Vec<String>,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn new(lookup: F) -> Self {
        Self {
            lookup,
            missing: Vec::new(),
        }
    }

    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&mut self, key: &str) -> String {
        match self.optional(key) {
            Some(value) => value,
            None => {
                self.missing.push(key.to_string());
                String::new()
            }
        }
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key: key.to_string(),
                message: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    fn check_missing(&mut self) -> Result<(), ConfigError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(std::mem::take(&mut self.missing)))
        }
    }
}
