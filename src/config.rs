// ABOUTME: Environment-based configuration for database, model endpoint, and abuse control
// ABOUTME: Environment-only approach with documented defaults, no config files
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Environment-based configuration management
//!
//! All runtime configuration is read from environment variables with sensible
//! defaults, so the service can run with nothing but an API key set.
//!
//! | Variable | Default | Purpose |
//! |----------|---------|---------|
//! | `FITFORGE_DATABASE_URL` | `sqlite:./data/fitforge.db` | SQLite database location |
//! | `FITFORGE_LLM_BASE_URL` | `http://localhost:11434/v1` | OpenAI-compatible endpoint |
//! | `FITFORGE_LLM_MODEL` | `qwen2.5:14b-instruct` | Model identifier |
//! | `FITFORGE_LLM_API_KEY` | (unset) | Bearer token, optional for local servers |
//! | `FITFORGE_LLM_TEMPERATURE` | `0.7` | Sampling temperature |
//! | `FITFORGE_LLM_MAX_TOKENS` | `4096` | Completion token ceiling |
//! | `FITFORGE_RATE_LIMIT_COOLDOWN_SECS` | `15` | Per-operation cooldown |
//! | `FITFORGE_RATE_LIMIT_HOURLY_QUOTA` | `10` | Calls per rolling hour |

use std::env;

use crate::errors::AppResult;

/// Environment variable for the database URL
pub const DATABASE_URL_ENV: &str = "FITFORGE_DATABASE_URL";

/// Default SQLite database location
pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/fitforge.db";

/// Model invocation settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible endpoint
    pub base_url: String,
    /// Bearer token, optional for local servers
    pub api_key: Option<String>,
    /// Model identifier sent with every request
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token ceiling
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".into(),
            api_key: None,
            model: "qwen2.5:14b-instruct".into(),
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

impl LlmConfig {
    /// Read model settings from the environment
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("FITFORGE_LLM_BASE_URL").unwrap_or(defaults.base_url),
            api_key: env::var("FITFORGE_LLM_API_KEY").ok().filter(|k| !k.is_empty()),
            model: env::var("FITFORGE_LLM_MODEL").unwrap_or(defaults.model),
            temperature: env::var("FITFORGE_LLM_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.temperature),
            max_tokens: env::var("FITFORGE_LLM_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_tokens),
        }
    }
}

/// Abuse-control knobs for the per-user, per-operation rate limiter
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Minimum seconds between calls for the same (user, operation)
    pub cooldown_secs: i64,
    /// Maximum calls within the rolling window
    pub hourly_quota: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 15,
            hourly_quota: 10,
        }
    }
}

impl RateLimitConfig {
    /// Read rate-limit settings from the environment
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cooldown_secs: env::var("FITFORGE_RATE_LIMIT_COOLDOWN_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cooldown_secs),
            hourly_quota: env::var("FITFORGE_RATE_LIMIT_HOURLY_QUOTA")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.hourly_quota),
        }
    }
}

/// Top-level service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// SQLite database URL
    pub database_url: String,
    /// Model endpoint settings
    pub llm: LlmConfig,
    /// Abuse-control settings
    pub rate_limit: RateLimitConfig,
}

impl ServiceConfig {
    /// Load the full service configuration from the environment
    ///
    /// # Errors
    ///
    /// Currently infallible; returns `AppResult` so stricter validation can
    /// be added without changing call sites.
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            database_url: env::var(DATABASE_URL_ENV).unwrap_or_else(|_| DEFAULT_DATABASE_URL.into()),
            llm: LlmConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        for var in [
            DATABASE_URL_ENV,
            "FITFORGE_LLM_BASE_URL",
            "FITFORGE_LLM_MODEL",
            "FITFORGE_RATE_LIMIT_COOLDOWN_SECS",
            "FITFORGE_RATE_LIMIT_HOURLY_QUOTA",
        ] {
            std::env::remove_var(var);
        }

        let config = ServiceConfig::from_env().expect("config loads");
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.rate_limit.cooldown_secs, 15);
        assert_eq!(config.rate_limit.hourly_quota, 10);
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("FITFORGE_RATE_LIMIT_HOURLY_QUOTA", "25");
        std::env::set_var("FITFORGE_LLM_MODEL", "llama-3.3-70b-versatile");

        let config = ServiceConfig::from_env().expect("config loads");
        assert_eq!(config.rate_limit.hourly_quota, 25);
        assert_eq!(config.llm.model, "llama-3.3-70b-versatile");

        std::env::remove_var("FITFORGE_RATE_LIMIT_HOURLY_QUOTA");
        std::env::remove_var("FITFORGE_LLM_MODEL");
    }
}
