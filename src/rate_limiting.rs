// ABOUTME: Per-user, per-operation abuse control with cooldown and hourly quota
// ABOUTME: Wraps the transactional rate-limit record mutation behind a single enforce() call
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Rate Limiting
//!
//! Two rules, checked inside one transaction against the per-(user,
//! operation) record:
//!
//! 1. **Cooldown**: a call arriving less than [`RateLimitConfig::cooldown_secs`]
//!    after the previous one is rejected.
//! 2. **Hourly quota**: at most [`RateLimitConfig::hourly_quota`] calls within
//!    the current rolling window; the window resets once its start is more
//!    than an hour old.
//!
//! The transaction commits before the model is invoked, so failed generations
//! still consume quota.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::config::RateLimitConfig;
use crate::database::{Database, RateLimitDecision};
use crate::errors::{AppError, AppResult};

/// Length of the rolling quota window
pub const WINDOW_SECS: i64 = 3600;

/// Operation key for the baseline generation flow
pub const OP_GENERATE_WORKOUT: &str = "generate_workout";

/// Operation key for the adaptive regeneration flow
pub const OP_GENERATE_ADAPTIVE_WORKOUT: &str = "generate_adaptive_workout";

/// Transactional per-user, per-operation rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    database: Database,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a rate limiter over the given store
    #[must_use]
    pub const fn new(database: Database, config: RateLimitConfig) -> Self {
        Self { database, config }
    }

    /// Admit or reject a call for (user, operation) at the current time
    ///
    /// # Errors
    ///
    /// Returns `RateLimitExceeded` when either rule rejects the call, or a
    /// database error if the transaction fails.
    pub async fn enforce(&self, user_id: Uuid, operation: &str) -> AppResult<()> {
        self.enforce_at(user_id, operation, Utc::now()).await
    }

    /// Admit or reject a call at an explicit point in time
    ///
    /// Split out from [`enforce`](Self::enforce) so tests can drive the clock.
    ///
    /// # Errors
    ///
    /// Returns `RateLimitExceeded` when either rule rejects the call, or a
    /// database error if the transaction fails.
    pub async fn enforce_at(
        &self,
        user_id: Uuid,
        operation: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let decision = self
            .database
            .check_and_increment_rate_limit(
                user_id,
                operation,
                now,
                self.config.cooldown_secs,
                WINDOW_SECS,
                self.config.hourly_quota,
            )
            .await?;

        match decision {
            RateLimitDecision::Allowed => Ok(()),
            RateLimitDecision::Denied { retry_after_secs } => {
                debug!(
                    %user_id,
                    operation,
                    retry_after_secs,
                    "rate limit rejected call"
                );
                Err(AppError::rate_limit_exceeded(retry_after_secs).with_user_id(user_id))
            }
        }
    }
}
