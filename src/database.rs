// ABOUTME: SQLite-backed document store for profiles, plans, session history, and rate limits
// ABOUTME: JSON document columns with server-managed timestamps and a transactional abuse-control record
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Database Management
//!
//! Document-store semantics over SQLite: profiles, workout plans, sessions,
//! and progress metrics are stored as JSON documents keyed by id/user, with
//! the columns the service actually queries on (timestamps, dedupe key)
//! promoted to real columns. The rate-limit record is the one piece of state
//! that is only ever mutated inside a transaction; see
//! [`Database::check_and_increment_rate_limit`].

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{
    FitnessProfile, ProgressMetric, SessionRecord, StoredProfile, StoredWorkoutPlan,
};

/// Outcome of a transactional rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Call admitted; the record was updated inside the transaction
    Allowed,
    /// Call rejected; retry after the given number of seconds
    Denied { retry_after_secs: i64 },
}

/// Database manager for profile, plan, and history storage
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection and run migrations
    ///
    /// # Errors
    ///
    /// Returns a database error if the connection or migration fails.
    pub async fn new(database_url: &str) -> AppResult<Self> {
        // Ensure SQLite creates the database file if it doesn't exist
        let connection_options = if database_url.starts_with("sqlite:")
            && !database_url.contains("memory")
            && !database_url.contains('?')
        {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };

        let pool = SqlitePool::connect(&connection_options).await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns a database error if any DDL statement fails.
    pub async fn migrate(&self) -> AppResult<()> {
        debug!("Running database migrations");

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS workout_plans (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                document TEXT NOT NULL,
                dedupe_key TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_workout_plans_user_id ON workout_plans(user_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_workout_plans_dedupe_key ON workout_plans(user_id, dedupe_key)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                document TEXT NOT NULL,
                started_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sessions_user_started ON sessions(user_id, started_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS progress_metrics (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                document TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_progress_user_recorded ON progress_metrics(user_id, recorded_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS rate_limits (
                user_id TEXT NOT NULL,
                operation TEXT NOT NULL,
                last_call_at TEXT NOT NULL,
                window_start TEXT NOT NULL,
                window_count INTEGER NOT NULL,
                PRIMARY KEY (user_id, operation)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ================================
    // Canonical Profiles
    // ================================

    /// Write a profile document, setting `created_at` once and refreshing
    /// `updated_at` on every write
    ///
    /// # Errors
    ///
    /// Returns a database error if the write fails.
    pub async fn upsert_profile(
        &self,
        user_id: Uuid,
        profile: &FitnessProfile,
        now: DateTime<Utc>,
    ) -> AppResult<StoredProfile> {
        let document = serde_json::to_string(profile)?;

        sqlx::query(
            r"
            INSERT INTO profiles (user_id, document, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                document = excluded.document,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user_id.to_string())
        .bind(&document)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.get_profile(user_id)
            .await?
            .ok_or_else(|| AppError::database("profile vanished after upsert"))
    }

    /// Load the canonical profile for a user
    ///
    /// # Errors
    ///
    /// Returns a database error if the read or document parse fails.
    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<Option<StoredProfile>> {
        let row = sqlx::query(
            "SELECT document, created_at, updated_at FROM profiles WHERE user_id = ?1",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let document: String = row.try_get("document")?;
        let profile: FitnessProfile = serde_json::from_str(&document)?;
        Ok(Some(StoredProfile {
            profile,
            created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
            updated_at: parse_timestamp(&row.try_get::<String, _>("updated_at")?)?,
        }))
    }

    // ================================
    // Workout Plans
    // ================================

    /// Persist a finished plan document
    ///
    /// # Errors
    ///
    /// Returns a database error if the write fails.
    pub async fn insert_plan(&self, plan: &StoredWorkoutPlan) -> AppResult<()> {
        let document = serde_json::to_string(plan)?;

        sqlx::query(
            r"
            INSERT INTO workout_plans (id, user_id, document, dedupe_key, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(plan.id.to_string())
        .bind(plan.user_id.to_string())
        .bind(&document)
        .bind(&plan.provenance.dedupe_key)
        .bind(plan.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Rewrite a stored plan document in place
    ///
    /// # Errors
    ///
    /// Returns a database error if the write fails.
    pub async fn update_plan(&self, plan: &StoredWorkoutPlan) -> AppResult<()> {
        let document = serde_json::to_string(plan)?;

        sqlx::query(
            r"
            UPDATE workout_plans SET document = ?2, dedupe_key = ?3
            WHERE id = ?1
            ",
        )
        .bind(plan.id.to_string())
        .bind(&document)
        .bind(&plan.provenance.dedupe_key)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load a plan by id
    ///
    /// # Errors
    ///
    /// Returns a database error if the read or document parse fails.
    pub async fn get_plan(&self, plan_id: Uuid) -> AppResult<Option<StoredWorkoutPlan>> {
        let row = sqlx::query("SELECT document FROM workout_plans WHERE id = ?1")
            .bind(plan_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| {
            let document: String = r.try_get("document")?;
            Ok(serde_json::from_str(&document)?)
        })
        .transpose()
    }

    /// Client-side reuse query: plans a user generated under a dedupe key,
    /// newest first. The key is advisory; multiple plans may share it.
    ///
    /// # Errors
    ///
    /// Returns a database error if the read or document parse fails.
    pub async fn plans_by_dedupe_key(
        &self,
        user_id: Uuid,
        dedupe_key: &str,
    ) -> AppResult<Vec<StoredWorkoutPlan>> {
        let rows = sqlx::query(
            r"
            SELECT document FROM workout_plans
            WHERE user_id = ?1 AND dedupe_key = ?2
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id.to_string())
        .bind(dedupe_key)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let document: String = r.try_get("document")?;
                Ok(serde_json::from_str(&document)?)
            })
            .collect()
    }

    // ================================
    // Session History & Progress Metrics
    // ================================

    /// Append a session record
    ///
    /// # Errors
    ///
    /// Returns a database error if the write fails.
    pub async fn insert_session(&self, record: &SessionRecord) -> AppResult<()> {
        let document = serde_json::to_string(record)?;

        sqlx::query(
            r"
            INSERT INTO sessions (id, user_id, document, started_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(record.id.to_string())
        .bind(record.user_id.to_string())
        .bind(&document)
        .bind(record.started_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent sessions ordered by start time descending
    ///
    /// # Errors
    ///
    /// Returns a database error if the read or document parse fails.
    pub async fn recent_sessions(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> AppResult<Vec<SessionRecord>> {
        let rows = sqlx::query(
            r"
            SELECT document FROM sessions
            WHERE user_id = ?1
            ORDER BY started_at DESC
            LIMIT ?2
            ",
        )
        .bind(user_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let document: String = r.try_get("document")?;
                Ok(serde_json::from_str(&document)?)
            })
            .collect()
    }

    /// Append a progress metric
    ///
    /// # Errors
    ///
    /// Returns a database error if the write fails.
    pub async fn insert_progress_metric(&self, metric: &ProgressMetric) -> AppResult<()> {
        let document = serde_json::to_string(metric)?;

        sqlx::query(
            r"
            INSERT INTO progress_metrics (id, user_id, document, recorded_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(metric.id.to_string())
        .bind(metric.user_id.to_string())
        .bind(&document)
        .bind(metric.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent progress metrics ordered by recording time descending
    ///
    /// # Errors
    ///
    /// Returns a database error if the read or document parse fails.
    pub async fn recent_progress_metrics(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> AppResult<Vec<ProgressMetric>> {
        let rows = sqlx::query(
            r"
            SELECT document FROM progress_metrics
            WHERE user_id = ?1
            ORDER BY recorded_at DESC
            LIMIT ?2
            ",
        )
        .bind(user_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let document: String = r.try_get("document")?;
                Ok(serde_json::from_str(&document)?)
            })
            .collect()
    }

    // ================================
    // Rate Limiting
    // ================================

    /// Atomic read-check-write of the rate-limit record for one
    /// (user, operation) pair
    ///
    /// The cooldown and window checks must be indivisible: two concurrent
    /// requests from the same user must not both observe "under quota" and
    /// both proceed. The whole decision runs inside a single transaction.
    ///
    /// # Errors
    ///
    /// Returns a database error if the transaction fails.
    pub async fn check_and_increment_rate_limit(
        &self,
        user_id: Uuid,
        operation: &str,
        now: DateTime<Utc>,
        cooldown_secs: i64,
        window_secs: i64,
        quota: u32,
    ) -> AppResult<RateLimitDecision> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r"
            SELECT last_call_at, window_start, window_count
            FROM rate_limits
            WHERE user_id = ?1 AND operation = ?2
            ",
        )
        .bind(user_id.to_string())
        .bind(operation)
        .fetch_optional(&mut *tx)
        .await?;

        let decision = match row {
            None => {
                sqlx::query(
                    r"
                    INSERT INTO rate_limits (user_id, operation, last_call_at, window_start, window_count)
                    VALUES (?1, ?2, ?3, ?3, 1)
                    ",
                )
                .bind(user_id.to_string())
                .bind(operation)
                .bind(now.to_rfc3339())
                .execute(&mut *tx)
                .await?;
                RateLimitDecision::Allowed
            }
            Some(row) => {
                let last_call_at = parse_timestamp(&row.try_get::<String, _>("last_call_at")?)?;
                let window_start = parse_timestamp(&row.try_get::<String, _>("window_start")?)?;
                let window_count: i64 = row.try_get("window_count")?;

                let since_last = (now - last_call_at).num_seconds();
                let since_window_start = (now - window_start).num_seconds();

                if since_last < cooldown_secs {
                    RateLimitDecision::Denied {
                        retry_after_secs: cooldown_secs - since_last,
                    }
                } else if since_window_start > window_secs {
                    // Window rolled over: start a fresh one
                    sqlx::query(
                        r"
                        UPDATE rate_limits
                        SET last_call_at = ?3, window_start = ?3, window_count = 1
                        WHERE user_id = ?1 AND operation = ?2
                        ",
                    )
                    .bind(user_id.to_string())
                    .bind(operation)
                    .bind(now.to_rfc3339())
                    .execute(&mut *tx)
                    .await?;
                    RateLimitDecision::Allowed
                } else if window_count >= i64::from(quota) {
                    RateLimitDecision::Denied {
                        retry_after_secs: window_secs - since_window_start,
                    }
                } else {
                    sqlx::query(
                        r"
                        UPDATE rate_limits
                        SET last_call_at = ?3, window_count = window_count + 1
                        WHERE user_id = ?1 AND operation = ?2
                        ",
                    )
                    .bind(user_id.to_string())
                    .bind(operation)
                    .bind(now.to_rfc3339())
                    .execute(&mut *tx)
                    .await?;
                    RateLimitDecision::Allowed
                }
            }
        };

        tx.commit().await?;
        Ok(decision)
    }
}

/// Parse an RFC 3339 timestamp column back into `DateTime<Utc>`
fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::database(format!("invalid stored timestamp: {e}")))
}
