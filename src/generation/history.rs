// ABOUTME: History Sampler reading bounded slices of sessions and progress metrics
// ABOUTME: Best-effort personalization context; empty results and read failures never fail the pipeline
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # History Sampler
//!
//! Reads the most recent sessions and progress metrics to seed
//! personalization context. Both reads are best effort: an empty result set
//! is valid, and a failed read degrades to an empty sample with a warning
//! rather than failing the generation call.

use tracing::warn;
use uuid::Uuid;

use crate::database::Database;
use crate::models::{ProgressMetric, SessionSample};

/// Number of recent sessions sampled per call
pub const SESSION_SAMPLE_LIMIT: u32 = 10;

/// Number of recent progress metrics sampled per call
pub const PROGRESS_SAMPLE_LIMIT: u32 = 5;

/// Personalization context assembled from recent history
#[derive(Debug, Clone, Default)]
pub struct HistoryContext {
    /// Most recent sessions, newest first
    pub sessions: Vec<SessionSample>,
    /// Most recent progress metrics, newest first
    pub progress: Vec<ProgressMetric>,
}

/// Sample recent history for a user
pub async fn sample(database: &Database, user_id: Uuid) -> HistoryContext {
    let sessions = match database.recent_sessions(user_id, SESSION_SAMPLE_LIMIT).await {
        Ok(records) => records.iter().map(SessionSample::from_record).collect(),
        Err(e) => {
            warn!(%user_id, error = %e, "session history read failed, continuing without it");
            Vec::new()
        }
    };

    let progress = match database
        .recent_progress_metrics(user_id, PROGRESS_SAMPLE_LIMIT)
        .await
    {
        Ok(metrics) => metrics,
        Err(e) => {
            warn!(%user_id, error = %e, "progress metric read failed, continuing without it");
            Vec::new()
        }
    };

    HistoryContext { sessions, progress }
}
