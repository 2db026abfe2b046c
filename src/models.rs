// ABOUTME: Core data models for profiles, generation requests, workout plans, and history records
// ABOUTME: Serde-backed types mirroring the document-store layout with bounds documented per field
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Data Models
//!
//! Types shared across the generation pipeline. Validation of inbound bounds
//! lives in [`crate::generation::validation`]; derived-record computation and
//! digest hashing live in [`crate::generation::profile`]. The structs here are
//! deliberately plain serde carriers so they round-trip cleanly through the
//! JSON document columns in the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::TokenUsage;

// ============================================================================
// Enums
// ============================================================================

/// Self-reported fitness level of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
}

/// Preferred workout intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Moderate,
    High,
}

impl Intensity {
    /// Numeric score used for the training-load index (low=1, moderate=2, high=3)
    #[must_use]
    pub const fn score(&self) -> u32 {
        match self {
            Self::Low => 1,
            Self::Moderate => 2,
            Self::High => 3,
        }
    }
}

/// Difficulty rating of a plan or exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

/// Subjective difficulty feedback on a completed session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyFeedback {
    TooEasy,
    JustRight,
    TooHard,
}

// ============================================================================
// Canonical Profile
// ============================================================================

/// Weekly time commitment (days/week 1-7, minutes/session 10-180)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeCommitment {
    pub days_per_week: u32,
    pub minutes_per_session: u32,
    /// Preferred time-of-day tags, non-empty (`morning`, `afternoon`, `evening`)
    pub preferred_times: Vec<String>,
}

/// Workout preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Workout-type tags (e.g. `strength`, `hiit`, `yoga`)
    #[serde(default)]
    pub workout_types: Vec<String>,
    pub intensity: Intensity,
    /// Preferred rest-day index, 0 = Sunday .. 6 = Saturday
    pub rest_day: u32,
    /// Injury / limitation tags
    #[serde(default)]
    pub limitations: Vec<String>,
}

/// Derived sub-record, recomputed on every profile write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedProfile {
    /// days/week x minutes/session
    pub weekly_minutes: u32,
    /// low=1, moderate=2, high=3
    pub intensity_score: u32,
    /// weekly minutes x intensity score, coarse workload proxy
    pub training_load_index: u32,
    /// Order-independent content hash of the normalized profile
    pub digest: String,
    /// 0-100 completeness heuristic
    pub completeness: u32,
}

/// Canonical fitness profile, one per user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitnessProfile {
    pub fitness_level: FitnessLevel,
    /// Goal tags, deduplicated and lower-cased
    #[serde(default)]
    pub goals: Vec<String>,
    /// Available-equipment tags, same normalization
    #[serde(default)]
    pub equipment: Vec<String>,
    pub time_commitment: TimeCommitment,
    pub preferences: Preferences,
    /// Derived sub-record; absent on transient inline profiles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedProfile>,
}

/// Profile as stored, with server-managed timestamps
#[derive(Debug, Clone)]
pub struct StoredProfile {
    pub profile: FitnessProfile,
    /// Set once on first submission
    pub created_at: DateTime<Utc>,
    /// Refreshed on every write
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update; `None` fields keep their current value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness_level: Option<FitnessLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_commitment: Option<TimeCommitment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
}

impl ProfilePatch {
    /// Whether the patch carries the complete shape required for the
    /// first-run inline fallback (level + time commitment + preferences)
    #[must_use]
    pub const fn is_complete_shape(&self) -> bool {
        self.fitness_level.is_some()
            && self.time_commitment.is_some()
            && self.preferences.is_some()
    }
}

// ============================================================================
// Generation Requests
// ============================================================================

/// Inbound request for a fresh workout generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutRequest {
    /// Workout-type tag (e.g. `strength`, `cardio`)
    pub workout_type: String,
    /// Explicit progression level (1-10), overrides the computed one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progression_level: Option<u8>,
    /// Focus-area tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_areas: Option<Vec<String>>,
    /// Prior plan identifiers the caller wants taken into account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_workout_ids: Option<Vec<String>>,
    /// Profile-shape overrides, used only when no canonical profile exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_overrides: Option<ProfilePatch>,
    /// Client-supplied idempotency key, takes precedence over the derived one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

/// Inbound request for the feedback-driven adaptive regeneration flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveWorkoutRequest {
    /// Plan this feedback refers to
    pub previous_workout_id: Uuid,
    /// 1-5
    pub performance_rating: u8,
    /// 0.0-1.0
    pub completion_rate: f64,
    pub difficulty_feedback: DifficultyFeedback,
    /// Actual time taken, minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_actual_minutes: Option<u32>,
}

// ============================================================================
// Workout Plan
// ============================================================================

/// A single exercise within a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Ordered instruction steps (1-12)
    pub instructions: Vec<String>,
    /// Target-muscle tags (1-10)
    pub target_muscles: Vec<String>,
    /// Equipment tags (0-10)
    #[serde(default)]
    pub equipment: Vec<String>,
    pub difficulty: Difficulty,
    /// 1-10
    pub sets: u32,
    /// 1-50; reps and duration are not mutually exclusive in the schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    /// 5-3600 seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    /// 0-600 seconds
    pub rest_seconds: u32,
    /// 0-10 coaching tips
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progression_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_cues: Option<Vec<String>>,
}

/// Workout plan as produced by the model and validated by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutPlan {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub workout_type: String,
    pub difficulty: Difficulty,
    /// Estimated duration, 10-180 minutes
    pub duration_minutes: u32,
    /// Ordered main block (1-40 exercises)
    pub exercises: Vec<Exercise>,
    /// Optional warm-up block (<=10 exercises)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warm_up: Option<Vec<Exercise>>,
    /// Optional cool-down block (<=10 exercises)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cool_down: Option<Vec<Exercise>>,
    /// Plan-level equipment tag set; always a subset of allowed equipment
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub target_muscles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progression_tips: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories_estimate: Option<u32>,
}

/// Lifecycle status of a stored plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Active,
    Archived,
}

/// Provenance recorded alongside every generated plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanProvenance {
    /// Generation source tag (`generated` or `adaptive`)
    pub source: String,
    /// Model identifier reported by the endpoint
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    /// Snapshot of the personalization inputs used for the prompt
    pub personalization: serde_json::Value,
    /// Profile digest at generation time
    pub profile_digest: String,
    /// Derived or caller-supplied idempotency key, advisory only
    pub dedupe_key: String,
    pub status: PlanStatus,
    /// Progression level the plan was generated for
    pub progression_level: u8,
    /// Source plan for the adaptive flow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_workout_id: Option<Uuid>,
}

/// A persisted plan document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredWorkoutPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: WorkoutPlan,
    pub provenance: PlanProvenance,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Session History & Progress Metrics
// ============================================================================

/// A recorded workout session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub workout_type: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// 1-5 session rating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Identifiers of exercises actually performed
    #[serde(default)]
    pub exercises_completed: Vec<String>,
}

/// Bounded projection of a session used for personalization context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSample {
    pub workout_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default)]
    pub exercises_completed: Vec<String>,
    /// end - start in whole minutes, when both timestamps exist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
}

impl SessionSample {
    /// Project a full session record down to the personalization fields
    #[must_use]
    pub fn from_record(record: &SessionRecord) -> Self {
        let duration_minutes = record
            .ended_at
            .map(|ended| (ended - record.started_at).num_minutes());
        Self {
            workout_type: record.workout_type.clone(),
            completed_at: record.completed_at,
            rating: record.rating,
            feedback: record.feedback.clone(),
            exercises_completed: record.exercises_completed.clone(),
            duration_minutes,
        }
    }
}

/// A recorded progress metric (weight, body fat, estimated 1RM, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressMetric {
    pub id: Uuid,
    pub user_id: Uuid,
    pub metric: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

// ============================================================================
// Service Outcomes
// ============================================================================

/// Adjustments reported back from the adaptive flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adaptations {
    pub new_progression_level: u8,
    pub reason: String,
}

/// Result of a generation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub workout_plan: StoredWorkoutPlan,
    pub dedupe_key: String,
    /// Present only on the adaptive flow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adaptations: Option<Adaptations>,
}
