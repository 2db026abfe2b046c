// ABOUTME: Generation orchestrator wiring validation, rate limiting, profile resolution, and the model
// ABOUTME: Owns the baseline and adaptive flows plus profile, plan, and session accessors
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Workout Generation Service
//!
//! The pipeline for a generation call, in order: authentication, request
//! validation, rate-limit admission, profile resolution, history sampling,
//! progression calculation, prompt construction, model invocation, output
//! extraction and schema validation, equipment constraint enforcement, and
//! persistence. Rate limiting commits before the model is called, so a
//! failed generation still consumes quota.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::{LlmConfig, RateLimitConfig};
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::llm::LlmProvider;
use crate::models::{
    Adaptations, AdaptiveWorkoutRequest, FitnessProfile, GenerationOutcome, PlanProvenance,
    PlanStatus, ProfilePatch, ProgressMetric, SessionRecord, StoredProfile, StoredWorkoutPlan,
    WorkoutRequest,
};
use crate::rate_limiting::{RateLimiter, OP_GENERATE_ADAPTIVE_WORKOUT, OP_GENERATE_WORKOUT};

use super::constraints::{enforce_plan_equipment, BODYWEIGHT};
use super::dedupe::derive_dedupe_key;
use super::extract::parse_and_validate_plan;
use super::invoker::{InvokerSettings, ModelInvoker};
use super::profile::{self, ResolvedProfile};
use super::progression::{
    adaptive_level, baseline_level, frequent_exercises, SessionFeedback,
};
use super::prompt::{build_adaptive_messages, build_generation_messages, SessionFacts};
use super::validation::{
    validate_adaptive_request, validate_profile_patch, validate_progress_metric,
    validate_session_record, validate_workout_request,
};
use super::history::{self, HistoryContext};

/// Provenance source tag for the baseline flow
const SOURCE_GENERATED: &str = "generated";

/// Provenance source tag for the adaptive flow
const SOURCE_ADAPTIVE: &str = "adaptive";

/// Orchestrates personalized workout generation end to end
#[derive(Clone)]
pub struct WorkoutGenerator {
    database: Database,
    model_name: String,
    rate_limiter: RateLimiter,
    invoker: ModelInvoker,
    provider: Arc<dyn LlmProvider>,
}

impl WorkoutGenerator {
    /// Wire the generator over a store and a model provider
    #[must_use]
    pub fn new(
        database: Database,
        provider: Arc<dyn LlmProvider>,
        llm_config: &LlmConfig,
        rate_limit_config: RateLimitConfig,
    ) -> Self {
        let rate_limiter = RateLimiter::new(database.clone(), rate_limit_config);
        let invoker = ModelInvoker::new(Arc::clone(&provider), InvokerSettings::from(llm_config));
        Self {
            database,
            model_name: llm_config.model.clone(),
            rate_limiter,
            invoker,
            provider,
        }
    }

    fn require_caller(caller: Option<Uuid>) -> AppResult<Uuid> {
        caller.ok_or_else(AppError::auth_required)
    }

    fn digest_of(resolved: &ResolvedProfile) -> String {
        resolved
            .profile
            .derived
            .as_ref()
            .map_or_else(|| profile::profile_digest(&resolved.profile), |d| d.digest.clone())
    }

    /// Add exercises from caller-referenced prior plans to the avoid list,
    /// keeping it sorted for deterministic prompts. Unparseable ids and
    /// plans owned by other users are skipped silently.
    async fn extend_avoid_from_prior_plans(
        &self,
        user_id: Uuid,
        previous_ids: Option<&[String]>,
        avoid: &mut Vec<String>,
    ) -> AppResult<()> {
        let Some(ids) = previous_ids else {
            return Ok(());
        };
        for raw in ids {
            let Ok(plan_id) = raw.parse::<Uuid>() else {
                continue;
            };
            let Some(prior) = self.database.get_plan(plan_id).await? else {
                continue;
            };
            if prior.user_id != user_id {
                continue;
            }
            for exercise in &prior.plan.exercises {
                let name = exercise.name.to_lowercase();
                if !avoid.contains(&name) {
                    avoid.push(name);
                }
            }
        }
        avoid.sort();
        Ok(())
    }

    fn personalization_snapshot(
        profile: Option<&FitnessProfile>,
        history: &HistoryContext,
        avoid_exercises: &[String],
        transient: bool,
    ) -> serde_json::Value {
        json!({
            "completeness": profile.and_then(|p| p.derived.as_ref()).map(|d| d.completeness),
            "training_load_index": profile
                .and_then(|p| p.derived.as_ref())
                .map(|d| d.training_load_index),
            "sessions_sampled": history.sessions.len(),
            "progress_metrics_sampled": history.progress.len(),
            "frequent_exercises": avoid_exercises,
            "transient_profile": transient,
        })
    }

    /// Generate a fresh personalized workout plan
    ///
    /// # Errors
    ///
    /// Fails with `AuthRequired` for anonymous callers, a validation error
    /// for out-of-bounds input, `RateLimitExceeded` when over quota,
    /// `FailedPrecondition` when no profile can be resolved, and an internal
    /// error when the model or its output cannot be used.
    #[instrument(skip(self, request), fields(workout_type = %request.workout_type))]
    pub async fn generate_workout(
        &self,
        caller: Option<Uuid>,
        request: WorkoutRequest,
    ) -> AppResult<GenerationOutcome> {
        let user_id = Self::require_caller(caller)?;
        validate_workout_request(&request)?;

        self.rate_limiter.enforce(user_id, OP_GENERATE_WORKOUT).await?;

        let resolved = profile::resolve(&self.database, user_id, request.profile_overrides.as_ref())
            .await?;
        let history = history::sample(&self.database, user_id).await;

        let level = request
            .progression_level
            .unwrap_or_else(|| baseline_level(resolved.profile.fitness_level, &history.sessions));

        let mut avoid = frequent_exercises(&history.sessions);
        self.extend_avoid_from_prior_plans(user_id, request.previous_workout_ids.as_deref(), &mut avoid)
            .await?;
        let digest = Self::digest_of(&resolved);

        let focus_areas = request.focus_areas.clone().unwrap_or_default();
        let facts = SessionFacts {
            workout_type: &request.workout_type,
            focus_areas: &focus_areas,
            progression_level: level,
            avoid_exercises: &avoid,
        };
        let messages = build_generation_messages(&resolved.profile, &facts, &history);

        let response = self.invoker.invoke(messages).await?;
        let mut plan = parse_and_validate_plan(&response.content)?;
        enforce_plan_equipment(&mut plan, &resolved.profile.equipment);

        let dedupe_key = request.idempotency_key.clone().unwrap_or_else(|| {
            derive_dedupe_key(
                user_id,
                &request.workout_type,
                resolved.profile.time_commitment.minutes_per_session,
                level,
                &resolved.profile.equipment,
                &digest,
            )
        });

        let stored = StoredWorkoutPlan {
            id: Uuid::new_v4(),
            user_id,
            plan,
            provenance: PlanProvenance {
                source: SOURCE_GENERATED.to_owned(),
                model: response.model,
                token_usage: response.usage,
                personalization: Self::personalization_snapshot(
                    Some(&resolved.profile),
                    &history,
                    &avoid,
                    resolved.transient,
                ),
                profile_digest: digest,
                dedupe_key: dedupe_key.clone(),
                status: PlanStatus::Active,
                progression_level: level,
                previous_workout_id: None,
            },
            created_at: Utc::now(),
        };
        self.database.insert_plan(&stored).await?;

        info!(
            %user_id,
            plan_id = %stored.id,
            level,
            "generated workout plan"
        );

        Ok(GenerationOutcome {
            workout_plan: stored,
            dedupe_key,
            adaptations: None,
        })
    }

    /// Regenerate a workout adapted to feedback on a previous session
    ///
    /// The canonical profile is optional on this path; the previous plan
    /// already encodes most of the personalization.
    ///
    /// # Errors
    ///
    /// Fails with `AuthRequired` for anonymous callers, `ResourceNotFound`
    /// when the referenced plan does not exist, `PermissionDenied` when it
    /// belongs to another user, plus the shared validation, rate-limit, and
    /// model failure modes.
    #[instrument(skip(self, request), fields(previous = %request.previous_workout_id))]
    pub async fn generate_adaptive_workout(
        &self,
        caller: Option<Uuid>,
        request: AdaptiveWorkoutRequest,
    ) -> AppResult<GenerationOutcome> {
        let user_id = Self::require_caller(caller)?;
        validate_adaptive_request(&request)?;

        self.rate_limiter
            .enforce(user_id, OP_GENERATE_ADAPTIVE_WORKOUT)
            .await?;

        let previous = self
            .database
            .get_plan(request.previous_workout_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("previous workout")
                    .with_resource_id(request.previous_workout_id.to_string())
            })?;
        if previous.user_id != user_id {
            return Err(AppError::permission_denied("workout belongs to another user")
                .with_user_id(user_id)
                .with_resource_id(previous.id.to_string()));
        }

        let stored_profile = self.database.get_profile(user_id).await?;
        let profile = stored_profile.map(|p| p.profile);
        let history = history::sample(&self.database, user_id).await;

        let feedback = SessionFeedback {
            performance_rating: request.performance_rating,
            completion_rate: request.completion_rate,
            difficulty_feedback: request.difficulty_feedback,
            time_actual_minutes: request.time_actual_minutes,
        };
        let tli = profile
            .as_ref()
            .and_then(|p| p.derived.as_ref())
            .map(|d| d.training_load_index);
        let (new_level, reason) =
            adaptive_level(tli, previous.plan.duration_minutes, &feedback);

        let messages = build_adaptive_messages(
            profile.as_ref(),
            &previous,
            request.performance_rating,
            request.completion_rate,
            request.difficulty_feedback,
            request.time_actual_minutes,
            new_level,
            &history,
        );

        let response = self.invoker.invoke(messages).await?;
        let mut plan = parse_and_validate_plan(&response.content)?;

        // Allowed set falls back from the prior plan to the profile to
        // bodyweight only
        let allowed = if previous.plan.equipment.is_empty() {
            profile
                .as_ref()
                .map(|p| p.equipment.clone())
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| vec![BODYWEIGHT.to_owned()])
        } else {
            previous.plan.equipment.clone()
        };
        enforce_plan_equipment(&mut plan, &allowed);

        let digest = profile.as_ref().map_or_else(
            || previous.provenance.profile_digest.clone(),
            profile::profile_digest,
        );
        let minutes = profile
            .as_ref()
            .map_or(previous.plan.duration_minutes, |p| {
                p.time_commitment.minutes_per_session
            });
        let dedupe_key = derive_dedupe_key(
            user_id,
            &previous.plan.workout_type,
            minutes,
            new_level,
            &allowed,
            &digest,
        );

        let avoid = frequent_exercises(&history.sessions);
        let stored = StoredWorkoutPlan {
            id: Uuid::new_v4(),
            user_id,
            plan,
            provenance: PlanProvenance {
                source: SOURCE_ADAPTIVE.to_owned(),
                model: response.model,
                token_usage: response.usage,
                personalization: Self::personalization_snapshot(
                    profile.as_ref(),
                    &history,
                    &avoid,
                    false,
                ),
                profile_digest: digest,
                dedupe_key: dedupe_key.clone(),
                status: PlanStatus::Active,
                progression_level: new_level,
                previous_workout_id: Some(previous.id),
            },
            created_at: Utc::now(),
        };
        self.database.insert_plan(&stored).await?;

        info!(
            %user_id,
            plan_id = %stored.id,
            previous = %previous.id,
            new_level,
            %reason,
            "generated adaptive workout plan"
        );

        Ok(GenerationOutcome {
            workout_plan: stored,
            dedupe_key,
            adaptations: Some(Adaptations {
                new_progression_level: new_level,
                reason,
            }),
        })
    }

    /// Create or update the caller's canonical profile from a partial patch
    ///
    /// On first write the patch must carry the complete shape. Every write
    /// recomputes the derived sub-record.
    ///
    /// # Errors
    ///
    /// Fails with `AuthRequired` for anonymous callers, a validation error
    /// for malformed patches, and `FailedPrecondition` when a first write
    /// lacks the complete shape.
    pub async fn upsert_profile(
        &self,
        caller: Option<Uuid>,
        patch: ProfilePatch,
    ) -> AppResult<StoredProfile> {
        let user_id = Self::require_caller(caller)?;
        validate_profile_patch(&patch)?;

        let merged = match self.database.get_profile(user_id).await? {
            Some(existing) => profile::merge(existing.profile, patch),
            None => {
                if !patch.is_complete_shape() {
                    return Err(AppError::failed_precondition(
                        "first profile write must include fitness_level, time_commitment, and preferences",
                    )
                    .with_user_id(user_id));
                }
                profile::merge(
                    FitnessProfile {
                        // is_complete_shape guarantees these are overwritten
                        fitness_level: crate::models::FitnessLevel::Beginner,
                        goals: vec![],
                        equipment: vec![],
                        time_commitment: crate::models::TimeCommitment {
                            days_per_week: 3,
                            minutes_per_session: 30,
                            preferred_times: vec![],
                        },
                        preferences: crate::models::Preferences {
                            workout_types: vec![],
                            intensity: crate::models::Intensity::Moderate,
                            rest_day: 0,
                            limitations: vec![],
                        },
                        derived: None,
                    },
                    patch,
                )
            }
        };

        let finalized = profile::finalize(merged);
        self.database.upsert_profile(user_id, &finalized, Utc::now()).await
    }

    /// Load the caller's canonical profile
    ///
    /// # Errors
    ///
    /// Fails with `AuthRequired` for anonymous callers or `ResourceNotFound`
    /// when no profile exists.
    pub async fn get_profile(&self, caller: Option<Uuid>) -> AppResult<StoredProfile> {
        let user_id = Self::require_caller(caller)?;
        self.database
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("fitness profile").with_user_id(user_id))
    }

    /// Load a plan the caller owns
    ///
    /// # Errors
    ///
    /// Fails with `AuthRequired`, `ResourceNotFound`, or `PermissionDenied`
    /// when the plan belongs to another user.
    pub async fn get_plan(
        &self,
        caller: Option<Uuid>,
        plan_id: Uuid,
    ) -> AppResult<StoredWorkoutPlan> {
        let user_id = Self::require_caller(caller)?;
        let plan = self
            .database
            .get_plan(plan_id)
            .await?
            .ok_or_else(|| AppError::not_found("workout plan").with_resource_id(plan_id.to_string()))?;
        if plan.user_id != user_id {
            return Err(AppError::permission_denied("workout belongs to another user")
                .with_user_id(user_id)
                .with_resource_id(plan_id.to_string()));
        }
        Ok(plan)
    }

    /// Plans the caller previously generated under a dedupe key, newest first
    ///
    /// # Errors
    ///
    /// Fails with `AuthRequired` or a database error.
    pub async fn find_plans_by_dedupe_key(
        &self,
        caller: Option<Uuid>,
        dedupe_key: &str,
    ) -> AppResult<Vec<StoredWorkoutPlan>> {
        let user_id = Self::require_caller(caller)?;
        self.database.plans_by_dedupe_key(user_id, dedupe_key).await
    }

    /// Append a completed (or abandoned) session to the caller's history
    ///
    /// The stored record is always attributed to the caller regardless of
    /// what the input claims.
    ///
    /// # Errors
    ///
    /// Fails with `AuthRequired`, a validation error for out-of-bounds
    /// ratings or timestamps, or a database error.
    pub async fn record_session(
        &self,
        caller: Option<Uuid>,
        mut record: SessionRecord,
    ) -> AppResult<SessionRecord> {
        let user_id = Self::require_caller(caller)?;
        validate_session_record(&record)?;
        record.user_id = user_id;
        if record.id.is_nil() {
            record.id = Uuid::new_v4();
        }
        self.database.insert_session(&record).await?;
        Ok(record)
    }

    /// Append a progress metric to the caller's history
    ///
    /// Sampled metrics feed the personalization context of later
    /// generations. The stored record is always attributed to the caller.
    ///
    /// # Errors
    ///
    /// Fails with `AuthRequired`, a validation error for a missing name or
    /// non-finite value, or a database error.
    pub async fn record_progress_metric(
        &self,
        caller: Option<Uuid>,
        mut metric: ProgressMetric,
    ) -> AppResult<ProgressMetric> {
        let user_id = Self::require_caller(caller)?;
        validate_progress_metric(&metric)?;
        metric.user_id = user_id;
        if metric.id.is_nil() {
            metric.id = Uuid::new_v4();
        }
        self.database.insert_progress_metric(&metric).await?;
        Ok(metric)
    }

    /// Archive a plan the caller owns
    ///
    /// Archived plans stay readable and keep their dedupe key; the status
    /// only marks them as retired from the active rotation. Archiving an
    /// already-archived plan is a no-op.
    ///
    /// # Errors
    ///
    /// Fails with `AuthRequired`, `ResourceNotFound`, or `PermissionDenied`
    /// when the plan belongs to another user.
    pub async fn archive_plan(
        &self,
        caller: Option<Uuid>,
        plan_id: Uuid,
    ) -> AppResult<StoredWorkoutPlan> {
        let mut plan = self.get_plan(caller, plan_id).await?;
        if plan.provenance.status != PlanStatus::Archived {
            plan.provenance.status = PlanStatus::Archived;
            self.database.update_plan(&plan).await?;
        }
        Ok(plan)
    }

    /// Check that the model endpoint is reachable
    ///
    /// # Errors
    ///
    /// Propagates the provider's failure as-is.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.provider.health_check().await
    }

    /// Model identifier the generator is configured for
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}
