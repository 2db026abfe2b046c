// ABOUTME: Profile normalization, derived-record computation, digest hashing, and canonical lookup
// ABOUTME: Implements the Profile Resolver with the first-run inline fallback path
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Profile Resolution & Derivation
//!
//! The canonical profile is the single authoritative stored fitness profile
//! per user. Every write recomputes the derived sub-record: weekly minutes,
//! intensity score, training-load index, an order-independent content digest,
//! and a 0-100 completeness heuristic.
//!
//! The digest must be invariant under permutation of any tag array: two
//! profiles with the same multiset of tags in different insertion order hash
//! identically. This is achieved by hashing a canonical JSON rendering with
//! every tag array sorted (object keys are already emitted in sorted order by
//! `serde_json`).

use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use super::validation::{clamp_rest_day, clamp_time_commitment};
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{DerivedProfile, FitnessProfile, ProfilePatch};

/// Lower-case, trim, drop empties, and deduplicate a tag list, preserving
/// first-occurrence order
#[must_use]
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Normalize every tag array on the profile in place
pub fn normalize_profile(profile: &mut FitnessProfile) {
    profile.goals = normalize_tags(&profile.goals);
    profile.equipment = normalize_tags(&profile.equipment);
    profile.time_commitment.preferred_times = normalize_tags(&profile.time_commitment.preferred_times);
    profile.preferences.workout_types = normalize_tags(&profile.preferences.workout_types);
    profile.preferences.limitations = normalize_tags(&profile.preferences.limitations);
}

/// Order-independent content digest of the normalized profile
///
/// Used as a cache/personalization key and recorded on every generated plan.
#[must_use]
pub fn profile_digest(profile: &FitnessProfile) -> String {
    let sorted = |tags: &[String]| {
        let mut tags = normalize_tags(tags);
        tags.sort();
        tags
    };

    // serde_json emits object keys in sorted order, so this rendering is
    // canonical as long as every array is sorted explicitly.
    let canonical = json!({
        "fitness_level": profile.fitness_level,
        "goals": sorted(&profile.goals),
        "equipment": sorted(&profile.equipment),
        "time_commitment": {
            "days_per_week": profile.time_commitment.days_per_week,
            "minutes_per_session": profile.time_commitment.minutes_per_session,
            "preferred_times": sorted(&profile.time_commitment.preferred_times),
        },
        "preferences": {
            "workout_types": sorted(&profile.preferences.workout_types),
            "intensity": profile.preferences.intensity,
            "rest_day": profile.preferences.rest_day,
            "limitations": sorted(&profile.preferences.limitations),
        },
    });

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// 0-100 heuristic for how fully the profile is filled in
#[must_use]
pub fn completeness(profile: &FitnessProfile) -> u32 {
    let tc = &profile.time_commitment;
    let commitment_valid = (1..=7).contains(&tc.days_per_week)
        && (10..=180).contains(&tc.minutes_per_session)
        && !tc.preferred_times.is_empty();

    let mut score = 15; // fitness level is always present
    if !profile.goals.is_empty() {
        score += 20;
    }
    if !profile.equipment.is_empty() {
        score += 20;
    }
    if commitment_valid {
        score += 25;
    }
    if !profile.preferences.workout_types.is_empty() {
        score += 20;
    }
    score
}

/// Compute the derived sub-record for a normalized profile
#[must_use]
pub fn derive(profile: &FitnessProfile) -> DerivedProfile {
    let weekly_minutes =
        profile.time_commitment.days_per_week * profile.time_commitment.minutes_per_session;
    let intensity_score = profile.preferences.intensity.score();

    DerivedProfile {
        weekly_minutes,
        intensity_score,
        training_load_index: weekly_minutes * intensity_score,
        digest: profile_digest(profile),
        completeness: completeness(profile),
    }
}

/// Normalize a profile and attach a freshly computed derived sub-record
///
/// Called on every write path so the stored document is always canonical.
#[must_use]
pub fn finalize(mut profile: FitnessProfile) -> FitnessProfile {
    normalize_profile(&mut profile);
    clamp_time_commitment(&mut profile.time_commitment);
    profile.preferences.rest_day = clamp_rest_day(profile.preferences.rest_day);
    profile.derived = Some(derive(&profile));
    profile
}

/// Merge a partial update into an existing profile; `None` fields keep their
/// current value. The result still needs [`finalize`].
#[must_use]
pub fn merge(mut existing: FitnessProfile, patch: ProfilePatch) -> FitnessProfile {
    if let Some(level) = patch.fitness_level {
        existing.fitness_level = level;
    }
    if let Some(goals) = patch.goals {
        existing.goals = goals;
    }
    if let Some(equipment) = patch.equipment {
        existing.equipment = equipment;
    }
    if let Some(time_commitment) = patch.time_commitment {
        existing.time_commitment = time_commitment;
    }
    if let Some(preferences) = patch.preferences {
        existing.preferences = preferences;
    }
    existing
}

/// Profile resolved for a generation call
#[derive(Debug, Clone)]
pub struct ResolvedProfile {
    pub profile: FitnessProfile,
    /// True when built from inline overrides rather than the canonical store.
    /// Transient profiles carry no derived sub-record, so the adaptive
    /// training-load base is unavailable on that path.
    pub transient: bool,
}

/// Load the canonical profile, or fall back to a complete inline shape on
/// first run
///
/// # Errors
///
/// Fails with `FailedPrecondition` when no canonical profile exists and the
/// request does not supply a complete inline shape.
pub async fn resolve(
    database: &Database,
    user_id: Uuid,
    overrides: Option<&ProfilePatch>,
) -> AppResult<ResolvedProfile> {
    if let Some(stored) = database.get_profile(user_id).await? {
        return Ok(ResolvedProfile {
            profile: stored.profile,
            transient: false,
        });
    }

    match overrides {
        Some(patch) if patch.is_complete_shape() => {
            debug!(%user_id, "no canonical profile, using inline overrides");
            let mut profile = FitnessProfile {
                // is_complete_shape guarantees these three are present
                fitness_level: patch.fitness_level.unwrap_or(crate::models::FitnessLevel::Beginner),
                goals: patch.goals.clone().unwrap_or_default(),
                equipment: patch.equipment.clone().unwrap_or_default(),
                time_commitment: patch
                    .time_commitment
                    .clone()
                    .ok_or_else(|| AppError::internal("complete shape missing time commitment"))?,
                preferences: patch
                    .preferences
                    .clone()
                    .ok_or_else(|| AppError::internal("complete shape missing preferences"))?,
                derived: None,
            };
            normalize_profile(&mut profile);
            clamp_time_commitment(&mut profile.time_commitment);
            profile.preferences.rest_day = clamp_rest_day(profile.preferences.rest_day);
            Ok(ResolvedProfile {
                profile,
                transient: true,
            })
        }
        _ => Err(AppError::failed_precondition(
            "no fitness profile on record; complete onboarding or supply a full inline profile",
        )
        .with_user_id(user_id)),
    }
}
