// ABOUTME: Request validation for generation calls and partial profile updates
// ABOUTME: Bounds checks surface before any side effect; numeric clamps apply when building full shapes
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Request Validator
//!
//! Schema-checks inbound generation requests and profile patches. Tag
//! normalization (lower-casing, dedup) is NOT performed here; that happens on
//! the profile write path. Numeric clamps (days 1-7, minutes 10-180, rest-day
//! 0-6) ARE applied wherever a full profile shape is constructed from partial
//! input, via the `clamp_*` helpers below.

use crate::errors::{AppError, AppResult};
use crate::models::{
    AdaptiveWorkoutRequest, ProfilePatch, ProgressMetric, SessionRecord, TimeCommitment,
    WorkoutRequest,
};

/// Maximum tags per goal/equipment list
pub const MAX_TAGS: usize = 30;

/// Maximum focus-area tags on a request
pub const MAX_FOCUS_AREAS: usize = 10;

/// Maximum prior plan identifiers on a request
pub const MAX_PREVIOUS_IDS: usize = 10;

/// Maximum length of a client-supplied idempotency key
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Maximum length of a single tag
pub const MAX_TAG_LEN: usize = 64;

/// Recognized preferred time-of-day tags
pub const PREFERRED_TIME_TAGS: &[&str] = &["morning", "afternoon", "evening"];

/// Maximum exercise identifiers on a recorded session (a full plan including
/// warm-up and cool-down blocks)
pub const MAX_SESSION_EXERCISES: usize = 60;

/// Clamp days/week to 1-7 and minutes/session to 10-180
pub fn clamp_time_commitment(tc: &mut TimeCommitment) {
    tc.days_per_week = tc.days_per_week.clamp(1, 7);
    tc.minutes_per_session = tc.minutes_per_session.clamp(10, 180);
}

/// Clamp the rest-day index to 0-6
#[must_use]
pub const fn clamp_rest_day(rest_day: u32) -> u32 {
    if rest_day > 6 {
        6
    } else {
        rest_day
    }
}

fn check_tag_list(field: &str, tags: &[String], max: usize) -> AppResult<()> {
    if tags.len() > max {
        return Err(AppError::out_of_range(format!(
            "{field} has {} tags, maximum is {max}",
            tags.len()
        )));
    }
    for tag in tags {
        if tag.trim().is_empty() {
            return Err(AppError::invalid_input(format!("{field} contains an empty tag")));
        }
        if tag.len() > MAX_TAG_LEN {
            return Err(AppError::out_of_range(format!(
                "{field} contains a tag longer than {MAX_TAG_LEN} characters"
            )));
        }
    }
    Ok(())
}

/// Validate a baseline generation request
///
/// # Errors
///
/// Returns a validation error if any field is out of declared bounds or of
/// the wrong shape.
pub fn validate_workout_request(request: &WorkoutRequest) -> AppResult<()> {
    if request.workout_type.trim().is_empty() {
        return Err(AppError::new(
            crate::errors::ErrorCode::MissingRequiredField,
            "workout_type is required",
        ));
    }
    if request.workout_type.len() > MAX_TAG_LEN {
        return Err(AppError::out_of_range("workout_type is too long"));
    }

    if let Some(level) = request.progression_level {
        if !(1..=10).contains(&level) {
            return Err(AppError::out_of_range(format!(
                "progression_level {level} is outside 1-10"
            )));
        }
    }

    if let Some(focus_areas) = &request.focus_areas {
        check_tag_list("focus_areas", focus_areas, MAX_FOCUS_AREAS)?;
    }

    if let Some(ids) = &request.previous_workout_ids {
        if ids.len() > MAX_PREVIOUS_IDS {
            return Err(AppError::out_of_range(format!(
                "previous_workout_ids has {} entries, maximum is {MAX_PREVIOUS_IDS}",
                ids.len()
            )));
        }
    }

    if let Some(key) = &request.idempotency_key {
        if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(AppError::invalid_input(format!(
                "idempotency_key must be 1-{MAX_IDEMPOTENCY_KEY_LEN} characters"
            )));
        }
    }

    if let Some(overrides) = &request.profile_overrides {
        validate_profile_patch(overrides)?;
    }

    Ok(())
}

/// Validate a partial profile update (also used for inline overrides)
///
/// # Errors
///
/// Returns a validation error on tag overflow or a malformed preferred-time
/// tag. Out-of-range numeric fields are not rejected here; they are clamped
/// when the full profile shape is constructed.
pub fn validate_profile_patch(patch: &ProfilePatch) -> AppResult<()> {
    if let Some(goals) = &patch.goals {
        check_tag_list("goals", goals, MAX_TAGS)?;
    }
    if let Some(equipment) = &patch.equipment {
        check_tag_list("equipment", equipment, MAX_TAGS)?;
    }
    if let Some(tc) = &patch.time_commitment {
        if tc.preferred_times.is_empty() {
            return Err(AppError::new(
                crate::errors::ErrorCode::MissingRequiredField,
                "preferred_times must not be empty",
            ));
        }
        for tag in &tc.preferred_times {
            let normalized = tag.trim().to_lowercase();
            if !PREFERRED_TIME_TAGS.contains(&normalized.as_str()) {
                return Err(AppError::invalid_input(format!(
                    "unrecognized preferred time tag: {tag}"
                )));
            }
        }
    }
    if let Some(preferences) = &patch.preferences {
        check_tag_list("workout_types", &preferences.workout_types, MAX_TAGS)?;
        check_tag_list("limitations", &preferences.limitations, MAX_TAGS)?;
    }
    Ok(())
}

/// Validate an adaptive regeneration request
///
/// # Errors
///
/// Returns a validation error if any field is out of declared bounds.
pub fn validate_adaptive_request(request: &AdaptiveWorkoutRequest) -> AppResult<()> {
    if !(1..=5).contains(&request.performance_rating) {
        return Err(AppError::out_of_range(format!(
            "performance_rating {} is outside 1-5",
            request.performance_rating
        )));
    }

    if !request.completion_rate.is_finite()
        || !(0.0..=1.0).contains(&request.completion_rate)
    {
        return Err(AppError::out_of_range(format!(
            "completion_rate {} is outside 0-1",
            request.completion_rate
        )));
    }

    if let Some(actual) = request.time_actual_minutes {
        if actual == 0 || actual > 24 * 60 {
            return Err(AppError::out_of_range(format!(
                "time_actual_minutes {actual} is implausible"
            )));
        }
    }

    Ok(())
}

/// Validate a session record before it is appended to history
///
/// # Errors
///
/// Returns a validation error when the rating is outside 1-5 or the end
/// timestamp precedes the start.
pub fn validate_session_record(record: &SessionRecord) -> AppResult<()> {
    if record.workout_type.trim().is_empty() {
        return Err(AppError::new(
            crate::errors::ErrorCode::MissingRequiredField,
            "workout_type is required",
        ));
    }

    if let Some(rating) = record.rating {
        if !(1..=5).contains(&rating) {
            return Err(AppError::out_of_range(format!(
                "rating {rating} is outside 1-5"
            )));
        }
    }

    if let Some(ended_at) = record.ended_at {
        if ended_at < record.started_at {
            return Err(AppError::invalid_input("ended_at precedes started_at"));
        }
    }

    check_tag_list(
        "exercises_completed",
        &record.exercises_completed,
        MAX_SESSION_EXERCISES,
    )?;

    Ok(())
}

/// Validate a progress metric before it is recorded
///
/// # Errors
///
/// Returns a validation error when the metric name is missing or the value
/// is not a finite number.
pub fn validate_progress_metric(metric: &ProgressMetric) -> AppResult<()> {
    if metric.metric.trim().is_empty() {
        return Err(AppError::new(
            crate::errors::ErrorCode::MissingRequiredField,
            "metric name is required",
        ));
    }
    if metric.metric.len() > MAX_TAG_LEN {
        return Err(AppError::out_of_range("metric name is too long"));
    }
    if !metric.value.is_finite() {
        return Err(AppError::out_of_range(format!(
            "metric value {} is not a finite number",
            metric.value
        )));
    }
    Ok(())
}
