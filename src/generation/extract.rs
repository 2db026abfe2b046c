// ABOUTME: Output extractor and schema validator for untrusted model text
// ABOUTME: Tolerates bare JSON, fenced blocks, and JSON embedded in prose; logs issues server-side
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Output Extractor / Validator
//!
//! The model is an untrusted oracle. Its text is reduced to a JSON candidate
//! in a fixed order: the whole trimmed text when it is brace-delimited, else
//! the contents of the first fenced code block, else the substring between
//! the first `{` and the last `}`. The candidate is then parsed and checked
//! against the workout-plan schema. Validation issues are logged with full
//! detail but callers only ever see a generic internal failure, so prompt and
//! schema internals never leak.

use tracing::warn;

use crate::errors::{AppError, AppResult};
use crate::models::{Exercise, WorkoutPlan};

/// Contents of the first fenced code block, with a leading `json` language
/// tag stripped
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let body = &text[start + 3..];
    let end = body.find("```")?;
    let content = body[..end].trim();
    let content = content.strip_prefix("json").unwrap_or(content);
    Some(content.trim())
}

/// Extract a JSON object candidate from free-form model text
///
/// # Errors
///
/// Returns an internal error when no brace-delimited candidate is found.
pub fn extract_json_object(text: &str) -> AppResult<&str> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Ok(trimmed);
    }

    if let Some(block) = fenced_block(trimmed) {
        if !block.is_empty() {
            return Ok(block);
        }
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(first), Some(last)) if first < last => Ok(&trimmed[first..=last]),
        _ => Err(AppError::internal("no JSON object found in model output")),
    }
}

fn check_range(issues: &mut Vec<String>, field: &str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        issues.push(format!("{field} is {value}, expected {min}-{max}"));
    }
}

fn check_exercise(prefix: &str, exercise: &Exercise, issues: &mut Vec<String>) {
    if exercise.name.trim().is_empty() {
        issues.push(format!("{prefix}.name is empty"));
    }
    if exercise.instructions.is_empty() || exercise.instructions.len() > 12 {
        issues.push(format!(
            "{prefix}.instructions has {} steps, expected 1-12",
            exercise.instructions.len()
        ));
    }
    if exercise.target_muscles.is_empty() || exercise.target_muscles.len() > 10 {
        issues.push(format!(
            "{prefix}.target_muscles has {} tags, expected 1-10",
            exercise.target_muscles.len()
        ));
    }
    if exercise.equipment.len() > 10 {
        issues.push(format!(
            "{prefix}.equipment has {} tags, expected at most 10",
            exercise.equipment.len()
        ));
    }
    check_range(issues, &format!("{prefix}.sets"), exercise.sets, 1, 10);
    if let Some(reps) = exercise.reps {
        check_range(issues, &format!("{prefix}.reps"), reps, 1, 50);
    }
    if let Some(duration) = exercise.duration_seconds {
        check_range(
            issues,
            &format!("{prefix}.duration_seconds"),
            duration,
            5,
            3600,
        );
    }
    check_range(
        issues,
        &format!("{prefix}.rest_seconds"),
        exercise.rest_seconds,
        0,
        600,
    );
    if exercise.tips.len() > 10 {
        issues.push(format!(
            "{prefix}.tips has {} entries, expected at most 10",
            exercise.tips.len()
        ));
    }
    // The schema deliberately does not require reps XOR duration; an exercise
    // with neither is tolerated even though it is not directly executable.
}

/// All schema violations in a parsed plan, empty when the plan is valid
#[must_use]
pub fn plan_schema_issues(plan: &WorkoutPlan) -> Vec<String> {
    let mut issues = Vec::new();

    if plan.name.trim().is_empty() {
        issues.push("name is empty".to_owned());
    }
    if plan.workout_type.trim().is_empty() {
        issues.push("workout_type is empty".to_owned());
    }
    check_range(&mut issues, "duration_minutes", plan.duration_minutes, 10, 180);

    if plan.exercises.is_empty() || plan.exercises.len() > 40 {
        issues.push(format!(
            "exercises has {} entries, expected 1-40",
            plan.exercises.len()
        ));
    }
    for (i, exercise) in plan.exercises.iter().enumerate() {
        check_exercise(&format!("exercises[{i}]"), exercise, &mut issues);
    }

    for (block_name, block) in [("warm_up", &plan.warm_up), ("cool_down", &plan.cool_down)] {
        if let Some(block) = block {
            if block.len() > 10 {
                issues.push(format!(
                    "{block_name} has {} entries, expected at most 10",
                    block.len()
                ));
            }
            for (i, exercise) in block.iter().enumerate() {
                check_exercise(&format!("{block_name}[{i}]"), exercise, &mut issues);
            }
        }
    }

    issues
}

/// Extract, parse, and validate a workout plan from raw model text
///
/// # Errors
///
/// Returns an internal error on extraction failure, parse failure, or any
/// schema violation. The raw text and specific issues are logged, never
/// returned.
pub fn parse_and_validate_plan(text: &str) -> AppResult<WorkoutPlan> {
    let candidate = extract_json_object(text)?;

    let plan: WorkoutPlan = serde_json::from_str(candidate).map_err(|e| {
        warn!(error = %e, "model output failed to parse as a workout plan");
        AppError::internal("model output failed schema validation")
    })?;

    let issues = plan_schema_issues(&plan);
    if !issues.is_empty() {
        warn!(?issues, "model output violated the workout plan schema");
        return Err(AppError::internal("model output failed schema validation"));
    }

    Ok(plan)
}
