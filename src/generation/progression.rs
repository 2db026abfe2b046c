// ABOUTME: Progression level calculators: baseline from history, adaptive from session feedback
// ABOUTME: Pure numeric logic with tie-break rules; output always clamped to 1-10
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Progression Calculator
//!
//! Two algorithms produce the 1-10 progression level:
//!
//! - **Baseline** (no explicit level supplied): per-tier base plus history
//!   bonuses.
//! - **Adaptive** (feedback-driven regeneration): base inferred from the
//!   training-load index, then signed adjustments from single-session
//!   feedback. Finishing early earns a half-point bonus; running long is
//!   never penalized.

use std::collections::{HashMap, HashSet};

use crate::models::{DifficultyFeedback, FitnessLevel, SessionSample};

/// Lowest progression level
pub const MIN_LEVEL: u8 = 1;

/// Highest progression level
pub const MAX_LEVEL: u8 = 10;

/// Training-load index units per adaptive base level
const TLI_PER_LEVEL: f64 = 900.0;

/// Adaptive base level used when no training-load index is available
const DEFAULT_ADAPTIVE_BASE: u8 = 5;

/// Sessions with rating >= 3 required for the first baseline bonus
const CONSISTENT_SESSIONS_THRESHOLD: usize = 5;

/// Rated sessions required for the high-average baseline bonus
const HIGH_AVERAGE_SESSIONS_THRESHOLD: usize = 10;

/// Average rating required for the high-average baseline bonus
const HIGH_AVERAGE_RATING: f64 = 4.5;

/// A session must appear in at least this many sampled sessions to count as
/// frequent
const FREQUENT_EXERCISE_THRESHOLD: usize = 3;

fn clamp_level(level: f64) -> u8 {
    let rounded = level.round();
    if rounded < f64::from(MIN_LEVEL) {
        MIN_LEVEL
    } else if rounded > f64::from(MAX_LEVEL) {
        MAX_LEVEL
    } else {
        // Rounded and bounded above, so the cast is lossless
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            rounded as u8
        }
    }
}

/// Baseline progression level from fitness tier and session history
///
/// Starts from the per-tier base (beginner=1, intermediate=4, advanced=7),
/// adds 1 when at least five sessions are rated 3 or better, and 1 more when
/// at least ten rated sessions average 4.5 or better.
#[must_use]
pub fn baseline_level(fitness_level: FitnessLevel, history: &[SessionSample]) -> u8 {
    let base: u8 = match fitness_level {
        FitnessLevel::Beginner => 1,
        FitnessLevel::Intermediate => 4,
        FitnessLevel::Advanced => 7,
    };

    let ratings: Vec<u8> = history.iter().filter_map(|s| s.rating).collect();

    let mut level = f64::from(base);

    let consistent = ratings.iter().filter(|&&r| r >= 3).count();
    if consistent >= CONSISTENT_SESSIONS_THRESHOLD {
        level += 1.0;
    }

    if ratings.len() >= HIGH_AVERAGE_SESSIONS_THRESHOLD {
        let average = ratings.iter().map(|&r| f64::from(r)).sum::<f64>() / ratings.len() as f64;
        if average >= HIGH_AVERAGE_RATING {
            level += 1.0;
        }
    }

    clamp_level(level)
}

/// Single-session feedback driving the adaptive recalculation
#[derive(Debug, Clone, Copy)]
pub struct SessionFeedback {
    /// 1-5
    pub performance_rating: u8,
    /// 0.0-1.0
    pub completion_rate: f64,
    pub difficulty_feedback: DifficultyFeedback,
    /// Actual time taken, minutes
    pub time_actual_minutes: Option<u32>,
}

/// Adaptive progression level from the training-load index and feedback
///
/// Returns the new level together with a human-readable reason string
/// describing the applied adjustments.
#[must_use]
pub fn adaptive_level(
    training_load_index: Option<u32>,
    estimated_duration_minutes: u32,
    feedback: &SessionFeedback,
) -> (u8, String) {
    let base = training_load_index.map_or(f64::from(DEFAULT_ADAPTIVE_BASE), |tli| {
        f64::from(clamp_level((f64::from(tli) / TLI_PER_LEVEL).round() + 1.0))
    });

    let mut adjustment = 0.0_f64;
    let mut reasons: Vec<&str> = Vec::new();

    if feedback.performance_rating >= 4 && feedback.completion_rate >= 0.9 {
        adjustment += 1.0;
        reasons.push("strong performance with high completion");
    }
    if feedback.performance_rating <= 2 || feedback.completion_rate < 0.7 {
        adjustment -= 1.0;
        reasons.push("low rating or incomplete session");
    }
    match feedback.difficulty_feedback {
        DifficultyFeedback::TooEasy => {
            adjustment += 1.0;
            reasons.push("reported too easy");
        }
        DifficultyFeedback::TooHard => {
            adjustment -= 1.0;
            reasons.push("reported too hard");
        }
        DifficultyFeedback::JustRight => {}
    }
    // Finishing early earns a bonus; overruns are deliberately not penalized
    if let Some(actual) = feedback.time_actual_minutes {
        if estimated_duration_minutes > 0
            && f64::from(actual) < 0.8 * f64::from(estimated_duration_minutes)
        {
            adjustment += 0.5;
            reasons.push("finished well under estimated time");
        }
    }

    let level = clamp_level(base + adjustment);
    let reason = if reasons.is_empty() {
        "no adjustment needed".to_owned()
    } else {
        reasons.join("; ")
    };

    (level, reason)
}

/// Exercise identifiers appearing in at least three of the sampled sessions
///
/// Used to bias prompt construction away from repetition. Returned sorted for
/// deterministic prompts.
#[must_use]
pub fn frequent_exercises(history: &[SessionSample]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for session in history {
        let unique: HashSet<&str> = session
            .exercises_completed
            .iter()
            .map(String::as_str)
            .collect();
        for exercise in unique {
            *counts.entry(exercise).or_insert(0) += 1;
        }
    }

    let mut frequent: Vec<String> = counts
        .into_iter()
        .filter(|&(_, count)| count >= FREQUENT_EXERCISE_THRESHOLD)
        .map(|(exercise, _)| exercise.to_owned())
        .collect();
    frequent.sort();
    frequent
}
