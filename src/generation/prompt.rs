// ABOUTME: Deterministic prompt construction embedding the machine-checkable plan schema
// ABOUTME: Renders profile facts, session facts, and history samples into role-tagged messages
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Prompt Builder
//!
//! Renders a fixed-section natural-language instruction block from validated
//! profile, request, and history data. The plan schema description is
//! embedded directly so the model is told exactly what shape to return. This
//! component introduces no randomness; all variability in output comes from
//! the model itself.

use std::fmt::Write as _;

use crate::generation::history::HistoryContext;
use crate::llm::ChatMessage;
use crate::models::{FitnessProfile, StoredWorkoutPlan};
use crate::models::{DifficultyFeedback, SessionSample};

/// System role and output contract shared by both flows
const SYSTEM_PROMPT: &str = "\
You are a certified personal trainer designing safe, effective workout plans. \
You respond with exactly one JSON object matching the schema the user provides. \
Do not include any text outside the JSON object.";

/// Machine-checkable description of the workout-plan schema, embedded verbatim
/// in every prompt
pub const PLAN_SCHEMA_DESCRIPTION: &str = r#"Respond with a single JSON object with these fields:
{
  "name": string,
  "description": string,
  "workout_type": string,
  "difficulty": "beginner" | "intermediate" | "advanced",
  "duration_minutes": integer (10-180),
  "exercises": array of 1-40 exercise objects (main block, in order),
  "warm_up": optional array of up to 10 exercise objects,
  "cool_down": optional array of up to 10 exercise objects,
  "equipment": array of equipment tag strings used by the plan,
  "target_muscles": array of muscle tag strings,
  "progression_tips": optional string,
  "motivation": optional string (one encouraging line),
  "calories_estimate": optional integer
}
Each exercise object has:
{
  "name": string,
  "description": string,
  "instructions": array of 1-12 ordered steps,
  "target_muscles": array of 1-10 muscle tags,
  "equipment": array of 0-10 equipment tags,
  "difficulty": "beginner" | "intermediate" | "advanced",
  "sets": integer (1-10),
  "reps": optional integer (1-50),
  "duration_seconds": optional integer (5-3600),
  "rest_seconds": integer (0-600),
  "tips": array of up to 10 strings,
  "progression_notes": optional string,
  "alternatives": optional array of strings,
  "form_cues": optional array of strings
}
Every exercise should carry either reps or duration_seconds so it is executable."#;

/// Request facts rendered into the prompt
#[derive(Debug, Clone)]
pub struct SessionFacts<'a> {
    pub workout_type: &'a str,
    pub focus_areas: &'a [String],
    pub progression_level: u8,
    /// Exercises to de-emphasize because they appeared frequently in history
    pub avoid_exercises: &'a [String],
}

fn join_or(tags: &[String], fallback: &str) -> String {
    if tags.is_empty() {
        fallback.to_owned()
    } else {
        tags.join(", ")
    }
}

fn write_profile_section(out: &mut String, profile: &FitnessProfile) {
    let tc = &profile.time_commitment;
    let prefs = &profile.preferences;
    let _ = writeln!(out, "## Athlete profile");
    let _ = writeln!(out, "- Fitness level: {:?}", profile.fitness_level);
    let _ = writeln!(out, "- Goals: {}", join_or(&profile.goals, "general fitness"));
    let _ = writeln!(
        out,
        "- Available equipment: {}",
        join_or(&profile.equipment, "bodyweight only")
    );
    let _ = writeln!(
        out,
        "- Schedule: {} days/week, {} minutes/session, preferred times: {}",
        tc.days_per_week,
        tc.minutes_per_session,
        join_or(&tc.preferred_times, "any")
    );
    let _ = writeln!(
        out,
        "- Preferred intensity: {:?}; rest day index: {}",
        prefs.intensity, prefs.rest_day
    );
    let _ = writeln!(
        out,
        "- Injuries/limitations: {}",
        join_or(&prefs.limitations, "none reported")
    );
    if let Some(derived) = &profile.derived {
        let _ = writeln!(
            out,
            "- Weekly training load index: {}",
            derived.training_load_index
        );
    }
}

fn write_session_line(out: &mut String, index: usize, session: &SessionSample) {
    let rating = session
        .rating
        .map_or_else(|| "unrated".to_owned(), |r| format!("{r}/5"));
    let duration = session
        .duration_minutes
        .map_or_else(String::new, |m| format!(", {m} min"));
    let _ = write!(
        out,
        "- Session {}: {} ({rating}{duration})",
        index + 1,
        session.workout_type
    );
    if let Some(feedback) = &session.feedback {
        let _ = write!(out, ": \"{feedback}\"");
    }
    let _ = writeln!(out);
}

fn write_history_section(out: &mut String, history: &HistoryContext) {
    if !history.sessions.is_empty() {
        let _ = writeln!(out, "## Recent sessions (newest first)");
        for (i, session) in history.sessions.iter().enumerate() {
            write_session_line(out, i, session);
        }
    }
    if !history.progress.is_empty() {
        let _ = writeln!(out, "## Recent progress metrics");
        for metric in &history.progress {
            let unit = metric.unit.as_deref().unwrap_or("");
            let _ = writeln!(out, "- {}: {}{}", metric.metric, metric.value, unit);
        }
    }
}

/// Build the message list for a baseline generation call
#[must_use]
pub fn build_generation_messages(
    profile: &FitnessProfile,
    facts: &SessionFacts<'_>,
    history: &HistoryContext,
) -> Vec<ChatMessage> {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "Design a {} workout at progression level {}/10.",
        facts.workout_type, facts.progression_level
    );
    if !facts.focus_areas.is_empty() {
        let _ = writeln!(body, "Focus areas: {}.", facts.focus_areas.join(", "));
    }
    let _ = writeln!(body);

    write_profile_section(&mut body, profile);
    write_history_section(&mut body, history);

    if !facts.avoid_exercises.is_empty() {
        let _ = writeln!(
            body,
            "## Variety\nThese exercises appeared often recently; prefer alternatives: {}.",
            facts.avoid_exercises.join(", ")
        );
    }

    let _ = writeln!(body, "\n## Output format\n{PLAN_SCHEMA_DESCRIPTION}");

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(body)]
}

/// Build the message list for an adaptive regeneration call
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn build_adaptive_messages(
    profile: Option<&FitnessProfile>,
    previous: &StoredWorkoutPlan,
    performance_rating: u8,
    completion_rate: f64,
    difficulty_feedback: DifficultyFeedback,
    time_actual_minutes: Option<u32>,
    new_level: u8,
    history: &HistoryContext,
) -> Vec<ChatMessage> {
    let mut body = String::new();
    let plan = &previous.plan;

    let _ = writeln!(
        body,
        "Regenerate a {} workout, adapted from the athlete's last session, \
         at progression level {new_level}/10.",
        plan.workout_type
    );
    let _ = writeln!(body);

    let _ = writeln!(body, "## Previous plan");
    let _ = writeln!(
        body,
        "- \"{}\": {:?}, {} minutes, {} exercises",
        plan.name,
        plan.difficulty,
        plan.duration_minutes,
        plan.exercises.len()
    );
    let _ = writeln!(body, "- Equipment used: {}", join_or(&plan.equipment, "bodyweight"));

    let _ = writeln!(body, "## Session feedback");
    let _ = writeln!(body, "- Performance rating: {performance_rating}/5");
    let _ = writeln!(
        body,
        "- Completion rate: {:.0}%",
        completion_rate * 100.0
    );
    let feedback_text = match difficulty_feedback {
        DifficultyFeedback::TooEasy => "too easy",
        DifficultyFeedback::JustRight => "just right",
        DifficultyFeedback::TooHard => "too hard",
    };
    let _ = writeln!(body, "- Difficulty felt: {feedback_text}");
    if let Some(actual) = time_actual_minutes {
        let _ = writeln!(
            body,
            "- Actual time: {actual} min (estimated {} min)",
            plan.duration_minutes
        );
    }

    if let Some(profile) = profile {
        write_profile_section(&mut body, profile);
    }
    write_history_section(&mut body, history);

    let _ = writeln!(
        body,
        "\nKeep the equipment within what the previous plan used.\n\n## Output format\n{PLAN_SCHEMA_DESCRIPTION}"
    );

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(body)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FitnessLevel, Intensity, Preferences, TimeCommitment};

    fn profile() -> FitnessProfile {
        FitnessProfile {
            fitness_level: FitnessLevel::Intermediate,
            goals: vec!["strength".into()],
            equipment: vec!["dumbbells".into()],
            time_commitment: TimeCommitment {
                days_per_week: 3,
                minutes_per_session: 45,
                preferred_times: vec!["morning".into()],
            },
            preferences: Preferences {
                workout_types: vec!["strength".into()],
                intensity: Intensity::Moderate,
                rest_day: 0,
                limitations: vec!["knee pain".into()],
            },
            derived: None,
        }
    }

    #[test]
    fn test_generation_prompt_is_deterministic() {
        let facts = SessionFacts {
            workout_type: "strength",
            focus_areas: &["upper body".to_owned()],
            progression_level: 4,
            avoid_exercises: &["push-up".to_owned()],
        };
        let history = HistoryContext::default();
        let a = build_generation_messages(&profile(), &facts, &history);
        let b = build_generation_messages(&profile(), &facts, &history);
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].content, b[0].content);
        assert_eq!(a[1].content, b[1].content);
    }

    #[test]
    fn test_prompt_embeds_schema_and_facts() {
        let facts = SessionFacts {
            workout_type: "hiit",
            focus_areas: &[],
            progression_level: 7,
            avoid_exercises: &[],
        };
        let messages = build_generation_messages(&profile(), &facts, &HistoryContext::default());
        let body = &messages[1].content;
        assert!(body.contains("progression level 7/10"));
        assert!(body.contains("knee pain"));
        assert!(body.contains("\"duration_minutes\": integer (10-180)"));
        assert!(!body.contains("Variety"));
    }

    #[test]
    fn test_session_lines_render_feedback_in_ascii() {
        let facts = SessionFacts {
            workout_type: "strength",
            focus_areas: &[],
            progression_level: 4,
            avoid_exercises: &[],
        };
        let history = HistoryContext {
            sessions: vec![SessionSample {
                workout_type: "strength".into(),
                completed_at: None,
                rating: Some(4),
                feedback: Some("felt great".into()),
                exercises_completed: vec![],
                duration_minutes: Some(40),
            }],
            progress: vec![],
        };
        let messages = build_generation_messages(&profile(), &facts, &history);
        let body = &messages[1].content;
        assert!(body.contains("- Session 1: strength (4/5, 40 min): \"felt great\""));
        assert!(body.is_ascii());
    }
}
