// ABOUTME: Command-line front end for the workout generation service
// ABOUTME: Profile management, generation, adaptive regeneration, and endpoint health checks
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Thin CLI over [`fitforge::WorkoutGenerator`], mainly for local development
//! against an Ollama or other OpenAI-compatible endpoint. Output is JSON on
//! stdout so results can be piped into `jq`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use fitforge::config::ServiceConfig;
use fitforge::database::Database;
use fitforge::llm::OpenAiCompatibleProvider;
use fitforge::models::{AdaptiveWorkoutRequest, DifficultyFeedback, ProfilePatch, WorkoutRequest};
use fitforge::{logging, WorkoutGenerator};

#[derive(Parser)]
#[command(name = "fitforge-cli", version, about = "Personalized workout generation")]
struct Cli {
    /// User identifier to act as
    #[arg(long, global = true)]
    user: Option<Uuid>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create or update the fitness profile from a JSON patch file
    Profile {
        /// Path to a JSON file containing the profile patch
        file: PathBuf,
    },
    /// Show the stored fitness profile
    ShowProfile,
    /// Generate a fresh workout plan
    Generate {
        /// Workout type tag (e.g. strength, cardio, hiit)
        #[arg(long)]
        workout_type: String,
        /// Explicit progression level 1-10
        #[arg(long)]
        level: Option<u8>,
        /// Focus-area tags, repeatable
        #[arg(long = "focus")]
        focus_areas: Vec<String>,
        /// Client-supplied idempotency key
        #[arg(long)]
        idempotency_key: Option<String>,
    },
    /// Regenerate a workout from feedback on a previous one
    Adapt {
        /// Identifier of the previous plan
        #[arg(long)]
        previous: Uuid,
        /// Performance rating 1-5
        #[arg(long)]
        rating: u8,
        /// Completion rate 0.0-1.0
        #[arg(long)]
        completion: f64,
        /// Difficulty feedback: too_easy, just_right, or too_hard
        #[arg(long, value_parser = parse_feedback)]
        feedback: DifficultyFeedback,
        /// Actual session length in minutes
        #[arg(long)]
        time_actual: Option<u32>,
    },
    /// Fetch a stored plan by id
    Show {
        plan_id: Uuid,
    },
    /// Retire a stored plan from the active rotation
    Archive {
        plan_id: Uuid,
    },
    /// List plans previously generated under a dedupe key
    Lookup {
        dedupe_key: String,
    },
    /// Check that the model endpoint is reachable
    Health,
}

fn parse_feedback(s: &str) -> Result<DifficultyFeedback, String> {
    serde_json::from_value(serde_json::Value::String(s.to_owned()))
        .map_err(|_| format!("expected too_easy, just_right, or too_hard, got {s}"))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();
    let config = ServiceConfig::from_env().context("loading configuration")?;

    let database = Database::new(&config.database_url)
        .await
        .context("opening database")?;
    let provider = Arc::new(
        OpenAiCompatibleProvider::new((&config.llm).into()).context("building model client")?,
    );
    let generator = WorkoutGenerator::new(database, provider, &config.llm, config.rate_limit);

    let caller = cli.user;

    match cli.command {
        Command::Profile { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let patch: ProfilePatch = serde_json::from_str(&raw).context("parsing profile patch")?;
            let stored = generator.upsert_profile(caller, patch).await?;
            print_json(&stored.profile)?;
        }
        Command::ShowProfile => {
            let stored = generator.get_profile(caller).await?;
            print_json(&stored.profile)?;
        }
        Command::Generate {
            workout_type,
            level,
            focus_areas,
            idempotency_key,
        } => {
            let request = WorkoutRequest {
                workout_type,
                progression_level: level,
                focus_areas: (!focus_areas.is_empty()).then_some(focus_areas),
                previous_workout_ids: None,
                profile_overrides: None,
                idempotency_key,
            };
            let outcome = generator.generate_workout(caller, request).await?;
            print_json(&outcome)?;
        }
        Command::Adapt {
            previous,
            rating,
            completion,
            feedback,
            time_actual,
        } => {
            let request = AdaptiveWorkoutRequest {
                previous_workout_id: previous,
                performance_rating: rating,
                completion_rate: completion,
                difficulty_feedback: feedback,
                time_actual_minutes: time_actual,
            };
            let outcome = generator.generate_adaptive_workout(caller, request).await?;
            print_json(&outcome)?;
        }
        Command::Show { plan_id } => {
            let plan = generator.get_plan(caller, plan_id).await?;
            print_json(&plan)?;
        }
        Command::Archive { plan_id } => {
            let plan = generator.archive_plan(caller, plan_id).await?;
            print_json(&plan)?;
        }
        Command::Lookup { dedupe_key } => {
            let plans = generator.find_plans_by_dedupe_key(caller, &dedupe_key).await?;
            print_json(&plans)?;
        }
        Command::Health => {
            let healthy = generator.health_check().await?;
            println!(
                "{}",
                serde_json::json!({ "healthy": healthy, "model": generator.model_name() })
            );
        }
    }

    Ok(())
}
