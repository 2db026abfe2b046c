// ABOUTME: Shared integration-test helpers: in-memory database, scripted model provider, fixtures
// ABOUTME: Each test file pulls these in via `mod common`
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;

use fitforge::config::{LlmConfig, RateLimitConfig};
use fitforge::database::Database;
use fitforge::errors::AppError;
use fitforge::llm::{ChatRequest, ChatResponse, LlmProvider};
use fitforge::models::{
    FitnessLevel, Intensity, Preferences, ProfilePatch, TimeCommitment,
};
use fitforge::WorkoutGenerator;

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging once per process
pub fn init_test_logging() {
    INIT_LOGGING.call_once(fitforge::logging::init);
}

/// Create a fresh in-memory database with migrations applied
pub async fn create_test_database() -> Database {
    Database::new("sqlite::memory:")
        .await
        .expect("in-memory database creates")
}

/// A complete profile patch suitable for onboarding
pub fn complete_patch() -> ProfilePatch {
    ProfilePatch {
        fitness_level: Some(FitnessLevel::Intermediate),
        goals: Some(vec!["strength".into(), "endurance".into()]),
        equipment: Some(vec!["dumbbells".into(), "bench".into()]),
        time_commitment: Some(TimeCommitment {
            days_per_week: 4,
            minutes_per_session: 45,
            preferred_times: vec!["morning".into()],
        }),
        preferences: Some(Preferences {
            workout_types: vec!["strength".into()],
            intensity: Intensity::Moderate,
            rest_day: 0,
            limitations: vec![],
        }),
    }
}

/// Valid model output matching the plan schema
pub fn valid_plan_json() -> String {
    serde_json::json!({
        "name": "Dumbbell Strength Session",
        "description": "Progressive full-body strength work",
        "workout_type": "strength",
        "difficulty": "intermediate",
        "duration_minutes": 45,
        "exercises": [
            {
                "name": "Goblet Squat",
                "description": "Squat holding one dumbbell at the chest",
                "instructions": ["Hold dumbbell vertically", "Squat to depth", "Drive up"],
                "target_muscles": ["quads", "glutes"],
                "equipment": ["dumbbells"],
                "difficulty": "intermediate",
                "sets": 4,
                "reps": 10,
                "rest_seconds": 90,
                "tips": ["Keep chest up"]
            },
            {
                "name": "Dumbbell Bench Press",
                "description": "Press from a flat bench",
                "instructions": ["Lie back", "Lower to chest", "Press up"],
                "target_muscles": ["chest", "triceps"],
                "equipment": ["dumbbells", "bench"],
                "difficulty": "intermediate",
                "sets": 4,
                "reps": 8,
                "rest_seconds": 90,
                "tips": []
            }
        ],
        "equipment": ["dumbbells", "bench"],
        "target_muscles": ["quads", "glutes", "chest", "triceps"],
        "motivation": "Strong work today."
    })
    .to_string()
}

/// One scripted reply from the mock provider
pub enum Scripted {
    /// Succeed with the given content
    Content(String),
    /// Fail with an error built by the closure
    Fail(Box<dyn Fn() -> AppError + Send>),
}

/// Scripted in-process model provider
///
/// Replies are consumed in order; running past the script fails the call.
/// Every request is captured for assertions.
pub struct MockProvider {
    script: Mutex<Vec<Scripted>>,
    calls: AtomicUsize,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    pub fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Provider that returns the same valid plan on every call
    pub fn always_valid() -> Arc<Self> {
        Self::new(vec![
            Scripted::Content(valid_plan_json()),
            Scripted::Content(valid_plan_json()),
            Scripted::Content(valid_plan_json()),
            Scripted::Content(valid_plan_json()),
        ])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());

        let next = {
            let mut script = self.script.lock().expect("script lock");
            if script.is_empty() {
                None
            } else {
                Some(script.remove(0))
            }
        };

        match next {
            Some(Scripted::Content(content)) => Ok(ChatResponse {
                content,
                model: "mock-model".into(),
                usage: None,
                finish_reason: Some("stop".into()),
            }),
            Some(Scripted::Fail(make)) => Err(make()),
            None => Err(AppError::external_service("mock", "script exhausted")),
        }
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        Ok(true)
    }
}

/// Rate-limit settings that never interfere with sequential test calls
pub fn permissive_rate_limit() -> RateLimitConfig {
    RateLimitConfig {
        cooldown_secs: 0,
        hourly_quota: 1000,
    }
}

/// Wire a generator over a fresh database and the given provider
pub async fn create_generator(provider: Arc<MockProvider>) -> (WorkoutGenerator, Database) {
    init_test_logging();
    let database = create_test_database().await;
    let generator = WorkoutGenerator::new(
        database.clone(),
        provider,
        &LlmConfig::default(),
        permissive_rate_limit(),
    );
    (generator, database)
}
