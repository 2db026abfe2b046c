// ABOUTME: End-to-end tests for the baseline generation flow against an in-memory store
// ABOUTME: Covers authentication, preconditions, fallback retry, validation failures, and persistence
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod common;

use uuid::Uuid;

use common::{
    complete_patch, create_generator, valid_plan_json, MockProvider, Scripted,
};
use fitforge::errors::{AppError, ErrorCode};
use fitforge::models::{PlanStatus, WorkoutRequest};

fn base_request() -> WorkoutRequest {
    WorkoutRequest {
        workout_type: "strength".into(),
        progression_level: None,
        focus_areas: None,
        previous_workout_ids: None,
        profile_overrides: None,
        idempotency_key: None,
    }
}

#[tokio::test]
async fn generate_workout_persists_plan_with_provenance() {
    let provider = MockProvider::always_valid();
    let (generator, database) = create_generator(provider.clone()).await;
    let user = Uuid::new_v4();

    generator
        .upsert_profile(Some(user), complete_patch())
        .await
        .expect("profile upserts");

    let outcome = generator
        .generate_workout(Some(user), base_request())
        .await
        .expect("generation succeeds");

    assert_eq!(outcome.workout_plan.user_id, user);
    assert_eq!(outcome.workout_plan.provenance.source, "generated");
    assert_eq!(outcome.workout_plan.provenance.status, PlanStatus::Active);
    assert_eq!(outcome.workout_plan.provenance.dedupe_key, outcome.dedupe_key);
    assert!(outcome.adaptations.is_none());
    // Intermediate tier with no history
    assert_eq!(outcome.workout_plan.provenance.progression_level, 4);
    assert_eq!(provider.call_count(), 1);

    let reloaded = database
        .get_plan(outcome.workout_plan.id)
        .await
        .expect("plan reads")
        .expect("plan exists");
    assert_eq!(reloaded.plan.name, outcome.workout_plan.plan.name);
    assert_eq!(reloaded.provenance.profile_digest, outcome.workout_plan.provenance.profile_digest);
}

#[tokio::test]
async fn anonymous_caller_is_rejected_before_any_side_effect() {
    let provider = MockProvider::always_valid();
    let (generator, _database) = create_generator(provider.clone()).await;

    let err = generator
        .generate_workout(None, base_request())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AuthRequired);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn missing_profile_fails_precondition() {
    let provider = MockProvider::always_valid();
    let (generator, _database) = create_generator(provider.clone()).await;

    let err = generator
        .generate_workout(Some(Uuid::new_v4()), base_request())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::FailedPrecondition);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn inline_overrides_allow_first_run_generation() {
    let provider = MockProvider::always_valid();
    let (generator, database) = create_generator(provider.clone()).await;
    let user = Uuid::new_v4();

    let request = WorkoutRequest {
        profile_overrides: Some(complete_patch()),
        ..base_request()
    };
    let outcome = generator
        .generate_workout(Some(user), request)
        .await
        .expect("inline profile suffices");

    // Inline overrides never create a canonical profile
    assert!(database.get_profile(user).await.expect("read ok").is_none());
    let snapshot = &outcome.workout_plan.provenance.personalization;
    assert_eq!(snapshot["transient_profile"], true);
}

#[tokio::test]
async fn explicit_progression_level_wins_over_computed() {
    let provider = MockProvider::always_valid();
    let (generator, _database) = create_generator(provider.clone()).await;
    let user = Uuid::new_v4();
    generator
        .upsert_profile(Some(user), complete_patch())
        .await
        .expect("profile upserts");

    let request = WorkoutRequest {
        progression_level: Some(9),
        ..base_request()
    };
    let outcome = generator
        .generate_workout(Some(user), request)
        .await
        .expect("generation succeeds");

    assert_eq!(outcome.workout_plan.provenance.progression_level, 9);
    let requests = provider.requests.lock().expect("requests lock");
    assert!(requests[0].messages[1].content.contains("level 9/10"));
}

#[tokio::test]
async fn structured_mode_rejection_triggers_exactly_one_fallback() {
    let provider = MockProvider::new(vec![
        Scripted::Fail(Box::new(|| {
            AppError::unsupported_response_format("response_format not supported")
        })),
        Scripted::Content(valid_plan_json()),
    ]);
    let (generator, _database) = create_generator(provider.clone()).await;
    let user = Uuid::new_v4();
    generator
        .upsert_profile(Some(user), complete_patch())
        .await
        .expect("profile upserts");

    let outcome = generator
        .generate_workout(Some(user), base_request())
        .await
        .expect("fallback succeeds");

    assert_eq!(provider.call_count(), 2);
    assert_eq!(outcome.workout_plan.provenance.source, "generated");

    let requests = provider.requests.lock().expect("requests lock");
    assert!(requests[0].json_mode);
    assert!(!requests[1].json_mode);
    // Fallback appends the plain-JSON instruction as an extra user message
    assert_eq!(requests[1].messages.len(), requests[0].messages.len() + 1);
}

#[tokio::test]
async fn other_provider_errors_do_not_retry() {
    let provider = MockProvider::new(vec![Scripted::Fail(Box::new(|| {
        AppError::external_service("mock", "connection refused")
    }))]);
    let (generator, _database) = create_generator(provider.clone()).await;
    let user = Uuid::new_v4();
    generator
        .upsert_profile(Some(user), complete_patch())
        .await
        .expect("profile upserts");

    let err = generator
        .generate_workout(Some(user), base_request())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InternalError);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn unusable_model_output_persists_nothing() {
    let provider = MockProvider::new(vec![Scripted::Content(
        "Sorry, I cannot help with that.".into(),
    )]);
    let (generator, _database) = create_generator(provider.clone()).await;
    let user = Uuid::new_v4();
    generator
        .upsert_profile(Some(user), complete_patch())
        .await
        .expect("profile upserts");

    let err = generator
        .generate_workout(Some(user), base_request())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InternalError);

    let plans = generator
        .find_plans_by_dedupe_key(Some(user), "anything")
        .await
        .expect("query ok");
    assert!(plans.is_empty());
}

#[tokio::test]
async fn equipment_outside_profile_is_stripped() {
    let plan_with_barbell = valid_plan_json().replace(
        r#""equipment":["dumbbells","bench"]"#,
        r#""equipment":["dumbbells","barbell","bodyweight"]"#,
    );
    let provider = MockProvider::new(vec![Scripted::Content(plan_with_barbell)]);
    let (generator, _database) = create_generator(provider.clone()).await;
    let user = Uuid::new_v4();
    generator
        .upsert_profile(Some(user), complete_patch())
        .await
        .expect("profile upserts");

    let outcome = generator
        .generate_workout(Some(user), base_request())
        .await
        .expect("generation succeeds");

    let equipment = &outcome.workout_plan.plan.equipment;
    assert!(!equipment.iter().any(|e| e == "barbell"));
    assert!(equipment.iter().any(|e| e == "dumbbells"));
    assert!(equipment.iter().any(|e| e == "bodyweight"));
}

#[tokio::test]
async fn identical_requests_derive_identical_dedupe_keys() {
    let provider = MockProvider::always_valid();
    let (generator, _database) = create_generator(provider.clone()).await;
    let user = Uuid::new_v4();
    generator
        .upsert_profile(Some(user), complete_patch())
        .await
        .expect("profile upserts");

    let first = generator
        .generate_workout(Some(user), base_request())
        .await
        .expect("first generation");
    let second = generator
        .generate_workout(Some(user), base_request())
        .await
        .expect("second generation");

    // Same inputs, same advisory key; both writes still land
    assert_eq!(first.dedupe_key, second.dedupe_key);
    assert_ne!(first.workout_plan.id, second.workout_plan.id);

    let plans = generator
        .find_plans_by_dedupe_key(Some(user), &first.dedupe_key)
        .await
        .expect("lookup ok");
    assert_eq!(plans.len(), 2);
}

#[tokio::test]
async fn client_idempotency_key_takes_precedence() {
    let provider = MockProvider::always_valid();
    let (generator, _database) = create_generator(provider.clone()).await;
    let user = Uuid::new_v4();
    generator
        .upsert_profile(Some(user), complete_patch())
        .await
        .expect("profile upserts");

    let request = WorkoutRequest {
        idempotency_key: Some("client-key-1".into()),
        ..base_request()
    };
    let outcome = generator
        .generate_workout(Some(user), request)
        .await
        .expect("generation succeeds");
    assert_eq!(outcome.dedupe_key, "client-key-1");
}

#[tokio::test]
async fn invalid_request_rejected_before_model_call() {
    let provider = MockProvider::always_valid();
    let (generator, _database) = create_generator(provider.clone()).await;
    let user = Uuid::new_v4();

    let request = WorkoutRequest {
        progression_level: Some(0),
        ..base_request()
    };
    let err = generator.generate_workout(Some(user), request).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValueOutOfRange);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn referenced_prior_plans_bias_the_prompt_away_from_repeats() {
    let provider = MockProvider::always_valid();
    let (generator, _database) = create_generator(provider.clone()).await;
    let user = Uuid::new_v4();
    generator
        .upsert_profile(Some(user), complete_patch())
        .await
        .expect("profile upserts");

    let first = generator
        .generate_workout(Some(user), base_request())
        .await
        .expect("first generation");

    let request = WorkoutRequest {
        previous_workout_ids: Some(vec![
            first.workout_plan.id.to_string(),
            "not-a-uuid".into(),
        ]),
        ..base_request()
    };
    generator
        .generate_workout(Some(user), request)
        .await
        .expect("second generation");

    let requests = provider.requests.lock().expect("requests lock");
    let second_body = &requests[1].messages[1].content;
    assert!(second_body.contains("prefer alternatives"));
    assert!(second_body.contains("goblet squat"));
}

#[tokio::test]
async fn get_plan_enforces_ownership() {
    let provider = MockProvider::always_valid();
    let (generator, _database) = create_generator(provider.clone()).await;
    let owner = Uuid::new_v4();
    generator
        .upsert_profile(Some(owner), complete_patch())
        .await
        .expect("profile upserts");
    let outcome = generator
        .generate_workout(Some(owner), base_request())
        .await
        .expect("generation succeeds");

    let plan_id = outcome.workout_plan.id;
    assert!(generator.get_plan(Some(owner), plan_id).await.is_ok());

    let err = generator
        .get_plan(Some(Uuid::new_v4()), plan_id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);

    let err = generator
        .get_plan(Some(owner), Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
}

#[tokio::test]
async fn archive_plan_marks_status_and_persists() {
    let provider = MockProvider::always_valid();
    let (generator, database) = create_generator(provider.clone()).await;
    let owner = Uuid::new_v4();
    generator
        .upsert_profile(Some(owner), complete_patch())
        .await
        .expect("profile upserts");
    let outcome = generator
        .generate_workout(Some(owner), base_request())
        .await
        .expect("generation succeeds");
    let plan_id = outcome.workout_plan.id;

    let err = generator
        .archive_plan(Some(Uuid::new_v4()), plan_id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);

    let archived = generator
        .archive_plan(Some(owner), plan_id)
        .await
        .expect("owner archives");
    assert_eq!(archived.provenance.status, PlanStatus::Archived);

    // The status change survives a reload, everything else is untouched
    let reloaded = database
        .get_plan(plan_id)
        .await
        .expect("plan reads")
        .expect("plan exists");
    assert_eq!(reloaded.provenance.status, PlanStatus::Archived);
    assert_eq!(reloaded.plan.name, outcome.workout_plan.plan.name);
    assert_eq!(reloaded.provenance.dedupe_key, outcome.dedupe_key);

    // Archiving twice is a no-op
    let again = generator
        .archive_plan(Some(owner), plan_id)
        .await
        .expect("second archive is accepted");
    assert_eq!(again.provenance.status, PlanStatus::Archived);
}
