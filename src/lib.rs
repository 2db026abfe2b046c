// ABOUTME: FitForge library root: AI-personalized workout generation service
// ABOUTME: Exposes the generation pipeline, storage layer, provider SPI, and shared models
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # FitForge
//!
//! Personalized workout plan generation backed by an OpenAI-compatible model
//! endpoint. The service resolves a user's canonical fitness profile, samples
//! recent training history, computes a 1-10 progression level, builds a
//! deterministic prompt around a machine-checkable plan schema, invokes the
//! model with a structured-output-then-plain fallback, and validates the
//! untrusted output before persisting it with provenance.
//!
//! Entry point: [`generation::WorkoutGenerator`].

#![warn(clippy::pedantic)]

pub mod config;
pub mod database;
pub mod errors;
pub mod generation;
pub mod llm;
pub mod logging;
pub mod models;
pub mod rate_limiting;

pub use errors::{AppError, AppResult, ErrorCode};
pub use generation::WorkoutGenerator;
