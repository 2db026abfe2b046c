// ABOUTME: Workout generation pipeline: validation, profile, history, progression, prompt, invocation
// ABOUTME: Submodules compose into WorkoutGenerator, the end-to-end orchestrator
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Workout Generation Pipeline
//!
//! Each stage of the pipeline lives in its own submodule; [`service`] wires
//! them together behind [`WorkoutGenerator`].

pub mod constraints;
pub mod dedupe;
pub mod extract;
pub mod history;
pub mod invoker;
pub mod profile;
pub mod progression;
pub mod prompt;
pub mod service;
pub mod validation;

pub use history::HistoryContext;
pub use invoker::{InvokerSettings, ModelInvoker};
pub use profile::ResolvedProfile;
pub use progression::SessionFeedback;
pub use service::WorkoutGenerator;
