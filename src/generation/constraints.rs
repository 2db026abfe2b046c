// ABOUTME: Equipment constraint enforcement applied after schema validation
// ABOUTME: Filters plan-level equipment tags down to the allowed set; bodyweight is always implicit
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Constraint Enforcement
//!
//! The model is told which equipment is available, but its output is not
//! trusted to honor that. After schema validation the plan-level equipment
//! set is filtered against the allowed set; tags the user does not have are
//! silently dropped. Bodyweight is always permitted.

use tracing::debug;

use crate::models::WorkoutPlan;

/// Equipment tag that is always allowed
pub const BODYWEIGHT: &str = "bodyweight";

/// Restrict the plan's equipment set to the allowed tags, case-insensitively
///
/// Tags outside the allowed set are dropped. A plan stripped of every tag is
/// normalized to `["bodyweight"]` so it always advertises something usable.
pub fn enforce_plan_equipment(plan: &mut WorkoutPlan, allowed: &[String]) {
    let allowed_lower: Vec<String> = allowed.iter().map(|a| a.to_lowercase()).collect();

    let before = plan.equipment.len();
    plan.equipment.retain(|tag| {
        let tag = tag.to_lowercase();
        tag == BODYWEIGHT || allowed_lower.contains(&tag)
    });

    if plan.equipment.len() < before {
        debug!(
            dropped = before - plan.equipment.len(),
            "dropped equipment tags outside the allowed set"
        );
    }

    if plan.equipment.is_empty() {
        plan.equipment = vec![BODYWEIGHT.to_owned()];
    }
}
