// ABOUTME: Deterministic dedupe-key derivation over the generation inputs
// ABOUTME: Advisory only; the key is recorded on every plan for client-side reuse queries
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Dedupe Key
//!
//! A content hash over the inputs that make a generation request "the same":
//! user, workout type, session length, progression level, equipment, and the
//! profile digest. Two identical requests from the same user always derive
//! the same key. The key never blocks a write; it is stored on the plan so
//! clients can ask "did I already generate this?" via
//! [`crate::database::Database::plans_by_dedupe_key`]. A caller-supplied
//! idempotency key takes precedence over the derived one.

use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Derive the advisory dedupe key for a generation request
#[must_use]
pub fn derive_dedupe_key(
    user_id: Uuid,
    workout_type: &str,
    minutes_per_session: u32,
    progression_level: u8,
    equipment: &[String],
    profile_digest: &str,
) -> String {
    let mut equipment: Vec<String> = equipment.iter().map(|e| e.to_lowercase()).collect();
    equipment.sort();
    equipment.dedup();

    // serde_json emits object keys sorted, so the rendering is canonical
    let canonical = json!({
        "user_id": user_id,
        "workout_type": workout_type.to_lowercase(),
        "minutes_per_session": minutes_per_session,
        "progression_level": progression_level,
        "equipment": equipment,
        "profile_digest": profile_digest,
    });

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
