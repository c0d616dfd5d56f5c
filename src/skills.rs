//! Conservative skill-level updates
//!
//! A single evaluation is a noisy sample, so stored proficiency moves at
//! most one step per call from its current value. The rule is a pure
//! function over `(current, proposed)`, independent of storage.

use crate::storage::SkillStore;
use crate::types::{SkillDelta, SkillSnapshot, UserId, MAX_SKILL_LEVEL, MIN_SKILL_LEVEL};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Conservative update rule: move at most one step toward the proposal
///
/// The proposal is first clamped into the valid 1..=5 range. A skill with
/// no current level is stored at the (clamped) proposal directly.
pub fn clamped_level(current: Option<u8>, proposed: u8) -> u8 {
    let proposed = proposed.clamp(MIN_SKILL_LEVEL, MAX_SKILL_LEVEL);
    match current {
        None => proposed,
        Some(current) => {
            let current = current.clamp(MIN_SKILL_LEVEL, MAX_SKILL_LEVEL);
            if proposed > current {
                current + 1
            } else if proposed < current {
                current - 1
            } else {
                current
            }
        }
    }
}

/// Applies assessed skill levels to the store, one conservative step at a time
pub struct SkillLevelUpdater {
    store: Arc<dyn SkillStore>,
}

impl SkillLevelUpdater {
    pub fn new(store: Arc<dyn SkillStore>) -> Self {
        Self { store }
    }

    /// Apply a skill assessment against the pre-evaluation snapshot
    ///
    /// Returns the applied deltas and any persistence warnings. Writes are
    /// best-effort: a failed upsert is reported as a warning and the
    /// remaining skills are still processed. Skills present in the snapshot
    /// but absent from the assessment are left untouched.
    pub async fn apply(
        &self,
        user: UserId,
        assessment: &BTreeMap<String, u8>,
        snapshot: &SkillSnapshot,
    ) -> (Vec<SkillDelta>, Vec<String>) {
        let mut deltas = Vec::with_capacity(assessment.len());
        let mut warnings = Vec::new();

        for (skill, &proposed) in assessment {
            let previous = snapshot.get(skill).copied();
            let stored = clamped_level(previous, proposed);

            if Some(stored) == previous {
                debug!("Skill '{}' unchanged at level {}", skill, stored);
                deltas.push(SkillDelta {
                    skill: skill.clone(),
                    previous,
                    proposed,
                    stored,
                });
                continue;
            }

            match self.store.upsert_skill(user, skill, stored).await {
                Ok(()) => {
                    debug!(
                        "Skill '{}' moved {:?} -> {} (proposed {})",
                        skill, previous, stored, proposed
                    );
                    deltas.push(SkillDelta {
                        skill: skill.clone(),
                        previous,
                        proposed,
                        stored,
                    });
                }
                Err(e) => {
                    warn!("Failed to persist skill '{}': {}", skill, e);
                    warnings.push(format!("Skill '{}' was not persisted: {}", skill, e));
                }
            }
        }

        (deltas, warnings)
    }
}
