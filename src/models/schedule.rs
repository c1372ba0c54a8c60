use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Phase;

/// ---------------------------------------------------------------------------
/// Workout Slot
/// ---------------------------------------------------------------------------

/// Abstract (phase, week, day) coordinate for one scheduled workout
/// position, independent of calendar date. Ordering between two slots goes
/// through `calendar::absolute_index`, which needs the program's
/// workouts-per-week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkoutSlot {
  pub phase: Phase,
  pub week: i64,
  pub day: i64,
}

impl std::fmt::Display for WorkoutSlot {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/w{}/d{}", self.phase, self.week, self.day)
  }
}

/// ---------------------------------------------------------------------------
/// Schedule Overrides
/// ---------------------------------------------------------------------------

/// A user-specific reassignment of which template occupies a slot, layered
/// non-destructively over the default catalog assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotOverride {
  pub phase: Phase,
  pub week: i64,
  pub day: i64,
  pub template_id: i64,
}

impl SlotOverride {
  pub fn slot(&self) -> WorkoutSlot {
    WorkoutSlot {
      phase: self.phase,
      week: self.week,
      day: self.day,
    }
  }
}

/// One override record per (athlete, program). Created lazily on first
/// mutation, never deleted, only patched. The slot override list lives in
/// a JSON column; `revision` backs the optimistic write check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOverrideRecord {
  pub id: i64,
  pub athlete_id: i64,
  pub program_id: i64,
  pub today_focus_template_id: Option<i64>,
  pub today_focus_set_at: Option<DateTime<Utc>>,
  pub slot_overrides: Vec<SlotOverride>,
  pub revision: i64,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
}

impl ScheduleOverrideRecord {
  pub fn slot_override_for(&self, slot: WorkoutSlot) -> Option<&SlotOverride> {
    self.slot_overrides.iter().find(|o| o.slot() == slot)
  }

  /// Remove-then-insert keeps at most one override per slot
  pub fn set_slot_override(&mut self, slot: WorkoutSlot, template_id: i64) {
    self.slot_overrides.retain(|o| o.slot() != slot);
    self.slot_overrides.push(SlotOverride {
      phase: slot.phase,
      week: slot.week,
      day: slot.day,
      template_id,
    });
  }

  pub fn remove_slot_override(&mut self, slot: WorkoutSlot) {
    self.slot_overrides.retain(|o| o.slot() != slot);
  }

  pub fn overrides_to_json(&self) -> String {
    serde_json::to_string(&self.slot_overrides).unwrap_or_default()
  }

  pub fn overrides_from_json(json: &str) -> Result<Vec<SlotOverride>, String> {
    serde_json::from_str(json).map_err(|e| format!("Failed to parse slot overrides: {}", e))
  }
}
