//! Cascade Scheduling
//!
//! When an athlete starts a future workout ahead of schedule, the selected
//! workout moves into today's slot and everything originally between today
//! and it shifts one position later inside that range. The shift never
//! touches completed history: any completed (or empty) slot in the range
//! aborts the cascade while the session itself still starts.

use serde::Serialize;

use crate::calendar;
use crate::catalog;
use crate::db::DbPool;
use crate::error::PlannerError;
use crate::models::{Program, SlotOverride, WorkoutSlot, WEEKS_PER_PHASE};
use crate::schedule;
use crate::session;

/// Result reported back through session start
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CascadeOutcome {
    pub applied: bool,
    pub slots_shifted: i64,
}

impl CascadeOutcome {
    fn skipped() -> Self {
        Self {
            applied: false,
            slots_shifted: 0,
        }
    }
}

/// Pull `template_id` forward to the program's current slot when its
/// effective position lies strictly ahead of today, shifting the
/// intervening workouts one slot later.
pub(crate) async fn cascade_forward(
    pool: &DbPool,
    program: &Program,
    template_id: i64,
) -> Result<CascadeOutcome, PlannerError> {
    let wpw = program.workouts_per_week();
    if wpw == 0 {
        return Ok(CascadeOutcome::skipped());
    }

    let record = schedule::fetch_record(pool, program.athlete_id, program.id).await?;
    let today_index = calendar::absolute_index(program.current_slot(), wpw);

    // The template's current effective position, scanning the whole grid
    // under existing overrides
    let total_slots = 3 * WEEKS_PER_PHASE * wpw;
    let mut selected_index = None;
    for index in 0..total_slots {
        let Some(slot) = calendar::slot_at_index(index, wpw) else {
            break;
        };
        if let Some((occupant, _)) =
            schedule::resolve_slot(pool, program, record.as_ref(), slot).await?
        {
            if occupant == template_id {
                selected_index = Some(index);
                break;
            }
        }
    }

    let Some(selected_index) = selected_index else {
        return Ok(CascadeOutcome::skipped());
    };
    if selected_index <= today_index {
        return Ok(CascadeOutcome::skipped());
    }

    // Collect the inclusive range [today..selected]; completed history and
    // rest days block the shift.
    let mut slots: Vec<WorkoutSlot> = Vec::new();
    let mut occupants: Vec<i64> = Vec::new();
    for index in today_index..=selected_index {
        let Some(slot) = calendar::slot_at_index(index, wpw) else {
            return Ok(CascadeOutcome::skipped());
        };
        match schedule::resolve_slot(pool, program, record.as_ref(), slot).await? {
            Some((occupant, _)) => {
                if session::has_completed_session(pool, program.athlete_id, occupant).await? {
                    tracing::warn!(
                        slot = %slot,
                        "cascade blocked by completed workout, starting in place"
                    );
                    return Ok(CascadeOutcome::skipped());
                }
                slots.push(slot);
                occupants.push(occupant);
            }
            None => {
                tracing::warn!(slot = %slot, "cascade blocked by rest day, starting in place");
                return Ok(CascadeOutcome::skipped());
            }
        }
    }

    // Selected workout to the front; every other slot inherits its
    // predecessor's prior occupant. Persist only what differs from the
    // catalog default.
    let mut new_overrides = Vec::new();
    for (i, slot) in slots.iter().enumerate() {
        let new_occupant = if i == 0 {
            template_id
        } else {
            occupants[i - 1]
        };
        let default = catalog::template_id_for_slot(pool, program, *slot).await?;
        if default != Some(new_occupant) {
            new_overrides.push(SlotOverride {
                phase: slot.phase,
                week: slot.week,
                day: slot.day,
                template_id: new_occupant,
            });
        }
    }

    schedule::replace_overrides_in_range(pool, program, &slots, new_overrides).await?;

    let slots_shifted = slots.len() as i64;
    tracing::info!(slots_shifted, "cascade applied");

    Ok(CascadeOutcome {
        applied: true,
        slots_shifted,
    })
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
