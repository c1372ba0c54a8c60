//! Schedule Override Store
//!
//! Layers user-specific overrides (today's focus, slot swaps) on top of
//! the default template grid and resolves the effective schedule for
//! reads. Key principles:
//! - the template catalog is never mutated; overrides are a non-destructive
//!   overlay keyed by (phase, week, day)
//! - completed history is load-bearing: slots whose effective template has
//!   a completed session cannot be refocused or swapped away
//! - every mutation validates first, then writes through one
//!   revision-checked record update (optimistic concurrency)

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::calendar;
use crate::catalog;
use crate::db::DbPool;
use crate::error::PlannerError;
use crate::models::{
    Phase, Program, ScheduleOverrideRecord, SlotOverride, WorkoutSlot, WEEKS_PER_PHASE,
};
use crate::session;

// ---------------------------------------------------------------------------
/// Effective Schedule Views
// ---------------------------------------------------------------------------

/// One slot of the effective schedule as the caller sees it
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledWorkout {
    pub slot: WorkoutSlot,
    /// None for a rest day
    pub template_id: Option<i64>,
    pub template_name: Option<String>,
    /// Whether an override, not the catalog default, supplied the template
    pub overridden: bool,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekSchedule {
    pub week: i64,
    pub days: Vec<ScheduledWorkout>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseOverview {
    pub phase: Phase,
    pub weeks: Vec<WeekSchedule>,
}

/// Which rule of the priority chain produced today's workout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TodaysWorkoutSource {
    InProgressSession,
    TodayFocus,
    ScheduledToday,
    NextAvailable,
    AllCompletedFallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct TodaysWorkout {
    pub template_id: Option<i64>,
    pub slot: Option<WorkoutSlot>,
    pub source: TodaysWorkoutSource,
    /// Whether the resolved slot equals the nominal current-day slot
    pub is_scheduled_today: bool,
    /// Set when an in-progress session pinned the result
    pub session_id: Option<i64>,
}

// ---------------------------------------------------------------------------
/// Slot Resolution
// ---------------------------------------------------------------------------

/// Effective occupant of a slot: the override when one exists and still
/// resolves, otherwise the catalog default. A stale override (template
/// deleted upstream) is recovered silently - the slot falls back to its
/// default and the condition is logged, never surfaced.
pub(crate) async fn resolve_slot(
    pool: &DbPool,
    program: &Program,
    record: Option<&ScheduleOverrideRecord>,
    slot: WorkoutSlot,
) -> Result<Option<(i64, bool)>, PlannerError> {
    if let Some(rec) = record {
        if let Some(ov) = rec.slot_override_for(slot) {
            if catalog::try_load_template(pool, ov.template_id).await?.is_some() {
                return Ok(Some((ov.template_id, true)));
            }
            let stale = PlannerError::StaleReference(format!(
                "override for slot {} references missing template {}",
                slot, ov.template_id
            ));
            tracing::warn!(error = %stale, "falling back to default template");
        }
    }

    Ok(catalog::template_id_for_slot(pool, program, slot)
        .await?
        .map(|id| (id, false)))
}

async fn scheduled_workout(
    pool: &DbPool,
    program: &Program,
    record: Option<&ScheduleOverrideRecord>,
    completed_ids: &[i64],
    slot: WorkoutSlot,
) -> Result<ScheduledWorkout, PlannerError> {
    let resolved = resolve_slot(pool, program, record, slot).await?;

    let (template_id, overridden) = match resolved {
        Some((id, ov)) => (Some(id), ov),
        None => (None, false),
    };

    let template_name = match template_id {
        Some(id) => catalog::try_load_template(pool, id).await?.map(|t| t.name),
        None => None,
    };

    Ok(ScheduledWorkout {
        slot,
        template_id,
        template_name,
        overridden,
        completed: template_id.is_some_and(|id| completed_ids.contains(&id)),
    })
}

// ---------------------------------------------------------------------------
/// Override Record Operations
// ---------------------------------------------------------------------------

pub(crate) async fn fetch_record(
    pool: &DbPool,
    athlete_id: i64,
    program_id: i64,
) -> Result<Option<ScheduleOverrideRecord>, PlannerError> {
    let row: Option<(
        i64,
        i64,
        i64,
        Option<i64>,
        Option<DateTime<Utc>>,
        String,
        i64,
        Option<DateTime<Utc>>,
        Option<DateTime<Utc>>,
    )> = sqlx::query_as(
        r#"
        SELECT id, athlete_id, program_id, today_focus_template_id, today_focus_set_at,
               slot_overrides_json, revision, created_at, updated_at
        FROM schedule_overrides
        WHERE athlete_id = ?1 AND program_id = ?2
        "#,
    )
    .bind(athlete_id)
    .bind(program_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some((
            id,
            athlete_id,
            program_id,
            today_focus_template_id,
            today_focus_set_at,
            overrides_json,
            revision,
            created_at,
            updated_at,
        )) => {
            let slot_overrides = ScheduleOverrideRecord::overrides_from_json(&overrides_json)
                .map_err(PlannerError::Database)?;
            Ok(Some(ScheduleOverrideRecord {
                id,
                athlete_id,
                program_id,
                today_focus_template_id,
                today_focus_set_at,
                slot_overrides,
                revision,
                created_at,
                updated_at,
            }))
        }
        None => Ok(None),
    }
}

/// Load the record, creating the empty row on first mutation
async fn ensure_record(
    pool: &DbPool,
    athlete_id: i64,
    program_id: i64,
) -> Result<ScheduleOverrideRecord, PlannerError> {
    sqlx::query(
        "INSERT OR IGNORE INTO schedule_overrides (athlete_id, program_id) VALUES (?1, ?2)",
    )
    .bind(athlete_id)
    .bind(program_id)
    .execute(pool)
    .await?;

    fetch_record(pool, athlete_id, program_id)
        .await?
        .ok_or_else(|| PlannerError::Database("Override record missing after upsert".to_string()))
}

/// Write the record back, guarded by the revision it was loaded at. A
/// concurrent writer bumps the revision first and this save refuses,
/// leaving no partial state.
async fn save_record(pool: &DbPool, record: &ScheduleOverrideRecord) -> Result<(), PlannerError> {
    let result = sqlx::query(
        r#"
        UPDATE schedule_overrides
        SET today_focus_template_id = ?1,
            today_focus_set_at = ?2,
            slot_overrides_json = ?3,
            revision = revision + 1,
            updated_at = ?4
        WHERE id = ?5 AND revision = ?6
        "#,
    )
    .bind(record.today_focus_template_id)
    .bind(record.today_focus_set_at)
    .bind(record.overrides_to_json())
    .bind(Utc::now())
    .bind(record.id)
    .bind(record.revision)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(PlannerError::InvalidState(
            "Schedule was modified concurrently, retry the operation".to_string(),
        ));
    }

    Ok(())
}

/// Replace every slot override inside `range` with the supplied set,
/// leaving overrides outside the range untouched. Total and idempotent:
/// callers hand over the complete desired overlay for the range.
pub(crate) async fn replace_overrides_in_range(
    pool: &DbPool,
    program: &Program,
    range: &[WorkoutSlot],
    new_overrides: Vec<SlotOverride>,
) -> Result<(), PlannerError> {
    let mut record = ensure_record(pool, program.athlete_id, program.id).await?;
    record.slot_overrides.retain(|o| !range.contains(&o.slot()));
    for ov in new_overrides {
        record.set_slot_override(ov.slot(), ov.template_id);
    }
    save_record(pool, &record).await
}

// ---------------------------------------------------------------------------
/// Queries
// ---------------------------------------------------------------------------

/// The raw override record, None when the athlete never customized
pub async fn get_override_record(
    pool: &DbPool,
    athlete_id: i64,
    program_id: i64,
) -> Result<Option<ScheduleOverrideRecord>, PlannerError> {
    catalog::load_athlete(pool, athlete_id).await?;
    catalog::load_program(pool, athlete_id, program_id).await?;
    fetch_record(pool, athlete_id, program_id).await
}

/// Effective schedule for one week, defaulting to the program's current
/// phase and week.
pub async fn get_week_schedule(
    pool: &DbPool,
    athlete_id: i64,
    program_id: i64,
    phase: Option<Phase>,
    week: Option<i64>,
) -> Result<Vec<ScheduledWorkout>, PlannerError> {
    catalog::load_athlete(pool, athlete_id).await?;
    let program = catalog::load_program(pool, athlete_id, program_id).await?;
    let record = fetch_record(pool, athlete_id, program_id).await?;
    let completed = session::completed_template_ids_for(pool, athlete_id, program_id).await?;

    let phase = phase.unwrap_or(program.phase);
    let week = week.unwrap_or(program.current_week);

    let mut days = Vec::new();
    for day in 1..=program.workouts_per_week() {
        let slot = WorkoutSlot { phase, week, day };
        days.push(scheduled_workout(pool, &program, record.as_ref(), &completed, slot).await?);
    }

    Ok(days)
}

/// All four weeks of a phase with overrides applied
pub async fn get_phase_overview(
    pool: &DbPool,
    athlete_id: i64,
    program_id: i64,
    phase: Option<Phase>,
) -> Result<PhaseOverview, PlannerError> {
    catalog::load_athlete(pool, athlete_id).await?;
    let program = catalog::load_program(pool, athlete_id, program_id).await?;
    let record = fetch_record(pool, athlete_id, program_id).await?;
    let completed = session::completed_template_ids_for(pool, athlete_id, program_id).await?;

    let phase = phase.unwrap_or(program.phase);

    let mut weeks = Vec::new();
    for week in 1..=WEEKS_PER_PHASE {
        let mut days = Vec::new();
        for day in 1..=program.workouts_per_week() {
            let slot = WorkoutSlot { phase, week, day };
            days.push(scheduled_workout(pool, &program, record.as_ref(), &completed, slot).await?);
        }
        weeks.push(WeekSchedule { week, days });
    }

    Ok(PhaseOverview { phase, weeks })
}

/// Effective workout for a calendar date. None when the date falls before
/// the program anchor, on a non-training weekday, or past the final phase.
pub async fn get_workout_for_date(
    pool: &DbPool,
    athlete_id: i64,
    program_id: i64,
    date: NaiveDate,
) -> Result<Option<ScheduledWorkout>, PlannerError> {
    catalog::load_athlete(pool, athlete_id).await?;
    let program = catalog::load_program(pool, athlete_id, program_id).await?;

    let Some(slot) = calendar::slot_for_date(program.start_date, &program.training_weekdays, date)
    else {
        return Ok(None);
    };

    let record = fetch_record(pool, athlete_id, program_id).await?;
    let completed = session::completed_template_ids_for(pool, athlete_id, program_id).await?;

    Ok(Some(
        scheduled_workout(pool, &program, record.as_ref(), &completed, slot).await?,
    ))
}

/// Resolve today's workout by strict priority:
/// 1. an in-progress session pins its template unconditionally, so a
///    mid-workout athlete is never redirected
/// 2. an explicit today-focus whose target has no completed session
/// 3. the first non-completed slot of the current week in day order
/// 4. the nominal current-day slot once everything this week is done
pub async fn get_todays_workout(
    pool: &DbPool,
    athlete_id: i64,
    program_id: i64,
) -> Result<TodaysWorkout, PlannerError> {
    catalog::load_athlete(pool, athlete_id).await?;
    let program = catalog::load_program(pool, athlete_id, program_id).await?;

    if let Some(active) = session::find_in_progress(pool, athlete_id).await? {
        return Ok(TodaysWorkout {
            template_id: Some(active.template_id),
            slot: None,
            source: TodaysWorkoutSource::InProgressSession,
            is_scheduled_today: false,
            session_id: Some(active.id),
        });
    }

    let record = fetch_record(pool, athlete_id, program_id).await?;

    if let Some(rec) = record.as_ref() {
        if let Some(focus_id) = rec.today_focus_template_id {
            if catalog::try_load_template(pool, focus_id).await?.is_none() {
                let stale = PlannerError::StaleReference(format!(
                    "today-focus references missing template {}",
                    focus_id
                ));
                tracing::warn!(error = %stale, "ignoring stale focus");
            } else if !session::has_completed_session(pool, athlete_id, focus_id).await? {
                return Ok(TodaysWorkout {
                    template_id: Some(focus_id),
                    slot: None,
                    source: TodaysWorkoutSource::TodayFocus,
                    is_scheduled_today: false,
                    session_id: None,
                });
            }
        }
    }

    let current = program.current_slot();
    for day in 1..=program.workouts_per_week() {
        let slot = WorkoutSlot {
            phase: program.phase,
            week: program.current_week,
            day,
        };
        if let Some((template_id, _)) = resolve_slot(pool, &program, record.as_ref(), slot).await? {
            if !session::has_completed_session(pool, athlete_id, template_id).await? {
                let is_today = slot == current;
                return Ok(TodaysWorkout {
                    template_id: Some(template_id),
                    slot: Some(slot),
                    source: if is_today {
                        TodaysWorkoutSource::ScheduledToday
                    } else {
                        TodaysWorkoutSource::NextAvailable
                    },
                    is_scheduled_today: is_today,
                    session_id: None,
                });
            }
        }
    }

    // Every slot this week is completed: show the nominal slot anyway
    let fallback = resolve_slot(pool, &program, record.as_ref(), current).await?;
    Ok(TodaysWorkout {
        template_id: fallback.map(|(id, _)| id),
        slot: Some(current),
        source: TodaysWorkoutSource::AllCompletedFallback,
        is_scheduled_today: true,
        session_id: None,
    })
}

// ---------------------------------------------------------------------------
/// Mutations
// ---------------------------------------------------------------------------

/// Point today at an arbitrary template of the athlete's category
pub async fn set_today_focus(
    pool: &DbPool,
    athlete_id: i64,
    program_id: i64,
    template_id: i64,
) -> Result<ScheduleOverrideRecord, PlannerError> {
    catalog::load_athlete(pool, athlete_id).await?;
    let program = catalog::load_program(pool, athlete_id, program_id).await?;
    let template = catalog::load_template(pool, template_id).await?;

    if template.category_id != program.category_id {
        return Err(PlannerError::Authorization(
            "Template does not belong to the athlete's category".to_string(),
        ));
    }
    if session::has_completed_session(pool, athlete_id, template_id).await? {
        return Err(PlannerError::InvalidState(
            "Cannot focus a workout that is already completed".to_string(),
        ));
    }

    let mut record = ensure_record(pool, athlete_id, program_id).await?;
    record.today_focus_template_id = Some(template_id);
    record.today_focus_set_at = Some(Utc::now());
    save_record(pool, &record).await?;

    fetch_record(pool, athlete_id, program_id)
        .await?
        .ok_or_else(|| PlannerError::Database("Override record vanished".to_string()))
}

/// Drop the focus pointer; slot overrides stay in place
pub async fn clear_today_focus(
    pool: &DbPool,
    athlete_id: i64,
    program_id: i64,
) -> Result<(), PlannerError> {
    catalog::load_athlete(pool, athlete_id).await?;
    catalog::load_program(pool, athlete_id, program_id).await?;

    let Some(mut record) = fetch_record(pool, athlete_id, program_id).await? else {
        return Ok(());
    };
    record.today_focus_template_id = None;
    record.today_focus_set_at = None;
    save_record(pool, &record).await
}

/// Swap the occupants of two same-phase slots. Rejects rest days and
/// slots whose effective template is already completed.
pub async fn swap_workouts(
    pool: &DbPool,
    athlete_id: i64,
    program_id: i64,
    slot_a: WorkoutSlot,
    slot_b: WorkoutSlot,
) -> Result<ScheduleOverrideRecord, PlannerError> {
    catalog::load_athlete(pool, athlete_id).await?;
    let program = catalog::load_program(pool, athlete_id, program_id).await?;

    if slot_a.phase != slot_b.phase {
        return Err(PlannerError::InvalidState(
            "Workouts can only be swapped within the same phase".to_string(),
        ));
    }

    let record = fetch_record(pool, athlete_id, program_id).await?;

    let occupant_a = resolve_slot(pool, &program, record.as_ref(), slot_a)
        .await?
        .map(|(id, _)| id)
        .ok_or_else(|| PlannerError::InvalidState(format!("Slot {} is a rest day", slot_a)))?;
    let occupant_b = resolve_slot(pool, &program, record.as_ref(), slot_b)
        .await?
        .map(|(id, _)| id)
        .ok_or_else(|| PlannerError::InvalidState(format!("Slot {} is a rest day", slot_b)))?;

    for occupant in [occupant_a, occupant_b] {
        if session::has_completed_session(pool, athlete_id, occupant).await? {
            return Err(PlannerError::InvalidState(
                "Cannot swap a workout that is already completed".to_string(),
            ));
        }
    }

    let mut record = ensure_record(pool, athlete_id, program_id).await?;
    record.set_slot_override(slot_a, occupant_b);
    record.set_slot_override(slot_b, occupant_a);
    save_record(pool, &record).await?;

    fetch_record(pool, athlete_id, program_id)
        .await?
        .ok_or_else(|| PlannerError::Database("Override record vanished".to_string()))
}

/// Remove every slot override of one phase; the focus pointer stays
pub async fn reset_phase_to_default(
    pool: &DbPool,
    athlete_id: i64,
    program_id: i64,
    phase: Phase,
) -> Result<(), PlannerError> {
    catalog::load_athlete(pool, athlete_id).await?;
    catalog::load_program(pool, athlete_id, program_id).await?;

    let Some(mut record) = fetch_record(pool, athlete_id, program_id).await? else {
        return Ok(());
    };
    record.slot_overrides.retain(|o| o.phase != phase);
    save_record(pool, &record).await
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
