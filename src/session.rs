//! Workout Session State Machine
//!
//! Tracks one execution attempt from start through completion or
//! abandonment. Key principles:
//! - at most one in-progress session per athlete; a second start resumes
//!   the existing attempt instead of forking a new one
//! - the athlete profile is snapshotted at start, so a session's numbers
//!   never drift when the profile changes mid-program
//! - sessions predating snapshots scale through a fixed Low/Moderate/High
//!   table; both paths are explicit variants of one `ScalingMode`

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cascade::{self, CascadeOutcome};
use crate::catalog;
use crate::db::DbPool;
use crate::error::PlannerError;
use crate::models::{
    ExerciseLog, Intensity, ScalingSnapshot, SessionStatus, TemplateExercise, WorkoutSession,
};
use crate::scaling::{
    detect_focus, experience_bucket, resolve_parameters, select_bodyweight_variant, ExerciseFocus,
    LoadRange, Prescription, VariantSelection,
};

// ---------------------------------------------------------------------------
/// Scaling Strategies
// ---------------------------------------------------------------------------

/// How a session's live numbers are derived on read. Category scaling is
/// the current path; the legacy intensity table only serves sessions
/// created before snapshots existed and produces the same output shape.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScalingMode {
    Category { snapshot: ScalingSnapshot },
    LegacyIntensity { intensity: Intensity },
}

impl ScalingMode {
    pub fn for_session(session: &WorkoutSession) -> Self {
        match session.scaling_snapshot {
            Some(snapshot) => ScalingMode::Category { snapshot },
            None => ScalingMode::LegacyIntensity {
                intensity: session.target_intensity.unwrap_or(Intensity::Moderate),
            },
        }
    }

    /// Resolve one template occurrence into the variant to perform and its
    /// prescription.
    pub fn resolve(&self, occurrence: &TemplateExercise) -> (VariantSelection, Prescription) {
        match self {
            ScalingMode::Category { snapshot } => {
                let focus =
                    detect_focus(&occurrence.exercise.tags, &occurrence.exercise.equipment);
                let prescription = resolve_parameters(
                    snapshot.category_id,
                    snapshot.phase,
                    snapshot.age_group,
                    snapshot.years_experience,
                    focus,
                );
                let selection = if focus == ExerciseFocus::Bodyweight {
                    select_bodyweight_variant(
                        occurrence.exercise.id,
                        occurrence.exercise.easier_variant_id,
                        occurrence.exercise.harder_variant_id,
                        snapshot.phase,
                        experience_bucket(snapshot.years_experience),
                    )
                } else {
                    VariantSelection {
                        exercise_id: occurrence.exercise.id,
                        is_substituted: false,
                    }
                };
                (selection, prescription)
            }
            ScalingMode::LegacyIntensity { intensity } => {
                let (rpe, load, tempo) = match intensity {
                    Intensity::Low => ((5.0, 6.0), (0.50, 0.60), "2.0.2"),
                    Intensity::Moderate => ((6.0, 8.0), (0.65, 0.75), "2.0.1"),
                    Intensity::High => ((8.0, 9.0), (0.80, 0.90), "x.x.x"),
                };
                let prescription = Prescription {
                    sets: occurrence.base_sets,
                    reps: occurrence.base_reps,
                    rest_seconds: occurrence.base_rest_seconds,
                    tempo: tempo.to_string(),
                    rpe: LoadRange {
                        min: rpe.0,
                        max: rpe.1,
                    },
                    percent_one_rm: Some(LoadRange {
                        min: load.0,
                        max: load.1,
                    }),
                };
                (
                    VariantSelection {
                        exercise_id: occurrence.exercise.id,
                        is_substituted: false,
                    },
                    prescription,
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
/// Views
// ---------------------------------------------------------------------------

/// One exercise of a session with its live-resolved prescription
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedExercise {
    pub exercise_id: i64,
    pub name: String,
    pub order_index: i64,
    pub is_substituted: bool,
    pub prescription: Prescription,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    pub session: WorkoutSession,
    pub scaling: ScalingMode,
    pub exercises: Vec<ResolvedExercise>,
}

/// Result of a start call; `is_existing` marks resume semantics
#[derive(Debug, Clone, Serialize)]
pub struct SessionStart {
    pub session: WorkoutSession,
    pub is_existing: bool,
    pub cascade: CascadeOutcome,
}

// ---------------------------------------------------------------------------
/// Row Loading
// ---------------------------------------------------------------------------

type SessionRow = (
    i64,
    i64,
    i64,
    i64,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    Option<i64>,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
);

fn session_from_row(row: SessionRow) -> Result<WorkoutSession, PlannerError> {
    let (
        id,
        athlete_id,
        program_id,
        template_id,
        status,
        started_at,
        completed_at,
        duration_seconds,
        target_intensity,
        exercise_order_json,
        exercises_json,
        scaling_snapshot_json,
        created_at,
        updated_at,
    ) = row;

    let exercise_order = match exercise_order_json {
        Some(json) => Some(
            serde_json::from_str::<Vec<i64>>(&json)
                .map_err(|e| PlannerError::Database(format!("Corrupt exercise order: {}", e)))?,
        ),
        None => None,
    };

    let scaling_snapshot = match scaling_snapshot_json {
        Some(json) => Some(ScalingSnapshot::from_json(&json).map_err(PlannerError::Database)?),
        None => None,
    };

    let target_intensity = match target_intensity {
        Some(s) => Some(s.parse::<Intensity>().map_err(PlannerError::Database)?),
        None => None,
    };

    Ok(WorkoutSession {
        id,
        athlete_id,
        program_id,
        template_id,
        status: status.parse().map_err(PlannerError::Database)?,
        started_at,
        completed_at,
        duration_seconds,
        target_intensity,
        exercise_order,
        exercises: WorkoutSession::exercises_from_json(&exercises_json)
            .map_err(PlannerError::Database)?,
        scaling_snapshot,
        created_at,
        updated_at,
    })
}

async fn load_session_row(
    pool: &DbPool,
    session_id: i64,
) -> Result<Option<WorkoutSession>, PlannerError> {
    let row: Option<SessionRow> = sqlx::query_as(
        r#"
        SELECT id, athlete_id, program_id, template_id, status, started_at, completed_at,
               duration_seconds, target_intensity, exercise_order_json, exercises_json,
               scaling_snapshot_json, created_at, updated_at
        FROM workout_sessions
        WHERE id = ?1
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    row.map(session_from_row).transpose()
}

pub(crate) async fn find_in_progress(
    pool: &DbPool,
    athlete_id: i64,
) -> Result<Option<WorkoutSession>, PlannerError> {
    let row: Option<SessionRow> = sqlx::query_as(
        r#"
        SELECT id, athlete_id, program_id, template_id, status, started_at, completed_at,
               duration_seconds, target_intensity, exercise_order_json, exercises_json,
               scaling_snapshot_json, created_at, updated_at
        FROM workout_sessions
        WHERE athlete_id = ?1 AND status = 'in_progress'
        "#,
    )
    .bind(athlete_id)
    .fetch_optional(pool)
    .await?;

    row.map(session_from_row).transpose()
}

pub(crate) async fn has_completed_session(
    pool: &DbPool,
    athlete_id: i64,
    template_id: i64,
) -> Result<bool, PlannerError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM workout_sessions WHERE athlete_id = ?1 AND template_id = ?2 AND status = 'completed'",
    )
    .bind(athlete_id)
    .bind(template_id)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

pub(crate) async fn completed_template_ids_for(
    pool: &DbPool,
    athlete_id: i64,
    program_id: i64,
) -> Result<Vec<i64>, PlannerError> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
        SELECT DISTINCT template_id
        FROM workout_sessions
        WHERE athlete_id = ?1 AND program_id = ?2 AND status = 'completed'
        "#,
    )
    .bind(athlete_id)
    .bind(program_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

async fn require_session(
    pool: &DbPool,
    athlete_id: i64,
    session_id: i64,
) -> Result<WorkoutSession, PlannerError> {
    let session = load_session_row(pool, session_id)
        .await?
        .ok_or_else(|| PlannerError::NotFound("Session".to_string()))?;

    if session.athlete_id != athlete_id {
        return Err(PlannerError::Authorization(
            "Session does not belong to this athlete".to_string(),
        ));
    }

    Ok(session)
}

async fn require_in_progress(
    pool: &DbPool,
    athlete_id: i64,
    session_id: i64,
) -> Result<WorkoutSession, PlannerError> {
    let session = require_session(pool, athlete_id, session_id).await?;
    if session.status != SessionStatus::InProgress {
        return Err(PlannerError::InvalidState(format!(
            "Session is {}, not in progress",
            session.status
        )));
    }
    Ok(session)
}

// ---------------------------------------------------------------------------
/// State Transitions
// ---------------------------------------------------------------------------

/// Start (or resume) a session for a template.
///
/// An existing in-progress session is returned unchanged with
/// `is_existing = true`; a brand-new session snapshots the athlete,
/// materializes one placeholder set log per prescribed set, and then
/// pulls the workout forward via the cascade unless told not to.
pub async fn start_session(
    pool: &DbPool,
    athlete_id: i64,
    program_id: i64,
    template_id: i64,
    exercise_order: Option<Vec<i64>>,
    target_intensity: Option<Intensity>,
    skip_cascade: bool,
) -> Result<SessionStart, PlannerError> {
    let athlete = catalog::load_athlete(pool, athlete_id).await?;
    let program = catalog::load_program(pool, athlete_id, program_id).await?;
    let template = catalog::load_template(pool, template_id).await?;

    if template.category_id != program.category_id {
        return Err(PlannerError::Authorization(
            "Template does not belong to the athlete's category".to_string(),
        ));
    }

    if let Some(existing) = find_in_progress(pool, athlete_id).await? {
        return Ok(SessionStart {
            session: existing,
            is_existing: true,
            cascade: CascadeOutcome {
                applied: false,
                slots_shifted: 0,
            },
        });
    }

    let snapshot = ScalingSnapshot {
        category_id: program.category_id,
        phase: program.phase,
        age_group: athlete.age_group,
        years_experience: athlete.years_experience,
    };
    let mode = ScalingMode::Category { snapshot };

    let occurrences = catalog::load_template_exercises(pool, template_id).await?;
    let logs: Vec<ExerciseLog> = occurrences
        .iter()
        .map(|occ| {
            let (selection, prescription) = mode.resolve(occ);
            ExerciseLog::placeholder(selection.exercise_id, prescription.sets)
        })
        .collect();

    let exercises_json =
        serde_json::to_string(&logs).map_err(|e| PlannerError::Database(e.to_string()))?;
    let order_json = match exercise_order.as_ref() {
        Some(order) => {
            Some(serde_json::to_string(order).map_err(|e| PlannerError::Database(e.to_string()))?)
        }
        None => None,
    };

    let insert = sqlx::query(
        r#"
        INSERT INTO workout_sessions (
            athlete_id, program_id, template_id, status, started_at, target_intensity,
            exercise_order_json, exercises_json, scaling_snapshot_json
        )
        VALUES (?1, ?2, ?3, 'in_progress', ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(athlete_id)
    .bind(program_id)
    .bind(template_id)
    .bind(Utc::now())
    .bind(target_intensity.map(|i| i.to_string()))
    .bind(order_json)
    .bind(&exercises_json)
    .bind(snapshot.to_json())
    .execute(pool)
    .await;

    let session_id = match insert {
        Ok(result) => result.last_insert_rowid(),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            // Lost a concurrent start race: the unique in-progress index
            // kept the invariant, resume the winner.
            let existing = find_in_progress(pool, athlete_id).await?.ok_or_else(|| {
                PlannerError::Database("In-progress session vanished after conflict".to_string())
            })?;
            return Ok(SessionStart {
                session: existing,
                is_existing: true,
                cascade: CascadeOutcome {
                    applied: false,
                    slots_shifted: 0,
                },
            });
        }
        Err(e) => return Err(e.into()),
    };

    let cascade = if skip_cascade {
        CascadeOutcome {
            applied: false,
            slots_shifted: 0,
        }
    } else {
        cascade::cascade_forward(pool, &program, template_id).await?
    };

    let session = load_session_row(pool, session_id)
        .await?
        .ok_or_else(|| PlannerError::Database("Session vanished after insert".to_string()))?;

    Ok(SessionStart {
        session,
        is_existing: false,
        cascade,
    })
}

/// Replace the whole completion log; last write wins
pub async fn update_progress(
    pool: &DbPool,
    athlete_id: i64,
    session_id: i64,
    exercises: Vec<ExerciseLog>,
    exercise_order: Option<Vec<i64>>,
) -> Result<WorkoutSession, PlannerError> {
    require_in_progress(pool, athlete_id, session_id).await?;

    let exercises_json =
        serde_json::to_string(&exercises).map_err(|e| PlannerError::Database(e.to_string()))?;
    let order_json = match exercise_order.as_ref() {
        Some(order) => {
            Some(serde_json::to_string(order).map_err(|e| PlannerError::Database(e.to_string()))?)
        }
        None => None,
    };

    sqlx::query(
        r#"
        UPDATE workout_sessions
        SET exercises_json = ?1,
            exercise_order_json = COALESCE(?2, exercise_order_json),
            updated_at = ?3
        WHERE id = ?4
        "#,
    )
    .bind(&exercises_json)
    .bind(order_json)
    .bind(Utc::now())
    .bind(session_id)
    .execute(pool)
    .await?;

    load_session_row(pool, session_id)
        .await?
        .ok_or_else(|| PlannerError::Database("Session vanished after update".to_string()))
}

/// Finish the session: records the final log, stamps completion time and
/// elapsed duration, and moves the program's last-workout marker.
pub async fn complete_session(
    pool: &DbPool,
    athlete_id: i64,
    session_id: i64,
    exercises: Vec<ExerciseLog>,
    exercise_order: Option<Vec<i64>>,
) -> Result<WorkoutSession, PlannerError> {
    let session = require_in_progress(pool, athlete_id, session_id).await?;

    let now = Utc::now();
    let duration_seconds = (now - session.started_at).num_seconds().max(0);
    let exercises_json =
        serde_json::to_string(&exercises).map_err(|e| PlannerError::Database(e.to_string()))?;
    let order_json = match exercise_order.as_ref() {
        Some(order) => {
            Some(serde_json::to_string(order).map_err(|e| PlannerError::Database(e.to_string()))?)
        }
        None => None,
    };

    sqlx::query(
        r#"
        UPDATE workout_sessions
        SET status = 'completed',
            completed_at = ?1,
            duration_seconds = ?2,
            exercises_json = ?3,
            exercise_order_json = COALESCE(?4, exercise_order_json),
            updated_at = ?1
        WHERE id = ?5
        "#,
    )
    .bind(now)
    .bind(duration_seconds)
    .bind(&exercises_json)
    .bind(order_json)
    .bind(session_id)
    .execute(pool)
    .await?;

    sqlx::query("UPDATE programs SET last_workout_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(session.program_id)
        .execute(pool)
        .await?;

    load_session_row(pool, session_id)
        .await?
        .ok_or_else(|| PlannerError::Database("Session vanished after completion".to_string()))
}

/// Walk away from the session; no program-level side effects
pub async fn abandon_session(
    pool: &DbPool,
    athlete_id: i64,
    session_id: i64,
    exercises: Option<Vec<ExerciseLog>>,
    exercise_order: Option<Vec<i64>>,
) -> Result<WorkoutSession, PlannerError> {
    require_in_progress(pool, athlete_id, session_id).await?;

    let exercises_json = match exercises.as_ref() {
        Some(logs) => {
            Some(serde_json::to_string(logs).map_err(|e| PlannerError::Database(e.to_string()))?)
        }
        None => None,
    };
    let order_json = match exercise_order.as_ref() {
        Some(order) => {
            Some(serde_json::to_string(order).map_err(|e| PlannerError::Database(e.to_string()))?)
        }
        None => None,
    };

    sqlx::query(
        r#"
        UPDATE workout_sessions
        SET status = 'abandoned',
            exercises_json = COALESCE(?1, exercises_json),
            exercise_order_json = COALESCE(?2, exercise_order_json),
            updated_at = ?3
        WHERE id = ?4
        "#,
    )
    .bind(exercises_json)
    .bind(order_json)
    .bind(Utc::now())
    .bind(session_id)
    .execute(pool)
    .await?;

    load_session_row(pool, session_id)
        .await?
        .ok_or_else(|| PlannerError::Database("Session vanished after abandon".to_string()))
}

// ---------------------------------------------------------------------------
/// Queries
// ---------------------------------------------------------------------------

const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Session with live-resolved prescriptions. Numbers come from the
/// snapshot captured at start, so they are stable across profile edits.
pub async fn get_session(
    pool: &DbPool,
    athlete_id: i64,
    session_id: i64,
) -> Result<SessionDetail, PlannerError> {
    catalog::load_athlete(pool, athlete_id).await?;
    let session = require_session(pool, athlete_id, session_id).await?;

    let mode = ScalingMode::for_session(&session);
    let occurrences = catalog::load_template_exercises(pool, session.template_id).await?;

    let mut exercises = Vec::with_capacity(occurrences.len());
    for occurrence in &occurrences {
        let (mut selection, prescription) = mode.resolve(occurrence);
        let mut name = occurrence.exercise.name.clone();

        if selection.is_substituted {
            match catalog::try_load_exercise(pool, selection.exercise_id).await? {
                Some(variant) => name = variant.name,
                None => {
                    let stale = PlannerError::StaleReference(format!(
                        "variant exercise {} no longer exists",
                        selection.exercise_id
                    ));
                    tracing::warn!(error = %stale, "using base exercise");
                    selection = VariantSelection {
                        exercise_id: occurrence.exercise.id,
                        is_substituted: false,
                    };
                }
            }
        }

        exercises.push(ResolvedExercise {
            exercise_id: selection.exercise_id,
            name,
            order_index: occurrence.order_index,
            is_substituted: selection.is_substituted,
            prescription,
        });
    }

    if let Some(order) = session.exercise_order.as_ref() {
        exercises.sort_by_key(|e| {
            order
                .iter()
                .position(|id| *id == e.exercise_id)
                .unwrap_or(usize::MAX)
        });
    }

    Ok(SessionDetail {
        session,
        scaling: mode,
        exercises,
    })
}

/// Most recent sessions of a program, newest first
pub async fn get_session_history(
    pool: &DbPool,
    athlete_id: i64,
    program_id: i64,
    limit: Option<i64>,
) -> Result<Vec<WorkoutSession>, PlannerError> {
    catalog::load_athlete(pool, athlete_id).await?;
    catalog::load_program(pool, athlete_id, program_id).await?;

    let rows: Vec<SessionRow> = sqlx::query_as(
        r#"
        SELECT id, athlete_id, program_id, template_id, status, started_at, completed_at,
               duration_seconds, target_intensity, exercise_order_json, exercises_json,
               scaling_snapshot_json, created_at, updated_at
        FROM workout_sessions
        WHERE athlete_id = ?1 AND program_id = ?2
        ORDER BY started_at DESC
        LIMIT ?3
        "#,
    )
    .bind(athlete_id)
    .bind(program_id)
    .bind(limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(session_from_row).collect()
}

/// Ids of templates this athlete has completed within the program
pub async fn get_completed_template_ids(
    pool: &DbPool,
    athlete_id: i64,
    program_id: i64,
) -> Result<Vec<i64>, PlannerError> {
    catalog::load_athlete(pool, athlete_id).await?;
    catalog::load_program(pool, athlete_id, program_id).await?;
    completed_template_ids_for(pool, athlete_id, program_id).await
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
