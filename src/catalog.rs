//! Read-only access to collaborator records: the template and exercise
//! catalogs plus athlete/program rows. Nothing in this module writes.

use chrono::{DateTime, NaiveDate, Utc};

use crate::db::DbPool;
use crate::error::PlannerError;
use crate::models::{
  AthleteProfile, Exercise, Program, ProgramTemplate, SportCategory, TemplateExercise,
  WorkoutSlot,
};

fn parse_string_list(json: &str) -> Result<Vec<String>, PlannerError> {
  serde_json::from_str(json)
    .map_err(|e| PlannerError::Database(format!("Corrupt string list column: {}", e)))
}

/// ---------------------------------------------------------------------------
/// Athlete & Program Records
/// ---------------------------------------------------------------------------

/// Resolve the caller's athlete profile. An unknown id means the caller
/// identity is bogus, not that a record is merely missing.
pub async fn load_athlete(pool: &DbPool, athlete_id: i64) -> Result<AthleteProfile, PlannerError> {
  let row: Option<(i64, String, String, i64, Option<DateTime<Utc>>)> = sqlx::query_as(
    "SELECT id, name, age_group, years_experience, created_at FROM athletes WHERE id = ?1",
  )
  .bind(athlete_id)
  .fetch_optional(pool)
  .await?;

  let (id, name, age_group, years_experience, created_at) =
    row.ok_or(PlannerError::NotAuthenticated)?;

  Ok(AthleteProfile {
    id,
    name,
    age_group: age_group.parse().map_err(PlannerError::Database)?,
    years_experience,
    created_at,
  })
}

/// Load a program and check it belongs to the calling athlete
pub async fn load_program(
  pool: &DbPool,
  athlete_id: i64,
  program_id: i64,
) -> Result<Program, PlannerError> {
  let row: Option<(
    i64,
    i64,
    i64,
    String,
    String,
    i64,
    i64,
    NaiveDate,
    String,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
  )> = sqlx::query_as(
    r#"
    SELECT id, athlete_id, category_id, skill_level, phase, current_week, current_day,
           start_date, training_weekdays_json, last_workout_at, created_at
    FROM programs
    WHERE id = ?1
    "#,
  )
  .bind(program_id)
  .fetch_optional(pool)
  .await?;

  let (
    id,
    owner_id,
    category_id,
    skill_level,
    phase,
    current_week,
    current_day,
    start_date,
    weekdays_json,
    last_workout_at,
    created_at,
  ) = row.ok_or_else(|| PlannerError::NotFound("Program".to_string()))?;

  if owner_id != athlete_id {
    return Err(PlannerError::Authorization(
      "Program does not belong to this athlete".to_string(),
    ));
  }

  let training_weekdays: Vec<u8> = serde_json::from_str(&weekdays_json)
    .map_err(|e| PlannerError::Database(format!("Corrupt training weekdays: {}", e)))?;

  Ok(Program {
    id,
    athlete_id: owner_id,
    category_id,
    skill_level: skill_level.parse().map_err(PlannerError::Database)?,
    phase: phase.parse().map_err(PlannerError::Database)?,
    current_week,
    current_day,
    start_date,
    training_weekdays,
    last_workout_at,
    created_at,
  })
}

/// ---------------------------------------------------------------------------
/// Sport Categories
/// ---------------------------------------------------------------------------

pub async fn load_category(pool: &DbPool, category_id: i64) -> Result<SportCategory, PlannerError> {
  let row: Option<(i64, String, String)> =
    sqlx::query_as("SELECT id, name, sports_json FROM sport_categories WHERE id = ?1")
      .bind(category_id)
      .fetch_optional(pool)
      .await?;

  let (id, name, sports_json) = row.ok_or_else(|| PlannerError::NotFound("Sport category".to_string()))?;

  Ok(SportCategory {
    id,
    name,
    sports: parse_string_list(&sports_json)?,
  })
}

/// ---------------------------------------------------------------------------
/// Templates
/// ---------------------------------------------------------------------------

/// Template by id, None when it no longer exists (stale override checks)
pub async fn try_load_template(
  pool: &DbPool,
  template_id: i64,
) -> Result<Option<ProgramTemplate>, PlannerError> {
  let row: Option<(i64, i64, String, String, i64, i64, String)> = sqlx::query_as(
    r#"
    SELECT id, category_id, phase, skill_level, week, day, name
    FROM program_templates
    WHERE id = ?1
    "#,
  )
  .bind(template_id)
  .fetch_optional(pool)
  .await?;

  match row {
    Some((id, category_id, phase, skill_level, week, day, name)) => Ok(Some(ProgramTemplate {
      id,
      category_id,
      phase: phase.parse().map_err(PlannerError::Database)?,
      skill_level: skill_level.parse().map_err(PlannerError::Database)?,
      week,
      day,
      name,
    })),
    None => Ok(None),
  }
}

pub async fn load_template(
  pool: &DbPool,
  template_id: i64,
) -> Result<ProgramTemplate, PlannerError> {
  try_load_template(pool, template_id)
    .await?
    .ok_or_else(|| PlannerError::NotFound("Template".to_string()))
}

/// Default occupant of a slot in the catalog grid, None for a rest day
pub async fn template_id_for_slot(
  pool: &DbPool,
  program: &Program,
  slot: WorkoutSlot,
) -> Result<Option<i64>, PlannerError> {
  let row: Option<(i64,)> = sqlx::query_as(
    r#"
    SELECT id
    FROM program_templates
    WHERE category_id = ?1 AND phase = ?2 AND skill_level = ?3 AND week = ?4 AND day = ?5
    "#,
  )
  .bind(program.category_id)
  .bind(slot.phase.to_string())
  .bind(program.skill_level.to_string())
  .bind(slot.week)
  .bind(slot.day)
  .fetch_optional(pool)
  .await?;

  Ok(row.map(|(id,)| id))
}

/// Exercise by id, None when it no longer exists (stale variant checks)
pub async fn try_load_exercise(
  pool: &DbPool,
  exercise_id: i64,
) -> Result<Option<Exercise>, PlannerError> {
  let row: Option<(i64, String, String, String, Option<i64>, Option<i64>)> = sqlx::query_as(
    r#"
    SELECT id, name, tags_json, equipment_json, easier_variant_id, harder_variant_id
    FROM exercises
    WHERE id = ?1
    "#,
  )
  .bind(exercise_id)
  .fetch_optional(pool)
  .await?;

  match row {
    Some((id, name, tags_json, equipment_json, easier_variant_id, harder_variant_id)) => {
      Ok(Some(Exercise {
        id,
        name,
        tags: parse_string_list(&tags_json)?,
        equipment: parse_string_list(&equipment_json)?,
        easier_variant_id,
        harder_variant_id,
      }))
    }
    None => Ok(None),
  }
}

/// Ordered exercise occurrences for a template, joined with their catalog
/// exercises.
pub async fn load_template_exercises(
  pool: &DbPool,
  template_id: i64,
) -> Result<Vec<TemplateExercise>, PlannerError> {
  let rows: Vec<(
    i64,
    String,
    String,
    String,
    Option<i64>,
    Option<i64>,
    i64,
    i64,
    i64,
    i64,
  )> = sqlx::query_as(
    r#"
    SELECT e.id, e.name, e.tags_json, e.equipment_json,
           e.easier_variant_id, e.harder_variant_id,
           te.order_index, te.base_sets, te.base_reps, te.base_rest_seconds
    FROM template_exercises te
    JOIN exercises e ON e.id = te.exercise_id
    WHERE te.template_id = ?1
    ORDER BY te.order_index
    "#,
  )
  .bind(template_id)
  .fetch_all(pool)
  .await?;

  let mut exercises = Vec::with_capacity(rows.len());
  for (
    id,
    name,
    tags_json,
    equipment_json,
    easier_variant_id,
    harder_variant_id,
    order_index,
    base_sets,
    base_reps,
    base_rest_seconds,
  ) in rows
  {
    exercises.push(TemplateExercise {
      exercise: Exercise {
        id,
        name,
        tags: parse_string_list(&tags_json)?,
        equipment: parse_string_list(&equipment_json)?,
        easier_variant_id,
        harder_variant_id,
      },
      order_index,
      base_sets,
      base_reps,
      base_rest_seconds,
    });
  }

  Ok(exercises)
}
