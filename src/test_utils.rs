//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Catalog, athlete, and program seeders
//! - Mock data factories

use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use crate::models::{AgeGroup, Phase, ScalingSnapshot, WorkoutSlot, PHASES, WEEKS_PER_PHASE};

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Athlete & Program Seeders
/// ---------------------------------------------------------------------------

/// Seed one athlete, returning their id
pub async fn seed_test_athlete(pool: &SqlitePool, age_group: AgeGroup, years: i64) -> i64 {
  let result = sqlx::query(
    "INSERT INTO athletes (name, age_group, years_experience) VALUES (?1, ?2, ?3)",
  )
  .bind("Test Athlete")
  .bind(age_group.to_string())
  .bind(years)
  .execute(pool)
  .await
  .expect("Failed to seed athlete");

  result.last_insert_rowid()
}

/// Seed a category-2 intermediate program starting Monday 2025-06-02 with
/// Mon/Wed/Fri training days, positioned at GPP week 1 day 1.
pub async fn seed_test_program(pool: &SqlitePool, athlete_id: i64) -> i64 {
  seed_test_program_with_weekdays(pool, athlete_id, &[0, 2, 4]).await
}

/// Same as `seed_test_program` with a custom weekday selection
pub async fn seed_test_program_with_weekdays(
  pool: &SqlitePool,
  athlete_id: i64,
  weekdays: &[u8],
) -> i64 {
  let weekdays_json = serde_json::to_string(weekdays).expect("weekdays serialize");

  let result = sqlx::query(
    r#"
    INSERT INTO programs (
      athlete_id, category_id, skill_level, phase, current_week, current_day,
      start_date, training_weekdays_json
    )
    VALUES (?1, 2, 'intermediate', 'gpp', 1, 1, '2025-06-02', ?2)
    "#,
  )
  .bind(athlete_id)
  .bind(weekdays_json)
  .execute(pool)
  .await
  .expect("Failed to seed program");

  result.last_insert_rowid()
}

/// Move a program's nominal position to the given slot
pub async fn set_program_position(pool: &SqlitePool, program_id: i64, slot: WorkoutSlot) {
  sqlx::query("UPDATE programs SET phase = ?1, current_week = ?2, current_day = ?3 WHERE id = ?4")
    .bind(slot.phase.to_string())
    .bind(slot.week)
    .bind(slot.day)
    .bind(program_id)
    .execute(pool)
    .await
    .expect("Failed to update program position");
}

/// ---------------------------------------------------------------------------
/// Catalog Seeders
/// ---------------------------------------------------------------------------

/// Seed the exercise catalog and the full category-2 intermediate template
/// grid: 3 phases x 4 weeks x 3 days, each template holding a strength, a
/// power, and a bodyweight occurrence.
pub async fn seed_test_catalog(pool: &SqlitePool) {
  // (id, name, tags, equipment, easier, harder)
  // Variants 5 and 6 are inserted before 4, which references them.
  let exercises: Vec<(i64, &str, &str, &str, Option<i64>, Option<i64>)> = vec![
    (1, "Back Squat", r#"["hinge","lower"]"#, r#"["barbell","rack"]"#, None, None),
    (2, "Bench Press", r#"["push","upper"]"#, r#"["barbell","bench"]"#, None, None),
    (3, "Power Clean", r#"["explosive","power"]"#, r#"["barbell"]"#, None, None),
    (5, "Incline Push-Up", r#"["push"]"#, r#"["bodyweight"]"#, None, None),
    (6, "Archer Push-Up", r#"["push"]"#, r#"["bodyweight"]"#, None, None),
    (7, "Plank", r#"["core"]"#, r#"[]"#, None, None),
    (4, "Push-Up", r#"["push"]"#, r#"["bodyweight"]"#, Some(5), Some(6)),
  ];

  for (id, name, tags, equipment, easier, harder) in exercises {
    sqlx::query(
      r#"
      INSERT OR REPLACE INTO exercises (id, name, tags_json, equipment_json, easier_variant_id, harder_variant_id)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6)
      "#,
    )
    .bind(id)
    .bind(name)
    .bind(tags)
    .bind(equipment)
    .bind(easier)
    .bind(harder)
    .execute(pool)
    .await
    .expect("Failed to seed exercise");
  }

  for phase in PHASES {
    for week in 1..=WEEKS_PER_PHASE {
      for day in 1..=3 {
        let result = sqlx::query(
          r#"
          INSERT INTO program_templates (category_id, phase, skill_level, week, day, name)
          VALUES (2, ?1, 'intermediate', ?2, ?3, ?4)
          "#,
        )
        .bind(phase.to_string())
        .bind(week)
        .bind(day)
        .bind(format!("Power Intermediate {} W{} D{}", phase, week, day))
        .execute(pool)
        .await
        .expect("Failed to seed template");

        let template_id = result.last_insert_rowid();

        // strength, power, bodyweight occurrence per template
        let occurrences = [(1i64, 0i64, 4i64, 8i64, 120i64), (3, 1, 3, 3, 150), (4, 2, 3, 12, 60)];
        for (exercise_id, order_index, sets, reps, rest) in occurrences {
          sqlx::query(
            r#"
            INSERT INTO template_exercises (template_id, exercise_id, order_index, base_sets, base_reps, base_rest_seconds)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
          )
          .bind(template_id)
          .bind(exercise_id)
          .bind(order_index)
          .bind(sets)
          .bind(reps)
          .bind(rest)
          .execute(pool)
          .await
          .expect("Failed to seed template exercise");
        }
      }
    }
  }
}

/// Template id at a grid position (seeded catalog only)
pub async fn template_at(pool: &SqlitePool, phase: Phase, week: i64, day: i64) -> i64 {
  let row: (i64,) = sqlx::query_as(
    r#"
    SELECT id FROM program_templates
    WHERE category_id = 2 AND skill_level = 'intermediate' AND phase = ?1 AND week = ?2 AND day = ?3
    "#,
  )
  .bind(phase.to_string())
  .bind(week)
  .bind(day)
  .fetch_one(pool)
  .await
  .expect("Template not seeded at position");

  row.0
}

/// ---------------------------------------------------------------------------
/// Session Seeders
/// ---------------------------------------------------------------------------

/// Insert a completed session for a template (yesterday, one hour long)
pub async fn seed_completed_session(
  pool: &SqlitePool,
  athlete_id: i64,
  program_id: i64,
  template_id: i64,
) -> i64 {
  let started = Utc::now() - Duration::days(1);
  let completed = started + Duration::hours(1);

  let result = sqlx::query(
    r#"
    INSERT INTO workout_sessions (
      athlete_id, program_id, template_id, status, started_at, completed_at,
      duration_seconds, exercises_json
    )
    VALUES (?1, ?2, ?3, 'completed', ?4, ?5, 3600, '[]')
    "#,
  )
  .bind(athlete_id)
  .bind(program_id)
  .bind(template_id)
  .bind(started)
  .bind(completed)
  .execute(pool)
  .await
  .expect("Failed to seed completed session");

  result.last_insert_rowid()
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// Snapshot matching the seeded test athlete/program pair
pub fn mock_scaling_snapshot() -> ScalingSnapshot {
  ScalingSnapshot {
    category_id: 2,
    phase: Phase::Gpp,
    age_group: AgeGroup::Adult,
    years_experience: 7,
  }
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('athletes', 'programs', 'program_templates', 'schedule_overrides', 'workout_sessions')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 5, "Expected 5 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_catalog_builds_full_grid() {
    let pool = setup_test_db().await;
    seed_test_catalog(&pool).await;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM program_templates")
      .fetch_one(&pool)
      .await
      .expect("Failed to count templates");
    assert_eq!(count, 36);

    let occurrence_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM template_exercises")
      .fetch_one(&pool)
      .await
      .expect("Failed to count occurrences");
    assert_eq!(occurrence_count, 108);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seeded_program_matches_snapshot_factory() {
    let pool = setup_test_db().await;
    let athlete_id = seed_test_athlete(&pool, AgeGroup::Adult, 7).await;
    let program_id = seed_test_program(&pool, athlete_id).await;

    let program = crate::catalog::load_program(&pool, athlete_id, program_id)
      .await
      .expect("program loads");
    let snapshot = mock_scaling_snapshot();
    assert_eq!(program.category_id, snapshot.category_id);
    assert_eq!(program.phase, snapshot.phase);

    teardown_test_db(pool).await;
  }
}
