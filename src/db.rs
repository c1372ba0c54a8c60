use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::env;

use crate::error::PlannerError;

pub type DbPool = SqlitePool;

/// Application state holding the database connection pool
pub struct AppState {
  pub db: DbPool,
}

const DB_PATH_ENV: &str = "PHASE_PLANNER_DB_PATH";
const DEFAULT_DB_PATH: &str = "phase-planner.db";

/// Resolve the database file path from the environment (.env supported),
/// falling back to a file in the working directory.
pub fn db_path() -> String {
  dotenvy::dotenv().ok();
  env::var(DB_PATH_ENV).unwrap_or_else(|_| DEFAULT_DB_PATH.to_string())
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db() -> Result<DbPool, PlannerError> {
  let path = db_path();
  let db_url = format!("sqlite://{}?mode=rwc", path);

  tracing::info!(path = %path, "initializing database");

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .map_err(|e| PlannerError::Database(e.to_string()))?;

  tracing::info!("database ready");

  Ok(pool)
}

/// Install the tracing subscriber. The embedding shell calls this once at
/// startup; repeated calls are no-ops.
pub fn init_logging() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .try_init();
}
