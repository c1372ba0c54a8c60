use serde::Serialize;

/// ---------------------------------------------------------------------------
/// Error Taxonomy
/// ---------------------------------------------------------------------------

/// Failure modes for every exposed operation. Mutation preconditions are
/// validated before any write, so none of these leaves partial state.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
  /// The caller's athlete id does not resolve to a profile
  #[error("Not authenticated")]
  NotAuthenticated,

  #[error("{0} not found")]
  NotFound(String),

  #[error("Authorization error: {0}")]
  Authorization(String),

  #[error("Invalid state: {0}")]
  InvalidState(String),

  /// An override points at a template that no longer exists. Resolution
  /// recovers by falling back to the slot default; this variant exists
  /// for diagnostics and is not returned by queries.
  #[error("Stale reference: {0}")]
  StaleReference(String),

  #[error("Database error: {0}")]
  Database(String),
}

impl From<sqlx::Error> for PlannerError {
  fn from(e: sqlx::Error) -> Self {
    PlannerError::Database(e.to_string())
  }
}

impl Serialize for PlannerError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}
