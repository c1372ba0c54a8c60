use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AgeGroup, Phase};

/// ---------------------------------------------------------------------------
/// Session Status
/// ---------------------------------------------------------------------------

/// One-way state machine: in_progress is initial, the other two terminal
/// and mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum SessionStatus {
  #[default]
  InProgress,
  Completed,
  Abandoned,
}

impl SessionStatus {
  pub fn is_terminal(&self) -> bool {
    !matches!(self, SessionStatus::InProgress)
  }
}

impl std::fmt::Display for SessionStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SessionStatus::InProgress => write!(f, "in_progress"),
      SessionStatus::Completed => write!(f, "completed"),
      SessionStatus::Abandoned => write!(f, "abandoned"),
    }
  }
}

impl std::str::FromStr for SessionStatus {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "in_progress" => Ok(SessionStatus::InProgress),
      "completed" => Ok(SessionStatus::Completed),
      "abandoned" => Ok(SessionStatus::Abandoned),
      _ => Err(format!("Unknown session status: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Legacy Intensity
/// ---------------------------------------------------------------------------

/// Coarse effort selector kept for sessions created before scaling
/// snapshots existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
  Low,
  Moderate,
  High,
}

impl std::fmt::Display for Intensity {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Intensity::Low => write!(f, "low"),
      Intensity::Moderate => write!(f, "moderate"),
      Intensity::High => write!(f, "high"),
    }
  }
}

impl std::str::FromStr for Intensity {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "low" => Ok(Intensity::Low),
      "moderate" => Ok(Intensity::Moderate),
      "high" => Ok(Intensity::High),
      _ => Err(format!("Unknown intensity: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Scaling Snapshot
/// ---------------------------------------------------------------------------

/// Athlete state captured once at session creation and never recomputed,
/// so later reads reproduce identical prescription numbers even after the
/// profile changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingSnapshot {
  pub category_id: i64,
  pub phase: Phase,
  pub age_group: AgeGroup,
  pub years_experience: i64,
}

impl ScalingSnapshot {
  pub fn to_json(&self) -> String {
    serde_json::to_string(self).unwrap_or_default()
  }

  pub fn from_json(json: &str) -> Result<Self, String> {
    serde_json::from_str(json).map_err(|e| format!("Failed to parse scaling snapshot: {}", e))
  }
}

/// ---------------------------------------------------------------------------
/// Completion Log
/// ---------------------------------------------------------------------------

/// Per-set completion record inside a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetLog {
  pub set_number: i64,
  pub reps_completed: Option<i64>,
  pub weight_kg: Option<f64>,
  pub completed: bool,
}

impl SetLog {
  pub fn placeholder(set_number: i64) -> Self {
    Self {
      set_number,
      reps_completed: None,
      weight_kg: None,
      completed: false,
    }
  }
}

/// Per-exercise completion record inside a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseLog {
  pub exercise_id: i64,
  pub sets: Vec<SetLog>,
}

impl ExerciseLog {
  /// Empty log sized to the prescribed set count
  pub fn placeholder(exercise_id: i64, set_count: i64) -> Self {
    Self {
      exercise_id,
      sets: (1..=set_count).map(SetLog::placeholder).collect(),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Workout Session
/// ---------------------------------------------------------------------------

/// One execution attempt against a template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSession {
  pub id: i64,
  pub athlete_id: i64,
  pub program_id: i64,
  pub template_id: i64,
  pub status: SessionStatus,
  pub started_at: DateTime<Utc>,
  pub completed_at: Option<DateTime<Utc>>,
  pub duration_seconds: Option<i64>,
  pub target_intensity: Option<Intensity>,
  pub exercise_order: Option<Vec<i64>>,
  pub exercises: Vec<ExerciseLog>,
  pub scaling_snapshot: Option<ScalingSnapshot>,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
}

impl WorkoutSession {
  pub fn exercises_to_json(&self) -> String {
    serde_json::to_string(&self.exercises).unwrap_or_default()
  }

  pub fn exercises_from_json(json: &str) -> Result<Vec<ExerciseLog>, String> {
    serde_json::from_str(json).map_err(|e| format!("Failed to parse exercise log: {}", e))
  }
}
