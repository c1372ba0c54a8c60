use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ---------------------------------------------------------------------------
/// Training Phase
/// ---------------------------------------------------------------------------

/// Macrocycle stage, strictly ordered GPP -> SPP -> SSP. The program runs
/// the three phases once; there is no wrap back to GPP after SSP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
  /// General preparation
  Gpp,
  /// Specific preparation
  Spp,
  /// Sport-specific / peaking preparation
  Ssp,
}

pub const PHASES: [Phase; 3] = [Phase::Gpp, Phase::Spp, Phase::Ssp];

/// Weeks in every phase
pub const WEEKS_PER_PHASE: i64 = 4;

impl Phase {
  pub fn index(&self) -> i64 {
    match self {
      Phase::Gpp => 0,
      Phase::Spp => 1,
      Phase::Ssp => 2,
    }
  }

  pub fn from_index(index: i64) -> Option<Self> {
    match index {
      0 => Some(Phase::Gpp),
      1 => Some(Phase::Spp),
      2 => Some(Phase::Ssp),
      _ => None,
    }
  }
}

impl std::fmt::Display for Phase {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Phase::Gpp => write!(f, "gpp"),
      Phase::Spp => write!(f, "spp"),
      Phase::Ssp => write!(f, "ssp"),
    }
  }
}

impl std::str::FromStr for Phase {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "gpp" => Ok(Phase::Gpp),
      "spp" => Ok(Phase::Spp),
      "ssp" => Ok(Phase::Ssp),
      _ => Err(format!("Unknown phase: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Age Group & Skill Level
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
  #[serde(rename = "14-17")]
  Youth,
  #[serde(rename = "18-35")]
  Adult,
  #[serde(rename = "36+")]
  Masters,
}

impl std::fmt::Display for AgeGroup {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      AgeGroup::Youth => write!(f, "14-17"),
      AgeGroup::Adult => write!(f, "18-35"),
      AgeGroup::Masters => write!(f, "36+"),
    }
  }
}

impl std::str::FromStr for AgeGroup {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "14-17" => Ok(AgeGroup::Youth),
      "18-35" => Ok(AgeGroup::Adult),
      "36+" => Ok(AgeGroup::Masters),
      _ => Err(format!("Unknown age group: {}", s)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
  Beginner,
  Intermediate,
  Advanced,
}

impl std::fmt::Display for SkillLevel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SkillLevel::Beginner => write!(f, "beginner"),
      SkillLevel::Intermediate => write!(f, "intermediate"),
      SkillLevel::Advanced => write!(f, "advanced"),
    }
  }
}

impl std::str::FromStr for SkillLevel {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "beginner" => Ok(SkillLevel::Beginner),
      "intermediate" => Ok(SkillLevel::Intermediate),
      "advanced" => Ok(SkillLevel::Advanced),
      _ => Err(format!("Unknown skill level: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Catalog Entries
/// ---------------------------------------------------------------------------

/// Immutable sport category row (seeded by migration)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SportCategory {
  pub id: i64,
  pub name: String,
  pub sports: Vec<String>,
}

/// Catalog exercise with tags/equipment driving focus detection and the
/// optional easier/harder progression references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
  pub id: i64,
  pub name: String,
  pub tags: Vec<String>,
  pub equipment: Vec<String>,
  pub easier_variant_id: Option<i64>,
  pub harder_variant_id: Option<i64>,
}

/// Template header, keyed by (category, phase, skill level, week, day)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramTemplate {
  pub id: i64,
  pub category_id: i64,
  pub phase: Phase,
  pub skill_level: SkillLevel,
  pub week: i64,
  pub day: i64,
  pub name: String,
}

/// One exercise occurrence inside a template, joined with its catalog
/// exercise. Base volumes are the authored numbers before scaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateExercise {
  pub exercise: Exercise,
  pub order_index: i64,
  pub base_sets: i64,
  pub base_reps: i64,
  pub base_rest_seconds: i64,
}

/// ---------------------------------------------------------------------------
/// Athlete & Program
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthleteProfile {
  pub id: i64,
  pub name: String,
  pub age_group: AgeGroup,
  pub years_experience: i64,
  pub created_at: Option<DateTime<Utc>>,
}

/// The athlete's active program: category/skill selection, nominal
/// schedule position, and the calendar inputs for slot mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
  pub id: i64,
  pub athlete_id: i64,
  pub category_id: i64,
  pub skill_level: SkillLevel,
  pub phase: Phase,
  pub current_week: i64,
  pub current_day: i64,
  pub start_date: chrono::NaiveDate,
  /// Weekday indices, 0 = Monday .. 6 = Sunday
  pub training_weekdays: Vec<u8>,
  pub last_workout_at: Option<DateTime<Utc>>,
  pub created_at: Option<DateTime<Utc>>,
}

impl Program {
  pub fn workouts_per_week(&self) -> i64 {
    self.training_weekdays.len() as i64
  }

  /// The nominal current-day slot from the program record
  pub fn current_slot(&self) -> crate::models::WorkoutSlot {
    crate::models::WorkoutSlot {
      phase: self.phase,
      week: self.current_week,
      day: self.current_day,
    }
  }
}
