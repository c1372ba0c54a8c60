pub mod catalog;
pub mod schedule;
pub mod session;

pub use catalog::{
  AgeGroup, AthleteProfile, Exercise, Phase, Program, ProgramTemplate, SkillLevel, SportCategory,
  TemplateExercise, PHASES, WEEKS_PER_PHASE,
};
pub use schedule::{ScheduleOverrideRecord, SlotOverride, WorkoutSlot};
pub use session::{
  ExerciseLog, Intensity, ScalingSnapshot, SessionStatus, SetLog, WorkoutSession,
};
