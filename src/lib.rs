//! Multi-phase training program personalization.
//!
//! Resolves athlete-specific exercise prescriptions from the
//! category/phase rules matrix and lets the athlete reorder, swap, or
//! jump ahead in their schedule without corrupting the template catalog
//! or losing completion history. Operations are plain async functions
//! over the pool; the presentation layer calls them in-process.

pub mod calendar;
pub mod cascade;
pub mod catalog;
pub mod db;
pub mod error;
pub mod models;
pub mod scaling;
pub mod schedule;
pub mod session;

#[cfg(test)]
mod test_utils;

pub use db::{init_logging, initialize_db, AppState, DbPool};
pub use error::PlannerError;
