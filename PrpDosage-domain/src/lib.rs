// PrpDosage Domain
// This crate contains the dosage planning logic for the PRP calculator

// Clinical constants
pub mod constants;

// Planner configuration and presets
pub mod config;

// Domain entities
pub mod entities;

// Services that implement business logic
pub mod services;

// Health checks and system status
pub mod health;

// Testing utilities - only available with mock feature
#[cfg(feature = "mock")]
pub mod testing;

pub use config::{ConfigError, PlannerConfig};
pub use entities::{DosagePlan, PatientInput, TreatmentPlan};
pub use services::{plan_dosage, DosageError, DosagePlannerServiceTrait};
