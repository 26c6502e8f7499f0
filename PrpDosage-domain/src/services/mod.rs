pub mod dosage;
pub mod feedback;
pub mod zone_plan;

// Domain services
// This module contains business logic implementations.

// Re-export service traits and factory functions
pub use dosage::{
    create_default_dosage_planner, plan_dosage, DosageError, DosagePlanner, DosagePlannerServiceTrait,
};
pub use feedback::concentration_feedback;

// Re-export mock service factory functions when the mock feature is enabled
#[cfg(feature = "mock")]
pub use dosage::create_mock_dosage_planner;
