// Domain entities and value objects
pub mod dosage;
pub mod zone;

// Re-export common types for easier imports
pub use dosage::{
    BaseConcentrations, ConcentrationFeedback, DosagePlan, FeedbackType, PatientInput, RangeStatus,
    RecoveryBreakdown, TreatmentPlan,
};
pub use zone::{ZoneConfig, ZoneKey, FULL_SCALP, TEMPORAL_CROWN, ZONES};
