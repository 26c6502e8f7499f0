// Public entities for the PRP dosage API
// This module contains data structures that are shared across the application boundary

// Calculation request and response envelopes
pub mod dosage;

// Common entities for error handling
pub mod common;

pub use common::ErrorResponse;
pub use dosage::{CalculateDosageRequest, CalculateDosageResponse};
