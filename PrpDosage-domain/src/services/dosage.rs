use thiserror::Error;
use tracing::{debug, error, info, instrument};
use validator::Validate;

use crate::config::PlannerConfig;
use crate::entities::{BaseConcentrations, DosagePlan, PatientInput, TreatmentPlan, ZONES};
use crate::services::feedback::concentration_feedback;
use crate::services::zone_plan::{resolve_zone_plan, ProtocolParameters};

/// Dosage planning errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DosageError {
    /// Thrombocyte count missing, zero, negative or not a number
    #[error("Patient thrombocytes must be greater than 0")]
    InvalidThrombocytes,

    /// PRP yield per tube not positive
    #[error("PRP yield per tube must be greater than 0")]
    InvalidYield,

    /// Concentration multiplier out of range
    #[error("{message}")]
    InvalidConcentration { field: &'static str, message: String },

    /// Recovery or activation rate outside [0, 100]
    #[error("{message}")]
    InvalidRate { field: &'static str, message: String },

    /// The calculation produced an unusable result
    #[error("Calculation error: {0}")]
    Internal(String),
}

impl DosageError {
    /// Request field the error refers to
    pub fn field(&self) -> Option<&'static str> {
        match self {
            DosageError::InvalidThrombocytes => Some("thrombocytes"),
            DosageError::InvalidYield => Some("prp_yield"),
            DosageError::InvalidConcentration { field, .. } | DosageError::InvalidRate { field, .. } => Some(field),
            DosageError::Internal(_) => None,
        }
    }

    /// Whether the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        !matches!(self, DosageError::Internal(_))
    }
}

/// Trait for dosage planning operations
pub trait DosagePlannerServiceTrait {
    /// Validate patient input before planning
    fn validate_input(&self, input: &PatientInput) -> Result<(), DosageError>;

    /// Compute the treatment plan for every zone
    fn plan_dosage(&self, input: PatientInput) -> Result<DosagePlan, DosageError>;

    /// Active planner configuration
    fn config(&self) -> PlannerConfig;
}

/// Dosage planner with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct DosagePlanner {
    config: PlannerConfig,
}

impl DosagePlanner {
    /// Create a planner with the given configuration
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }
}

impl DosagePlannerServiceTrait for DosagePlanner {
    fn validate_input(&self, input: &PatientInput) -> Result<(), DosageError> {
        if !(input.thrombocytes > 0.0 && input.thrombocytes.is_finite()) {
            return Err(DosageError::InvalidThrombocytes);
        }

        if !(input.prp_yield > 0.0 && input.prp_yield.is_finite()) {
            return Err(DosageError::InvalidYield);
        }

        if !(input.prp_concentration > 0.0 && input.prp_concentration.is_finite()) {
            return Err(DosageError::InvalidConcentration {
                field: "prp_concentration",
                message: "PRP concentration must be greater than 0".to_string(),
            });
        }

        // Range rules declared on the entity
        if let Err(validation_errors) = input.validate() {
            let field_errors = validation_errors.field_errors();
            for field in ["ppp_concentration", "recovery_rate", "activation_rate"] {
                if let Some(errors) = field_errors.get(field) {
                    let message = errors
                        .iter()
                        .filter_map(|err| err.message.as_ref().map(|msg| msg.to_string()))
                        .next()
                        .unwrap_or_else(|| format!("Invalid {}", field));
                    return Err(field_error(field, message));
                }
            }
            return Err(DosageError::Internal(validation_errors.to_string()));
        }

        for (field, value) in [
            ("ppp_concentration", input.ppp_concentration),
            ("recovery_rate", input.recovery_rate),
            ("activation_rate", input.activation_rate),
        ] {
            if !value.is_finite() {
                return Err(field_error(field, format!("{} must be a finite number", field)));
            }
        }

        Ok(())
    }

    #[instrument(skip(self), fields(thrombocytes = input.thrombocytes))]
    fn plan_dosage(&self, input: PatientInput) -> Result<DosagePlan, DosageError> {
        self.validate_input(&input)?;

        let concentrations = BaseConcentrations::from_input(&input);
        let protocol = ProtocolParameters::resolve(&input, &concentrations, &self.config.double_spin);

        if protocol.double_spin {
            info!(
                initial_concentration = concentrations.final_prp_concentration_per_ul,
                "Single-spin PRP below threshold, using double-spin protocol"
            );
        }

        let zones: Vec<TreatmentPlan> = ZONES
            .iter()
            .map(|zone| resolve_zone_plan(zone, &protocol, &self.config))
            .collect();

        for plan in &zones {
            ensure_finite(plan)?;
            debug!(
                zone = %plan.zone,
                tubes = plan.tubes_needed,
                volume_ml = plan.total_injection_volume_ml,
                concentration = ?plan.concentration_status,
                platelets = ?plan.platelet_count_status,
                "Zone plan resolved"
            );
        }

        let feedback = concentration_feedback(
            concentrations.final_prp_concentration_per_ul,
            self.config.double_spin.enabled,
        );

        Ok(DosagePlan {
            input,
            concentrations,
            feedback,
            double_spin_used: protocol.double_spin,
            zones,
        })
    }

    fn config(&self) -> PlannerConfig {
        self.config
    }
}

fn field_error(field: &'static str, message: String) -> DosageError {
    match field {
        "recovery_rate" | "activation_rate" => DosageError::InvalidRate { field, message },
        _ => DosageError::InvalidConcentration { field, message },
    }
}

/// Reject plans whose arithmetic overflowed
fn ensure_finite(plan: &TreatmentPlan) -> Result<(), DosageError> {
    let values = [
        plan.total_prp_volume_ml,
        plan.total_ppp_needed_ml,
        plan.total_injection_volume_ml,
        plan.extract_volume_per_tube_ml,
        plan.final_mixture_concentration_per_ul,
        plan.total_platelets,
    ];

    if values.iter().all(|value| value.is_finite()) {
        Ok(())
    } else {
        error!(zone = %plan.zone, "Zone plan contains non-finite values");
        Err(DosageError::Internal(format!(
            "plan for zone {} could not be computed",
            plan.zone
        )))
    }
}

/// Plan a dosage with the canonical configuration
pub fn plan_dosage(input: PatientInput) -> Result<DosagePlan, DosageError> {
    DosagePlanner::default().plan_dosage(input)
}

/// Create the planner used by the application
pub fn create_default_dosage_planner(config: PlannerConfig) -> impl DosagePlannerServiceTrait + Send + Sync {
    DosagePlanner::new(config)
}

/// Create a mock planner for testing
/// This function is only available when the mock feature is enabled
#[cfg(feature = "mock")]
pub fn create_mock_dosage_planner() -> impl DosagePlannerServiceTrait + Send + Sync {
    crate::testing::MockDosagePlanner::new()
}
