use serde::{Deserialize, Serialize};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use crate::constants::{defaults, units};
use crate::entities::zone::ZoneKey;

/// Patient blood values and protocol parameters for one calculation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate, PartialEq)]
pub struct PatientInput {
    /// Patient thrombocytes (G/L)
    pub thrombocytes: f64,

    /// PRP yield per tube (mL)
    #[serde(default = "default_prp_yield")]
    pub prp_yield: f64,

    /// PRP concentration multiplier over baseline
    #[serde(default = "default_prp_concentration")]
    pub prp_concentration: f64,

    /// PPP concentration multiplier over baseline
    #[serde(default = "default_ppp_concentration")]
    #[validate(range(min = 0.0, message = "PPP concentration cannot be negative"))]
    pub ppp_concentration: f64,

    /// Share of platelets recovered by centrifugation (%)
    #[serde(default = "default_recovery_rate")]
    #[validate(range(min = 0.0, max = 100.0, message = "Recovery rate must be between 0 and 100"))]
    pub recovery_rate: f64,

    /// Share of recovered platelets activated during processing (%)
    #[serde(default = "default_activation_rate")]
    #[validate(range(min = 0.0, max = 100.0, message = "Activation rate must be between 0 and 100"))]
    pub activation_rate: f64,
}

fn default_prp_yield() -> f64 {
    defaults::PRP_YIELD_ML
}

fn default_prp_concentration() -> f64 {
    defaults::PRP_CONCENTRATION_X
}

fn default_ppp_concentration() -> f64 {
    defaults::PPP_CONCENTRATION_X
}

fn default_recovery_rate() -> f64 {
    defaults::RECOVERY_RATE_PERCENT
}

fn default_activation_rate() -> f64 {
    defaults::ACTIVATION_RATE_PERCENT
}

impl PatientInput {
    /// Input with the given thrombocyte count and every optional field defaulted
    pub fn new(thrombocytes: f64) -> Self {
        Self {
            thrombocytes,
            prp_yield: defaults::PRP_YIELD_ML,
            prp_concentration: defaults::PRP_CONCENTRATION_X,
            ppp_concentration: defaults::PPP_CONCENTRATION_X,
            recovery_rate: defaults::RECOVERY_RATE_PERCENT,
            activation_rate: defaults::ACTIVATION_RATE_PERCENT,
        }
    }

    pub fn with_prp_yield(mut self, prp_yield: f64) -> Self {
        self.prp_yield = prp_yield;
        self
    }

    pub fn with_prp_concentration(mut self, prp_concentration: f64) -> Self {
        self.prp_concentration = prp_concentration;
        self
    }

    pub fn with_ppp_concentration(mut self, ppp_concentration: f64) -> Self {
        self.ppp_concentration = ppp_concentration;
        self
    }

    pub fn with_recovery_rate(mut self, recovery_rate: f64) -> Self {
        self.recovery_rate = recovery_rate;
        self
    }

    pub fn with_activation_rate(mut self, activation_rate: f64) -> Self {
        self.activation_rate = activation_rate;
        self
    }
}

/// Concentrations derived once per request and shared by every zone
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct BaseConcentrations {
    /// Whole-blood platelets per µL
    pub baseline_platelets_per_ul: f64,
    /// Single-spin PRP platelets per µL
    pub final_prp_concentration_per_ul: f64,
    /// PPP platelets per µL
    pub final_ppp_concentration_per_ul: f64,
    /// Platelets in one mL of single-spin PRP
    pub platelets_per_ml_of_prp: f64,
}

impl BaseConcentrations {
    /// Derive the shared concentrations from validated patient input
    pub fn from_input(input: &PatientInput) -> Self {
        let baseline = input.thrombocytes * units::GL_TO_PER_UL;
        let final_prp = baseline * input.prp_concentration;

        Self {
            baseline_platelets_per_ul: baseline,
            final_prp_concentration_per_ul: final_prp,
            final_ppp_concentration_per_ul: baseline * input.ppp_concentration,
            platelets_per_ml_of_prp: final_prp * units::UL_PER_ML,
        }
    }

    /// Single-spin PRP concentration in millions per µL
    pub fn final_prp_concentration_millions(&self) -> f64 {
        self.final_prp_concentration_per_ul / units::MILLION
    }
}

/// Position of a measured value relative to its target range
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum RangeStatus {
    /// Below the lower bound
    BelowMin,
    /// Within the bounds, inclusive
    Optimal,
    /// Above the upper bound
    AboveMax,
}

impl RangeStatus {
    /// Classify `value` against the inclusive range `[min, max]`
    pub fn classify(value: f64, min: f64, max: f64) -> Self {
        if value < min {
            RangeStatus::BelowMin
        } else if value > max {
            RangeStatus::AboveMax
        } else {
            RangeStatus::Optimal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RangeStatus::BelowMin => "below_min",
            RangeStatus::Optimal => "optimal",
            RangeStatus::AboveMax => "above_max",
        }
    }
}

/// How many platelets survive processing and stay available for treatment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct RecoveryBreakdown {
    /// Recovery rate after any protocol penalty (%)
    pub effective_recovery_rate: f64,
    /// Activation rate (%)
    pub activation_rate: f64,
    /// Recovered platelets per µL of baseline
    pub recovered_platelets_per_ul: f64,
    /// Recovered platelets lost to activation per µL
    pub activated_platelets_per_ul: f64,
    /// Recovered platelets still available per µL
    pub inactivated_platelets_per_ul: f64,
    /// Delivered platelets expected to be usable
    pub usable_platelets: f64,
}

/// Treatment plan for one zone
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct TreatmentPlan {
    pub zone: ZoneKey,
    pub zone_name: String,
    /// Whole-blood tubes to draw
    pub tubes_needed: u32,
    /// PRP tubes after processing
    pub final_tubes_needed: u32,
    pub total_prp_volume_ml: f64,
    pub total_ppp_needed_ml: f64,
    pub total_injection_volume_ml: f64,
    pub extract_volume_per_tube_ml: f64,
    pub final_mixture_concentration_per_ul: f64,
    pub total_platelets: f64,
    pub target_platelets: f64,
    pub min_platelets: f64,
    pub max_platelets: f64,
    pub min_volume_ml: f64,
    pub concentration_status: RangeStatus,
    pub platelet_count_status: RangeStatus,
    pub recovery: RecoveryBreakdown,
    pub double_spin_used: bool,
    /// Yield per PRP tube used by the search (mL)
    pub effective_prp_yield_ml: f64,
    /// PRP concentration used by the search (platelets/µL)
    pub effective_prp_concentration_per_ul: f64,
    /// Retries taken before the search settled
    pub iterations: u32,
}

/// Severity of the concentration feedback
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    Warning,
    Info,
    Success,
}

/// Human-readable assessment of the single-spin PRP concentration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct ConcentrationFeedback {
    #[serde(rename = "type")]
    pub feedback_type: FeedbackType,
    pub message: String,
}

/// Complete result of one dosage calculation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DosagePlan {
    /// Input after defaults were applied
    pub input: PatientInput,
    pub concentrations: BaseConcentrations,
    pub feedback: ConcentrationFeedback,
    /// Whether the double-spin protocol applies to this request
    pub double_spin_used: bool,
    /// One plan per configured zone, in zone order
    pub zones: Vec<TreatmentPlan>,
}

impl DosagePlan {
    /// Plan for a specific zone
    pub fn zone(&self, key: ZoneKey) -> Option<&TreatmentPlan> {
        self.zones.iter().find(|plan| plan.zone == key)
    }
}
