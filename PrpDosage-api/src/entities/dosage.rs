use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use prp_dosage_domain::entities::{
    BaseConcentrations, ConcentrationFeedback, DosagePlan, PatientInput, RangeStatus,
    RecoveryBreakdown, TreatmentPlan,
};

/// Public request model for a dosage calculation
///
/// Only `thrombocytes` is required; every other field falls back to the
/// standard protocol value when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CalculateDosageRequest {
    /// Patient thrombocytes (G/L)
    #[schema(example = 200.0)]
    pub thrombocytes: Option<f64>,

    /// PRP yield per tube (mL), default 1.0
    #[schema(example = 1.0)]
    pub prp_yield: Option<f64>,

    /// PRP concentration multiplier over baseline, default 4.0
    #[schema(example = 7.0)]
    pub prp_concentration: Option<f64>,

    /// PPP concentration multiplier over baseline, default 2.5
    #[schema(example = 0.5)]
    pub ppp_concentration: Option<f64>,

    /// Recovery rate (%), default 70
    pub recovery_rate: Option<f64>,

    /// Activation rate (%), default 20
    pub activation_rate: Option<f64>,
}

impl CalculateDosageRequest {
    /// Build the domain input, applying defaults to omitted fields
    pub fn into_patient_input(self, thrombocytes: f64) -> PatientInput {
        let defaults = PatientInput::new(thrombocytes);
        PatientInput {
            thrombocytes,
            prp_yield: self.prp_yield.unwrap_or(defaults.prp_yield),
            prp_concentration: self.prp_concentration.unwrap_or(defaults.prp_concentration),
            ppp_concentration: self.ppp_concentration.unwrap_or(defaults.ppp_concentration),
            recovery_rate: self.recovery_rate.unwrap_or(defaults.recovery_rate),
            activation_rate: self.activation_rate.unwrap_or(defaults.activation_rate),
        }
    }
}

/// Successful calculation envelope
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CalculateDosageResponse {
    /// Always true for successful calculations
    pub success: bool,
    pub data: DosageData,
}

/// Calculation results
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DosageData {
    pub input_parameters: InputParameters,
    pub calculated_concentrations: CalculatedConcentrations,
    pub concentration_feedback: ConcentrationFeedback,
    /// Whether the double-spin protocol was applied
    pub double_spin_used: bool,
    /// Plans keyed by zone (`temporal_crown`, `full_scalp`)
    pub zones: BTreeMap<String, ZonePlanResponse>,
}

/// Input values after defaults were applied
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InputParameters {
    /// Patient thrombocytes (G/L)
    pub thrombocytes_gl: f64,
    /// PRP yield per tube (mL)
    pub prp_yield_ml: f64,
    /// PRP multiplier over baseline
    pub prp_concentration_x: f64,
    /// PPP multiplier over baseline
    pub ppp_concentration_x: f64,
    pub recovery_rate: f64,
    pub activation_rate: f64,
}

/// Concentrations shared by every zone
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CalculatedConcentrations {
    /// Whole-blood platelets per µL
    pub baseline_platelets_per_ul: u64,
    /// Single-spin PRP platelets per µL
    pub final_prp_concentration_per_ul: u64,
    /// Single-spin PRP concentration in millions per µL
    pub final_prp_concentration_millions: f64,
    /// PPP platelets per µL
    pub final_ppp_concentration_per_ul: u64,
    /// Platelets in one mL of single-spin PRP
    pub platelets_per_ml_of_prp: u64,
}

/// Treatment plan for one zone
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ZonePlanResponse {
    pub zone_name: String,
    /// Whole-blood tubes to draw
    pub tubes_needed: u32,
    /// PRP tubes after processing
    pub final_tubes_needed: u32,
    pub total_prp_volume_ml: f64,
    pub total_ppp_needed_ml: f64,
    pub total_injection_volume_ml: f64,
    pub extract_volume_per_tube_ml: f64,
    /// Blended concentration in millions per µL
    pub final_mixture_concentration_millions: f64,
    pub total_platelets: u64,
    pub target_platelets: u64,
    pub min_platelets: u64,
    pub max_platelets: u64,
    pub min_volume_ml: f64,
    pub concentration_status: RangeStatus,
    pub platelet_count_status: RangeStatus,
    pub double_spin_used: bool,
    pub effective_prp_yield_ml: f64,
    /// PRP concentration used for the plan, in millions per µL
    pub effective_prp_concentration_millions: f64,
    pub recovery: RecoveryResponse,
    pub iterations: u32,
}

/// Platelet recovery and activation estimate
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecoveryResponse {
    pub effective_recovery_rate: f64,
    pub activation_rate: f64,
    pub recovered_platelets_per_ul: u64,
    pub activated_platelets_per_ul: u64,
    pub inactivated_platelets_per_ul: u64,
    pub usable_platelets: u64,
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn to_volume(value: f64) -> f64 {
    round_to(value, 1)
}

fn to_millions(per_ul: f64) -> f64 {
    round_to(per_ul / 1_000_000.0, 2)
}

fn to_count(value: f64) -> u64 {
    value.round().max(0.0) as u64
}

impl From<&DosagePlan> for CalculateDosageResponse {
    fn from(plan: &DosagePlan) -> Self {
        Self {
            success: true,
            data: DosageData {
                input_parameters: InputParameters::from(&plan.input),
                calculated_concentrations: CalculatedConcentrations::from(&plan.concentrations),
                concentration_feedback: plan.feedback.clone(),
                double_spin_used: plan.double_spin_used,
                zones: plan
                    .zones
                    .iter()
                    .map(|zone| (zone.zone.as_str().to_string(), ZonePlanResponse::from(zone)))
                    .collect(),
            },
        }
    }
}

impl From<&PatientInput> for InputParameters {
    fn from(input: &PatientInput) -> Self {
        Self {
            thrombocytes_gl: input.thrombocytes,
            prp_yield_ml: input.prp_yield,
            prp_concentration_x: input.prp_concentration,
            ppp_concentration_x: input.ppp_concentration,
            recovery_rate: input.recovery_rate,
            activation_rate: input.activation_rate,
        }
    }
}

impl From<&BaseConcentrations> for CalculatedConcentrations {
    fn from(base: &BaseConcentrations) -> Self {
        Self {
            baseline_platelets_per_ul: to_count(base.baseline_platelets_per_ul),
            final_prp_concentration_per_ul: to_count(base.final_prp_concentration_per_ul),
            final_prp_concentration_millions: round_to(base.final_prp_concentration_millions(), 2),
            final_ppp_concentration_per_ul: to_count(base.final_ppp_concentration_per_ul),
            platelets_per_ml_of_prp: to_count(base.platelets_per_ml_of_prp),
        }
    }
}

impl From<&TreatmentPlan> for ZonePlanResponse {
    fn from(plan: &TreatmentPlan) -> Self {
        Self {
            zone_name: plan.zone_name.clone(),
            tubes_needed: plan.tubes_needed,
            final_tubes_needed: plan.final_tubes_needed,
            total_prp_volume_ml: to_volume(plan.total_prp_volume_ml),
            total_ppp_needed_ml: to_volume(plan.total_ppp_needed_ml),
            total_injection_volume_ml: to_volume(plan.total_injection_volume_ml),
            extract_volume_per_tube_ml: to_volume(plan.extract_volume_per_tube_ml),
            final_mixture_concentration_millions: to_millions(plan.final_mixture_concentration_per_ul),
            total_platelets: to_count(plan.total_platelets),
            target_platelets: to_count(plan.target_platelets),
            min_platelets: to_count(plan.min_platelets),
            max_platelets: to_count(plan.max_platelets),
            min_volume_ml: to_volume(plan.min_volume_ml),
            concentration_status: plan.concentration_status,
            platelet_count_status: plan.platelet_count_status,
            double_spin_used: plan.double_spin_used,
            effective_prp_yield_ml: to_volume(plan.effective_prp_yield_ml),
            effective_prp_concentration_millions: to_millions(plan.effective_prp_concentration_per_ul),
            recovery: RecoveryResponse::from(&plan.recovery),
            iterations: plan.iterations,
        }
    }
}

impl From<&RecoveryBreakdown> for RecoveryResponse {
    fn from(recovery: &RecoveryBreakdown) -> Self {
        Self {
            effective_recovery_rate: round_to(recovery.effective_recovery_rate, 1),
            activation_rate: round_to(recovery.activation_rate, 1),
            recovered_platelets_per_ul: to_count(recovery.recovered_platelets_per_ul),
            activated_platelets_per_ul: to_count(recovery.activated_platelets_per_ul),
            inactivated_platelets_per_ul: to_count(recovery.inactivated_platelets_per_ul),
            usable_platelets: to_count(recovery.usable_platelets),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prp_dosage_domain::plan_dosage;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(2.349, 1), 2.3);
        assert_eq!(round_to(1.4567, 2), 1.46);
        assert_eq!(round_to(-0.04, 1), -0.0);
    }

    #[test]
    fn test_request_defaults() {
        let request: CalculateDosageRequest =
            serde_json::from_str(r#"{"thrombocytes": 200, "prp_concentration": 7}"#).unwrap();
        let input = request.into_patient_input(200.0);

        assert_eq!(input, PatientInput::new(200.0).with_prp_concentration(7.0));
    }

    #[test]
    fn test_response_is_rounded() {
        let plan = plan_dosage(
            PatientInput::new(237.0)
                .with_prp_yield(1.3)
                .with_prp_concentration(5.3),
        )
        .unwrap();
        let response = CalculateDosageResponse::from(&plan);
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["success"], true);
        let input = &value["data"]["input_parameters"];
        assert_eq!(input["thrombocytes_gl"], 237.0);
        assert_eq!(input["prp_yield_ml"], 1.3);
        assert_eq!(input["prp_concentration_x"], 5.3);
        assert_eq!(input["ppp_concentration_x"], 2.5);

        let concentrations = &value["data"]["calculated_concentrations"];
        assert_eq!(concentrations["baseline_platelets_per_ul"], 237_000);
        assert_eq!(concentrations["final_prp_concentration_millions"], 1.26);

        for key in ["temporal_crown", "full_scalp"] {
            let zone = &value["data"]["zones"][key];
            let volume = zone["total_injection_volume_ml"].as_f64().unwrap();
            assert_eq!(volume, round_to(volume, 1));
            assert!(zone["total_platelets"].is_u64());
        }
    }
}
