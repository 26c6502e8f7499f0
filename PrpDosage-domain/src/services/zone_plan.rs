//! Per-zone plan resolution.
//!
//! A bounded, monotone search over the tube count: every retry adds one tube
//! to the count derived from the platelet target, until the mixture satisfies
//! the concentration window, the zone platelet range and the minimum volume,
//! or the retry budget runs out.

use tracing::{debug, instrument, trace};

use crate::config::{DoubleSpinConfig, ExcessPlateletPolicy, PlannerConfig, RetryPriority};
use crate::constants::{thresholds, units};
use crate::entities::{
    BaseConcentrations, PatientInput, RangeStatus, RecoveryBreakdown, TreatmentPlan, ZoneConfig,
};

/// Slack allowed when comparing a diluted mixture against the window edges (platelets/µL)
const CONCENTRATION_TOLERANCE_PER_UL: f64 = 1e-3;

/// Processing parameters shared by every zone of one request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtocolParameters {
    pub double_spin: bool,
    /// PRP yield per processed tube (mL)
    pub prp_yield_ml: f64,
    /// PRP concentration after processing (platelets/µL)
    pub prp_concentration_per_ul: f64,
    /// PPP concentration (platelets/µL)
    pub ppp_concentration_per_ul: f64,
    pub baseline_platelets_per_ul: f64,
    /// Recovery rate after any protocol penalty (%)
    pub recovery_rate: f64,
    pub activation_rate: f64,
    /// Whole-blood tubes drawn per PRP tube
    pub blood_tubes_per_prp_tube: u32,
}

impl ProtocolParameters {
    /// Pick single- or double-spin parameters from the single-spin concentration
    pub fn resolve(input: &PatientInput, base: &BaseConcentrations, double_spin: &DoubleSpinConfig) -> Self {
        let use_double_spin = double_spin.enabled
            && base.final_prp_concentration_per_ul < double_spin.min_concentration_threshold;

        if use_double_spin {
            // Rescale the single-spin concentration to the double-spin multiplier
            let rescale = double_spin.concentration_multiplier / input.prp_concentration;
            Self {
                double_spin: true,
                prp_yield_ml: double_spin.prp_yield_per_tube_ml,
                prp_concentration_per_ul: base.final_prp_concentration_per_ul * rescale,
                ppp_concentration_per_ul: base.final_ppp_concentration_per_ul,
                baseline_platelets_per_ul: base.baseline_platelets_per_ul,
                recovery_rate: input.recovery_rate * (1.0 - double_spin.recovery_penalty_percent / 100.0),
                activation_rate: input.activation_rate,
                blood_tubes_per_prp_tube: double_spin.blood_tubes_per_prp_tube.max(1),
            }
        } else {
            Self {
                double_spin: false,
                prp_yield_ml: input.prp_yield,
                prp_concentration_per_ul: base.final_prp_concentration_per_ul,
                ppp_concentration_per_ul: base.final_ppp_concentration_per_ul,
                baseline_platelets_per_ul: base.baseline_platelets_per_ul,
                recovery_rate: input.recovery_rate,
                activation_rate: input.activation_rate,
                blood_tubes_per_prp_tube: 1,
            }
        }
    }

    fn recovery_factor(&self) -> f64 {
        self.recovery_rate / 100.0
    }

    fn usable_factor(&self) -> f64 {
        self.recovery_factor() * (1.0 - self.activation_rate / 100.0)
    }
}

/// One evaluated tube count
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    tubes: u32,
    prp_ml: f64,
    ppp_ml: f64,
    concentration_per_ul: f64,
    total_platelets: f64,
}

impl Candidate {
    fn injection_volume_ml(&self) -> f64 {
        self.prp_ml + self.ppp_ml
    }
}

/// Why the search takes another step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryReason {
    ConcentrationBelowWindow,
    PlateletsBelowTarget,
    ExcessPlatelets,
    VolumeBelowMinimum,
}

/// Resolve the treatment plan for one zone
#[instrument(level = "debug", skip_all, fields(zone = %zone.key))]
pub fn resolve_zone_plan(zone: &ZoneConfig, protocol: &ProtocolParameters, config: &PlannerConfig) -> TreatmentPlan {
    ZonePlanner::new(zone, protocol, config).resolve()
}

struct ZonePlanner<'a> {
    zone: &'a ZoneConfig,
    protocol: &'a ProtocolParameters,
    config: &'a PlannerConfig,
    /// Platelet minimum the search aims for
    min_target: f64,
}

impl<'a> ZonePlanner<'a> {
    fn new(zone: &'a ZoneConfig, protocol: &'a ProtocolParameters, config: &'a PlannerConfig) -> Self {
        let recovery = protocol.recovery_factor();
        let min_target = if config.adjust_min_for_recovery && recovery > 0.0 {
            zone.min_platelets / recovery
        } else {
            zone.min_platelets
        };

        Self {
            zone,
            protocol,
            config,
            min_target,
        }
    }

    /// Tube count that just covers the platelet target
    fn base_tubes(&self) -> u32 {
        let optimal_prp_volume_ml = self.min_target / (self.protocol.prp_concentration_per_ul * units::UL_PER_ML);
        let tubes = (optimal_prp_volume_ml / self.protocol.prp_yield_ml).ceil();
        if tubes.is_finite() && tubes > 0.0 {
            tubes as u32
        } else {
            0
        }
    }

    fn resolve(&self) -> TreatmentPlan {
        let base_tubes = self.base_tubes();
        let mut iteration = 0;

        let candidate = loop {
            let final_pass = iteration >= self.config.max_iterations;
            let tubes = base_tubes.saturating_add(iteration).max(1);
            let candidate = self.evaluate(tubes, final_pass);

            if final_pass {
                debug!(iteration, tubes, "retry budget exhausted");
                break candidate;
            }

            match self.retry_reason(&candidate) {
                Some(reason) => {
                    debug!(iteration, tubes, ?reason, "adding a tube");
                    iteration += 1;
                }
                None => break candidate,
            }
        };

        self.into_plan(candidate, iteration)
    }

    /// PRP and PPP volumes for a tube count
    fn evaluate(&self, tubes: u32, force_top_up: bool) -> Candidate {
        let protocol = self.protocol;
        let prp_ml = f64::from(tubes) * protocol.prp_yield_ml;
        let prp_conc = protocol.prp_concentration_per_ul;
        let ppp_conc = protocol.ppp_concentration_per_ul;

        let ppp_ml = if prp_ml >= self.zone.min_volume_ml {
            if prp_conc > thresholds::OPTIMAL_MAX_PLATELETS_PER_UL {
                dilution_volume_ml(prp_ml, prp_conc, ppp_conc)
            } else {
                0.0
            }
        } else {
            let top_up_ml = self.zone.min_volume_ml - prp_ml;
            let (blended, _) = mix(prp_ml, prp_conc, top_up_ml, ppp_conc);
            if force_top_up || blended >= thresholds::OPTIMAL_MIN_PLATELETS_PER_UL - CONCENTRATION_TOLERANCE_PER_UL {
                top_up_ml
            } else {
                trace!(tubes, blended, "top-up would leave the window, deferring");
                0.0
            }
        };

        let (concentration_per_ul, total_platelets) = mix(prp_ml, prp_conc, ppp_ml, ppp_conc);

        Candidate {
            tubes,
            prp_ml,
            ppp_ml,
            concentration_per_ul,
            total_platelets,
        }
    }

    fn retry_reason(&self, candidate: &Candidate) -> Option<RetryReason> {
        let ordered = match self.config.retry_priority {
            RetryPriority::ConcentrationFirst => [
                RetryReason::ConcentrationBelowWindow,
                RetryReason::PlateletsBelowTarget,
            ],
            RetryPriority::PlateletCountFirst => [
                RetryReason::PlateletsBelowTarget,
                RetryReason::ConcentrationBelowWindow,
            ],
        };

        ordered
            .into_iter()
            .chain([RetryReason::ExcessPlatelets, RetryReason::VolumeBelowMinimum])
            .find(|reason| self.applies(*reason, candidate))
    }

    fn applies(&self, reason: RetryReason, candidate: &Candidate) -> bool {
        match reason {
            RetryReason::ConcentrationBelowWindow => {
                candidate.concentration_per_ul
                    < thresholds::OPTIMAL_MIN_PLATELETS_PER_UL - CONCENTRATION_TOLERANCE_PER_UL
            }
            RetryReason::PlateletsBelowTarget => candidate.total_platelets < self.min_target,
            RetryReason::ExcessPlatelets => {
                if candidate.total_platelets <= self.zone.max_platelets || candidate.tubes <= 1 {
                    return false;
                }
                let fewer = self.evaluate(candidate.tubes - 1, false);
                let fewer_meets_minimum = fewer.total_platelets >= self.min_target;
                match self.config.excess_policy {
                    ExcessPlateletPolicy::KeepCurrent => {
                        debug!(
                            tubes = candidate.tubes,
                            fewer_meets_minimum, "platelets above zone maximum, keeping tube count"
                        );
                        false
                    }
                    ExcessPlateletPolicy::LegacyRetry => fewer_meets_minimum,
                }
            }
            RetryReason::VolumeBelowMinimum => candidate.injection_volume_ml() < self.zone.min_volume_ml,
        }
    }

    fn into_plan(&self, candidate: Candidate, iterations: u32) -> TreatmentPlan {
        let zone = self.zone;
        let protocol = self.protocol;
        let total_injection_volume_ml = candidate.injection_volume_ml();
        let tubes_needed = candidate.tubes.saturating_mul(protocol.blood_tubes_per_prp_tube);

        let recovered = protocol.baseline_platelets_per_ul * protocol.recovery_factor();
        let activated = recovered * (protocol.activation_rate / 100.0);

        TreatmentPlan {
            zone: zone.key,
            zone_name: zone.name.to_string(),
            tubes_needed,
            final_tubes_needed: candidate.tubes,
            total_prp_volume_ml: candidate.prp_ml,
            total_ppp_needed_ml: candidate.ppp_ml,
            total_injection_volume_ml,
            extract_volume_per_tube_ml: total_injection_volume_ml / f64::from(tubes_needed),
            final_mixture_concentration_per_ul: candidate.concentration_per_ul,
            total_platelets: candidate.total_platelets,
            target_platelets: zone.target_platelets,
            min_platelets: zone.min_platelets,
            max_platelets: zone.max_platelets,
            min_volume_ml: zone.min_volume_ml,
            concentration_status: RangeStatus::classify(
                candidate.concentration_per_ul,
                thresholds::OPTIMAL_MIN_PLATELETS_PER_UL - CONCENTRATION_TOLERANCE_PER_UL,
                thresholds::OPTIMAL_MAX_PLATELETS_PER_UL + CONCENTRATION_TOLERANCE_PER_UL,
            ),
            platelet_count_status: RangeStatus::classify(
                candidate.total_platelets,
                zone.min_platelets,
                zone.max_platelets,
            ),
            recovery: RecoveryBreakdown {
                effective_recovery_rate: protocol.recovery_rate,
                activation_rate: protocol.activation_rate,
                recovered_platelets_per_ul: recovered,
                activated_platelets_per_ul: activated,
                inactivated_platelets_per_ul: recovered * (1.0 - protocol.activation_rate / 100.0),
                usable_platelets: candidate.total_platelets * protocol.usable_factor(),
            },
            double_spin_used: protocol.double_spin,
            effective_prp_yield_ml: protocol.prp_yield_ml,
            effective_prp_concentration_per_ul: protocol.prp_concentration_per_ul,
            iterations,
        }
    }
}

/// PPP volume that brings `prp_ml` of PRP down to the top of the window
fn dilution_volume_ml(prp_ml: f64, prp_conc: f64, ppp_conc: f64) -> f64 {
    let max = thresholds::OPTIMAL_MAX_PLATELETS_PER_UL;
    let denominator = max - ppp_conc;
    if denominator > 0.0 {
        prp_ml * (prp_conc - max) / denominator
    } else {
        0.0
    }
}

/// Concentration (platelets/µL) and platelet count of a PRP/PPP blend
fn mix(prp_ml: f64, prp_conc: f64, ppp_ml: f64, ppp_conc: f64) -> (f64, f64) {
    let volume_ml = prp_ml + ppp_ml;
    if volume_ml <= 0.0 {
        return (0.0, 0.0);
    }
    let platelet_ml_per_ul = prp_ml * prp_conc + ppp_ml * ppp_conc;
    (platelet_ml_per_ul / volume_ml, platelet_ml_per_ul * units::UL_PER_ML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{FULL_SCALP, TEMPORAL_CROWN};

    fn protocol_for(input: PatientInput) -> ProtocolParameters {
        let base = BaseConcentrations::from_input(&input);
        ProtocolParameters::resolve(&input, &base, &DoubleSpinConfig::default())
    }

    #[test]
    fn test_single_spin_when_concentration_is_sufficient() {
        let protocol = protocol_for(PatientInput::new(200.0).with_prp_concentration(7.0));
        assert!(!protocol.double_spin);
        assert_eq!(protocol.prp_yield_ml, 1.0);
        assert_eq!(protocol.prp_concentration_per_ul, 1_400_000.0);
        assert_eq!(protocol.recovery_rate, 70.0);
        assert_eq!(protocol.blood_tubes_per_prp_tube, 1);
    }

    #[test]
    fn test_double_spin_parameters() {
        let protocol = protocol_for(PatientInput::new(100.0).with_prp_concentration(4.0));
        assert!(protocol.double_spin);
        assert_eq!(protocol.prp_yield_ml, 2.0);
        assert!((protocol.prp_concentration_per_ul - 700_000.0).abs() < 1e-6);
        assert!((protocol.recovery_rate - 56.0).abs() < 1e-9);
        assert_eq!(protocol.blood_tubes_per_prp_tube, 2);
    }

    #[test]
    fn test_disabled_double_spin_keeps_single_spin() {
        let input = PatientInput::new(100.0);
        let base = BaseConcentrations::from_input(&input);
        let config = DoubleSpinConfig {
            enabled: false,
            ..DoubleSpinConfig::default()
        };
        let protocol = ProtocolParameters::resolve(&input, &base, &config);
        assert!(!protocol.double_spin);
        assert_eq!(protocol.prp_concentration_per_ul, 400_000.0);
    }

    #[test]
    fn test_dilution_settles_at_window_maximum() {
        let ppp_ml = dilution_volume_ml(1.0, 3_500_000.0, 1_250_000.0);
        assert!((ppp_ml - 8.0).abs() < 1e-9);

        let (concentration, _) = mix(1.0, 3_500_000.0, ppp_ml, 1_250_000.0);
        assert!((concentration - thresholds::OPTIMAL_MAX_PLATELETS_PER_UL).abs() < 1e-6);
    }

    #[test]
    fn test_no_dilution_when_ppp_is_too_rich() {
        assert_eq!(dilution_volume_ml(2.0, 3_000_000.0, 1_600_000.0), 0.0);
    }

    #[test]
    fn test_scenario_without_dilution() {
        let protocol = protocol_for(
            PatientInput::new(200.0)
                .with_prp_concentration(7.0)
                .with_ppp_concentration(0.5),
        );
        let plan = resolve_zone_plan(&TEMPORAL_CROWN, &protocol, &PlannerConfig::canonical());

        assert_eq!(plan.tubes_needed, 2);
        assert_eq!(plan.total_prp_volume_ml, 2.0);
        assert_eq!(plan.total_ppp_needed_ml, 0.0);
        assert_eq!(plan.concentration_status, RangeStatus::Optimal);
        assert_eq!(plan.platelet_count_status, RangeStatus::AboveMax);
        assert_eq!(plan.iterations, 0);
    }

    #[test]
    fn test_top_up_reaches_minimum_volume() {
        // 3.5M/µL PRP, 1.25M/µL PPP; one tube covers the platelet minimum
        let protocol = protocol_for(PatientInput::new(500.0).with_prp_concentration(7.0));
        let plan = resolve_zone_plan(&TEMPORAL_CROWN, &protocol, &PlannerConfig::canonical());

        assert_eq!(plan.tubes_needed, 1);
        assert_eq!(plan.total_prp_volume_ml, 1.0);
        assert!((plan.total_ppp_needed_ml - 1.0).abs() < 1e-9);
        assert!((plan.total_injection_volume_ml - 2.0).abs() < 1e-9);
        assert!(plan.final_mixture_concentration_per_ul < protocol.prp_concentration_per_ul);
    }

    #[test]
    fn test_low_concentration_exhausts_budget_and_keeps_volume_floor() {
        // 0.7M/µL after double spin can never reach the window
        let protocol = protocol_for(PatientInput::new(100.0).with_ppp_concentration(0.5));
        let config = PlannerConfig::canonical();
        let plan = resolve_zone_plan(&FULL_SCALP, &protocol, &config);

        assert_eq!(plan.iterations, config.max_iterations);
        assert_eq!(plan.concentration_status, RangeStatus::BelowMin);
        assert!(plan.total_injection_volume_ml >= FULL_SCALP.min_volume_ml);
        assert_eq!(plan.tubes_needed, plan.final_tubes_needed * 2);
    }

    #[test]
    fn test_forced_top_up_on_final_pass() {
        // One 1.5 mL tube of 1.1M/µL PRP; topping up with empty PPP would leave the window
        let protocol = ProtocolParameters {
            double_spin: false,
            prp_yield_ml: 1.5,
            prp_concentration_per_ul: 1_100_000.0,
            ppp_concentration_per_ul: 0.0,
            baseline_platelets_per_ul: 275_000.0,
            recovery_rate: 70.0,
            activation_rate: 20.0,
            blood_tubes_per_prp_tube: 1,
        };

        let no_retries = PlannerConfig {
            max_iterations: 0,
            ..PlannerConfig::canonical()
        };
        let plan = resolve_zone_plan(&TEMPORAL_CROWN, &protocol, &no_retries);
        assert_eq!(plan.final_tubes_needed, 1);
        assert!((plan.total_ppp_needed_ml - 0.5).abs() < 1e-9);
        assert!((plan.total_injection_volume_ml - TEMPORAL_CROWN.min_volume_ml).abs() < 1e-9);

        // With retries left the shortfall is fixed by another tube instead
        let plan = resolve_zone_plan(&TEMPORAL_CROWN, &protocol, &PlannerConfig::canonical());
        assert_eq!(plan.final_tubes_needed, 2);
        assert_eq!(plan.total_ppp_needed_ml, 0.0);
        assert_eq!(plan.iterations, 1);
    }

    #[test]
    fn test_recovery_adjusted_target_needs_more_tubes() {
        let protocol = protocol_for(
            PatientInput::new(250.0)
                .with_prp_concentration(6.0)
                .with_ppp_concentration(0.5),
        );
        let canonical = resolve_zone_plan(&FULL_SCALP, &protocol, &PlannerConfig::canonical());
        let adjusted = resolve_zone_plan(
            &FULL_SCALP,
            &protocol,
            &PlannerConfig {
                adjust_min_for_recovery: true,
                ..PlannerConfig::canonical()
            },
        );

        assert!(adjusted.final_tubes_needed > canonical.final_tubes_needed);
    }

    #[test]
    fn test_recovery_breakdown() {
        let protocol = protocol_for(PatientInput::new(200.0).with_prp_concentration(7.0));
        let plan = resolve_zone_plan(&TEMPORAL_CROWN, &protocol, &PlannerConfig::canonical());
        let recovery = plan.recovery;

        assert!((recovery.recovered_platelets_per_ul - 140_000.0).abs() < 1e-6);
        assert!((recovery.activated_platelets_per_ul - 28_000.0).abs() < 1e-6);
        assert!((recovery.inactivated_platelets_per_ul - 112_000.0).abs() < 1e-6);
        assert!((recovery.usable_platelets - plan.total_platelets * 0.56).abs() < 1.0);
    }

    #[test]
    fn test_excess_platelet_policies() {
        // Two tubes of 1.2M/µL exceed the temporal maximum; one tube topped up with
        // 1.0M/µL PPP still meets the minimum
        let protocol = ProtocolParameters {
            double_spin: false,
            prp_yield_ml: 1.0,
            prp_concentration_per_ul: 1_200_000.0,
            ppp_concentration_per_ul: 1_000_000.0,
            baseline_platelets_per_ul: 300_000.0,
            recovery_rate: 70.0,
            activation_rate: 20.0,
            blood_tubes_per_prp_tube: 1,
        };

        let keep = resolve_zone_plan(&TEMPORAL_CROWN, &protocol, &PlannerConfig::canonical());
        assert_eq!(keep.iterations, 0);
        assert_eq!(keep.final_tubes_needed, 2);
        assert_eq!(keep.platelet_count_status, RangeStatus::AboveMax);

        let retry_config = PlannerConfig {
            excess_policy: ExcessPlateletPolicy::LegacyRetry,
            ..PlannerConfig::canonical()
        };
        let retry = resolve_zone_plan(&TEMPORAL_CROWN, &protocol, &retry_config);
        assert!(retry.iterations >= 1);
        assert_eq!(retry.iterations, retry_config.max_iterations);
        assert!(retry.final_tubes_needed > keep.final_tubes_needed);
        assert_eq!(retry.final_tubes_needed, 5);
    }

    #[test]
    fn test_retry_priority_does_not_change_plans() {
        let concentration_first = PlannerConfig::canonical();
        let platelet_count_first = PlannerConfig {
            retry_priority: RetryPriority::PlateletCountFirst,
            ..PlannerConfig::canonical()
        };

        for thrombocytes in [60.0, 150.0, 240.0, 420.0] {
            for prp_concentration in [2.0, 4.5, 7.0] {
                let protocol = protocol_for(
                    PatientInput::new(thrombocytes)
                        .with_prp_concentration(prp_concentration)
                        .with_ppp_concentration(0.5),
                );
                for zone in [&TEMPORAL_CROWN, &FULL_SCALP] {
                    assert_eq!(
                        resolve_zone_plan(zone, &protocol, &concentration_first),
                        resolve_zone_plan(zone, &protocol, &platelet_count_first),
                    );
                }
            }
        }
    }

    #[test]
    fn test_mix_of_nothing_is_empty() {
        assert_eq!(mix(0.0, 1_000_000.0, 0.0, 0.0), (0.0, 0.0));
    }
}
