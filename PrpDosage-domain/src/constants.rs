//! Clinical constants used by the dosage planner
//!
//! All concentrations are expressed in platelets per microliter (µL) unless the
//! name says otherwise. Platelet counts are absolute numbers of platelets.

/// Therapeutic window for the final injectable mixture
pub mod thresholds {
    /// Lower bound of the optimal mixture concentration (platelets/µL)
    pub const OPTIMAL_MIN_PLATELETS_PER_UL: f64 = 1_000_000.0;

    /// Upper bound of the optimal mixture concentration (platelets/µL)
    pub const OPTIMAL_MAX_PLATELETS_PER_UL: f64 = 1_500_000.0;
}

/// Unit conversion factors for the fixed formula set
pub mod units {
    /// G/L to platelets/µL
    pub const GL_TO_PER_UL: f64 = 1_000.0;

    /// Microliters in one milliliter
    pub const UL_PER_ML: f64 = 1_000.0;

    /// Scale used when reporting concentrations in millions/µL
    pub const MILLION: f64 = 1_000_000.0;
}

/// Second centrifugation protocol parameters
pub mod double_spin {
    /// Single-spin PRP concentration below which double spin is used
    pub const MIN_CONCENTRATION_THRESHOLD: f64 = 1_000_000.0;

    /// Concentration multiplier applied to the baseline after the second spin
    pub const CONCENTRATION_MULTIPLIER: f64 = 7.0;

    /// PRP yield per final tube after the second spin (mL)
    pub const PRP_YIELD_PER_TUBE_ML: f64 = 2.0;

    /// Recovery loss caused by the second spin, in percent of the recovery rate
    pub const RECOVERY_PENALTY_PERCENT: f64 = 20.0;

    /// Whole-blood tubes consumed per final PRP tube
    pub const BLOOD_TUBES_PER_PRP_TUBE: u32 = 2;
}

/// Defaults for optional request fields
pub mod defaults {
    /// PRP yield per tube (mL)
    pub const PRP_YIELD_ML: f64 = 1.0;

    /// PRP concentration multiplier
    pub const PRP_CONCENTRATION_X: f64 = 4.0;

    /// PPP concentration multiplier
    pub const PPP_CONCENTRATION_X: f64 = 2.5;

    /// Platelet recovery rate (%)
    pub const RECOVERY_RATE_PERCENT: f64 = 70.0;

    /// Platelet activation rate (%)
    pub const ACTIVATION_RATE_PERCENT: f64 = 20.0;
}

/// Search bounds for zone plan resolution
pub mod search {
    /// Retry budget for the tube-count search
    pub const MAX_PLAN_ITERATIONS: u32 = 3;

    /// Retry budget used by the earliest planner revision
    pub const LEGACY_MAX_PLAN_ITERATIONS: u32 = 5;

    /// Largest retry budget accepted from configuration
    pub const MAX_ITERATIONS_CEILING: u32 = 50;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_is_ordered() {
        assert!(thresholds::OPTIMAL_MIN_PLATELETS_PER_UL < thresholds::OPTIMAL_MAX_PLATELETS_PER_UL);
    }

    #[test]
    fn test_double_spin_threshold_matches_window_floor() {
        assert_eq!(
            double_spin::MIN_CONCENTRATION_THRESHOLD,
            thresholds::OPTIMAL_MIN_PLATELETS_PER_UL
        );
    }
}
