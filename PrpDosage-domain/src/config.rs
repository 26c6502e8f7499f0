//! Planner configuration.
//!
//! The search behaviour that differed between planner revisions (retry budget,
//! retry priority, excess-platelet handling, recovery-adjusted targets) is kept
//! here as data so each revision can be expressed as a preset.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{double_spin, search};

/// Configuration errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Unknown preset name
    #[error("Unknown planner preset: {0}")]
    UnknownPreset(String),

    /// A value could not be parsed
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Which retry rule is reported first when both targets are missed
///
/// Both rules add one tube, so the priority never changes the resulting plan.
/// It only selects the reason logged for each retry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetryPriority {
    /// Concentration window before platelet count
    ConcentrationFirst,
    /// Platelet count before concentration window
    PlateletCountFirst,
}

/// What to do when a plan delivers more platelets than the zone maximum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExcessPlateletPolicy {
    /// Keep the current tube count
    KeepCurrent,
    /// Retry when one fewer tube would still meet the minimum
    LegacyRetry,
}

/// Double-spin protocol settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DoubleSpinConfig {
    pub enabled: bool,
    /// Single-spin concentration (platelets/µL) below which double spin applies
    pub min_concentration_threshold: f64,
    pub concentration_multiplier: f64,
    pub prp_yield_per_tube_ml: f64,
    /// Recovery loss in percent of the recovery rate
    pub recovery_penalty_percent: f64,
    pub blood_tubes_per_prp_tube: u32,
}

impl Default for DoubleSpinConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_concentration_threshold: double_spin::MIN_CONCENTRATION_THRESHOLD,
            concentration_multiplier: double_spin::CONCENTRATION_MULTIPLIER,
            prp_yield_per_tube_ml: double_spin::PRP_YIELD_PER_TUBE_ML,
            recovery_penalty_percent: double_spin::RECOVERY_PENALTY_PERCENT,
            blood_tubes_per_prp_tube: double_spin::BLOOD_TUBES_PER_PRP_TUBE,
        }
    }
}

/// Tunable behaviour of the dosage planner
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlannerConfig {
    /// Retries allowed per zone
    pub max_iterations: u32,
    pub retry_priority: RetryPriority,
    pub excess_policy: ExcessPlateletPolicy,
    /// Inflate the minimum platelet target to offset recovery loss
    pub adjust_min_for_recovery: bool,
    pub double_spin: DoubleSpinConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self::canonical()
    }
}

impl PlannerConfig {
    /// Current planner behaviour
    pub fn canonical() -> Self {
        Self {
            max_iterations: search::MAX_PLAN_ITERATIONS,
            retry_priority: RetryPriority::ConcentrationFirst,
            excess_policy: ExcessPlateletPolicy::KeepCurrent,
            adjust_min_for_recovery: false,
            double_spin: DoubleSpinConfig::default(),
        }
    }

    /// Earliest revision: larger retry budget, platelet count checked first,
    /// recovery-adjusted targets
    pub fn legacy() -> Self {
        Self {
            max_iterations: search::LEGACY_MAX_PLAN_ITERATIONS,
            retry_priority: RetryPriority::PlateletCountFirst,
            excess_policy: ExcessPlateletPolicy::LegacyRetry,
            adjust_min_for_recovery: true,
            double_spin: DoubleSpinConfig::default(),
        }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_lowercase().as_str() {
            "canonical" | "default" => Ok(Self::canonical()),
            "legacy" => Ok(Self::legacy()),
            other => Err(ConfigError::UnknownPreset(other.to_string())),
        }
    }

    /// Build a configuration from key/value settings.
    ///
    /// Recognised keys: `PRP_PLANNER_PRESET`, `PRP_MAX_ITERATIONS`,
    /// `PRP_ADJUST_MIN_FOR_RECOVERY`, `PRP_DOUBLE_SPIN_ENABLED`. Missing keys
    /// keep the preset value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("PRP_PLANNER_PRESET") {
            Some(name) => Self::preset(&name)?,
            None => Self::canonical(),
        };

        if let Some(value) = lookup("PRP_MAX_ITERATIONS") {
            config.max_iterations = value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|iterations| *iterations <= search::MAX_ITERATIONS_CEILING)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "PRP_MAX_ITERATIONS",
                    value: value.clone(),
                })?;
        }

        if let Some(value) = lookup("PRP_ADJUST_MIN_FOR_RECOVERY") {
            config.adjust_min_for_recovery = parse_flag("PRP_ADJUST_MIN_FOR_RECOVERY", &value)?;
        }

        if let Some(value) = lookup("PRP_DOUBLE_SPIN_ENABLED") {
            config.double_spin.enabled = parse_flag("PRP_DOUBLE_SPIN_ENABLED", &value)?;
        }

        Ok(config)
    }

    /// Build a configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
