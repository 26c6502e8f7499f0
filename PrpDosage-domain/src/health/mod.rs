//! Domain layer health check functionality
//! This module provides health check services for the application

use std::collections::HashMap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{FeedbackType, PatientInput, ZONES};
use crate::services::DosagePlannerServiceTrait;

/// System health status
#[derive(Debug, Clone, PartialEq)]
pub enum SystemStatus {
    /// All components are healthy
    Healthy,
    /// Some components are degraded but the system is functional
    Degraded,
    /// System is not functioning properly
    Unhealthy,
}

/// Component health status
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Component is functioning but producing unexpected results
    Degraded,
    /// Component is not functioning
    Unhealthy,
}

/// Represents a health component with status and optional details
#[derive(Debug, Clone)]
pub struct HealthComponent {
    /// Status of the component
    pub status: ComponentStatus,
    /// Optional details about the component status
    pub details: Option<String>,
}

/// Represents the overall health of the system
#[derive(Debug, Clone)]
pub struct SystemHealth {
    /// Overall system status
    pub status: SystemStatus,
    /// Map of component names to their health status
    pub components: HashMap<String, HealthComponent>,
    /// When the check ran
    pub checked_at: DateTime<Utc>,
}

/// Trait for health services
#[async_trait]
pub trait HealthServiceTrait: Send + Sync + std::fmt::Debug {
    /// Get the overall system health
    async fn get_system_health(&self) -> SystemHealth;

    /// Check the status of the dosage planner
    /// Returns true if the planner is healthy, false if degraded
    /// Returns an error if the planner could not run
    async fn check_planner_status(&self) -> Result<bool, String>;
}

/// Run a known calculation through the planner.
///
/// Returns:
/// - Ok(true) if the planner produced the expected plan shape
/// - Ok(false) if it produced a plan with unexpected content
/// - Err if the calculation failed
pub fn check_planner_status(planner: &dyn DosagePlannerServiceTrait) -> Result<bool, String> {
    let canary = PatientInput::new(200.0)
        .with_prp_yield(1.0)
        .with_prp_concentration(7.0)
        .with_ppp_concentration(0.5);

    let plan = planner
        .plan_dosage(canary)
        .map_err(|e| format!("Planner check failed: {}", e))?;

    Ok(plan.zones.len() == ZONES.len() && plan.feedback.feedback_type == FeedbackType::Success)
}

/// Aggregate component statuses into the system status
pub fn overall_status(components: &HashMap<String, HealthComponent>) -> SystemStatus {
    if components.values().any(|c| c.status == ComponentStatus::Unhealthy) {
        SystemStatus::Unhealthy
    } else if components.values().any(|c| c.status == ComponentStatus::Degraded) {
        SystemStatus::Degraded
    } else {
        SystemStatus::Healthy
    }
}

/// Get overall system health
pub fn get_system_health(planner: &dyn DosagePlannerServiceTrait) -> SystemHealth {
    let planner_component = match check_planner_status(planner) {
        Ok(true) => HealthComponent {
            status: ComponentStatus::Healthy,
            details: None,
        },
        Ok(false) => HealthComponent {
            status: ComponentStatus::Degraded,
            details: Some("Planner returned an unexpected plan".to_string()),
        },
        Err(e) => HealthComponent {
            status: ComponentStatus::Unhealthy,
            details: Some(e),
        },
    };

    let components: HashMap<String, HealthComponent> = vec![
        ("planner".to_string(), planner_component),
        (
            "api".to_string(),
            HealthComponent {
                status: ComponentStatus::Healthy,
                details: None,
            },
        ),
    ]
    .into_iter()
    .collect();

    SystemHealth {
        status: overall_status(&components),
        components,
        checked_at: Utc::now(),
    }
}
