// Testing utilities and mock implementations for the domain layer
// This module is only available when the "mock" feature is enabled

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use async_trait::async_trait;
use chrono::Utc;

use crate::config::PlannerConfig;
use crate::entities::{DosagePlan, PatientInput};
use crate::health::{ComponentStatus, HealthComponent, HealthServiceTrait, SystemHealth, SystemStatus};
use crate::services::{DosageError, DosagePlanner, DosagePlannerServiceTrait};

/// Mock implementation of the DosagePlannerServiceTrait for testing
///
/// Delegates to the real planner unless configured to fail, and counts calls
/// so tests can assert the planner was or was not reached.
#[derive(Debug, Default)]
pub struct MockDosagePlanner {
    inner: DosagePlanner,
    failure: Option<DosageError>,
    calls: AtomicUsize,
}

impl MockDosagePlanner {
    /// Create a new mock planner
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the mock to fail every calculation with an internal error
    pub fn with_internal_failure(self) -> Self {
        self.with_failure(DosageError::Internal("mock planner failure".to_string()))
    }

    /// Configure the mock to fail every calculation with the given error
    pub fn with_failure(mut self, error: DosageError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Number of plan_dosage calls received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DosagePlannerServiceTrait for MockDosagePlanner {
    fn validate_input(&self, input: &PatientInput) -> Result<(), DosageError> {
        self.inner.validate_input(input)
    }

    fn plan_dosage(&self, input: PatientInput) -> Result<DosagePlan, DosageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => self.inner.plan_dosage(input),
        }
    }

    fn config(&self) -> PlannerConfig {
        self.inner.config()
    }
}

/// Mock health service with a fixed planner status
#[derive(Debug)]
pub struct MockHealthService {
    planner_status: ComponentStatus,
}

impl Default for MockHealthService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHealthService {
    /// Create a healthy mock health service
    pub fn new() -> Self {
        Self {
            planner_status: ComponentStatus::Healthy,
        }
    }

    /// Report the planner as degraded
    pub fn with_degraded_planner(mut self) -> Self {
        self.planner_status = ComponentStatus::Degraded;
        self
    }

    /// Report the planner as unhealthy
    pub fn with_unhealthy_planner(mut self) -> Self {
        self.planner_status = ComponentStatus::Unhealthy;
        self
    }
}

#[async_trait]
impl HealthServiceTrait for MockHealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let mut components = HashMap::new();
        components.insert(
            "planner".to_string(),
            HealthComponent {
                status: self.planner_status.clone(),
                details: match self.planner_status {
                    ComponentStatus::Healthy => None,
                    ComponentStatus::Degraded => Some("Planner returned an unexpected plan".to_string()),
                    ComponentStatus::Unhealthy => Some("Planner check failed".to_string()),
                },
            },
        );

        let status = match self.planner_status {
            ComponentStatus::Healthy => SystemStatus::Healthy,
            ComponentStatus::Degraded => SystemStatus::Degraded,
            ComponentStatus::Unhealthy => SystemStatus::Unhealthy,
        };

        SystemHealth {
            status,
            components,
            checked_at: Utc::now(),
        }
    }

    async fn check_planner_status(&self) -> Result<bool, String> {
        match self.planner_status {
            ComponentStatus::Healthy => Ok(true),
            ComponentStatus::Degraded => Ok(false),
            ComponentStatus::Unhealthy => Err("Planner check failed".to_string()),
        }
    }
}
