use axum::{http::StatusCode, response::IntoResponse, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use std::time::{SystemTime, UNIX_EPOCH};
use std::sync::{Arc, Once};
use once_cell::sync::OnceCell;
use async_trait::async_trait;

use prp_dosage_domain::health::{
    self, ComponentStatus as DomainComponentStatus, HealthServiceTrait, SystemHealth, SystemStatus,
};

use crate::api::handlers::PlannerService;

/// Service name reported by health and documentation endpoints
pub const SERVICE_NAME: &str = "PRP Calculator API";

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status ("healthy", "degraded" or "unhealthy")
    pub status: String,
    /// Service name
    pub service: String,
    /// Current application version from Cargo manifest
    pub version: String,
    /// RFC 3339 timestamp of when the response was generated
    pub timestamp: String,
    /// Uptime of the service in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    /// Details about the components of the system
    pub components: ComponentStatus,
    /// Environment information
    pub environment: String,
}

/// Status of individual system components
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentStatus {
    /// Dosage planner status, checked with a known calculation
    pub planner: ComponentHealthStatus,
    /// API status
    pub api: ComponentHealthStatus,
}

/// Health status for an individual component
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealthStatus {
    /// Status of the component ("healthy", "degraded" or "unhealthy")
    pub status: String,
    /// Optional message with more details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// Track the time when the server started
static SERVER_START_TIME: OnceCell<u64> = OnceCell::new();
static INIT: Once = Once::new();

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Record the server start time used for uptime reporting
pub fn initialize_server_start_time() {
    INIT.call_once(|| {
        let _ = SERVER_START_TIME.set(unix_now());
    });
}

/// Health check endpoint to verify the API is running
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "API is healthy", body = HealthResponse),
        (status = 500, description = "API is not healthy", body = HealthResponse),
        (status = 503, description = "API is degraded", body = HealthResponse)
    ),
    tag = "health"
)]
#[instrument(skip(health_service))]
pub async fn health_check(
    Extension(health_service): Extension<Arc<dyn HealthServiceTrait + Send + Sync>>,
) -> impl IntoResponse {
    info!("Health check requested");

    let uptime = SERVER_START_TIME
        .get()
        .map(|&start_time| unix_now().saturating_sub(start_time));

    let system_health = health_service.get_system_health().await;

    let (overall_status, status_code) = match system_health.status {
        SystemStatus::Healthy => ("healthy", StatusCode::OK),
        SystemStatus::Degraded => ("degraded", StatusCode::SERVICE_UNAVAILABLE),
        SystemStatus::Unhealthy => ("unhealthy", StatusCode::INTERNAL_SERVER_ERROR),
    };

    if status_code != StatusCode::OK {
        warn!(status = overall_status, "Health check reports a problem");
    }

    let response = HealthResponse {
        status: overall_status.to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: system_health.checked_at.to_rfc3339(),
        uptime,
        components: ComponentStatus {
            planner: component_status(&system_health, "planner"),
            api: component_status(&system_health, "api"),
        },
        environment: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
    };

    (status_code, Json(response))
}

fn component_status(system_health: &SystemHealth, name: &str) -> ComponentHealthStatus {
    match system_health.components.get(name) {
        Some(component) => ComponentHealthStatus {
            status: map_component_status(&component.status),
            message: component.details.clone(),
        },
        None => ComponentHealthStatus {
            status: map_component_status(&DomainComponentStatus::Healthy),
            message: None,
        },
    }
}

/// Map domain component status to API status string
fn map_component_status(status: &DomainComponentStatus) -> String {
    match status {
        DomainComponentStatus::Healthy => "healthy",
        DomainComponentStatus::Degraded => "degraded",
        DomainComponentStatus::Unhealthy => "unhealthy",
    }
    .to_string()
}

/// Health service backed by the live dosage planner
pub struct HealthService {
    planner: PlannerService,
}

impl std::fmt::Debug for HealthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthService").finish_non_exhaustive()
    }
}

impl HealthService {
    /// Create a new health service
    pub fn new(planner: PlannerService) -> Self {
        HealthService { planner }
    }
}

#[async_trait]
impl HealthServiceTrait for HealthService {
    async fn get_system_health(&self) -> SystemHealth {
        health::get_system_health(self.planner.as_ref())
    }

    async fn check_planner_status(&self) -> Result<bool, String> {
        health::check_planner_status(self.planner.as_ref())
    }
}

/// Factory function to create a health service
pub fn create_health_service(planner: PlannerService) -> Arc<dyn HealthServiceTrait + Send + Sync> {
    Arc::new(HealthService::new(planner))
}
