use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Types of authentication events
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthEventType {
    /// Bearer token checked against the configured credential
    TokenValidation,
    /// Request rejected before reaching a protected route
    AccessDenied,
}

impl std::fmt::Display for AuthEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthEventType::TokenValidation => write!(f, "TOKEN_VALIDATION"),
            AuthEventType::AccessDenied => write!(f, "ACCESS_DENIED"),
        }
    }
}

/// Authentication event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    /// Type of authentication event
    pub event_type: AuthEventType,
    /// Timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
    /// Whether the event was successful
    pub success: bool,
    /// Additional details about the event
    pub details: Option<String>,
    /// The resource being accessed
    pub resource: Option<String>,
    /// Duration of the check in microseconds
    pub duration_us: Option<u64>,
}

impl AuthEvent {
    /// Create a new authentication event
    pub fn new(event_type: AuthEventType, success: bool) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            success,
            details: None,
            resource: None,
            duration_us: None,
        }
    }

    /// Set the details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Set the resource
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Set the duration
    pub fn with_duration(mut self, duration_us: u64) -> Self {
        self.duration_us = Some(duration_us);
        self
    }
}

/// Log an authentication event
///
/// The presented credential is never part of the event.
pub fn log_auth_event(event: &AuthEvent) {
    let resource = event.resource.as_deref().unwrap_or("-");
    let details = event.details.as_deref().unwrap_or("");

    if event.success {
        info!(
            event_type = %event.event_type,
            resource,
            duration_us = event.duration_us,
            "AUTH-LOG [{}] [SUCCESS] [{}] {}",
            event.event_type,
            event.timestamp.to_rfc3339(),
            details
        );
    } else {
        warn!(
            event_type = %event.event_type,
            resource,
            duration_us = event.duration_us,
            "AUTH-LOG [{}] [FAILURE] [{}] {}",
            event.event_type,
            event.timestamp.to_rfc3339(),
            details
        );
    }
}
