use thiserror::Error;

use prp_dosage_domain::{ConfigError, PlannerConfig};

const DEFAULT_PORT: u16 = 3000;

/// Server configuration errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("PORT must be a number between 0 and 65535, got {0}")]
    InvalidPort(String),

    #[error(transparent)]
    Planner(#[from] ConfigError),
}

/// Runtime configuration for the API server
#[derive(Clone)]
pub struct AppConfig {
    /// Port to listen on
    pub port: u16,
    /// Deployment environment name
    pub environment: String,
    /// Bearer token required by the calculation routes, if any
    pub bearer_token: Option<String>,
    /// Dosage planner settings
    pub planner: PlannerConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("planner", &self.planner)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            environment: "development".to_string(),
            bearer_token: None,
            planner: PlannerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build the configuration from key/value settings
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| AppConfigError::InvalidPort(value.clone()))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            environment: lookup("APP_ENV").unwrap_or_else(|| "development".to_string()),
            bearer_token: lookup("API_BEARER_TOKEN").filter(|token| !token.trim().is_empty()),
            planner: PlannerConfig::from_lookup(&lookup)?,
        })
    }

    /// Build the configuration from the process environment
    pub fn from_env() -> Result<Self, AppConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Return a copy that requires the given bearer token
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}
