pub mod docs;
pub mod dosage;
pub mod health;

use std::sync::Arc;

use prp_dosage_domain::{services::create_default_dosage_planner, DosagePlannerServiceTrait, PlannerConfig};

/// Planner shared as router state
pub type PlannerService = Arc<dyn DosagePlannerServiceTrait + Send + Sync>;

/// Create the planner the handlers use
pub fn create_planner_service(config: PlannerConfig) -> PlannerService {
    Arc::new(create_default_dosage_planner(config))
}

// Re-export handlers for easier imports
pub use docs::api_index;
pub use dosage::{calculate_dosage, method_not_allowed};
pub use health::health_check;
