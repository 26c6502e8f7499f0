pub mod config;
pub mod handlers;
pub mod routes;

use axum::Router;

pub use config::AppConfig;

/// Create the application router
pub fn create_application(config: &AppConfig) -> Router {
    routes::create_app(config)
}
