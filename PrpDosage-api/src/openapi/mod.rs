use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Configure Swagger UI endpoints
pub fn configure_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

/// Registers the optional bearer scheme used by the calculation routes
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::docs::api_index,
        crate::api::handlers::health::health_check,
        crate::api::handlers::dosage::calculate_dosage,
    ),
    components(
        schemas(
            // Request and response envelopes
            crate::entities::dosage::CalculateDosageRequest,
            crate::entities::dosage::CalculateDosageResponse,
            crate::entities::dosage::DosageData,
            crate::entities::dosage::InputParameters,
            crate::entities::dosage::CalculatedConcentrations,
            crate::entities::dosage::ZonePlanResponse,
            crate::entities::dosage::RecoveryResponse,
            crate::entities::common::ErrorResponse,

            // Domain value types
            prp_dosage_domain::entities::ConcentrationFeedback,
            prp_dosage_domain::entities::FeedbackType,
            prp_dosage_domain::entities::RangeStatus,

            // Health
            crate::api::handlers::health::HealthResponse,
            crate::api::handlers::health::ComponentStatus,
            crate::api::handlers::health::ComponentHealthStatus,
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "docs", description = "Service documentation"),
        (name = "health", description = "Health check endpoint"),
        (name = "dosage", description = "PRP dosage calculation")
    ),
    info(
        title = "PRP Calculator API",
        version = "0.1.0",
        description = "Plans platelet-rich plasma treatments for hair restoration by scalp zone",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
    ),
    servers(
        (url = "/", description = "Local development server")
    )
)]
pub struct ApiDoc;
