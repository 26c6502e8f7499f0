use axum::Json;
use serde_json::{json, Value};
use tracing::debug;

use prp_dosage_domain::entities::ZONES;

use crate::api::handlers::health::SERVICE_NAME;

/// Describe the service and how to call it
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service documentation", content_type = "application/json")
    ),
    tag = "docs"
)]
pub async fn api_index() -> Json<Value> {
    debug!("Documentation endpoint called");

    let zones: Vec<Value> = ZONES
        .iter()
        .map(|zone| {
            json!({
                "key": zone.key.as_str(),
                "name": zone.name,
                "min_platelets": zone.min_platelets,
                "target_platelets": zone.target_platelets,
                "max_platelets": zone.max_platelets,
                "min_volume_ml": zone.min_volume_ml,
            })
        })
        .collect();

    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Plans PRP hair-restoration treatments per scalp zone",
        "endpoints": {
            "GET /": "This documentation",
            "GET /health": "Service health",
            "POST /calculate": "Calculate treatment plans",
            "POST /api/calculate": "Alias of POST /calculate",
            "GET /api-docs": "Swagger UI",
            "GET /api-docs/openapi.json": "OpenAPI document",
        },
        "request": {
            "thrombocytes": "required, patient thrombocytes in G/L",
            "prp_yield": "optional, PRP mL per tube (default 1.0)",
            "prp_concentration": "optional, PRP multiplier over baseline (default 4.0)",
            "ppp_concentration": "optional, PPP multiplier over baseline (default 2.5)",
            "recovery_rate": "optional, % of platelets recovered (default 70)",
            "activation_rate": "optional, % of recovered platelets activated (default 20)",
        },
        "example_request": {
            "thrombocytes": 200,
            "prp_yield": 1.0,
            "prp_concentration": 7.0,
            "ppp_concentration": 0.5,
        },
        "authentication": "Authorization: Bearer <token> on calculation routes when the server is configured with a token",
        "zones": zones,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_index_lists_endpoints_and_zones() {
        let Json(body) = api_index().await;

        assert_eq!(body["service"], SERVICE_NAME);
        assert!(body["endpoints"]["POST /calculate"].is_string());
        assert_eq!(body["zones"].as_array().map(Vec::len), Some(ZONES.len()));
        assert_eq!(body["zones"][0]["key"], "temporal_crown");
    }
}
