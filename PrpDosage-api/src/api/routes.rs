use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use prp_dosage_domain::health::HealthServiceTrait;

use crate::api::config::AppConfig;
use crate::api::handlers::{self, docs, dosage, health, PlannerService};
use crate::auth::{bearer_auth, configure_security, BearerAuth};
use crate::openapi::configure_swagger_routes;

/// Create the application router from runtime configuration
pub fn create_app(config: &AppConfig) -> Router {
    debug!("Creating application router");

    let planner = handlers::create_planner_service(config.planner);
    let health_service = health::create_health_service(planner.clone());
    let auth = BearerAuth::new(config.bearer_token.clone());

    if auth.is_enabled() {
        info!("Bearer token required on calculation routes");
    } else {
        info!("No API_BEARER_TOKEN configured, calculation routes are open");
    }

    build_router(planner, health_service, auth)
}

/// Assemble the router from its collaborators
pub fn build_router(
    planner: PlannerService,
    health_service: Arc<dyn HealthServiceTrait + Send + Sync>,
    auth: BearerAuth,
) -> Router {
    // Calculation routes, guarded by the bearer token when one is configured
    let calculation_routes = Router::new()
        .route(
            "/calculate",
            post(dosage::calculate_dosage).fallback(dosage::method_not_allowed),
        )
        .route(
            "/api/calculate",
            post(dosage::calculate_dosage).fallback(dosage::method_not_allowed),
        )
        .layer(middleware::from_fn_with_state(auth, bearer_auth));

    debug!("Calculation routes configured");

    let public_routes = Router::new()
        .route("/", get(docs::api_index))
        .route("/health", get(health::health_check))
        .layer(Extension(health_service));

    debug!("Public routes configured");

    let app = Router::new()
        .merge(public_routes)
        .merge(calculation_routes)
        .with_state(planner);

    let app = add_swagger_ui(app);
    let app = configure_security(app);

    app.layer(TraceLayer::new_for_http())
}

/// Add Swagger UI to the router
fn add_swagger_ui(app: Router) -> Router {
    app.merge(configure_swagger_routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use prp_dosage_domain::testing::{MockDosagePlanner, MockHealthService};
    use tower::ServiceExt;

    fn test_app(auth: BearerAuth) -> Router {
        build_router(
            Arc::new(MockDosagePlanner::new()),
            Arc::new(MockHealthService::new()),
            auth,
        )
    }

    fn calculate(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::from(r#"{"thrombocytes": 200}"#)).unwrap()
    }

    #[tokio::test]
    async fn test_both_calculation_paths_are_routed() {
        for uri in ["/calculate", "/api/calculate"] {
            let response = test_app(BearerAuth::disabled())
                .oneshot(calculate(uri, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_token_required_when_configured() {
        let auth = BearerAuth::new(Some("rotating-secret".to_string()));

        let response = test_app(auth.clone()).oneshot(calculate("/calculate", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("www-authenticate"));

        let response = test_app(auth.clone())
            .oneshot(calculate("/calculate", Some("wrong")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = test_app(auth)
            .oneshot(calculate("/api/calculate", Some("rotating-secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_public_routes_skip_token() {
        let auth = BearerAuth::new(Some("rotating-secret".to_string()));
        for uri in ["/", "/health"] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = test_app(auth.clone()).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_security_headers_applied() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = test_app(BearerAuth::disabled()).oneshot(request).await.unwrap();

        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["x-frame-options"], "DENY");
    }
}
