use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::api::handlers::PlannerService;
use crate::entities::{CalculateDosageRequest, CalculateDosageResponse, ErrorResponse};

/// Calculate the PRP treatment plan for every zone
#[utoipa::path(
    post,
    path = "/calculate",
    request_body = CalculateDosageRequest,
    responses(
        (status = 200, description = "Treatment plans calculated", body = CalculateDosageResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 500, description = "Calculation error", body = ErrorResponse),
    ),
    security(
        (),
        ("bearer" = [])
    ),
    tag = "dosage"
)]
#[instrument(skip_all, fields(calculation_id = %Uuid::new_v4()))]
pub async fn calculate_dosage(
    State(planner): State<PlannerService>,
    payload: Result<Json<CalculateDosageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected calculation body: {}", rejection.body_text());
        ErrorResponse::from_json_rejection(rejection)
    })?;

    let thrombocytes = request.thrombocytes.ok_or_else(|| {
        warn!("Calculation request without thrombocytes");
        ErrorResponse::missing_field("thrombocytes")
    })?;

    if !(thrombocytes > 0.0) {
        warn!(thrombocytes, "Rejected non-positive thrombocytes");
        return Err(ErrorResponse::invalid_field(
            "thrombocytes",
            "Invalid input: Patient thrombocytes must be greater than 0",
        ));
    }

    let input = request.into_patient_input(thrombocytes);
    info!(thrombocytes, prp_yield = input.prp_yield, "Calculating dosage plan");

    match planner.plan_dosage(input) {
        Ok(plan) => {
            info!(double_spin = plan.double_spin_used, "Dosage plan calculated");
            Ok((StatusCode::OK, Json(CalculateDosageResponse::from(&plan))))
        }
        Err(e) if e.is_client_error() => {
            warn!("Invalid calculation input: {}", e);
            let message = format!("Invalid input: {}", e);
            Err(match e.field() {
                Some(field) => ErrorResponse::invalid_field(field, message),
                None => ErrorResponse::validation_error(message, None),
            })
        }
        Err(e) => {
            error!("Dosage calculation failed: {}", e);
            Err(ErrorResponse::internal_error("Calculation error"))
        }
    }
}

/// Fallback for unsupported methods on the calculation routes
pub async fn method_not_allowed() -> ErrorResponse {
    ErrorResponse::method_not_allowed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use axum::{body::Body, http::Request, routing::post, Router};
    use prp_dosage_domain::testing::MockDosagePlanner;
    use tower::ServiceExt;

    fn app(planner: PlannerService) -> Router {
        Router::new()
            .route("/calculate", post(calculate_dosage).fallback(method_not_allowed))
            .with_state(planner)
    }

    fn json_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/calculate")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_thrombocytes_skips_planner() {
        let mock = Arc::new(MockDosagePlanner::new());
        let response = app(mock.clone()).oneshot(json_request("{}")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Missing required field: thrombocytes");
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_positive_thrombocytes_skips_planner() {
        let mock = Arc::new(MockDosagePlanner::new());
        let response = app(mock.clone())
            .oneshot(json_request(r#"{"thrombocytes": 0}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["details"]["field"], "thrombocytes");
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_planner_failure_is_internal_error() {
        let mock = Arc::new(MockDosagePlanner::new().with_internal_failure());
        let response = app(mock.clone())
            .oneshot(json_request(r#"{"thrombocytes": 200}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Calculation error");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_core_validation_error_names_field() {
        let mock = Arc::new(MockDosagePlanner::new());
        let response = app(mock)
            .oneshot(json_request(r#"{"thrombocytes": 200, "recovery_rate": 150}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["details"]["field"], "recovery_rate");
        assert!(body["message"].as_str().unwrap().starts_with("Invalid input: "));
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let mock = Arc::new(MockDosagePlanner::new());
        let response = app(mock.clone()).oneshot(json_request("{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Invalid JSON data");
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_get_is_method_not_allowed() {
        let mock = Arc::new(MockDosagePlanner::new());
        let request = Request::builder().uri("/calculate").body(Body::empty()).unwrap();
        let response = app(mock).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_successful_calculation() {
        let mock = Arc::new(MockDosagePlanner::new());
        let response = app(mock)
            .oneshot(json_request(
                r#"{"thrombocytes": 200, "prp_yield": 1.0, "prp_concentration": 7.0, "ppp_concentration": 0.5}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["concentration_feedback"]["type"], "success");
        assert!(body["data"]["zones"]["temporal_crown"].is_object());
        assert!(body["data"]["zones"]["full_scalp"].is_object());
    }
}
