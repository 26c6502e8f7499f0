//! Request authorization for the calculation routes
//!
//! The bearer credential is injected at startup (see `AppConfig`) and can be
//! rotated by restarting with a new value. When no credential is configured
//! the calculation routes are open.

pub mod logging;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::debug;

use crate::entities::ErrorResponse;
use logging::{log_auth_event, AuthEvent, AuthEventType};

/// Bearer credential shared by the auth middleware
#[derive(Clone, Default)]
pub struct BearerAuth {
    token: Option<Arc<str>>,
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl BearerAuth {
    /// Require the given token; `None` or a blank token disables the check
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token
                .filter(|token| !token.trim().is_empty())
                .map(|token| Arc::from(token.as_str())),
        }
    }

    /// Authorization disabled
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Check a presented token against the configured one
    pub fn verify(&self, presented: &str) -> bool {
        match &self.token {
            Some(expected) => constant_time_eq(expected.as_bytes(), presented.as_bytes()),
            None => true,
        }
    }
}

/// Compare two byte strings without short-circuiting on the first mismatch
fn constant_time_eq(expected: &[u8], presented: &[u8]) -> bool {
    if expected.len() != presented.len() {
        return false;
    }

    expected
        .iter()
        .zip(presented)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Extract the token from an `Authorization: Bearer <token>` header value
fn bearer_token(value: &HeaderValue) -> Option<&str> {
    let value = value.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

/// Middleware rejecting requests without the configured bearer token
pub async fn bearer_auth(State(auth): State<BearerAuth>, req: Request, next: Next) -> Response {
    if !auth.is_enabled() {
        return next.run(req).await;
    }

    let resource = req.uri().path().to_string();
    let start_time = Instant::now();

    let outcome = match req.headers().get(header::AUTHORIZATION) {
        None => Err("Missing Authorization header"),
        Some(value) => match bearer_token(value) {
            None => Err("Authorization header does not contain a Bearer token"),
            Some(token) if auth.verify(token) => Ok(()),
            Some(_) => Err("Invalid bearer token"),
        },
    };

    let elapsed = start_time.elapsed().as_micros() as u64;

    match outcome {
        Ok(()) => {
            debug!(resource = %resource, "Bearer token accepted");
            log_auth_event(
                &AuthEvent::new(AuthEventType::TokenValidation, true)
                    .with_resource(resource)
                    .with_duration(elapsed),
            );
            next.run(req).await
        }
        Err(reason) => {
            log_auth_event(
                &AuthEvent::new(AuthEventType::AccessDenied, false)
                    .with_details(reason)
                    .with_resource(resource)
                    .with_duration(elapsed),
            );

            let mut response = ErrorResponse::unauthorized(reason).into_response();
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            response
        }
    }
}

/// Apply CORS and security headers to the whole application
pub fn configure_security(app: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(3600));

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            axum::http::HeaderName::from_static("x-permitted-cross-domain-policies"),
            HeaderValue::from_static("none"),
        ));

    app.layer(cors).layer(security_headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secret-longer"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&HeaderValue::from_static("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&HeaderValue::from_static("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&HeaderValue::from_static("Basic abc")), None);
        assert_eq!(bearer_token(&HeaderValue::from_static("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderValue::from_static("abc")), None);
    }

    #[test]
    fn test_verify() {
        let auth = BearerAuth::new(Some("rotating-secret".to_string()));
        assert!(auth.is_enabled());
        assert!(auth.verify("rotating-secret"));
        assert!(!auth.verify("rotating-secreT"));

        let open = BearerAuth::new(Some("   ".to_string()));
        assert!(!open.is_enabled());
        assert!(open.verify("anything"));
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let auth = BearerAuth::new(Some("rotating-secret".to_string()));
        assert!(!format!("{:?}", auth).contains("rotating-secret"));
    }
}
