//! Service token authentication middleware.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use wallet_types::{PaymentGateway, PaymentStore, WalletStore};

use super::handlers::AppState;

/// Extracts the token from the Authorization header.
/// Expected format: "Bearer <token>"
fn extract_bearer(auth_header: Option<&str>) -> Option<&str> {
    auth_header?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Routes reachable without the service token.
///
/// The webhook route carries its own gateway signature instead.
fn is_public(path: &str) -> bool {
    path == "/health"
        || path.starts_with("/api/webhooks/")
        || path.starts_with("/swagger-ui")
        || path.starts_with("/api-docs")
}

fn token_matches(provided: &str, expected: &str) -> bool {
    !expected.is_empty() && bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
}

/// Rejects payment and wallet calls without the shared service token.
pub async fn auth_middleware<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    request: Request<Body>,
    next: Next,
) -> Response
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    if is_public(request.uri().path()) {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    match extract_bearer(auth_header) {
        Some(token) if token_matches(token, &state.api_token) => next.run(request).await,
        Some(_) => {
            tracing::warn!(
                target: "security",
                path = %request.uri().path(),
                "Rejected request with invalid service token"
            );
            unauthorized_response("Invalid service token")
        }
        None => unauthorized_response("Missing or invalid Authorization header"),
    }
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": message,
            "code": 401,
            "retryable": false
        })),
    )
        .into_response()
}
