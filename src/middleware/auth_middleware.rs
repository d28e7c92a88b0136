// Authentication middleware for protected routes
// Validates JWT tokens and injects AuthenticatedUser into request extensions

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::user::UserRole;
use crate::{app::AppState, middleware::auth::AuthenticatedUser};

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "success": false,
            "message": message
        })),
    )
        .into_response()
}

/// Validate the bearer token and add AuthenticatedUser to request extensions
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return unauthorized("Missing or invalid authorization header"),
    };

    match app_state.jwt_service.validate_access_token(token) {
        Ok(claims) => {
            let user_id = match Uuid::parse_str(&claims.sub) {
                Ok(id) => id,
                Err(_) => return unauthorized("Invalid or expired token"),
            };
            let cluster_id = match Uuid::parse_str(&claims.cluster_id) {
                Ok(id) => id,
                Err(_) => return unauthorized("Invalid or expired token"),
            };
            let role = match UserRole::from_str(&claims.role) {
                Ok(role) => role,
                Err(_) => return unauthorized("Invalid or expired token"),
            };

            let auth_user = AuthenticatedUser {
                user_id,
                email: claims.email,
                role,
                cluster_id,
                exp: claims.exp,
            };

            request.extensions_mut().insert(auth_user);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!("JWT validation failed: {}", e);
            unauthorized("Invalid or expired token")
        }
    }
}

/// Reject non-admin callers on /api/admin routes
pub async fn require_admin(request: Request<Body>, next: Next) -> Response {
    let is_admin = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.is_admin())
        .unwrap_or(false);

    if !is_admin {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "success": false,
                "message": "Admin access required"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

/// Extractor so handlers can take AuthenticatedUser as a parameter
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "success": false,
                        "message": "Authentication required"
                    })),
                )
            })
    }
}
