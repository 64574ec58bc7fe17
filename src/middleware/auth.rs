use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;
use crate::db::models::user::{Actor, Role};
use crate::utils::api_response::ApiResponse;

/// Caller identity headers honoured when `AUTH_DISABLED=true`.
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// JWT Claims issued by the auth provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject - the caller's email
    pub sub: String,
    /// Workflow role of the caller
    pub role: String,
    /// Expiration timestamp (UNIX TIME)
    pub exp: usize,
}

impl Claims {
    /// Converts the claims into the workflow caller, or a 401 if the role is unknown.
    pub fn actor(&self) -> Result<Actor, ApiResponse<()>> {
        let role = self.role.parse::<Role>().map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::UNAUTHORIZED,
                "Invalid role in token",
                Some(json!({ "error": e })),
            )
        })?;
        if self.sub.trim().is_empty() {
            return Err(ApiResponse::<()>::error(
                StatusCode::UNAUTHORIZED,
                "Token has no subject",
                None,
            ));
        }
        Ok(Actor::new(self.sub.as_str(), role))
    }
}

/// ✅ **JWT Middleware** (Handles Token Authentication)
///
/// Inserts the caller as an [`Actor`] extension for the handlers.
pub async fn jwt_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let authenticated = if state.config.auth_disabled {
        actor_from_headers(req.headers())
    } else {
        actor_from_token(req.headers(), &state.config.jwt_secret)
    };
    let actor = authenticated.map_err(IntoResponse::into_response)?;

    tracing::debug!(email = %actor.email, role = %actor.role, "authenticated caller");
    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

fn actor_from_token(headers: &HeaderMap, secret: &str) -> Result<Actor, ApiResponse<()>> {
    let auth_header = headers.get("Authorization").ok_or_else(|| {
        tracing::warn!("Missing Authorization header");
        ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "Missing Authorization header", None)
    })?;

    let token_str = auth_header.to_str().map_err(|_| {
        tracing::warn!("Invalid Authorization header format");
        ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header format",
            None,
        )
    })?;

    let token = token_str.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::warn!("Invalid token format (missing 'Bearer ' prefix)");
        ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "Invalid token format (missing 'Bearer ' prefix)",
            None,
        )
    })?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::warn!("JWT decoding failed: {:?}", e);
        ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "Invalid token",
            Some(json!({ "error": e.to_string() })),
        )
    })?;

    token_data.claims.actor()
}

fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiResponse<()>> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ApiResponse::<()>::error(
                    StatusCode::UNAUTHORIZED,
                    format!("Missing {name} header"),
                    None,
                )
            })
    };
    let email = header(USER_EMAIL_HEADER)?;
    let role = header(USER_ROLE_HEADER)?.parse::<Role>().map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "Invalid role header",
            Some(json!({ "error": e })),
        )
    })?;
    Ok(Actor::new(email, role))
}
