// ============================================================================
// PMS API - Authentication Gate
// File: crates/pms-api/src/middleware/auth.rs
// ============================================================================
//! Bearer-token gate. The principal is reloaded from the store on every
//! request so deactivated users lose access immediately.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

use pms_core::domain::{Role, User};

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated principal, resolved by [`require_auth`]
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
    pub name: String,
    pub email: String,
}

impl AuthUser {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            tenant_id: user.tenant_id,
            role: user.role,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }

    /// Role gate; runs before any store mutation
    pub fn require(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if self.role.is_any(allowed) {
            Ok(())
        } else {
            warn!(user_id = %self.id, role = self.role.as_str(), "role not permitted");
            Err(ApiError::forbidden())
        }
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request).ok_or(ApiError::Unauthenticated)?;

    let claims = state.jwt.validate_token(token).map_err(|e| {
        debug!("Token rejected: {}", e);
        ApiError::InvalidToken
    })?;
    let user_id = claims.user_id().map_err(|_| ApiError::InvalidToken)?;

    let user = state
        .repo::<User>()
        .find(user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| {
            warn!(user_id = %user_id, "Token subject is missing or inactive");
            ApiError::InvalidToken
        })?;

    request.extensions_mut().insert(AuthUser::from_user(&user));
    Ok(next.run(request).await)
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthenticated)
    }
}
