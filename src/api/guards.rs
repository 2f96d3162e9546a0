use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::services::access_control::{AccessTarget, AuthContext, Capability, CapabilitySet};

/// The caller, rebuilt from the bearer token on every request.
pub(crate) struct CurrentUser(pub(crate) AuthContext);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        if claims.sub.trim().is_empty() {
            return Err(ApiError::Unauthorized("Invalid authentication credentials"));
        }

        Ok(CurrentUser(AuthContext::new(claims.sub, claims.role)))
    }
}

/// Evaluates `target` for the caller and fails with 403 unless `capability` is granted.
pub(crate) fn require(
    state: &AppState,
    context: &AuthContext,
    target: AccessTarget<'_>,
    capability: Capability,
) -> Result<CapabilitySet, ApiError> {
    let granted = state.evaluator().evaluate(context, target);
    if granted.contains(capability) {
        Ok(granted)
    } else {
        tracing::debug!(
            username = %context.username,
            role = context.role.as_str(),
            capability = capability.token(),
            "Capability denied"
        );
        Err(ApiError::Forbidden("Not enough permissions"))
    }
}
