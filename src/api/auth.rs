use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::validate_payload;
use crate::core::security;
use crate::core::state::AppState;
use crate::schemas::account::Account;
use crate::schemas::auth::{LoginRequest, MeResponse, SessionUser, TokenResponse};
use crate::services::access_control::role_capabilities;

const INVALID_CREDENTIALS: &str = "Incorrect username or password";

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/login", post(login)).route("/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    validate_payload(&payload)?;

    let account = authenticate(&state, &payload).await?;

    if !account.is_active {
        return Err(ApiError::BadRequest("Inactive account".to_string()));
    }

    let token = security::create_access_token(&account.username, account.role, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    tracing::info!(username = %account.username, role = account.role.as_str(), "Login succeeded");

    let capabilities = role_capabilities(account.role);
    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: account,
        capabilities,
    }))
}

/// Seed accounts answer first. A seeded username never falls through to the backend, so
/// a wrong seed password cannot be retried against a backend account of the same name.
async fn authenticate(state: &AppState, payload: &LoginRequest) -> Result<Account, ApiError> {
    if state.seeds().contains(&payload.username) {
        return state
            .seeds()
            .authenticate(&payload.username, &payload.password)
            .map_err(|e| ApiError::internal(e, "Failed to verify seed account"))?
            .ok_or(ApiError::Unauthorized(INVALID_CREDENTIALS));
    }

    state
        .backend()
        .authenticate(&payload.username, &payload.password)
        .await
        .map_err(|e| ApiError::backend(e, "Authentication backend unavailable"))?
        .ok_or(ApiError::Unauthorized(INVALID_CREDENTIALS))
}

async fn me(CurrentUser(context): CurrentUser) -> Json<MeResponse> {
    let capabilities = role_capabilities(context.role);
    Json(MeResponse {
        user: SessionUser { username: context.username, role: context.role },
        capabilities,
    })
}
