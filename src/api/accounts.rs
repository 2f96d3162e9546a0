use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{require, CurrentUser};
use crate::api::students::SearchQuery;
use crate::api::validation::{validate_payload, validate_record_id};
use crate::core::state::AppState;
use crate::schemas::account::{Account, AccountCreate, AccountUpdate, Role};
use crate::schemas::Scoped;
use crate::services::access_control::{AccessTarget, AuthContext, Capability};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_accounts).post(create_account))
        .route("/:id", get(get_account).put(update_account).delete(delete_account))
}

fn scoped(state: &AppState, context: &AuthContext, account: Account) -> Scoped<Account> {
    let capabilities = state.evaluator().evaluate(context, AccessTarget::Account(&account));
    Scoped { record: account, capabilities }
}

async fn load_account(state: &AppState, account_id: &str) -> Result<Account, ApiError> {
    validate_record_id(account_id)?;
    state
        .backend()
        .get_account(account_id)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to load account"))?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))
}

async fn list_accounts(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<Scoped<Account>>>, ApiError> {
    require(&state, &context, AccessTarget::Collection, Capability::ViewAccount)?;

    let accounts = state
        .backend()
        .list_accounts()
        .await
        .map_err(|e| ApiError::backend(e, "Failed to list accounts"))?;

    let search = params.search.unwrap_or_default();
    Ok(Json(
        accounts
            .into_iter()
            .filter(|account| account.matches_search(&search))
            .map(|account| scoped(&state, &context, account))
            .collect(),
    ))
}

async fn get_account(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Path(account_id): Path<String>,
) -> Result<Json<Scoped<Account>>, ApiError> {
    let account = load_account(&state, &account_id).await?;
    require(&state, &context, AccessTarget::Account(&account), Capability::ViewAccount)?;
    Ok(Json(scoped(&state, &context, account)))
}

async fn create_account(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Json(payload): Json<AccountCreate>,
) -> Result<(StatusCode, Json<Scoped<Account>>), ApiError> {
    require(&state, &context, AccessTarget::Collection, Capability::CreateAccount)?;
    validate_payload(&payload)?;

    if state.seeds().contains(&payload.username) {
        return Err(ApiError::Conflict("Username is reserved by a seed account".to_string()));
    }

    let account = state
        .backend()
        .create_account(&payload)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to create account"))?;

    tracing::info!(
        account_id = %account.id,
        role = account.role.as_str(),
        username = %context.username,
        "Account created"
    );
    Ok((StatusCode::CREATED, Json(scoped(&state, &context, account))))
}

async fn update_account(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Path(account_id): Path<String>,
    Json(payload): Json<AccountUpdate>,
) -> Result<Json<Scoped<Account>>, ApiError> {
    let existing = load_account(&state, &account_id).await?;
    require(&state, &context, AccessTarget::Account(&existing), Capability::EditAccount)?;
    validate_payload(&payload)?;

    // A demoted superadmin would become deletable.
    let demotes = payload.role.is_some_and(|role| role != Role::Superadmin);
    if existing.role == Role::Superadmin && demotes {
        return Err(ApiError::Forbidden("Superadmin role cannot be changed"));
    }

    let account = state
        .backend()
        .update_account(&account_id, &payload)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to update account"))?;

    Ok(Json(scoped(&state, &context, account)))
}

async fn delete_account(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Path(account_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let existing = load_account(&state, &account_id).await?;
    require(&state, &context, AccessTarget::Account(&existing), Capability::DeleteAccount)?;

    state
        .backend()
        .delete_account(&account_id)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to delete account"))?;

    tracing::info!(account_id = %account_id, username = %context.username, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}
