use axum::{extract::State, routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::schemas::DashboardResponse;
use crate::services::access_control::{role_capabilities, Capability};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}

/// Counts of what the caller can see. Accounts are only counted for roles that may view them.
async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
) -> Result<Json<DashboardResponse>, ApiError> {
    let capabilities = role_capabilities(context.role);
    let backend = state.backend();

    let students = async {
        backend
            .list_students()
            .await
            .map(|students| state.evaluator().visible_students(&context, students).len())
    };
    let subjects = async { backend.list_subjects().await.map(|subjects| subjects.len()) };
    let accounts = async {
        if capabilities.contains(Capability::ViewAccount) {
            backend.list_accounts().await.map(|accounts| Some(accounts.len()))
        } else {
            Ok(None)
        }
    };

    let (students, subjects, accounts) = tokio::try_join!(students, subjects, accounts)
        .map_err(|e| ApiError::backend(e, "Failed to load dashboard counts"))?;

    Ok(Json(DashboardResponse {
        role: context.role,
        capabilities,
        students,
        subjects,
        accounts,
    }))
}
