use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{require, CurrentUser};
use crate::api::validation::{validate_payload, validate_record_id};
use crate::core::state::AppState;
use crate::schemas::subject::{Subject, SubjectPayload};
use crate::schemas::Scoped;
use crate::services::access_control::{AccessTarget, Capability};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subjects).post(create_subject))
        .route("/:id", get(get_subject).put(update_subject).delete(delete_subject))
}

async fn list_subjects(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
) -> Result<Json<Vec<Scoped<Subject>>>, ApiError> {
    let capabilities = require(&state, &context, AccessTarget::Subject, Capability::View)?;

    let subjects = state
        .backend()
        .list_subjects()
        .await
        .map_err(|e| ApiError::backend(e, "Failed to list subjects"))?;

    Ok(Json(
        subjects
            .into_iter()
            .map(|subject| Scoped { record: subject, capabilities: capabilities.clone() })
            .collect(),
    ))
}

async fn get_subject(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Path(subject_id): Path<String>,
) -> Result<Json<Scoped<Subject>>, ApiError> {
    let capabilities = require(&state, &context, AccessTarget::Subject, Capability::View)?;
    let subject = load_subject(&state, &subject_id).await?;
    Ok(Json(Scoped { record: subject, capabilities }))
}

async fn create_subject(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Json(payload): Json<SubjectPayload>,
) -> Result<(StatusCode, Json<Scoped<Subject>>), ApiError> {
    let capabilities =
        require(&state, &context, AccessTarget::Subject, Capability::CreateSubject)?;
    validate_payload(&payload)?;

    let subject = state
        .backend()
        .create_subject(&payload)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to create subject"))?;

    Ok((StatusCode::CREATED, Json(Scoped { record: subject, capabilities })))
}

async fn update_subject(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Path(subject_id): Path<String>,
    Json(payload): Json<SubjectPayload>,
) -> Result<Json<Scoped<Subject>>, ApiError> {
    let capabilities = require(&state, &context, AccessTarget::Subject, Capability::EditSubject)?;
    validate_record_id(&subject_id)?;
    validate_payload(&payload)?;

    let subject = state
        .backend()
        .update_subject(&subject_id, &payload)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to update subject"))?;

    Ok(Json(Scoped { record: subject, capabilities }))
}

async fn delete_subject(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Path(subject_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require(&state, &context, AccessTarget::Subject, Capability::DeleteSubject)?;
    load_subject(&state, &subject_id).await?;

    state
        .backend()
        .delete_subject(&subject_id)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to delete subject"))?;

    tracing::info!(subject_id = %subject_id, username = %context.username, "Subject deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn load_subject(state: &AppState, subject_id: &str) -> Result<Subject, ApiError> {
    validate_record_id(subject_id)?;
    state
        .backend()
        .get_subject(subject_id)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to load subject"))?
        .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))
}
