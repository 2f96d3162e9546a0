use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::guards::{require, CurrentUser};
use crate::api::validation::{validate_payload, validate_record_id};
use crate::core::metrics;
use crate::core::state::AppState;
use crate::schemas::report_card::ReportCardView;
use crate::schemas::student::{Student, StudentPayload};
use crate::schemas::Scoped;
use crate::services::access_control::{AccessTarget, AuthContext, Capability, CapabilitySet};
use crate::services::report_card::{build_report_card, ReportCardError};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    pub(crate) search: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_students).post(create_student))
        .route("/:id", get(get_student).put(update_student).delete(delete_student))
        .route("/:id/report-card", get(report_card))
}

/// Loads a student the caller may see. Students outside the caller's view are reported as
/// missing rather than forbidden.
pub(crate) async fn load_visible_student(
    state: &AppState,
    context: &AuthContext,
    student_id: &str,
) -> Result<(Student, CapabilitySet), ApiError> {
    validate_record_id(student_id)?;

    let student = state
        .backend()
        .get_student(student_id)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to load student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    let capabilities = state.evaluator().evaluate(context, AccessTarget::Student(&student));
    if !capabilities.contains(Capability::View) {
        return Err(ApiError::NotFound("Student not found".to_string()));
    }

    Ok((student, capabilities))
}

/// Like [`load_visible_student`] but also demands `capability` on the record.
pub(crate) async fn load_student_for(
    state: &AppState,
    context: &AuthContext,
    student_id: &str,
    capability: Capability,
) -> Result<(Student, CapabilitySet), ApiError> {
    let (student, _) = load_visible_student(state, context, student_id).await?;
    let capabilities = require(state, context, AccessTarget::Student(&student), capability)?;
    Ok((student, capabilities))
}

async fn list_students(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<Scoped<Student>>>, ApiError> {
    let students = state
        .backend()
        .list_students()
        .await
        .map_err(|e| ApiError::backend(e, "Failed to list students"))?;

    let search = params.search.unwrap_or_default();
    let matching: Vec<Student> =
        students.into_iter().filter(|student| student.matches_search(&search)).collect();

    let evaluator = state.evaluator();
    let response = evaluator
        .visible_students(&context, matching)
        .into_iter()
        .map(|student| {
            let capabilities = evaluator.evaluate(&context, AccessTarget::Student(&student));
            Scoped { record: student, capabilities }
        })
        .collect();

    Ok(Json(response))
}

async fn create_student(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Json(payload): Json<StudentPayload>,
) -> Result<(StatusCode, Json<Scoped<Student>>), ApiError> {
    require(&state, &context, AccessTarget::Collection, Capability::CreateStudent)?;
    validate_payload(&payload)?;

    let student = state
        .backend()
        .create_student(&payload)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to create student"))?;

    tracing::info!(student_id = %student.id, username = %context.username, "Student created");

    let capabilities = state.evaluator().evaluate(&context, AccessTarget::Student(&student));
    Ok((StatusCode::CREATED, Json(Scoped { record: student, capabilities })))
}

async fn get_student(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Path(student_id): Path<String>,
) -> Result<Json<Scoped<Student>>, ApiError> {
    let (student, capabilities) = load_visible_student(&state, &context, &student_id).await?;
    Ok(Json(Scoped { record: student, capabilities }))
}

async fn update_student(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Path(student_id): Path<String>,
    Json(payload): Json<StudentPayload>,
) -> Result<Json<Scoped<Student>>, ApiError> {
    load_student_for(&state, &context, &student_id, Capability::EditStudent).await?;
    validate_payload(&payload)?;

    let student = state
        .backend()
        .update_student(&student_id, &payload)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to update student"))?;

    let capabilities = state.evaluator().evaluate(&context, AccessTarget::Student(&student));
    Ok(Json(Scoped { record: student, capabilities }))
}

async fn delete_student(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Path(student_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    load_student_for(&state, &context, &student_id, Capability::DeleteStudent).await?;

    state
        .backend()
        .delete_student(&student_id)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to delete student"))?;

    tracing::info!(student_id = %student_id, username = %context.username, "Student deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn report_card(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Path(student_id): Path<String>,
) -> Result<Json<ReportCardView>, ApiError> {
    let (student, _) =
        load_student_for(&state, &context, &student_id, Capability::ViewReportCard).await?;

    let backend = state.backend();
    let fetched = tokio::try_join!(
        backend.grades_for_student(&student_id),
        backend.attendance_for_student(&student_id),
        backend.observed_values_for_student(&student_id),
    );
    let (grades, attendance, observed_values) = fetched.map_err(|e| {
        metrics::record_report_card("failed");
        ApiError::backend(e, "Failed to load report card records")
    })?;

    let view = build_report_card(Some(&student), &grades, &attendance, &observed_values)
        .map_err(|err| match err {
            ReportCardError::MissingStudent => ApiError::NotFound("Student not found".to_string()),
        })?;

    metrics::record_report_card("built");
    tracing::debug!(
        student_id = %student_id,
        grades = view.grades.len(),
        months = view.attendance.len(),
        "Report card built"
    );
    Ok(Json(view))
}
