//! Per-student grade, attendance and observed-value records.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::students::{load_student_for, load_visible_student};
use crate::api::validation::{validate_payload, validate_record_id};
use crate::core::state::AppState;
use crate::schemas::attendance::{AttendancePayload, AttendanceRecord};
use crate::schemas::grade::{GradePayload, GradeRecord};
use crate::schemas::observed_value::{ObservedValuePayload, ObservedValueRecord};
use crate::services::access_control::Capability;

pub(crate) fn grades_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_grade))
        .route("/:id", put(update_grade))
        .route("/student/:student_id", get(list_grades))
}

pub(crate) fn attendance_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_attendance))
        .route("/student/:student_id", get(list_attendance))
}

pub(crate) fn observed_values_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_observed_value))
        .route("/student/:student_id", get(list_observed_values))
}

async fn list_grades(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<GradeRecord>>, ApiError> {
    load_visible_student(&state, &context, &student_id).await?;

    let grades = state
        .backend()
        .grades_for_student(&student_id)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to load grades"))?;

    Ok(Json(grades))
}

async fn create_grade(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Json(payload): Json<GradePayload>,
) -> Result<(StatusCode, Json<GradeRecord>), ApiError> {
    validate_payload(&payload)?;
    validate_record_id(payload.subject_id.as_str())?;
    load_student_for(&state, &context, payload.student_id.as_str(), Capability::CreateGrade)
        .await?;

    let grade = state
        .backend()
        .create_grade(&payload)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to create grade"))?;

    tracing::info!(
        student_id = %payload.student_id,
        subject_id = %payload.subject_id,
        username = %context.username,
        "Grade recorded"
    );
    Ok((StatusCode::CREATED, Json(grade)))
}

async fn update_grade(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Path(grade_id): Path<String>,
    Json(payload): Json<GradePayload>,
) -> Result<Json<GradeRecord>, ApiError> {
    validate_record_id(&grade_id)?;
    validate_payload(&payload)?;
    validate_record_id(payload.subject_id.as_str())?;
    load_student_for(&state, &context, payload.student_id.as_str(), Capability::CreateGrade)
        .await?;

    let grade = state
        .backend()
        .update_grade(&grade_id, &payload)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to update grade"))?;

    Ok(Json(grade))
}

async fn list_attendance(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError> {
    load_visible_student(&state, &context, &student_id).await?;

    let attendance = state
        .backend()
        .attendance_for_student(&student_id)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to load attendance"))?;

    Ok(Json(attendance))
}

async fn create_attendance(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Json(payload): Json<AttendancePayload>,
) -> Result<(StatusCode, Json<AttendanceRecord>), ApiError> {
    validate_payload(&payload)?;
    let payload = payload.normalized();
    load_student_for(&state, &context, payload.student_id.as_str(), Capability::CreateAttendance)
        .await?;

    let record = state
        .backend()
        .create_attendance(&payload)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to record attendance"))?;

    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_observed_values(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<ObservedValueRecord>>, ApiError> {
    load_visible_student(&state, &context, &student_id).await?;

    let values = state
        .backend()
        .observed_values_for_student(&student_id)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to load observed values"))?;

    Ok(Json(values))
}

async fn create_observed_value(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Json(payload): Json<ObservedValuePayload>,
) -> Result<(StatusCode, Json<ObservedValueRecord>), ApiError> {
    validate_payload(&payload)?;
    load_student_for(
        &state,
        &context,
        payload.student_id.as_str(),
        Capability::CreateObservedValue,
    )
    .await?;

    let record = state
        .backend()
        .create_observed_value(&payload)
        .await
        .map_err(|e| ApiError::backend(e, "Failed to record observed value"))?;

    Ok((StatusCode::CREATED, Json(record)))
}
