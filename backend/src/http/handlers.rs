//! HTTP handlers for the REST API.
//!
//! Each handler parses its request, delegates to the [`PollingGateway`]
//! and shapes the result. No handler keeps per-client state.
//!
//! [`PollingGateway`]: crate::services::PollingGateway

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use tracing::debug;

use super::dto::{
    AssignWindowRequest, CancelRescheduleRequest, HealthResponse, RescheduleDto,
    RescheduleListQuery, RescheduleListResponse, RescheduleResponse,
    ValidateRescheduleResponse, WindowResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::models::{AccessDecision, AssessmentId, RescheduleId, ScheduleKey, StudentProfileId};
use crate::services::RescheduleRequest;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

type KeyPath = Result<Path<(AssessmentId, StudentProfileId)>, PathRejection>;

fn schedule_key(path: KeyPath) -> Result<ScheduleKey, AppError> {
    let Path((assessment_id, student_profile_id)) =
        path.map_err(|e| AppError::BadRequest(format!("Invalid path: {}", e.body_text())))?;
    Ok(ScheduleKey {
        assessment_id,
        student_profile_id,
    })
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e.body_text())))
}

fn reschedule_id(
    path: Result<Path<RescheduleId>, PathRejection>,
) -> Result<RescheduleId, AppError> {
    path.map(|Path(id)| id)
        .map_err(|e| AppError::BadRequest(format!("Invalid reschedule id: {}", e.body_text())))
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let repository = match state.gateway.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        repository,
    }))
}

// =============================================================================
// Windows
// =============================================================================

/// PUT /v1/windows/{assessment_id}/{student_id}
///
/// Assign the default window. Fails with 409 if the key already has one.
pub async fn assign_window(
    State(state): State<AppState>,
    path: KeyPath,
    body: Result<Json<AssignWindowRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<WindowResponse>), AppError> {
    let key = schedule_key(path)?;
    let request = json_body(body)?;
    let stored = state.gateway.assign_window(key, request.window_start).await?;
    Ok((StatusCode::CREATED, Json(WindowResponse::new(key, stored))))
}

/// GET /v1/windows/{assessment_id}/{student_id}
pub async fn get_window(
    State(state): State<AppState>,
    path: KeyPath,
) -> HandlerResult<WindowResponse> {
    let key = schedule_key(path)?;
    let stored = state
        .gateway
        .get_window(key)
        .await
        .map_err(AppError::window_lookup)?;
    Ok(Json(WindowResponse::new(key, stored)))
}

/// GET /v1/windows/{assessment_id}/{student_id}/reschedules
pub async fn window_history(
    State(state): State<AppState>,
    path: KeyPath,
) -> HandlerResult<RescheduleListResponse> {
    let key = schedule_key(path)?;
    let entries = state.gateway.window_history(key).await?;
    Ok(Json(entries.into()))
}

// =============================================================================
// Access
// =============================================================================

/// GET /v1/access/{assessment_id}/{student_id}
///
/// Polled by clients; read-only.
pub async fn check_access(
    State(state): State<AppState>,
    path: KeyPath,
) -> HandlerResult<AccessDecision> {
    let key = schedule_key(path)?;
    let decision = state
        .gateway
        .check_access(key.assessment_id, key.student_profile_id)
        .await
        .map_err(AppError::window_lookup)?;
    Ok(Json(decision))
}

// =============================================================================
// Reschedules
// =============================================================================

/// POST /v1/reschedules
pub async fn create_reschedule(
    State(state): State<AppState>,
    body: Result<Json<RescheduleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RescheduleResponse>), AppError> {
    let request = json_body(body)?;
    debug!(
        "Reschedule requested for {} by teacher {}",
        request.schedule_key, request.teacher_id
    );
    let applied = state.gateway.propose_reschedule(&request).await?;
    Ok((StatusCode::CREATED, Json(applied.into())))
}

/// POST /v1/reschedules/validate
///
/// Dry run: returns the report with 200 even when it has errors.
pub async fn validate_reschedule(
    State(state): State<AppState>,
    body: Result<Json<RescheduleRequest>, JsonRejection>,
) -> HandlerResult<ValidateRescheduleResponse> {
    let request = json_body(body)?;
    let report = state.gateway.validate_reschedule(&request).await?;
    Ok(Json(report.into()))
}

/// POST /v1/reschedules/{id}/cancel
///
/// The body is optional; an empty body cancels without a reason.
pub async fn cancel_reschedule(
    State(state): State<AppState>,
    path: Result<Path<RescheduleId>, PathRejection>,
    body: Option<Json<CancelRescheduleRequest>>,
) -> HandlerResult<RescheduleDto> {
    let id = reschedule_id(path)?;
    let reason = body.and_then(|Json(request)| request.reason);
    let cancelled = state.gateway.cancel_reschedule(id, reason).await?;
    Ok(Json(cancelled.into()))
}

/// GET /v1/reschedules/{id}
pub async fn get_reschedule(
    State(state): State<AppState>,
    path: Result<Path<RescheduleId>, PathRejection>,
) -> HandlerResult<RescheduleDto> {
    let id = reschedule_id(path)?;
    let reschedule = state.gateway.get_reschedule(id).await?;
    Ok(Json(reschedule.into()))
}

/// GET /v1/reschedules?teacherId=&studentId=
///
/// `teacherId` narrows to one teacher (optionally one student); `studentId`
/// alone lists every reschedule affecting that student.
pub async fn list_reschedules(
    State(state): State<AppState>,
    query: Result<Query<RescheduleListQuery>, QueryRejection>,
) -> HandlerResult<RescheduleListResponse> {
    let Query(query) =
        query.map_err(|e| AppError::BadRequest(format!("Invalid query: {}", e.body_text())))?;

    let entries = match (query.teacher_id, query.student_id) {
        (Some(teacher), student) => state.gateway.teacher_reschedules(teacher, student).await?,
        (None, Some(student)) => state.gateway.student_reschedules(student).await?,
        (None, None) => {
            return Err(AppError::BadRequest(
                "teacherId or studentId is required".to_string(),
            ))
        }
    };
    Ok(Json(entries.into()))
}

/// GET /v1/students/{id}/reschedules
pub async fn student_reschedules(
    State(state): State<AppState>,
    path: Result<Path<StudentProfileId>, PathRejection>,
) -> HandlerResult<RescheduleListResponse> {
    let Path(student) =
        path.map_err(|e| AppError::BadRequest(format!("Invalid student id: {}", e.body_text())))?;
    let entries = state.gateway.student_reschedules(student).await?;
    Ok(Json(entries.into()))
}
