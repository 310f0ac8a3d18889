// src/handlers/leave_requests.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        organization::OrganizationContext,
        rbac::{PermHrApprove, PermHrWrite, RequirePermission},
    },
    models::leave::{CreateLeaveRequest, DecideLeaveRequest, LeaveRequest, LeaveStatus},
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct LeaveListQuery {
    pub status: Option<LeaveStatus>,
    pub employee_id: Option<Uuid>,
}

// POST /api/leave-requests
#[utoipa::path(
    post,
    path = "/api/leave-requests",
    tag = "Leave",
    request_body = CreateLeaveRequest,
    responses(
        (status = 201, description = "Pedido criado como pendente; dias corridos inclusivos", body = LeaveRequest),
        (status = 400, description = "Período inválido"),
        (status = 404, description = "Funcionário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_leave_request(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    _guard: RequirePermission<PermHrWrite>,
    Json(payload): Json<CreateLeaveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let request = app_state
        .leave_service
        .create_request(&mut *rls_conn, &org, &user, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(request)))
}

// GET /api/leave-requests
#[utoipa::path(
    get,
    path = "/api/leave-requests",
    tag = "Leave",
    params(LeaveListQuery),
    responses(
        (status = 200, description = "Pedidos de férias", body = Vec<LeaveRequest>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_leave_requests(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    Query(query): Query<LeaveListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let requests = app_state
        .leave_service
        .list_requests(&mut *rls_conn, &org, query.status, query.employee_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(requests)))
}

async fn decide(
    app_state: AppState,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    request_id: Uuid,
    decision: LeaveStatus,
    payload: Option<DecideLeaveRequest>,
) -> Result<LeaveRequest, ApiError> {
    let payload = payload.unwrap_or_default();
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .leave_service
        .decide(&mut *rls_conn, &org, request_id, decision, &user, payload.comment.as_deref())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))
}

// POST /api/leave-requests/{id}/approve
#[utoipa::path(
    post,
    path = "/api/leave-requests/{id}/approve",
    tag = "Leave",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body(content = DecideLeaveRequest, description = "Comentário opcional"),
    responses(
        (status = 200, description = "Pedido aprovado", body = LeaveRequest),
        (status = 400, description = "Pedido já decidido"),
        (status = 403, description = "Sem permissão hr:approve")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_leave_request(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    _guard: RequirePermission<PermHrApprove>,
    Path(request_id): Path<Uuid>,
    payload: Option<Json<DecideLeaveRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = payload.map(|Json(p)| p);
    let decided = decide(app_state, locale, user, org, request_id, LeaveStatus::Approved, payload).await?;

    Ok((StatusCode::OK, Json(decided)))
}

// POST /api/leave-requests/{id}/reject
#[utoipa::path(
    post,
    path = "/api/leave-requests/{id}/reject",
    tag = "Leave",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body(content = DecideLeaveRequest, description = "Comentário opcional"),
    responses(
        (status = 200, description = "Pedido recusado", body = LeaveRequest),
        (status = 400, description = "Pedido já decidido"),
        (status = 403, description = "Sem permissão hr:approve")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_leave_request(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    _guard: RequirePermission<PermHrApprove>,
    Path(request_id): Path<Uuid>,
    payload: Option<Json<DecideLeaveRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = payload.map(|Json(p)| p);
    let decided = decide(app_state, locale, user, org, request_id, LeaveStatus::Rejected, payload).await?;

    Ok((StatusCode::OK, Json(decided)))
}
