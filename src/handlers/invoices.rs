// src/handlers/invoices.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
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
        rbac::{PermBillingWrite, PermDocumentsWrite, RequirePermission},
    },
    models::invoice::{CreateInvoiceRequest, Invoice, InvoiceDetail, InvoiceStatus, UpdateInvoiceRequest},
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct InvoiceListQuery {
    /// Filtra pelo status efetivo (inclui `overdue`)
    pub status: Option<InvoiceStatus>,
}

// POST /api/invoices
#[utoipa::path(
    post,
    path = "/api/invoices",
    tag = "Invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Fatura criada em rascunho com número FAC-<ano>-<seq>", body = InvoiceDetail),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_invoice(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    _guard: RequirePermission<PermBillingWrite>,
    Json(payload): Json<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .invoice_service
        .create_invoice(&mut *rls_conn, &org, &payload, Utc::now().date_naive())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(detail)))
}

// GET /api/invoices
#[utoipa::path(
    get,
    path = "/api/invoices",
    tag = "Invoices",
    params(InvoiceListQuery),
    responses(
        (status = 200, description = "Faturas, mais recentes primeiro", body = Vec<Invoice>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_invoices(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    Query(query): Query<InvoiceListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let invoices = app_state
        .invoice_service
        .list_invoices(&mut *rls_conn, &org, query.status, Utc::now().date_naive())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(invoices)))
}

// GET /api/invoices/{id}
#[utoipa::path(
    get,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Fatura com linhas, pagamentos e saldo", body = InvoiceDetail),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_invoice(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .invoice_service
        .get_invoice(&mut *rls_conn, &org, invoice_id, Utc::now().date_naive())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

// PUT /api/invoices/{id}
#[utoipa::path(
    put,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    request_body = UpdateInvoiceRequest,
    responses(
        (status = 200, description = "Fatura atualizada; totais recalculados", body = InvoiceDetail),
        (status = 400, description = "Fatura bloqueada (enviada, paga, vencida ou cancelada)")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_invoice(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    _guard: RequirePermission<PermBillingWrite>,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<UpdateInvoiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .invoice_service
        .update_invoice(&mut *rls_conn, &org, invoice_id, &payload, Utc::now().date_naive())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

// DELETE /api/invoices/{id}
#[utoipa::path(
    delete,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 204, description = "Fatura removida"),
        (status = 400, description = "Apenas rascunhos e faturas canceladas podem ser removidos"),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_invoice(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    _guard: RequirePermission<PermBillingWrite>,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .invoice_service
        .delete_invoice(&mut *rls_conn, &org, invoice_id, Utc::now().date_naive())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/invoices/{id}/send
#[utoipa::path(
    post,
    path = "/api/invoices/{id}/send",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Fatura marcada como enviada", body = Invoice),
        (status = 400, description = "Só rascunhos podem ser enviados")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_invoice(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    _guard: RequirePermission<PermBillingWrite>,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let invoice = app_state
        .invoice_service
        .send_invoice(&mut *rls_conn, &org, invoice_id, Utc::now().date_naive())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(invoice)))
}

// POST /api/invoices/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/invoices/{id}/cancel",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Fatura cancelada", body = Invoice),
        (status = 400, description = "Fatura paga ou já cancelada")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_invoice(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    _guard: RequirePermission<PermBillingWrite>,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let invoice = app_state
        .invoice_service
        .cancel_invoice(&mut *rls_conn, &org, invoice_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(invoice)))
}

// GET /api/invoices/{id}/pdf
#[utoipa::path(
    get,
    path = "/api/invoices/{id}/pdf",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "PDF da fatura (application/pdf)"),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn invoice_pdf(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    _guard: RequirePermission<PermDocumentsWrite>,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let (number, pdf) = app_state
        .document_service
        .generate_invoice_pdf(&mut *rls_conn, &org, invoice_id, Utc::now().date_naive())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{number}.pdf\"")),
    ];

    Ok((headers, pdf))
}
