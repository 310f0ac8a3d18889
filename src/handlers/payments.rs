// src/handlers/payments.rs

use axum::{
    extract::{Query, State},
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
        rbac::{PermBillingWrite, RequirePermission},
    },
    models::payment::{Payment, PaymentReceipt, RecordPaymentRequest},
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct PaymentListQuery {
    pub invoice_id: Option<Uuid>,
}

// POST /api/payments
#[utoipa::path(
    post,
    path = "/api/payments",
    tag = "Payments",
    request_body = RecordPaymentRequest,
    responses(
        (status = 201, description = "Pagamento registrado e fatura reconciliada", body = PaymentReceipt),
        (status = 400, description = "Valor inválido ou fatura cancelada"),
        (status = 404, description = "Fatura não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn record_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    _guard: RequirePermission<PermBillingWrite>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let receipt = app_state
        .payment_service
        .record_payment(
            &mut *rls_conn,
            &org,
            payload.invoice_id,
            payload.amount,
            payload.method,
            payload.paid_at,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

// GET /api/payments
#[utoipa::path(
    get,
    path = "/api/payments",
    tag = "Payments",
    params(PaymentListQuery),
    responses(
        (status = 200, description = "Pagamentos, mais recentes primeiro", body = Vec<Payment>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_payments(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    Query(query): Query<PaymentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let payments = app_state
        .payment_service
        .list_payments(&mut *rls_conn, &org, query.invoice_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(payments)))
}
