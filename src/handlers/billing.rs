// src/handlers/billing.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        organization::OrganizationContext,
        rbac::{PermBillingManage, RequirePermission},
    },
    models::organization::BillingInfo,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutPayload {
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "pro")]
    pub plan: String,

    #[validate(length(min = 1, max = 255))]
    #[schema(example = "price_1PqRsTuVwXyZ")]
    pub price_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    #[schema(example = "https://checkout.stripe.com/c/pay/cs_test_a1b2c3")]
    pub url: String,
}

// GET /api/billing
#[utoipa::path(
    get,
    path = "/api/billing",
    tag = "Billing",
    responses(
        (status = 200, description = "Plano e status da assinatura", body = BillingInfo)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_billing(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrganizationContext,
) -> Result<impl IntoResponse, ApiError> {
    let info = app_state
        .billing_service
        .billing_info(&org)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(info)))
}

// POST /api/billing/checkout
#[utoipa::path(
    post,
    path = "/api/billing/checkout",
    tag = "Billing",
    request_body = CheckoutPayload,
    responses(
        (status = 200, description = "URL da sessão de checkout do provedor", body = CheckoutResponse),
        (status = 403, description = "Só o owner gerencia a assinatura"),
        (status = 500, description = "Falha no provedor de pagamentos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_checkout(
    State(app_state): State<AppState>,
    locale: Locale,
    org: OrganizationContext,
    _guard: RequirePermission<PermBillingManage>,
    Json(payload): Json<CheckoutPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let url = app_state
        .billing_service
        .create_checkout(&org, &payload.plan, &payload.price_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(CheckoutResponse { url })))
}
