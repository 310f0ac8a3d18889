// src/handlers/customers.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
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
    models::customer::Customer,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCustomerPayload {
    #[validate(length(min = 1, max = 200, message = "Le nom du client est obligatoire."))]
    #[schema(example = "Boulangerie Martin")]
    pub name: String,

    #[validate(email(message = "Adresse e-mail invalide."))]
    #[schema(example = "compta@boulangerie-martin.fr")]
    pub email: Option<String>,

    #[validate(length(max = 500))]
    pub address: Option<String>,

    #[validate(length(max = 32))]
    #[schema(example = "FR83404833048")]
    pub vat_number: Option<String>,
}

// POST /api/customers
#[utoipa::path(
    post,
    path = "/api/customers",
    tag = "Customers",
    request_body = CreateCustomerPayload,
    responses(
        (status = 201, description = "Cliente criado", body = Customer),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Sem permissão billing:write")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    _guard: RequirePermission<PermBillingWrite>,
    Json(payload): Json<CreateCustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let customer = app_state
        .customer_repo
        .create_customer(
            &mut *rls_conn,
            &org,
            &payload.name,
            payload.email.as_deref(),
            payload.address.as_deref(),
            payload.vat_number.as_deref(),
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(customer)))
}

// GET /api/customers
#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "Customers",
    responses(
        (status = 200, description = "Clientes da organização", body = Vec<Customer>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let customers = app_state
        .customer_repo
        .list_customers(&mut *rls_conn, &org)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customers)))
}

// GET /api/customers/{id}
#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente", body = Customer),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    Path(customer_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let customer = app_state
        .customer_repo
        .find_customer(&mut *rls_conn, &org, customer_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customer)))
}
