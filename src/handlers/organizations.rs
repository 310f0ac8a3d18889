// src/handlers/organizations.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::organization::UserOrganization,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrganizationPayload {
    #[validate(length(min = 1, max = 200, message = "Le nom de l'organisation est obligatoire."))]
    #[schema(example = "Atelier Dupont SARL")]
    pub name: String,
}

// POST /api/organizations
#[utoipa::path(
    post,
    path = "/api/organizations",
    tag = "Organizations",
    request_body = CreateOrganizationPayload,
    responses(
        (status = 201, description = "Organização criada; o chamador vira owner", body = UserOrganization),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_organization(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateOrganizationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization = app_state
        .organization_service
        .create_organization(&user, &payload.name)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(organization)))
}

// GET /api/organizations
#[utoipa::path(
    get,
    path = "/api/organizations",
    tag = "Organizations",
    responses(
        (status = 200, description = "Organizações do usuário", body = Vec<UserOrganization>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_my_organizations(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let organizations = app_state
        .organization_service
        .list_for_user(&user)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(organizations)))
}
