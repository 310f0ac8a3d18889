// src/handlers/settings.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use uuid::Uuid; // Importante para o Swagger params
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
    models::settings::{OrganizationSettings, UpdateSettingsRequest},
};

// GET /api/settings
#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "Settings",
    responses(
        (status = 200, description = "Dados legais e de faturação da organização", body = OrganizationSettings)
    ),
    params(("x-organization-id" = Option<Uuid>, Header, description = "Organização (opcional)")),
    security(("api_jwt" = []))
)]
pub async fn get_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
) -> Result<impl IntoResponse, ApiError> {
    // Obtém conexão segura com RLS
    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let settings = app_state
        .settings_repo
        .get_settings(&mut *rls_conn, &org)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(settings)))
}

// PUT /api/settings
#[utoipa::path(
    put,
    path = "/api/settings",
    tag = "Settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Configurações salvas", body = OrganizationSettings),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Sem permissão billing:write")
    ),
    params(("x-organization-id" = Option<Uuid>, Header, description = "Organização (opcional)")),
    security(("api_jwt" = []))
)]
pub async fn update_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    _guard: RequirePermission<PermBillingWrite>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let updated = app_state
        .settings_repo
        .upsert_settings(&mut *rls_conn, &org, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(updated)))
}
