// src/handlers/users.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::MeResponse,
};

// GET /api/users/me
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Identidade do token e organizações", body = MeResponse),
        (status = 401, description = "Token ausente ou inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let organizations = app_state
        .organization_service
        .list_for_user(&user)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(MeResponse { user: user.0, organizations })))
}
