// src/handlers/payroll.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

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
        rbac::{PermHrManage, RequirePermission},
    },
    models::document::DocumentLink,
    services::payroll_service::parse_month,
};

fn validate_month(month: &str) -> Result<(), ValidationError> {
    parse_month(month)
        .map(|_| ())
        .map_err(|_| ValidationError::new("month_format"))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PayrollExportPayload {
    #[validate(custom(function = "validate_month"))]
    #[schema(example = "2026-09")]
    pub month: String,
}

// POST /api/payroll/exports
#[utoipa::path(
    post,
    path = "/api/payroll/exports",
    tag = "Payroll",
    request_body = PayrollExportPayload,
    responses(
        (status = 201, description = "CSV gerado; URL assinada válida por 15 minutos", body = DocumentLink),
        (status = 400, description = "Mês inválido (YYYY-MM)")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_payroll(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    _guard: RequirePermission<PermHrManage>,
    Json(payload): Json<PayrollExportPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let link = app_state
        .payroll_service
        .export_month(
            &mut *rls_conn,
            &org,
            &payload.month,
            &app_state.url_signer,
            Utc::now().timestamp(),
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(link)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_must_be_year_dash_month() {
        assert!(PayrollExportPayload { month: "2026-09".into() }.validate().is_ok());

        let errors = PayrollExportPayload { month: "09/2026".into() }.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("month"));
    }
}
