// src/handlers/employees.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
        validation::validate_not_negative,
    },
    config::AppState,
    db::employee_repo::EmployeeFields,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        organization::OrganizationContext,
        rbac::{PermHrManage, RequirePermission},
    },
    models::employee::Employee,
};

/// Cadastro completo, usado no POST e no PUT.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EmployeePayload {
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Camille")]
    pub first_name: String,

    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Lefèvre")]
    pub last_name: String,

    #[validate(email(message = "Adresse e-mail invalide."))]
    #[schema(example = "camille.lefevre@atelier-dupont.fr")]
    pub email: String,

    #[validate(length(max = 100))]
    pub job_title: Option<String>,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "3200.00")]
    pub monthly_salary: Decimal,

    #[schema(value_type = String, format = Date, example = "2024-09-02")]
    pub hired_at: NaiveDate,
}

impl EmployeePayload {
    fn fields(&self) -> EmployeeFields<'_> {
        EmployeeFields {
            first_name: &self.first_name,
            last_name: &self.last_name,
            email: &self.email,
            job_title: self.job_title.as_deref(),
            monthly_salary: self.monthly_salary,
            hired_at: self.hired_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeListQuery {
    /// Inclui funcionários desligados
    #[serde(default)]
    pub include_inactive: bool,
}

// POST /api/employees
#[utoipa::path(
    post,
    path = "/api/employees",
    tag = "Employees",
    request_body = EmployeePayload,
    responses(
        (status = 201, description = "Funcionário cadastrado", body = Employee),
        (status = 409, description = "E-mail já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_employee(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    _guard: RequirePermission<PermHrManage>,
    Json(payload): Json<EmployeePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let employee = app_state
        .employee_repo
        .create_employee(&mut *rls_conn, &org, &payload.fields())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    tracing::info!(organization_id = %org.organization_id, employee_id = %employee.id, "Funcionário cadastrado");

    Ok((StatusCode::CREATED, Json(employee)))
}

// GET /api/employees
#[utoipa::path(
    get,
    path = "/api/employees",
    tag = "Employees",
    params(EmployeeListQuery),
    responses(
        (status = 200, description = "Funcionários por sobrenome", body = Vec<Employee>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_employees(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    Query(query): Query<EmployeeListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let employees = app_state
        .employee_repo
        .list_employees(&mut *rls_conn, &org, !query.include_inactive)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(employees)))
}

// GET /api/employees/{id}
#[utoipa::path(
    get,
    path = "/api/employees/{id}",
    tag = "Employees",
    params(("id" = Uuid, Path, description = "ID do funcionário")),
    responses(
        (status = 200, description = "Funcionário", body = Employee),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_employee(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    Path(employee_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let employee = app_state
        .employee_repo
        .find_employee(&mut *rls_conn, &org, employee_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(employee)))
}

// PUT /api/employees/{id}
#[utoipa::path(
    put,
    path = "/api/employees/{id}",
    tag = "Employees",
    params(("id" = Uuid, Path, description = "ID do funcionário")),
    request_body = EmployeePayload,
    responses(
        (status = 200, description = "Cadastro atualizado", body = Employee),
        (status = 404, description = "Não encontrado"),
        (status = 409, description = "E-mail já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_employee(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    _guard: RequirePermission<PermHrManage>,
    Path(employee_id): Path<Uuid>,
    Json(payload): Json<EmployeePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let employee = app_state
        .employee_repo
        .update_employee(&mut *rls_conn, &org, employee_id, &payload.fields())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(employee)))
}

// DELETE /api/employees/{id}
// Exclusão lógica: o histórico de férias continua referenciando o cadastro
#[utoipa::path(
    delete,
    path = "/api/employees/{id}",
    tag = "Employees",
    params(("id" = Uuid, Path, description = "ID do funcionário")),
    responses(
        (status = 204, description = "Funcionário desligado"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn deactivate_employee(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
    _guard: RequirePermission<PermHrManage>,
    Path(employee_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .employee_repo
        .deactivate_employee(&mut *rls_conn, &org, employee_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
