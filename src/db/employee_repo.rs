// src/db/employee_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    middleware::organization::OrganizationContext,
    models::employee::Employee,
};

/// Dados de cadastro, usados tanto na criação quanto na edição.
#[derive(Debug, Clone)]
pub struct EmployeeFields<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub job_title: Option<&'a str>,
    pub monthly_salary: Decimal,
    pub hired_at: NaiveDate,
}

#[derive(Clone, Default)]
pub struct EmployeeRepository;

impl EmployeeRepository {
    pub async fn create_employee<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        fields: &EmployeeFields<'_>,
    ) -> Result<Employee, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Employee>(
            r#"
            INSERT INTO employees (
                organization_id, first_name, last_name, email, job_title, monthly_salary, hired_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(org.organization_id)
        .bind(fields.first_name)
        .bind(fields.last_name)
        .bind(fields.email)
        .bind(fields.job_title)
        .bind(fields.monthly_salary)
        .bind(fields.hired_at)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, fields.email))
    }

    pub async fn update_employee<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        employee_id: Uuid,
        fields: &EmployeeFields<'_>,
    ) -> Result<Employee, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Employee>(
            r#"
            UPDATE employees SET
                first_name = $3,
                last_name = $4,
                email = $5,
                job_title = $6,
                monthly_salary = $7,
                hired_at = $8
            WHERE id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(employee_id)
        .bind(org.organization_id)
        .bind(fields.first_name)
        .bind(fields.last_name)
        .bind(fields.email)
        .bind(fields.job_title)
        .bind(fields.monthly_salary)
        .bind(fields.hired_at)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, fields.email))?
        .ok_or_else(|| not_found(employee_id))
    }

    pub async fn find_employee<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        employee_id: Uuid,
    ) -> Result<Employee, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees WHERE id = $1 AND organization_id = $2",
        )
        .bind(employee_id)
        .bind(org.organization_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| not_found(employee_id))
    }

    /// `active_only` esconde os desligados (exclusão lógica).
    pub async fn list_employees<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        active_only: bool,
    ) -> Result<Vec<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let employees = sqlx::query_as::<_, Employee>(
            r#"
            SELECT * FROM employees
            WHERE organization_id = $1 AND (is_active OR NOT $2)
            ORDER BY last_name ASC, first_name ASC
            "#,
        )
        .bind(org.organization_id)
        .bind(active_only)
        .fetch_all(executor)
        .await?;

        Ok(employees)
    }

    pub async fn deactivate_employee<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        employee_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE employees SET is_active = FALSE WHERE id = $1 AND organization_id = $2",
        )
        .bind(employee_id)
        .bind(org.organization_id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(employee_id));
        }
        Ok(())
    }
}

fn not_found(employee_id: Uuid) -> AppError {
    AppError::ResourceNotFound(format!("employee {employee_id}"))
}
