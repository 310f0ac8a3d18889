// src/db/leave_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    middleware::organization::OrganizationContext,
    models::leave::{LeaveRequest, LeaveStatus, LeaveType},
};

#[derive(Clone, Default)]
pub struct LeaveRepository;

impl LeaveRepository {
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_request<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        employee_id: Uuid,
        leave_type: LeaveType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        days: i32,
        comment: Option<&str>,
    ) -> Result<LeaveRequest, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, LeaveRequest>(
            r#"
            INSERT INTO leave_requests (
                organization_id, employee_id, leave_type, start_date, end_date, days, comment
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(org.organization_id)
        .bind(employee_id)
        .bind(leave_type)
        .bind(start_date)
        .bind(end_date)
        .bind(days)
        .bind(comment)
        .fetch_one(executor)
        .await?;

        Ok(request)
    }

    /// Filtros opcionais: `NULL` no parâmetro desliga o filtro.
    pub async fn list_requests<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        status: Option<LeaveStatus>,
        employee_id: Option<Uuid>,
    ) -> Result<Vec<LeaveRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let requests = sqlx::query_as::<_, LeaveRequest>(
            r#"
            SELECT * FROM leave_requests
            WHERE organization_id = $1
              AND ($2::leave_status IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR employee_id = $3)
            ORDER BY start_date DESC, created_at DESC
            "#,
        )
        .bind(org.organization_id)
        .bind(status)
        .bind(employee_id)
        .fetch_all(executor)
        .await?;

        Ok(requests)
    }

    pub async fn find_request<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        request_id: Uuid,
    ) -> Result<LeaveRequest, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, LeaveRequest>(
            "SELECT * FROM leave_requests WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        )
        .bind(request_id)
        .bind(org.organization_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::ResourceNotFound(format!("leave request {request_id}")))
    }

    /// Grava a decisão. Só afeta pedidos ainda pendentes; `None` significa
    /// que alguém decidiu antes.
    pub async fn record_decision<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        request_id: Uuid,
        status: LeaveStatus,
        approver_id: Uuid,
        comment: Option<&str>,
    ) -> Result<Option<LeaveRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, LeaveRequest>(
            r#"
            UPDATE leave_requests SET
                status = $3,
                approver_id = $4,
                comment = COALESCE($5, comment),
                decided_at = NOW()
            WHERE id = $1 AND organization_id = $2 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(org.organization_id)
        .bind(status)
        .bind(approver_id)
        .bind(comment)
        .fetch_optional(executor)
        .await?;

        Ok(request)
    }

    /// Pedidos aprovados que tocam o intervalo `[from, to]`.
    pub async fn list_approved_overlapping<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<LeaveRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let requests = sqlx::query_as::<_, LeaveRequest>(
            r#"
            SELECT * FROM leave_requests
            WHERE organization_id = $1
              AND status = 'approved'
              AND start_date <= $3
              AND end_date >= $2
            "#,
        )
        .bind(org.organization_id)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;

        Ok(requests)
    }
}
