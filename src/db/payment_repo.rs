// src/db/payment_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    middleware::organization::OrganizationContext,
    models::payment::{Payment, PaymentMethod},
};

// Somente inserção e leitura: o histórico de pagamentos é imutável.
#[derive(Clone, Default)]
pub struct PaymentRepository;

impl PaymentRepository {
    pub async fn insert_payment<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
        amount: Decimal,
        method: PaymentMethod,
        paid_at: DateTime<Utc>,
    ) -> Result<Payment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (organization_id, invoice_id, amount, method, paid_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(org.organization_id)
        .bind(invoice_id)
        .bind(amount)
        .bind(method)
        .bind(paid_at)
        .fetch_one(executor)
        .await?;

        Ok(payment)
    }

    pub async fn list_for_invoice<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
    ) -> Result<Vec<Payment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE invoice_id = $1 AND organization_id = $2
            ORDER BY paid_at ASC, created_at ASC
            "#,
        )
        .bind(invoice_id)
        .bind(org.organization_id)
        .fetch_all(executor)
        .await?;

        Ok(payments)
    }

    pub async fn list_payments<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
    ) -> Result<Vec<Payment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE organization_id = $1 ORDER BY paid_at DESC",
        )
        .bind(org.organization_id)
        .fetch_all(executor)
        .await?;

        Ok(payments)
    }

    pub async fn sum_for_invoice<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
    ) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0)::numeric
            FROM payments
            WHERE invoice_id = $1 AND organization_id = $2
            "#,
        )
        .bind(invoice_id)
        .bind(org.organization_id)
        .fetch_one(executor)
        .await?;

        Ok(total)
    }
}
