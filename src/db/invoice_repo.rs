// src/db/invoice_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    middleware::organization::OrganizationContext,
    models::invoice::{Invoice, InvoiceItem, InvoiceStatus, InvoiceTotals},
};

/// Linha já normalizada (taxa de IVA resolvida) pronta para gravar.
#[derive(Debug, Clone)]
pub struct NewInvoiceItem {
    pub label: String,
    pub qty: Decimal,
    pub unit_price: Decimal,
    pub vat_rate: Decimal,
}

#[derive(Clone, Default)]
pub struct InvoiceRepository;

impl InvoiceRepository {
    // =========================================================================
    //  NUMERAÇÃO
    // =========================================================================

    /// Reserva o próximo número da organização. Deve rodar na mesma
    /// transação que insere a fatura: o lock da linha serializa criações
    /// concorrentes.
    pub async fn next_sequence<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoice_sequences (organization_id, last_value)
            VALUES ($1, 1)
            ON CONFLICT (organization_id)
            DO UPDATE SET last_value = invoice_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(org.organization_id)
        .fetch_one(executor)
        .await?;

        Ok(value)
    }

    // =========================================================================
    //  CABEÇALHO
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_invoice<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        customer_id: Uuid,
        number: &str,
        totals: &InvoiceTotals,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        notes: Option<&str>,
    ) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                organization_id, customer_id, number, status,
                total_ht, total_vat, total_ttc, issue_date, due_date, notes
            )
            VALUES ($1, $2, $3, 'draft', $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(org.organization_id)
        .bind(customer_id)
        .bind(number)
        .bind(totals.total_ht)
        .bind(totals.total_vat)
        .bind(totals.total_ttc)
        .bind(issue_date)
        .bind(due_date)
        .bind(notes)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, number))
    }

    pub async fn find_invoice<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
    ) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE id = $1 AND organization_id = $2",
        )
        .bind(invoice_id)
        .bind(org.organization_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| not_found(invoice_id))
    }

    /// Igual a `find_invoice`, mas trava a linha até o fim da transação.
    pub async fn lock_invoice<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
    ) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        )
        .bind(invoice_id)
        .bind(org.organization_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| not_found(invoice_id))
    }

    pub async fn list_invoices<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
    ) -> Result<Vec<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoices = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE organization_id = $1 ORDER BY created_at DESC",
        )
        .bind(org.organization_id)
        .fetch_all(executor)
        .await?;

        Ok(invoices)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update_invoice<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
        customer_id: Uuid,
        due_date: NaiveDate,
        notes: Option<&str>,
        totals: &InvoiceTotals,
    ) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices SET
                customer_id = $3,
                due_date = $4,
                notes = $5,
                total_ht = $6,
                total_vat = $7,
                total_ttc = $8,
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(invoice_id)
        .bind(org.organization_id)
        .bind(customer_id)
        .bind(due_date)
        .bind(notes)
        .bind(totals.total_ht)
        .bind(totals.total_vat)
        .bind(totals.total_ttc)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| not_found(invoice_id))
    }

    /// Troca o status; `sent_at` só é preenchido na transição para enviada.
    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
        status: InvoiceStatus,
    ) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices SET
                status = $3,
                sent_at = CASE WHEN $3 = 'sent'::invoice_status THEN NOW() ELSE sent_at END,
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(invoice_id)
        .bind(org.organization_id)
        .bind(status)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| not_found(invoice_id))
    }

    pub async fn delete_invoice<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1 AND organization_id = $2")
            .bind(invoice_id)
            .bind(org.organization_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(invoice_id));
        }
        Ok(())
    }

    // =========================================================================
    //  LINHAS
    // =========================================================================

    /// Insere todas as linhas de uma vez (UNNEST), na ordem recebida.
    pub async fn insert_items<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
        items: &[NewInvoiceItem],
    ) -> Result<Vec<InvoiceItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        let qtys: Vec<_> = items.iter().map(|i| i.qty).collect();
        let prices: Vec<_> = items.iter().map(|i| i.unit_price).collect();
        let rates: Vec<_> = items.iter().map(|i| i.vat_rate).collect();

        let rows = sqlx::query_as::<_, InvoiceItem>(
            r#"
            INSERT INTO invoice_items (
                invoice_id, organization_id, label, qty, unit_price, vat_rate, position
            )
            SELECT $1, $2, t.label, t.qty, t.unit_price, t.vat_rate, (t.ord - 1)::int
            FROM UNNEST($3::text[], $4::numeric[], $5::numeric[], $6::numeric[])
                WITH ORDINALITY AS t(label, qty, unit_price, vat_rate, ord)
            RETURNING *
            "#,
        )
        .bind(invoice_id)
        .bind(org.organization_id)
        .bind(labels)
        .bind(qtys)
        .bind(prices)
        .bind(rates)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    pub async fn delete_items<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1 AND organization_id = $2")
            .bind(invoice_id)
            .bind(org.organization_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn list_items<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
    ) -> Result<Vec<InvoiceItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT * FROM invoice_items
            WHERE invoice_id = $1 AND organization_id = $2
            ORDER BY position ASC
            "#,
        )
        .bind(invoice_id)
        .bind(org.organization_id)
        .fetch_all(executor)
        .await?;

        Ok(items)
    }
}

fn not_found(invoice_id: Uuid) -> AppError {
    AppError::ResourceNotFound(format!("invoice {invoice_id}"))
}
