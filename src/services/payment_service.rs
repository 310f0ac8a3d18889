// src/services/payment_service.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{InvoiceRepository, PaymentRepository},
    middleware::organization::OrganizationContext,
    models::{
        invoice::InvoiceStatus,
        payment::{Payment, PaymentMethod, PaymentReceipt},
    },
};

/// Status resultante depois de somar todo o histórico de pagamentos.
/// Não depende da ordem nem de quantas vezes é aplicada.
pub fn reconciled_status(current: InvoiceStatus, total_ttc: Decimal, paid_sum: Decimal) -> InvoiceStatus {
    match current {
        InvoiceStatus::Cancelled | InvoiceStatus::Paid => current,
        _ if paid_sum >= total_ttc => InvoiceStatus::Paid,
        _ => current,
    }
}

#[derive(Clone)]
pub struct PaymentService {
    repo: PaymentRepository,
    invoice_repo: InvoiceRepository,
}

impl PaymentService {
    pub fn new(repo: PaymentRepository, invoice_repo: InvoiceRepository) -> Self {
        Self { repo, invoice_repo }
    }

    /// Grava o pagamento e reconcilia a fatura numa única transação.
    /// O `FOR UPDATE` serializa pagamentos simultâneos da mesma fatura.
    pub async fn record_payment<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
        amount: Decimal,
        method: PaymentMethod,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<PaymentReceipt, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let invoice = self.invoice_repo.lock_invoice(&mut *tx, org, invoice_id).await?;
        if invoice.status == InvoiceStatus::Cancelled {
            return Err(AppError::StateConflict("invoice_cancelled"));
        }

        let payment = self
            .repo
            .insert_payment(&mut *tx, org, invoice_id, amount, method, paid_at.unwrap_or_else(Utc::now))
            .await?;

        let paid_sum = self.repo.sum_for_invoice(&mut *tx, org, invoice_id).await?;
        let status = reconciled_status(invoice.status, invoice.total_ttc, paid_sum);
        if status != invoice.status {
            self.invoice_repo.set_status(&mut *tx, org, invoice_id, status).await?;
        }

        tx.commit().await?;

        tracing::info!(
            organization_id = %org.organization_id,
            invoice_id = %invoice_id,
            amount = %amount,
            paid_sum = %paid_sum,
            status = ?status,
            "Pagamento registrado"
        );

        Ok(PaymentReceipt {
            payment,
            invoice_status: status,
            amount_paid: paid_sum,
            amount_due: (invoice.total_ttc - paid_sum).max(Decimal::ZERO),
        })
    }

    pub async fn list_payments<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Option<Uuid>,
    ) -> Result<Vec<Payment>, AppError>
    where
        E: Acquire<'e, Database = Postgres, Connection = &'e mut sqlx::PgConnection>,
    {
        let mut conn = executor.acquire().await?;

        match invoice_id {
            Some(invoice_id) => {
                // 404 para fatura de outra organização
                self.invoice_repo.find_invoice(&mut *conn, org, invoice_id).await?;
                self.repo.list_for_invoice(&mut *conn, org, invoice_id).await
            }
            None => self.repo.list_payments(&mut *conn, org).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn full_payment_marks_invoice_paid() {
        assert_eq!(reconciled_status(InvoiceStatus::Sent, dec("240"), dec("240")), InvoiceStatus::Paid);
        assert_eq!(reconciled_status(InvoiceStatus::Overdue, dec("240"), dec("300")), InvoiceStatus::Paid);
    }

    #[test]
    fn partial_payment_leaves_status_unchanged() {
        assert_eq!(reconciled_status(InvoiceStatus::Sent, dec("240"), dec("239.99")), InvoiceStatus::Sent);
        assert_eq!(reconciled_status(InvoiceStatus::Draft, dec("240"), dec("100")), InvoiceStatus::Draft);
    }

    #[test]
    fn cumulative_payments_settle_the_invoice() {
        // 100 + 140 somados pelo banco
        assert_eq!(reconciled_status(InvoiceStatus::Sent, dec("240"), dec("100") + dec("140")), InvoiceStatus::Paid);
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let once = reconciled_status(InvoiceStatus::Sent, dec("240"), dec("240"));
        let twice = reconciled_status(once, dec("240"), dec("240"));
        assert_eq!(once, twice);
    }

    #[test]
    fn cancelled_invoices_never_become_paid() {
        assert_eq!(
            reconciled_status(InvoiceStatus::Cancelled, dec("240"), dec("240")),
            InvoiceStatus::Cancelled
        );
    }
}
