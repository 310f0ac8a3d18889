// src/services/invoice_service.rs

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        invoice_repo::NewInvoiceItem, CustomerRepository, InvoiceRepository, PaymentRepository,
        SettingsRepository,
    },
    middleware::organization::OrganizationContext,
    models::{
        invoice::{
            CreateInvoiceRequest, Invoice, InvoiceDetail, InvoiceItem, InvoiceItemInput,
            InvoiceStatus, InvoiceTotals, UpdateInvoiceRequest,
        },
        payment::Payment,
    },
};

const INVOICE_NUMBER_PREFIX: &str = "FAC";

pub fn default_vat_rate() -> Decimal {
    Decimal::from(20)
}

// =============================================================================
//  CÁLCULO (funções puras)
// =============================================================================

/// Resolve a taxa de IVA de cada linha (ausente => padrão da organização)
/// e alinha quantidade e preço à precisão das colunas, para que as linhas
/// gravadas reproduzam exatamente os totais.
pub fn normalize_items(items: &[InvoiceItemInput], default_vat: Decimal) -> Vec<NewInvoiceItem> {
    items
        .iter()
        .map(|item| NewInvoiceItem {
            label: item.label.trim().to_string(),
            qty: item.qty.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero),
            unit_price: round_money(item.unit_price),
            vat_rate: round_money(item.vat_rate.unwrap_or(default_vat)),
        })
        .collect()
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn out_of_range() -> AppError {
    AppError::InvalidInput("invoice amounts out of range".into())
}

/// HT e TVA são somados com precisão total e arredondados uma única vez;
/// o TTC é a soma das duas partes já arredondadas, então
/// `total_ttc == total_ht + total_vat` vale sempre.
///
/// Aritmética verificada: estouro vira `InvalidInput`, nunca pânico.
pub fn compute_totals(items: &[NewInvoiceItem]) -> Result<InvoiceTotals, AppError> {
    let mut ht = Decimal::ZERO;
    let mut vat = Decimal::ZERO;

    for item in items {
        let line_ht = item.qty.checked_mul(item.unit_price).ok_or_else(out_of_range)?;
        let line_vat = line_ht
            .checked_mul(item.vat_rate)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(out_of_range)?;
        ht = ht.checked_add(line_ht).ok_or_else(out_of_range)?;
        vat = vat.checked_add(line_vat).ok_or_else(out_of_range)?;
    }

    let total_ht = round_money(ht);
    let total_vat = round_money(vat);

    Ok(InvoiceTotals {
        total_ht,
        total_vat,
        total_ttc: total_ht.checked_add(total_vat).ok_or_else(out_of_range)?,
    })
}

/// `FAC-2026-0001`. Sequências acima de 9999 simplesmente ganham dígitos.
pub fn format_invoice_number(year: i32, sequence: i64) -> String {
    format!("{INVOICE_NUMBER_PREFIX}-{year}-{sequence:04}")
}

pub fn default_due_date(issue_date: NaiveDate, payment_terms_days: i32) -> NaiveDate {
    issue_date + Duration::days(i64::from(payment_terms_days))
}

/// Valor pago e saldo devedor (nunca negativo, mesmo com pagamento a maior).
pub fn payment_balance(total_ttc: Decimal, payments: &[Payment]) -> (Decimal, Decimal) {
    let paid: Decimal = payments.iter().map(|p| p.amount).sum();
    (paid, (total_ttc - paid).max(Decimal::ZERO))
}

// =============================================================================
//  REGRAS DE ESTADO
// =============================================================================

pub fn ensure_editable(invoice: &Invoice, today: NaiveDate) -> Result<(), AppError> {
    let status = invoice.effective_status(today);
    if status.is_locked() {
        return Err(AppError::StateConflict("invoice_locked"));
    }
    if status == InvoiceStatus::Cancelled {
        return Err(AppError::StateConflict("invoice_cancelled"));
    }
    Ok(())
}

/// Só rascunhos e faturas canceladas podem ser excluídos.
pub fn ensure_deletable(invoice: &Invoice, today: NaiveDate) -> Result<(), AppError> {
    match invoice.effective_status(today) {
        InvoiceStatus::Paid => Err(AppError::StateConflict("invoice_paid")),
        status if status.is_locked() => Err(AppError::StateConflict("invoice_locked")),
        _ => Ok(()),
    }
}

pub fn ensure_sendable(invoice: &Invoice) -> Result<(), AppError> {
    match invoice.status {
        InvoiceStatus::Draft => Ok(()),
        InvoiceStatus::Cancelled => Err(AppError::StateConflict("invoice_cancelled")),
        _ => Err(AppError::StateConflict("invoice_not_draft")),
    }
}

pub fn ensure_cancellable(invoice: &Invoice) -> Result<(), AppError> {
    match invoice.status {
        InvoiceStatus::Paid => Err(AppError::StateConflict("invoice_paid")),
        InvoiceStatus::Cancelled => Err(AppError::StateConflict("invoice_cancelled")),
        _ => Ok(()),
    }
}

pub fn build_detail(
    invoice: Invoice,
    mut items: Vec<InvoiceItem>,
    payments: Vec<Payment>,
    today: NaiveDate,
) -> InvoiceDetail {
    items.sort_by_key(|item| item.position);
    let (amount_paid, amount_due) = payment_balance(invoice.total_ttc, &payments);

    InvoiceDetail {
        header: invoice.presented(today),
        items,
        payments,
        amount_paid,
        amount_due,
    }
}

// =============================================================================
//  SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct InvoiceService {
    repo: InvoiceRepository,
    payment_repo: PaymentRepository,
    customer_repo: CustomerRepository,
    settings_repo: SettingsRepository,
}

impl InvoiceService {
    pub fn new(
        repo: InvoiceRepository,
        payment_repo: PaymentRepository,
        customer_repo: CustomerRepository,
        settings_repo: SettingsRepository,
    ) -> Self {
        Self { repo, payment_repo, customer_repo, settings_repo }
    }

    /// Cria o rascunho, reservando o número na mesma transação.
    pub async fn create_invoice<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        input: &CreateInvoiceRequest,
        today: NaiveDate,
    ) -> Result<InvoiceDetail, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        // 1. Cliente precisa ser da mesma organização
        self.customer_repo.find_customer(&mut *tx, org, input.customer_id).await?;
        let settings = self.settings_repo.get_settings(&mut *tx, org).await?;

        // 2. Datas
        let issue_date = input.issue_date.unwrap_or(today);
        let due_date = input
            .due_date
            .unwrap_or_else(|| default_due_date(issue_date, settings.payment_terms_days));
        if due_date < issue_date {
            return Err(AppError::InvalidInput("due_date < issue_date".into()));
        }

        // 3. Totais
        let items = normalize_items(&input.items, settings.default_vat_rate);
        let totals = compute_totals(&items)?;

        // 4. Número + gravação
        let sequence = self.repo.next_sequence(&mut *tx, org).await?;
        let number = format_invoice_number(today.year(), sequence);

        let invoice = self
            .repo
            .insert_invoice(
                &mut *tx,
                org,
                input.customer_id,
                &number,
                &totals,
                issue_date,
                due_date,
                input.notes.as_deref(),
            )
            .await?;
        let items = self.repo.insert_items(&mut *tx, org, invoice.id, &items).await?;

        tx.commit().await?;

        tracing::info!(
            organization_id = %org.organization_id,
            invoice_id = %invoice.id,
            number = %invoice.number,
            total_ttc = %invoice.total_ttc,
            "Fatura criada"
        );

        Ok(build_detail(invoice, items, Vec::new(), today))
    }

    /// Atualiza o cabeçalho e substitui todas as linhas.
    pub async fn update_invoice<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
        input: &UpdateInvoiceRequest,
        today: NaiveDate,
    ) -> Result<InvoiceDetail, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self.repo.lock_invoice(&mut *tx, org, invoice_id).await?;
        ensure_editable(&current, today)?;

        let customer_id = input.customer_id.unwrap_or(current.customer_id);
        if customer_id != current.customer_id {
            self.customer_repo.find_customer(&mut *tx, org, customer_id).await?;
        }

        let due_date = input.due_date.unwrap_or(current.due_date);
        if due_date < current.issue_date {
            return Err(AppError::InvalidInput("due_date < issue_date".into()));
        }
        let notes = input.notes.as_deref().or(current.notes.as_deref());

        let settings = self.settings_repo.get_settings(&mut *tx, org).await?;
        let items = normalize_items(&input.items, settings.default_vat_rate);
        let totals = compute_totals(&items)?;

        self.repo.delete_items(&mut *tx, org, invoice_id).await?;
        let items = self.repo.insert_items(&mut *tx, org, invoice_id, &items).await?;
        let invoice = self
            .repo
            .update_invoice(&mut *tx, org, invoice_id, customer_id, due_date, notes, &totals)
            .await?;
        let payments = self.payment_repo.list_for_invoice(&mut *tx, org, invoice_id).await?;

        tx.commit().await?;

        Ok(build_detail(invoice, items, payments, today))
    }

    pub async fn delete_invoice<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
        today: NaiveDate,
    ) -> Result<(), AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let invoice = self.repo.lock_invoice(&mut *tx, org, invoice_id).await?;
        ensure_deletable(&invoice, today)?;
        self.repo.delete_invoice(&mut *tx, org, invoice_id).await?;

        tx.commit().await?;

        tracing::info!(organization_id = %org.organization_id, invoice_id = %invoice_id, "Fatura excluída");
        Ok(())
    }

    /// draft -> sent
    pub async fn send_invoice<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
        today: NaiveDate,
    ) -> Result<Invoice, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let invoice = self.repo.lock_invoice(&mut *tx, org, invoice_id).await?;
        ensure_sendable(&invoice)?;
        let invoice = self
            .repo
            .set_status(&mut *tx, org, invoice_id, InvoiceStatus::Sent)
            .await?;

        tx.commit().await?;

        tracing::info!(organization_id = %org.organization_id, invoice_id = %invoice_id, "Fatura enviada");
        Ok(invoice.presented(today))
    }

    pub async fn cancel_invoice<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
    ) -> Result<Invoice, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let invoice = self.repo.lock_invoice(&mut *tx, org, invoice_id).await?;
        ensure_cancellable(&invoice)?;
        let invoice = self
            .repo
            .set_status(&mut *tx, org, invoice_id, InvoiceStatus::Cancelled)
            .await?;

        tx.commit().await?;

        tracing::info!(organization_id = %org.organization_id, invoice_id = %invoice_id, "Fatura cancelada");
        Ok(invoice)
    }

    pub async fn get_invoice<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        invoice_id: Uuid,
        today: NaiveDate,
    ) -> Result<InvoiceDetail, AppError>
    where
        E: Acquire<'e, Database = Postgres, Connection = &'e mut sqlx::PgConnection>,
    {
        let mut conn = executor.acquire().await?;

        let invoice = self.repo.find_invoice(&mut *conn, org, invoice_id).await?;
        let items = self.repo.list_items(&mut *conn, org, invoice_id).await?;
        let payments = self.payment_repo.list_for_invoice(&mut *conn, org, invoice_id).await?;

        Ok(build_detail(invoice, items, payments, today))
    }

    /// O filtro compara o status efetivo (uma fatura vencida responde a `overdue`).
    pub async fn list_invoices<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        status: Option<InvoiceStatus>,
        today: NaiveDate,
    ) -> Result<Vec<Invoice>, AppError>
    where
        E: Acquire<'e, Database = Postgres, Connection = &'e mut sqlx::PgConnection>,
    {
        let mut conn = executor.acquire().await?;
        let invoices = self.repo.list_invoices(&mut *conn, org).await?;

        Ok(invoices
            .into_iter()
            .map(|invoice| invoice.presented(today))
            .filter(|invoice| status.is_none_or(|wanted| invoice.status == wanted))
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::payment::PaymentMethod;
    use chrono::Utc;

    pub fn invoice(status: InvoiceStatus, due_date: NaiveDate) -> Invoice {
        Invoice {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            number: "FAC-2026-0001".into(),
            status,
            total_ht: Decimal::from(200),
            total_vat: Decimal::from(40),
            total_ttc: Decimal::from(240),
            issue_date: due_date - Duration::days(30),
            due_date,
            sent_at: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn input(qty: i64, price: &str, vat: Option<i64>) -> InvoiceItemInput {
        InvoiceItemInput {
            label: "Prestation".into(),
            qty: Decimal::from(qty),
            unit_price: price.parse().unwrap(),
            vat_rate: vat.map(Decimal::from),
        }
    }

    #[test]
    fn single_line_totals() {
        let items = normalize_items(&[input(2, "100", Some(20))], default_vat_rate());
        let totals = compute_totals(&items).unwrap();

        assert_eq!(totals.total_ht, Decimal::from(200));
        assert_eq!(totals.total_vat, Decimal::from(40));
        assert_eq!(totals.total_ttc, Decimal::from(240));
    }

    #[test]
    fn missing_vat_rate_uses_the_default() {
        let items = normalize_items(&[input(1, "50", None)], Decimal::from(10));
        assert_eq!(items[0].vat_rate, Decimal::from(10));
        assert_eq!(compute_totals(&items).unwrap().total_vat, Decimal::from(5));
    }

    #[test]
    fn ttc_is_always_ht_plus_vat() {
        let items = normalize_items(
            &[input(3, "19.99", Some(20)), input(7, "0.35", Some(5)), input(1, "12.35", Some(10))],
            default_vat_rate(),
        );
        let totals = compute_totals(&items).unwrap();

        assert_eq!(totals.total_ttc, totals.total_ht + totals.total_vat);
        // 59.97 + 2.45 + 12.35 = 74.77
        assert_eq!(totals.total_ht, "74.77".parse::<Decimal>().unwrap());
        // 11.994 + 0.1225 + 1.235 = 13.3515 -> 13.35
        assert_eq!(totals.total_vat, "13.35".parse::<Decimal>().unwrap());
    }

    #[test]
    fn oversized_amounts_are_rejected_without_panicking() {
        let huge: Decimal = "100000000000000000".parse().unwrap();
        let items = vec![NewInvoiceItem {
            label: "Prestation".into(),
            qty: huge,
            unit_price: huge,
            vat_rate: Decimal::from(20),
        }];

        assert!(matches!(compute_totals(&items), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn oversized_lines_fail_validation() {
        use validator::Validate;

        let mut line = input(1, "100", Some(20));
        line.qty = "100000000000000000".parse().unwrap();
        line.unit_price = "100000000000000000".parse().unwrap();
        let errors = line.validate().unwrap_err();

        assert!(errors.field_errors().contains_key("qty"));
        assert!(errors.field_errors().contains_key("unit_price"));
    }

    #[test]
    fn sub_cent_prices_fail_validation() {
        use validator::Validate;

        let line = input(3, "0.005", Some(20));
        let errors = line.validate().unwrap_err();

        assert_eq!(errors.field_errors()["unit_price"][0].code, "scale");
    }

    #[test]
    fn stored_lines_reproduce_the_totals() {
        // Mesmo sem validação prévia, as linhas seguem a precisão das colunas
        let items = normalize_items(&[input(3, "0.005", Some(20))], default_vat_rate());
        assert_eq!(items[0].unit_price, "0.01".parse::<Decimal>().unwrap());

        let totals = compute_totals(&items).unwrap();
        let line_ht = items[0].qty * items[0].unit_price;
        assert_eq!(totals.total_ht, line_ht);
    }

    #[test]
    fn numbering_is_zero_padded() {
        assert_eq!(format_invoice_number(2026, 1), "FAC-2026-0001");
        assert_eq!(format_invoice_number(2026, 42), "FAC-2026-0042");
        assert_eq!(format_invoice_number(2027, 12345), "FAC-2027-12345");
    }

    #[test]
    fn due_date_defaults_to_payment_terms() {
        assert_eq!(default_due_date(date(2026, 1, 31), 30), date(2026, 3, 2));
    }

    #[test]
    fn sent_paid_and_overdue_invoices_are_locked() {
        let today = date(2026, 10, 17);
        let future = date(2026, 11, 1);
        let past = date(2026, 9, 1);

        assert!(ensure_editable(&invoice(InvoiceStatus::Draft, future), today).is_ok());
        for status in [InvoiceStatus::Sent, InvoiceStatus::Paid, InvoiceStatus::Overdue] {
            assert!(matches!(
                ensure_editable(&invoice(status, future), today),
                Err(AppError::StateConflict("invoice_locked"))
            ));
        }
        // enviada e vencida: efetivamente overdue
        assert!(ensure_editable(&invoice(InvoiceStatus::Sent, past), today).is_err());
        assert!(ensure_editable(&invoice(InvoiceStatus::Cancelled, future), today).is_err());
    }

    #[test]
    fn only_drafts_and_cancelled_invoices_can_be_deleted() {
        let today = date(2026, 10, 17);
        let future = date(2026, 11, 1);
        let past = date(2026, 9, 1);

        assert!(matches!(
            ensure_deletable(&invoice(InvoiceStatus::Paid, future), today),
            Err(AppError::StateConflict("invoice_paid"))
        ));
        for status in [InvoiceStatus::Sent, InvoiceStatus::Overdue] {
            assert!(matches!(
                ensure_deletable(&invoice(status, future), today),
                Err(AppError::StateConflict("invoice_locked"))
            ));
        }
        // enviada e vencida: efetivamente overdue
        assert!(ensure_deletable(&invoice(InvoiceStatus::Sent, past), today).is_err());
        assert!(ensure_deletable(&invoice(InvoiceStatus::Draft, future), today).is_ok());
        assert!(ensure_deletable(&invoice(InvoiceStatus::Cancelled, future), today).is_ok());
    }

    #[test]
    fn send_and_cancel_transitions() {
        let due = date(2026, 11, 1);
        assert!(ensure_sendable(&invoice(InvoiceStatus::Draft, due)).is_ok());
        assert!(ensure_sendable(&invoice(InvoiceStatus::Sent, due)).is_err());
        assert!(ensure_cancellable(&invoice(InvoiceStatus::Sent, due)).is_ok());
        assert!(ensure_cancellable(&invoice(InvoiceStatus::Paid, due)).is_err());
        assert!(ensure_cancellable(&invoice(InvoiceStatus::Cancelled, due)).is_err());
    }

    #[test]
    fn overdue_is_derived_at_read_time() {
        let detail = build_detail(
            invoice(InvoiceStatus::Sent, date(2026, 9, 30)),
            Vec::new(),
            Vec::new(),
            date(2026, 10, 17),
        );
        assert_eq!(detail.header.status, InvoiceStatus::Overdue);
        assert_eq!(detail.amount_due, Decimal::from(240));
    }

    #[test]
    fn balance_never_goes_negative() {
        let payment = |amount: i64| Payment {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            invoice_id: Uuid::new_v4(),
            amount: Decimal::from(amount),
            method: PaymentMethod::BankTransfer,
            paid_at: Utc::now(),
            created_at: Utc::now(),
        };

        let (paid, due) = payment_balance(Decimal::from(240), &[payment(100), payment(50)]);
        assert_eq!((paid, due), (Decimal::from(150), Decimal::from(90)));

        let (paid, due) = payment_balance(Decimal::from(240), &[payment(300)]);
        assert_eq!((paid, due), (Decimal::from(300), Decimal::ZERO));
    }
}
