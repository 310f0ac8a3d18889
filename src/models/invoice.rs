// src/models/invoice.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::validation::{validate_percentage, validate_quantity, validate_unit_price},
    models::payment::Payment,
};

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "invoice_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,     // Brouillon
    Sent,      // Envoyée
    Paid,      // Payée
    Overdue,   // En retard (derivado na leitura, nunca gravado)
    Cancelled, // Annulée
}

impl InvoiceStatus {
    /// Faturas enviadas (ou além) têm linhas e totais congelados.
    pub fn is_locked(self) -> bool {
        matches!(self, InvoiceStatus::Sent | InvoiceStatus::Paid | InvoiceStatus::Overdue)
    }
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Invoice {
    pub id: Uuid,

    #[schema(ignore)]
    pub organization_id: Uuid,

    pub customer_id: Uuid,

    #[schema(example = "FAC-2026-0001")]
    pub number: String,

    pub status: InvoiceStatus,

    // Valores
    #[schema(example = "200.00")]
    pub total_ht: Decimal,
    #[schema(example = "40.00")]
    pub total_vat: Decimal,
    #[schema(example = "240.00")]
    pub total_ttc: Decimal,

    // Datas
    #[schema(value_type = String, format = Date, example = "2026-10-01")]
    pub issue_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2026-10-31")]
    pub due_date: NaiveDate,
    pub sent_at: Option<DateTime<Utc>>,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Status como o cliente deve vê-lo: uma fatura enviada e vencida
    /// aparece como `overdue` sem que isso seja persistido.
    pub fn effective_status(&self, today: NaiveDate) -> InvoiceStatus {
        match self.status {
            InvoiceStatus::Sent if self.due_date < today => InvoiceStatus::Overdue,
            status => status,
        }
    }

    pub fn presented(mut self, today: NaiveDate) -> Self {
        self.status = self.effective_status(today);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,

    #[schema(ignore)]
    pub organization_id: Uuid,

    #[schema(example = "Développement site vitrine")]
    pub label: String,
    #[schema(example = "2")]
    pub qty: Decimal,
    #[schema(example = "100.00")]
    pub unit_price: Decimal,
    #[schema(example = "20")]
    pub vat_rate: Decimal,

    pub position: i32,
}

/// Linha recebida pela API (criação ou substituição total).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct InvoiceItemInput {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Développement site vitrine")]
    pub label: String,

    #[validate(custom(function = "validate_quantity"))]
    #[schema(example = "2")]
    pub qty: Decimal,

    #[validate(custom(function = "validate_unit_price"))]
    #[schema(example = "100.00")]
    pub unit_price: Decimal,

    // Ausente => taxa padrão (20 ou a configurada na organização)
    #[validate(custom(function = "validate_percentage"))]
    #[schema(example = "20")]
    pub vat_rate: Option<Decimal>,
}

/// Totais derivados das linhas; nunca editados diretamente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct InvoiceTotals {
    pub total_ht: Decimal,
    pub total_vat: Decimal,
    pub total_ttc: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub header: Invoice,
    pub items: Vec<InvoiceItem>,
    pub payments: Vec<Payment>,
    #[schema(example = "0.00")]
    pub amount_paid: Decimal,
    #[schema(example = "240.00")]
    pub amount_due: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInvoiceRequest {
    pub customer_id: Uuid,

    // Ausente => hoje
    #[schema(value_type = Option<String>, format = Date, example = "2026-10-01")]
    pub issue_date: Option<NaiveDate>,

    // Ausente => emissão + prazo de pagamento configurado
    #[schema(value_type = Option<String>, format = Date, example = "2026-10-31")]
    pub due_date: Option<NaiveDate>,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,

    #[validate(length(min = 1, message = "Une facture doit contenir au moins une ligne."), nested)]
    pub items: Vec<InvoiceItemInput>,
}

/// Substituição total: as linhas enviadas trocam todas as existentes.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateInvoiceRequest {
    pub customer_id: Option<Uuid>,

    #[schema(value_type = Option<String>, format = Date, example = "2026-11-15")]
    pub due_date: Option<NaiveDate>,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,

    #[validate(length(min = 1, message = "Une facture doit contenir au moins une ligne."), nested)]
    pub items: Vec<InvoiceItemInput>,
}
