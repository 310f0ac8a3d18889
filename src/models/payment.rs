// src/models/payment.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{common::validation::validate_amount, models::invoice::InvoiceStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Card,
    Cheque,
    Cash,
    Other,
}

// Pagamentos são somente-inserção: não há update nem delete.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: Uuid,

    #[schema(ignore)]
    pub organization_id: Uuid,

    pub invoice_id: Uuid,

    #[schema(example = "240.00")]
    pub amount: Decimal,

    pub method: PaymentMethod,

    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordPaymentRequest {
    pub invoice_id: Uuid,

    // Pagamento a maior é aceito e gravado como veio
    #[validate(custom(function = "validate_amount"))]
    #[schema(example = "240.00")]
    pub amount: Decimal,

    pub method: PaymentMethod,

    // Ausente => agora
    pub paid_at: Option<DateTime<Utc>>,
}

/// Pagamento gravado + situação da fatura depois da reconciliação.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub invoice_status: InvoiceStatus,
    #[schema(example = "240.00")]
    pub amount_paid: Decimal,
    #[schema(example = "0.00")]
    pub amount_due: Decimal,
}
