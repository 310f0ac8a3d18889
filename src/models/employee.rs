// src/models/employee.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Employee {
    pub id: Uuid,

    #[schema(ignore)]
    pub organization_id: Uuid,

    #[schema(example = "Camille")]
    pub first_name: String,
    #[schema(example = "Lefèvre")]
    pub last_name: String,
    #[schema(example = "camille.lefevre@atelier-dupont.fr")]
    pub email: String,
    #[schema(example = "Comptable")]
    pub job_title: Option<String>,

    // Salário bruto mensal
    #[schema(example = "3200.00")]
    pub monthly_salary: Decimal,

    #[schema(value_type = String, format = Date, example = "2024-09-02")]
    pub hired_at: NaiveDate,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
