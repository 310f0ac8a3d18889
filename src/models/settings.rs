// src/models/settings.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::validate_percentage;

pub const DEFAULT_PAYMENT_TERMS_DAYS: i32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OrganizationSettings {
    #[schema(ignore)] // O contexto (membership) já define a organização
    pub organization_id: Uuid,

    #[schema(example = "Atelier Dupont SARL")]
    pub company_name: Option<String>,

    #[schema(example = "732 829 320 00074")]
    pub siret: Option<String>,

    #[schema(example = "FR40303265045")]
    pub vat_number: Option<String>,

    #[schema(example = "12 rue des Lilas, 75011 Paris")]
    pub address: Option<String>,

    #[schema(example = "FR7630006000011234567890189")]
    pub iban: Option<String>,

    #[schema(example = "AGRIFRPP")]
    pub bic: Option<String>,

    #[schema(example = 30)]
    pub payment_terms_days: i32,

    #[schema(example = "20.00")]
    pub default_vat_rate: Decimal,

    pub updated_at: Option<DateTime<Utc>>,
}

impl OrganizationSettings {
    // Usado quando a organização ainda não salvou nada
    pub fn empty(organization_id: Uuid) -> Self {
        Self {
            organization_id,
            company_name: None,
            siret: None,
            vat_number: None,
            address: None,
            iban: None,
            bic: None,
            payment_terms_days: DEFAULT_PAYMENT_TERMS_DAYS,
            default_vat_rate: Decimal::from(20),
            updated_at: None,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSettingsRequest {
    #[schema(example = "Atelier Dupont SARL")]
    pub company_name: Option<String>,

    #[validate(length(equal = 14, message = "Le SIRET doit contenir 14 chiffres."))]
    pub siret: Option<String>,

    pub vat_number: Option<String>,

    pub address: Option<String>,

    #[validate(length(min = 15, max = 34))]
    pub iban: Option<String>,

    #[validate(length(min = 8, max = 11))]
    pub bic: Option<String>,

    #[validate(range(min = 0, max = 120))]
    pub payment_terms_days: Option<i32>,

    #[validate(custom(function = "validate_percentage"))]
    pub default_vat_rate: Option<Decimal>,
}
