// src/models/organization.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Mapeia o CREATE TYPE member_role do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "member_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Admin,
    Member,
}

// ---
// Organization (o "tenant")
// ---
// Os campos de cobrança só mudam via webhook do provedor de pagamentos.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Organization {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(example = "Atelier Dupont SARL")]
    pub name: String,

    #[schema(example = "cus_Q1w2e3r4")]
    pub stripe_customer_id: Option<String>,

    #[schema(example = "sub_1PqRsT")]
    pub stripe_subscription_id: Option<String>,

    #[schema(example = "pro")]
    pub billing_plan: Option<String>,

    #[schema(example = "active")]
    pub subscription_status: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Linha da tabela-ponte usuário <-> organização.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Membership {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
}

/// Organização vista pelo usuário (com o seu cargo).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserOrganization {
    pub organization_id: Uuid,
    #[schema(example = "Atelier Dupont SARL")]
    pub name: String,
    pub role: MemberRole,
}

/// Projeção de cobrança exposta em GET /api/billing
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BillingInfo {
    pub organization_id: Uuid,
    pub billing_plan: Option<String>,
    pub subscription_status: Option<String>,
    pub has_payment_customer: bool,
}

impl From<Organization> for BillingInfo {
    fn from(org: Organization) -> Self {
        BillingInfo {
            organization_id: org.id,
            billing_plan: org.billing_plan,
            subscription_status: org.subscription_status,
            has_payment_customer: org.stripe_customer_id.is_some(),
        }
    }
}
