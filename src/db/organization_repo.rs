// src/db/organization_repo.rs

use std::sync::LazyLock;

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::organization::{MemberRole, Membership, Organization, UserOrganization},
    services::webhook_projector::{BillingTarget, BillingUpdate},
};

// COALESCE: campos ausentes no evento mantêm o valor atual
const BILLING_UPDATE_SET: &str = r#"
    UPDATE organizations SET
        stripe_customer_id = COALESCE($2, stripe_customer_id),
        stripe_subscription_id = COALESCE($3, stripe_subscription_id),
        billing_plan = COALESCE($4, billing_plan),
        subscription_status = COALESCE($5, subscription_status),
        updated_at = NOW()
"#;

static BILLING_UPDATE_BY_ID: LazyLock<String> =
    LazyLock::new(|| format!("{BILLING_UPDATE_SET} WHERE id = $1"));
static BILLING_UPDATE_BY_CUSTOMER: LazyLock<String> =
    LazyLock::new(|| format!("{BILLING_UPDATE_SET} WHERE stripe_customer_id = $1"));

#[derive(Clone)]
pub struct OrganizationRepository {
    pool: PgPool,
}

impl OrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verifica se o usuário pertence à organização pedida.
    /// Esta é a verificação de autorização mais importante.
    pub async fn find_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Membership>, AppError> {
        let membership = sqlx::query_as::<_, Membership>(
            "SELECT * FROM memberships WHERE user_id = $1 AND organization_id = $2",
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    /// Sem cabeçalho explícito, usamos a membership mais antiga.
    pub async fn first_membership(&self, user_id: Uuid) -> Result<Option<Membership>, AppError> {
        let membership = sqlx::query_as::<_, Membership>(
            "SELECT * FROM memberships WHERE user_id = $1 ORDER BY created_at ASC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    pub async fn list_user_organizations(&self, user_id: Uuid) -> Result<Vec<UserOrganization>, AppError> {
        let organizations = sqlx::query_as::<_, UserOrganization>(
            r#"
            SELECT o.id AS organization_id, o.name, m.role
            FROM memberships m
            JOIN organizations o ON o.id = m.organization_id
            WHERE m.user_id = $1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(organizations)
    }

    pub async fn find_by_id(&self, organization_id: Uuid) -> Result<Organization, AppError> {
        sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::OrganizationNotFound)
    }

    pub async fn create_organization<'e, E>(&self, executor: E, name: &str) -> Result<Organization, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let organization = sqlx::query_as::<_, Organization>(
            "INSERT INTO organizations (name) VALUES ($1) RETURNING *",
        )
        .bind(name)
        .fetch_one(executor)
        .await?;

        Ok(organization)
    }

    pub async fn add_member<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<Membership, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO memberships (user_id, organization_id, role)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .bind(role)
        .fetch_one(executor)
        .await?;

        Ok(membership)
    }

    // =========================================================================
    //  PROJEÇÃO DE COBRANÇA (só webhooks escrevem aqui)
    // =========================================================================

    /// Aplica a atualização derivada de um evento do provedor.
    /// Devolve `false` quando nenhuma organização corresponde.
    pub async fn apply_billing_update(&self, update: &BillingUpdate) -> Result<bool, AppError> {
        let query = match &update.target {
            BillingTarget::Organization(organization_id) => {
                sqlx::query(&BILLING_UPDATE_BY_ID).bind(*organization_id)
            }
            BillingTarget::Customer(customer_id) => {
                sqlx::query(&BILLING_UPDATE_BY_CUSTOMER).bind(customer_id.clone())
            }
        };

        let result = query
            .bind(update.customer_id.clone())
            .bind(update.subscription_id.clone())
            .bind(update.billing_plan.clone())
            .bind(update.subscription_status.clone())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
