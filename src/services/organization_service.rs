// src/services/organization_service.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::OrganizationRepository,
    middleware::auth::AuthenticatedUser,
    models::organization::{MemberRole, UserOrganization},
};

#[derive(Clone)]
pub struct OrganizationService {
    repo: OrganizationRepository,
    pool: PgPool,
}

impl OrganizationService {
    pub fn new(repo: OrganizationRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    /// Cria a organização e torna o chamador `owner`, numa única transação.
    pub async fn create_organization(
        &self,
        user: &AuthenticatedUser,
        name: &str,
    ) -> Result<UserOrganization, AppError> {
        let mut tx = self.pool.begin().await?;

        let organization = self.repo.create_organization(&mut *tx, name.trim()).await?;
        let membership = self
            .repo
            .add_member(&mut *tx, organization.id, user.0.id, MemberRole::Owner)
            .await?;

        tx.commit().await?;

        tracing::info!(organization_id = %organization.id, owner_id = %user.0.id, "Organização criada");

        Ok(UserOrganization {
            organization_id: organization.id,
            name: organization.name,
            role: membership.role,
        })
    }

    pub async fn list_for_user(&self, user: &AuthenticatedUser) -> Result<Vec<UserOrganization>, AppError> {
        self.repo.list_user_organizations(user.0.id).await
    }
}
