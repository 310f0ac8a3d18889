// src/db/customer_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    middleware::organization::OrganizationContext,
    models::customer::Customer,
};

#[derive(Clone, Default)]
pub struct CustomerRepository;

impl CustomerRepository {
    pub async fn create_customer<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        name: &str,
        email: Option<&str>,
        address: Option<&str>,
        vat_number: Option<&str>,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (organization_id, name, email, address, vat_number)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(org.organization_id)
        .bind(name)
        .bind(email)
        .bind(address)
        .bind(vat_number)
        .fetch_one(executor)
        .await?;

        Ok(customer)
    }

    pub async fn list_customers<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
    ) -> Result<Vec<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE organization_id = $1 ORDER BY name ASC",
        )
        .bind(org.organization_id)
        .fetch_all(executor)
        .await?;

        Ok(customers)
    }

    /// Cliente de outra organização é tratado como inexistente.
    pub async fn find_customer<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        customer_id: Uuid,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE id = $1 AND organization_id = $2",
        )
        .bind(customer_id)
        .bind(org.organization_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::ResourceNotFound(format!("customer {customer_id}")))
    }
}
