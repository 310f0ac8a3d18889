// src/db/document_repo.rs

use sqlx::{Executor, Postgres};

use crate::{
    common::error::AppError,
    middleware::organization::OrganizationContext,
    models::document::{DocumentKind, GeneratedDocument},
};

#[derive(Clone, Default)]
pub struct DocumentRepository;

impl DocumentRepository {
    pub async fn record_document<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        kind: DocumentKind,
        storage_key: &str,
    ) -> Result<GeneratedDocument, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let document = sqlx::query_as::<_, GeneratedDocument>(
            r#"
            INSERT INTO generated_documents (organization_id, kind, storage_key)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(org.organization_id)
        .bind(kind)
        .bind(storage_key)
        .fetch_one(executor)
        .await?;

        Ok(document)
    }

    pub async fn list_documents<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
    ) -> Result<Vec<GeneratedDocument>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let documents = sqlx::query_as::<_, GeneratedDocument>(
            "SELECT * FROM generated_documents WHERE organization_id = $1 ORDER BY created_at DESC",
        )
        .bind(org.organization_id)
        .fetch_all(executor)
        .await?;

        Ok(documents)
    }
}
