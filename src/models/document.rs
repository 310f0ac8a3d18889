// src/models/document.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "document_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    InvoicePdf,
    PayrollExport,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct GeneratedDocument {
    pub id: Uuid,

    #[schema(ignore)]
    pub organization_id: Uuid,

    pub kind: DocumentKind,

    #[schema(example = "payroll-exports/550e8400-e29b-41d4-a716-446655440000/2026-09-1f0c.csv")]
    pub storage_key: String,

    pub created_at: DateTime<Utc>,
}

/// Documento + URL assinada (temporária) para download.
#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentLink {
    #[serde(flatten)]
    pub document: GeneratedDocument,
    pub url: String,
}
