// src/handlers/documents.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, organization::OrganizationContext},
    models::document::DocumentLink,
    services::document_service::sign_documents,
};

// GET /api/documents
#[utoipa::path(
    get,
    path = "/api/documents",
    tag = "Documents",
    responses(
        (status = 200, description = "Documentos gerados com URLs assinadas", body = Vec<DocumentLink>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_documents(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &org, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let documents = app_state
        .document_service
        .list_documents(&mut *rls_conn, &org)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    let links = sign_documents(documents, &app_state.url_signer, Utc::now().timestamp())
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(links)))
}

#[derive(Debug, Deserialize)]
pub struct SignedFileQuery {
    pub expires: Option<i64>,
    pub signature: Option<String>,
}

fn content_type_for(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext) {
        Some("pdf") => "application/pdf",
        Some("csv") => "text/csv; charset=utf-8",
        _ => "application/octet-stream",
    }
}

// GET /files/{*key}
// Público: a autorização é a própria assinatura da URL
pub async fn download_file(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(key): Path<String>,
    Query(query): Query<SignedFileQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(expires), Some(signature)) = (query.expires, query.signature) else {
        return Err(AppError::Forbidden("signed-url".into()).to_api_error(&locale, &app_state.i18n_store));
    };

    app_state
        .url_signer
        .verify(&key, expires, &signature, Utc::now().timestamp())
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    let bytes = app_state
        .storage
        .get(&key)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    let file_name = key.rsplit('/').next().unwrap_or(&key).to_string();
    let headers = [
        (header::CONTENT_TYPE, content_type_for(&key).to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
    ];

    Ok((headers, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_follows_the_extension() {
        assert_eq!(content_type_for("documents/org/invoices/FAC-2026-0001.pdf"), "application/pdf");
        assert_eq!(content_type_for("payroll-exports/org/2026-09-x.csv"), "text/csv; charset=utf-8");
        assert_eq!(content_type_for("misc/blob"), "application/octet-stream");
    }
}
