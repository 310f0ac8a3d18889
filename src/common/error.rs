// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{common::i18n::I18nStore, middleware::i18n::Locale};

// Erros de domínio e de infraestrutura. A tradução para HTTP acontece
// em `to_api_error`, que conhece o idioma do cliente.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Não autenticado")]
    Unauthenticated,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Permissão ausente: {0}")]
    Forbidden(String),

    #[error("Organização não encontrada")]
    OrganizationNotFound,

    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    // A chave identifica a regra de estado violada (ex: "invoice_locked")
    #[error("Conflito de estado: {0}")]
    StateConflict(&'static str),

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Assinatura do webhook inválida")]
    WebhookSignatureInvalid,

    #[error("Erro do provedor de pagamentos: {0}")]
    PaymentProvider(String),

    #[error("Erro de armazenamento: {0}")]
    Storage(String),

    #[error("Erro ao gerar documento: {0}")]
    Document(String),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

/// Rejeição HTTP padrão: `{ "error": string, "details"?: object }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self { status, error: error.into(), details: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::OrganizationNotFound | AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_)
            | AppError::InvalidInput(_)
            | AppError::StateConflict(_)
            | AppError::WebhookSignatureInvalid => StatusCode::BAD_REQUEST,
            AppError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::PaymentProvider(_)
            | AppError::Storage(_)
            | AppError::Document(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converte o erro numa resposta traduzida para o idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let lang = locale.0.as_str();
        let status = self.status();

        match self {
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| match &e.message {
                            Some(m) => m.to_string(),
                            None => store.translate(lang, &format!("validation.{}", e.code)),
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                ApiError {
                    status,
                    error: store.translate(lang, "validation_failed"),
                    details: Some(json!(details)),
                }
            }
            AppError::Unauthenticated => ApiError::new(status, store.translate(lang, "unauthenticated")),
            AppError::InvalidToken => ApiError::new(status, store.translate(lang, "invalid_token")),
            AppError::Forbidden(permission) => ApiError::new(
                status,
                store.translate_with(lang, "forbidden", &[("permission", permission)]),
            ),
            AppError::OrganizationNotFound => {
                ApiError::new(status, store.translate(lang, "organization_not_found"))
            }
            AppError::InvalidInput(detail) => ApiError::new(
                status,
                store.translate_with(lang, "invalid_input", &[("detail", detail)]),
            ),
            AppError::StateConflict(rule) => {
                ApiError::new(status, store.translate(lang, &format!("state.{rule}")))
            }
            AppError::ResourceNotFound(resource) => ApiError::new(
                status,
                store.translate_with(lang, "resource_not_found", &[("resource", resource)]),
            ),
            AppError::DatabaseError(sqlx::Error::RowNotFound) => ApiError::new(
                status,
                store.translate_with(lang, "resource_not_found", &[("resource", "")]),
            ),
            AppError::UniqueConstraintViolation(detail) => ApiError::new(
                status,
                store.translate_with(lang, "unique_violation", &[("detail", detail)]),
            ),
            AppError::WebhookSignatureInvalid => {
                ApiError::new(status, store.translate(lang, "webhook_signature_invalid"))
            }
            // Todos os outros erros viram 500 e são logados aqui.
            e => {
                tracing::error!(error = %e, "Erro Interno do Servidor");
                let message = if store.expose_internal_errors() {
                    e.to_string()
                } else {
                    store.translate(lang, "internal")
                };
                ApiError::new(status, message)
            }
        }
    }
}

// Usado onde não existe contexto de idioma (ex: webhooks do provedor).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), &I18nStore::default())
            .into_response()
    }
}

/// Converte violações de unicidade do Postgres no erro de domínio.
pub(crate) fn map_unique_violation(e: sqlx::Error, detail: &str) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return AppError::UniqueConstraintViolation(detail.to_string());
        }
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::{ValidationError, ValidationErrors};

    fn locale(lang: &str) -> Locale {
        Locale(lang.to_string())
    }

    #[test]
    fn taxonomy_maps_to_expected_status_codes() {
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::OrganizationNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::StateConflict("invoice_locked").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::ResourceNotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::UniqueConstraintViolation("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::DatabaseError(sqlx::Error::RowNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Storage("disk".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn state_conflict_is_translated() {
        let store = I18nStore::new(false);
        let api = AppError::StateConflict("invoice_locked").to_api_error(&locale("fr"), &store);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert!(api.error.contains("facture"));
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let mut errors = ValidationErrors::new();
        let mut err = ValidationError::new("length");
        err.message = Some("obrigatório".into());
        errors.add("label", err);

        let api = AppError::ValidationError(errors).to_api_error(&locale("en"), &I18nStore::new(false));
        let details = api.details.expect("details");
        assert_eq!(details["label"][0], "obrigatório");
    }

    #[test]
    fn internal_errors_are_hidden_in_production() {
        let err = AppError::Storage("disk full at /var".into());

        let production = err.to_api_error(&locale("en"), &I18nStore::new(false));
        assert!(!production.error.contains("/var"));

        let development = err.to_api_error(&locale("en"), &I18nStore::new(true));
        assert!(development.error.contains("/var"));
    }
}
