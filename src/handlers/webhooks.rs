// src/handlers/webhooks.rs

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::{common::error::AppError, config::AppState};

const SIGNATURE_HEADER: &str = "stripe-signature";

// POST /api/webhooks/stripe
// Sem JWT: a autenticação é a assinatura HMAC sobre o corpo bruto.
#[utoipa::path(
    post,
    path = "/api/webhooks/stripe",
    tag = "Webhooks",
    request_body(content = String, description = "Evento do provedor (JSON bruto)", content_type = "application/json"),
    responses(
        (status = 200, description = "Evento recebido (aplicado ou ignorado)"),
        (status = 400, description = "Assinatura inválida ou corpo ilegível"),
        (status = 500, description = "Falha ao gravar; o provedor reenvia")
    )
)]
pub async fn stripe_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::WebhookSignatureInvalid)?;

    let outcome = app_state
        .billing_service
        .handle_webhook(&body, signature, Utc::now().timestamp())
        .await?;

    tracing::debug!(outcome = ?outcome, "Webhook processado");

    Ok((StatusCode::OK, Json(json!({ "received": true }))))
}
