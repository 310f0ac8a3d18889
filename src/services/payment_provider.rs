// src/services/payment_provider.rs

use std::collections::HashMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::common::error::AppError;

type HmacSha256 = Hmac<Sha256>;

// Janela aceita entre o carimbo `t=` e o relógio local
const SIGNATURE_TOLERANCE_SECS: u64 = 300;

/// Pedido de sessão de checkout (modo assinatura).
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub price_id: String,
    pub customer_id: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    pub client_reference_id: String,
    pub metadata: HashMap<String, String>,
}

/// Provedor de pagamentos (injetado no `AppState`, nunca global).
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Cria a sessão e devolve a URL de redirecionamento.
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<String, AppError>;
}

pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    message: Option<String>,
}

impl StripeClient {
    pub fn new(api_base: &str, secret_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response, AppError> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let (error_type, error_message) = match serde_json::from_str::<StripeErrorEnvelope>(&body) {
            Ok(envelope) => (envelope.error.type_, envelope.error.message),
            Err(_) => (None, None),
        };

        tracing::error!(
            status = %status,
            stripe_error_type = ?error_type,
            stripe_error_message = ?error_message,
            context = %context,
            "Requisição ao Stripe falhou"
        );

        Err(AppError::PaymentProvider(format!("{context}: status {status}")))
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<String, AppError> {
        let mut body: Vec<(String, String)> = vec![
            ("mode".into(), "subscription".into()),
            ("line_items[0][price]".into(), request.price_id.clone()),
            ("line_items[0][quantity]".into(), "1".into()),
            ("success_url".into(), request.success_url.clone()),
            ("cancel_url".into(), request.cancel_url.clone()),
            ("client_reference_id".into(), request.client_reference_id.clone()),
        ];

        if let Some(customer) = &request.customer_id {
            body.push(("customer".into(), customer.clone()));
        }

        for (key, value) in &request.metadata {
            body.push((format!("metadata[{key}]"), value.clone()));
            // Repete nos metadados da assinatura para os eventos de subscription
            body.push((format!("subscription_data[metadata][{key}]"), value.clone()));
        }

        let resp = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .form(&body)
            .send()
            .await
            .map_err(|e| AppError::PaymentProvider(e.to_string()))?;
        let resp = Self::ensure_success(resp, "create checkout session").await?;

        #[derive(Deserialize)]
        struct CheckoutResp {
            url: Option<String>,
        }

        let parsed: CheckoutResp = resp
            .json()
            .await
            .map_err(|e| AppError::PaymentProvider(e.to_string()))?;

        parsed
            .url
            .ok_or_else(|| AppError::PaymentProvider("checkout session without url".into()))
    }
}

/// Verifica o cabeçalho `Stripe-Signature` (`t=<unix>,v1=<hex>`).
/// A comparação do HMAC é feita em tempo constante.
pub fn verify_webhook_signature(
    secret: &str,
    payload: &[u8],
    signature_header: &str,
    now: i64,
) -> Result<(), AppError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("t=") {
            timestamp = Some(rest);
        } else if let Some(rest) = part.strip_prefix("v1=") {
            signatures.push(rest);
        }
    }

    // O HMAC cobre o texto literal de `t`, não o número re-serializado
    let raw_timestamp = timestamp.ok_or(AppError::WebhookSignatureInvalid)?;
    let parsed: i64 = raw_timestamp
        .parse()
        .map_err(|_| AppError::WebhookSignatureInvalid)?;
    let age = now
        .checked_sub(parsed)
        .map(i64::unsigned_abs)
        .ok_or(AppError::WebhookSignatureInvalid)?;
    if signatures.is_empty() || age > SIGNATURE_TOLERANCE_SECS {
        return Err(AppError::WebhookSignatureInvalid);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::WebhookSignatureInvalid)?;
    mac.update(raw_timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = mac.finalize().into_bytes();

    // O Stripe pode enviar várias assinaturas v1 durante rotação de segredo
    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|provided| bool::from(expected.as_slice().ct_eq(provided.as_slice())))
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(AppError::WebhookSignatureInvalid)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";

    pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = sign(payload, SECRET, 1_700_000_000);

        assert!(verify_webhook_signature(SECRET, payload, &header, 1_700_000_010).is_ok());
    }

    #[test]
    fn rejects_wrong_secret_and_modified_payload() {
        let payload = br#"{"type":"checkout.session.completed"}"#;

        let forged = sign(payload, "wrong_secret", 1_700_000_000);
        assert!(verify_webhook_signature(SECRET, payload, &forged, 1_700_000_000).is_err());

        let header = sign(payload, SECRET, 1_700_000_000);
        let tampered = br#"{"type":"checkout.session.completed","hacked":true}"#;
        assert!(verify_webhook_signature(SECRET, tampered, &header, 1_700_000_000).is_err());
    }

    #[test]
    fn rejects_timestamps_outside_tolerance() {
        let payload = b"{}";
        let header = sign(payload, SECRET, 1_700_000_000);

        assert!(verify_webhook_signature(SECRET, payload, &header, 1_700_000_000 + 600).is_err());
    }

    #[test]
    fn extreme_timestamps_are_rejected_without_panicking() {
        let payload = b"{}";
        for header in [
            "t=-9223372036854775808,v1=00",
            "t=9223372036854775807,v1=00",
            "t=99999999999999999999,v1=00",
        ] {
            assert!(matches!(
                verify_webhook_signature(SECRET, payload, header, 1_700_000_000),
                Err(AppError::WebhookSignatureInvalid)
            ));
        }
        // `now` no outro extremo também não pode estourar
        assert!(matches!(
            verify_webhook_signature(SECRET, payload, "t=1,v1=00", i64::MIN),
            Err(AppError::WebhookSignatureInvalid)
        ));
    }

    #[test]
    fn signature_covers_the_literal_timestamp() {
        let payload = br#"{"type":"invoice.paid"}"#;
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(b"01700000000.");
        mac.update(payload);
        let header = format!("t=01700000000,v1={}", hex::encode(mac.finalize().into_bytes()));

        assert!(verify_webhook_signature(SECRET, payload, &header, 1_700_000_000).is_ok());
    }

    #[test]
    fn rejects_malformed_headers() {
        let payload = b"{}";
        for header in ["garbage", "v1=abcd", "t=1700000000", "t=abc,v1=zz"] {
            assert!(matches!(
                verify_webhook_signature(SECRET, payload, header, 1_700_000_000),
                Err(AppError::WebhookSignatureInvalid)
            ));
        }
    }
}
