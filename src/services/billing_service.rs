// src/services/billing_service.rs

use std::{collections::HashMap, sync::Arc};

use crate::{
    common::error::AppError,
    db::OrganizationRepository,
    middleware::organization::OrganizationContext,
    models::organization::BillingInfo,
    services::{
        payment_provider::{verify_webhook_signature, CheckoutRequest, PaymentProvider},
        webhook_projector::{project, StripeEvent},
    },
};

/// Resultado do processamento de um webhook (sempre 200 quando `Ok`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied,
    Ignored,
    // Evento válido, mas nenhuma organização corresponde
    Unmatched,
}

#[derive(Clone)]
pub struct BillingService {
    organization_repo: OrganizationRepository,
    provider: Arc<dyn PaymentProvider>,
    webhook_secret: String,
    success_url: String,
    cancel_url: String,
}

impl BillingService {
    pub fn new(
        organization_repo: OrganizationRepository,
        provider: Arc<dyn PaymentProvider>,
        webhook_secret: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Self {
        Self {
            organization_repo,
            provider,
            webhook_secret: webhook_secret.to_string(),
            success_url: success_url.to_string(),
            cancel_url: cancel_url.to_string(),
        }
    }

    pub async fn billing_info(&self, org: &OrganizationContext) -> Result<BillingInfo, AppError> {
        let organization = self.organization_repo.find_by_id(org.organization_id).await?;
        Ok(organization.into())
    }

    /// Cria a sessão de checkout e devolve a URL do provedor.
    pub async fn create_checkout(
        &self,
        org: &OrganizationContext,
        plan: &str,
        price_id: &str,
    ) -> Result<String, AppError> {
        let organization = self.organization_repo.find_by_id(org.organization_id).await?;

        let metadata = HashMap::from([
            ("organization_id".to_string(), organization.id.to_string()),
            ("plan".to_string(), plan.to_string()),
        ]);

        let request = CheckoutRequest {
            price_id: price_id.to_string(),
            customer_id: organization.stripe_customer_id,
            success_url: self.success_url.clone(),
            cancel_url: self.cancel_url.clone(),
            client_reference_id: organization.id.to_string(),
            metadata,
        };

        let url = self.provider.create_checkout_session(&request).await?;
        tracing::info!(organization_id = %organization.id, plan, "Sessão de checkout criada");

        Ok(url)
    }

    /// Verifica, projeta e aplica um evento do provedor.
    /// Falha de persistência sobe como erro para o provedor reenviar.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<WebhookOutcome, AppError> {
        verify_webhook_signature(&self.webhook_secret, payload, signature_header, now)?;

        let event: StripeEvent = serde_json::from_slice(payload)
            .map_err(|e| AppError::InvalidInput(format!("webhook payload: {e}")))?;

        let Some(update) = project(&event) else {
            tracing::debug!(event_id = ?event.id, event_type = %event.type_, "Evento ignorado");
            return Ok(WebhookOutcome::Ignored);
        };

        let applied = self
            .organization_repo
            .apply_billing_update(&update)
            .await
            // O erro em si é registrado uma vez, na conversão para 500
            .inspect_err(|_| {
                tracing::warn!(event_id = ?event.id, event_type = %event.type_, "Projeção de cobrança não gravada; o provedor vai reenviar");
            })?;

        if applied {
            tracing::info!(event_id = ?event.id, event_type = %event.type_, target = ?update.target, "Projeção de cobrança atualizada");
            Ok(WebhookOutcome::Applied)
        } else {
            tracing::warn!(event_id = ?event.id, event_type = %event.type_, target = ?update.target, "Nenhuma organização para o evento");
            Ok(WebhookOutcome::Unmatched)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::test_support::lazy_state, services::payment_provider::tests::sign};

    #[tokio::test]
    async fn bad_signature_is_rejected_before_touching_the_database() {
        let state = lazy_state();
        let payload = br#"{"type":"invoice.payment_failed","data":{"object":{}}}"#;
        let header = sign(payload, "not-the-secret", 1_700_000_000);

        let result = state.billing_service.handle_webhook(payload, &header, 1_700_000_000).await;
        assert!(matches!(result, Err(AppError::WebhookSignatureInvalid)));
    }

    #[tokio::test]
    async fn unknown_events_are_acknowledged() {
        let state = lazy_state();
        let payload = br#"{"id":"evt_1","type":"charge.refunded","data":{"object":{"customer":"cus_1"}}}"#;
        let header = sign(payload, &state.config.stripe_webhook_secret, 1_700_000_000);

        let result = state.billing_service.handle_webhook(payload, &header, 1_700_000_000).await;
        assert_eq!(result.unwrap(), WebhookOutcome::Ignored);
    }

    #[tokio::test]
    async fn payment_failed_below_threshold_is_a_no_op() {
        let state = lazy_state();
        let payload = br#"{"id":"evt_2","type":"invoice.payment_failed","data":{"object":{"customer":"cus_1","attempt_count":2}}}"#;
        let header = sign(payload, &state.config.stripe_webhook_secret, 1_700_000_000);

        let result = state.billing_service.handle_webhook(payload, &header, 1_700_000_000).await;
        assert_eq!(result.unwrap(), WebhookOutcome::Ignored);
    }
}
