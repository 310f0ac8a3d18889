// src/services/webhook_projector.rs

//! Tradução dos eventos do provedor de pagamentos na projeção de
//! cobrança da organização. Função pura: nenhum I/O acontece aqui.

use std::collections::HashMap;

use serde::Deserialize;
use uuid::Uuid;

// A partir desta tentativa a assinatura passa a `past_due`
pub const PAST_DUE_ATTEMPT_THRESHOLD: i64 = 3;

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_PAST_DUE: &str = "past_due";
pub const STATUS_CANCELED: &str = "canceled";

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    customer: Option<String>,
    subscription: Option<String>,
    client_reference_id: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct InvoiceObject {
    customer: Option<String>,
    subscription: Option<String>,
    #[serde(default)]
    attempt_count: i64,
}

#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    id: Option<String>,
    customer: Option<String>,
    status: Option<String>,
    #[serde(default)]
    items: SubscriptionItems,
}

#[derive(Debug, Default, Deserialize)]
struct SubscriptionItems {
    #[serde(default)]
    data: Vec<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItem {
    price: Option<SubscriptionPrice>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionPrice {
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Como localizar a organização afetada pelo evento.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingTarget {
    Organization(Uuid),
    Customer(String),
}

/// Mudança a aplicar; `None` mantém o valor atual da coluna.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingUpdate {
    pub target: BillingTarget,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub billing_plan: Option<String>,
    pub subscription_status: Option<String>,
}

impl BillingUpdate {
    fn for_customer(customer_id: String) -> Self {
        Self {
            target: BillingTarget::Customer(customer_id),
            customer_id: None,
            subscription_id: None,
            billing_plan: None,
            subscription_status: None,
        }
    }
}

/// Deriva a atualização de cobrança de um evento. Eventos desconhecidos,
/// incompletos ou sem efeito devolvem `None`.
pub fn project(event: &StripeEvent) -> Option<BillingUpdate> {
    let object = event.data.object.clone();

    match event.type_.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSessionObject = serde_json::from_value(object).ok()?;
            let organization_id = session
                .metadata
                .get("organization_id")
                .cloned()
                .or(session.client_reference_id)
                .and_then(|raw| Uuid::parse_str(&raw).ok())?;

            Some(BillingUpdate {
                target: BillingTarget::Organization(organization_id),
                customer_id: session.customer,
                subscription_id: session.subscription,
                billing_plan: session.metadata.get("plan").cloned(),
                subscription_status: Some(STATUS_ACTIVE.to_string()),
            })
        }
        "invoice.payment_succeeded" => {
            let invoice: InvoiceObject = serde_json::from_value(object).ok()?;
            // Faturas avulsas (sem assinatura) não mexem no status
            let subscription_id = invoice.subscription?;

            Some(BillingUpdate {
                subscription_id: Some(subscription_id),
                subscription_status: Some(STATUS_ACTIVE.to_string()),
                ..BillingUpdate::for_customer(invoice.customer?)
            })
        }
        "invoice.payment_failed" => {
            let invoice: InvoiceObject = serde_json::from_value(object).ok()?;
            if invoice.attempt_count < PAST_DUE_ATTEMPT_THRESHOLD {
                return None;
            }

            Some(BillingUpdate {
                subscription_status: Some(STATUS_PAST_DUE.to_string()),
                ..BillingUpdate::for_customer(invoice.customer?)
            })
        }
        "customer.subscription.updated" => {
            let subscription: SubscriptionObject = serde_json::from_value(object).ok()?;
            let plan = subscription
                .items
                .data
                .first()
                .and_then(|item| item.price.as_ref())
                .and_then(|price| price.metadata.get("plan").cloned());

            Some(BillingUpdate {
                subscription_id: subscription.id,
                billing_plan: plan,
                subscription_status: subscription.status,
                ..BillingUpdate::for_customer(subscription.customer?)
            })
        }
        "customer.subscription.deleted" => {
            let subscription: SubscriptionObject = serde_json::from_value(object).ok()?;

            Some(BillingUpdate {
                subscription_status: Some(STATUS_CANCELED.to_string()),
                ..BillingUpdate::for_customer(subscription.customer?)
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(type_: &str, object: serde_json::Value) -> StripeEvent {
        serde_json::from_value(json!({
            "id": "evt_1",
            "type": type_,
            "data": { "object": object }
        }))
        .unwrap()
    }

    #[test]
    fn checkout_completed_activates_the_organization_from_metadata() {
        let org_id = Uuid::new_v4();
        let update = project(&event(
            "checkout.session.completed",
            json!({
                "customer": "cus_123",
                "subscription": "sub_456",
                "metadata": { "organization_id": org_id.to_string(), "plan": "pro" }
            }),
        ))
        .unwrap();

        assert_eq!(update.target, BillingTarget::Organization(org_id));
        assert_eq!(update.customer_id.as_deref(), Some("cus_123"));
        assert_eq!(update.subscription_id.as_deref(), Some("sub_456"));
        assert_eq!(update.billing_plan.as_deref(), Some("pro"));
        assert_eq!(update.subscription_status.as_deref(), Some("active"));
    }

    #[test]
    fn checkout_falls_back_to_client_reference_id() {
        let org_id = Uuid::new_v4();
        let update = project(&event(
            "checkout.session.completed",
            json!({ "customer": "cus_123", "client_reference_id": org_id.to_string() }),
        ))
        .unwrap();

        assert_eq!(update.target, BillingTarget::Organization(org_id));
        assert_eq!(update.billing_plan, None);
    }

    #[test]
    fn checkout_without_organization_is_ignored() {
        let update = project(&event("checkout.session.completed", json!({ "customer": "cus_123" })));
        assert!(update.is_none());
    }

    #[test]
    fn payment_failed_moves_to_past_due_only_from_third_attempt() {
        let third = project(&event(
            "invoice.payment_failed",
            json!({ "customer": "cus_123", "subscription": "sub_456", "attempt_count": 3 }),
        ))
        .unwrap();
        assert_eq!(third.target, BillingTarget::Customer("cus_123".into()));
        assert_eq!(third.subscription_status.as_deref(), Some("past_due"));

        let second = project(&event(
            "invoice.payment_failed",
            json!({ "customer": "cus_123", "subscription": "sub_456", "attempt_count": 2 }),
        ));
        assert!(second.is_none());
    }

    #[test]
    fn payment_succeeded_requires_a_subscription() {
        let with_sub = project(&event(
            "invoice.payment_succeeded",
            json!({ "customer": "cus_123", "subscription": "sub_456" }),
        ))
        .unwrap();
        assert_eq!(with_sub.subscription_status.as_deref(), Some("active"));

        let one_off = project(&event("invoice.payment_succeeded", json!({ "customer": "cus_123" })));
        assert!(one_off.is_none());
    }

    #[test]
    fn subscription_updated_copies_status_and_plan() {
        let update = project(&event(
            "customer.subscription.updated",
            json!({
                "id": "sub_456",
                "customer": "cus_123",
                "status": "trialing",
                "items": { "data": [ { "price": { "metadata": { "plan": "team" } } } ] }
            }),
        ))
        .unwrap();

        assert_eq!(update.subscription_status.as_deref(), Some("trialing"));
        assert_eq!(update.billing_plan.as_deref(), Some("team"));
        assert_eq!(update.subscription_id.as_deref(), Some("sub_456"));
    }

    #[test]
    fn subscription_deleted_cancels() {
        let update = project(&event(
            "customer.subscription.deleted",
            json!({ "id": "sub_456", "customer": "cus_123", "status": "canceled" }),
        ))
        .unwrap();
        assert_eq!(update.subscription_status.as_deref(), Some("canceled"));
    }

    #[test]
    fn unknown_events_are_ignored() {
        assert!(project(&event("charge.refunded", json!({ "customer": "cus_123" }))).is_none());
    }
}
