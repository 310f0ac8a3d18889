//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::{auth::auth_guard, organization::organization_guard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Sem configuração válida a aplicação não sobe
    let config = Config::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config).await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app = build_router(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn build_router(app_state: AppState) -> Router {
    // Só exigem o token: o usuário pode ainda não ter organização
    let user_routes = Router::new()
        .route("/me", get(handlers::users::get_me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let organization_routes = Router::new()
        .route("/"
               ,post(handlers::organizations::create_organization)
               .get(handlers::organizations::list_my_organizations)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Token + membership: tudo que lê ou grava dados de uma organização
    let tenant_routes = Router::new()
        .route("/settings"
               ,get(handlers::settings::get_settings)
               .put(handlers::settings::update_settings)
        )
        .route("/customers"
               ,post(handlers::customers::create_customer)
               .get(handlers::customers::list_customers)
        )
        .route("/customers/{id}", get(handlers::customers::get_customer))
        // Faturas
        .route("/invoices"
               ,post(handlers::invoices::create_invoice)
               .get(handlers::invoices::list_invoices)
        )
        .route("/invoices/{id}"
               ,get(handlers::invoices::get_invoice)
               .put(handlers::invoices::update_invoice)
               .delete(handlers::invoices::delete_invoice)
        )
        .route("/invoices/{id}/send", post(handlers::invoices::send_invoice))
        .route("/invoices/{id}/cancel", post(handlers::invoices::cancel_invoice))
        .route("/invoices/{id}/pdf", get(handlers::invoices::invoice_pdf))
        .route("/payments"
               ,post(handlers::payments::record_payment)
               .get(handlers::payments::list_payments)
        )
        // RH
        .route("/employees"
               ,post(handlers::employees::create_employee)
               .get(handlers::employees::list_employees)
        )
        .route("/employees/{id}"
               ,get(handlers::employees::get_employee)
               .put(handlers::employees::update_employee)
               .delete(handlers::employees::deactivate_employee)
        )
        .route("/leave-requests"
               ,post(handlers::leave_requests::create_leave_request)
               .get(handlers::leave_requests::list_leave_requests)
        )
        .route("/leave-requests/{id}/approve", post(handlers::leave_requests::approve_leave_request))
        .route("/leave-requests/{id}/reject", post(handlers::leave_requests::reject_leave_request))
        .route("/payroll/exports", post(handlers::payroll::export_payroll))
        // Documentos e assinatura
        .route("/documents", get(handlers::documents::list_documents))
        .route("/billing", get(handlers::billing::get_billing))
        .route("/billing/checkout", post(handlers::billing::create_checkout))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            organization_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        // Públicas: autenticadas pela assinatura HMAC
        .route("/api/webhooks/stripe", post(handlers::webhooks::stripe_webhook))
        .route("/files/{*key}", get(handlers::documents::download_file))
        .nest("/api/users", user_routes)
        .nest("/api/organizations", organization_routes)
        .nest("/api", tenant_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::test_support::lazy_state, services::payment_provider::tests::sign};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_router(lazy_state());

        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn tenant_routes_require_a_token() {
        let app = build_router(lazy_state());

        let response = app
            .oneshot(Request::builder().uri("/api/invoices").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn garbage_tokens_are_rejected() {
        let app = build_router(lazy_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/users/me")
                    .header("authorization", "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn webhook_with_bad_signature_is_a_bad_request() {
        let app = build_router(lazy_state());
        let payload = r#"{"id":"evt_1","type":"customer.subscription.deleted","data":{"object":{"customer":"cus_1"}}}"#;
        let now = chrono::Utc::now().timestamp();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/webhooks/stripe")
                    .header("stripe-signature", sign(payload.as_bytes(), "wrong-secret", now))
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn webhook_without_signature_header_is_a_bad_request() {
        let app = build_router(lazy_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/webhooks/stripe")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ignored_webhook_events_are_acknowledged() {
        let state = lazy_state();
        let secret = state.config.stripe_webhook_secret.clone();
        let app = build_router(state);
        let payload = r#"{"id":"evt_2","type":"charge.refunded","data":{"object":{}}}"#;
        let now = chrono::Utc::now().timestamp();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/webhooks/stripe")
                    .header("stripe-signature", sign(payload.as_bytes(), &secret, now))
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["received"], true);
    }

    #[tokio::test]
    async fn signed_files_reject_tampered_urls() {
        let app = build_router(lazy_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/files/documents/org/invoices/FAC-2026-0001.pdf?expires=99999999999&signature=00ff")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn signed_files_are_served() {
        let state = lazy_state();
        let key = format!("payroll-exports/{}/2026-09.csv", uuid::Uuid::new_v4());
        state.storage.put(&key, b"employee_id\n".to_vec()).await.unwrap();
        let url = state.url_signer.sign(&key, chrono::Utc::now().timestamp()).unwrap();
        let path = url.trim_start_matches(&state.config.public_base_url).to_string();
        let app = build_router(state);

        let response = app
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/csv; charset=utf-8");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"employee_id\n");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = build_router(lazy_state());

        let response = app
            .oneshot(Request::builder().uri("/api-docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["paths"]["/api/invoices"].is_object());
    }
}
