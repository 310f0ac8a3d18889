// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Users / Organizations ---
        handlers::users::get_me,
        handlers::organizations::create_organization,
        handlers::organizations::list_my_organizations,

        // --- Settings ---
        handlers::settings::get_settings,
        handlers::settings::update_settings,

        // --- Customers ---
        handlers::customers::create_customer,
        handlers::customers::list_customers,
        handlers::customers::get_customer,

        // --- INVOICES ---
        handlers::invoices::create_invoice,
        handlers::invoices::list_invoices,
        handlers::invoices::get_invoice,
        handlers::invoices::update_invoice,
        handlers::invoices::delete_invoice,
        handlers::invoices::send_invoice,
        handlers::invoices::cancel_invoice,
        handlers::invoices::invoice_pdf,

        // --- Payments ---
        handlers::payments::record_payment,
        handlers::payments::list_payments,

        // --- HR ---
        handlers::employees::create_employee,
        handlers::employees::list_employees,
        handlers::employees::get_employee,
        handlers::employees::update_employee,
        handlers::employees::deactivate_employee,
        handlers::leave_requests::create_leave_request,
        handlers::leave_requests::list_leave_requests,
        handlers::leave_requests::approve_leave_request,
        handlers::leave_requests::reject_leave_request,
        handlers::payroll::export_payroll,

        // --- Documents ---
        handlers::documents::list_documents,

        // --- Billing ---
        handlers::billing::get_billing,
        handlers::billing::create_checkout,
        handlers::webhooks::stripe_webhook,
    ),
    components(
        schemas(
            // --- Auth / Organizations ---
            models::auth::User,
            models::auth::MeResponse,
            models::organization::MemberRole,
            models::organization::Organization,
            models::organization::UserOrganization,
            models::organization::BillingInfo,

            // --- Settings ---
            models::settings::OrganizationSettings,
            models::settings::UpdateSettingsRequest,

            // --- Invoices ---
            models::customer::Customer,
            models::invoice::InvoiceStatus,
            models::invoice::Invoice,
            models::invoice::InvoiceItem,
            models::invoice::InvoiceItemInput,
            models::invoice::InvoiceTotals,
            models::invoice::InvoiceDetail,
            models::invoice::CreateInvoiceRequest,
            models::invoice::UpdateInvoiceRequest,

            // --- Payments ---
            models::payment::PaymentMethod,
            models::payment::Payment,
            models::payment::RecordPaymentRequest,
            models::payment::PaymentReceipt,

            // --- HR ---
            models::employee::Employee,
            models::leave::LeaveType,
            models::leave::LeaveStatus,
            models::leave::LeaveRequest,
            models::leave::CreateLeaveRequest,
            models::leave::DecideLeaveRequest,

            // --- Documents ---
            models::document::DocumentKind,
            models::document::GeneratedDocument,
            models::document::DocumentLink,

            // --- Payloads ---
            handlers::organizations::CreateOrganizationPayload,
            handlers::customers::CreateCustomerPayload,
            handlers::employees::EmployeePayload,
            handlers::payroll::PayrollExportPayload,
            handlers::billing::CheckoutPayload,
            handlers::billing::CheckoutResponse,
        )
    ),
    tags(
        (name = "Users", description = "Identidade do token"),
        (name = "Organizations", description = "Organizações e memberships"),
        (name = "Settings", description = "Dados legais e de faturação"),
        (name = "Customers", description = "Clientes faturáveis"),
        (name = "Invoices", description = "Ciclo de vida das faturas"),
        (name = "Payments", description = "Pagamentos e reconciliação"),
        (name = "Employees", description = "Cadastro de funcionários"),
        (name = "Leave", description = "Pedidos de férias e aprovação"),
        (name = "Payroll", description = "Exportação mensal da folha"),
        (name = "Documents", description = "PDFs e exportações geradas"),
        (name = "Billing", description = "Assinatura da organização"),
        (name = "Webhooks", description = "Eventos do provedor de pagamentos")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route_group() {
        let doc = ApiDoc::openapi();

        for path in [
            "/api/invoices",
            "/api/invoices/{id}/send",
            "/api/payments",
            "/api/leave-requests/{id}/approve",
            "/api/payroll/exports",
            "/api/webhooks/stripe",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} ausente do OpenAPI");
        }

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
