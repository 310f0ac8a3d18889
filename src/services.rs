pub mod auth;
pub mod billing_service;
pub mod document_service;
pub mod invoice_service;
pub mod leave_service;
pub mod organization_service;
pub mod payment_provider;
pub mod payment_service;
pub mod payroll_service;
pub mod storage;
pub mod webhook_projector;
