pub mod billing;
pub mod customers;
pub mod documents;
pub mod employees;
pub mod invoices;
pub mod leave_requests;
pub mod organizations;
pub mod payments;
pub mod payroll;
pub mod settings;
pub mod users;
pub mod webhooks;
