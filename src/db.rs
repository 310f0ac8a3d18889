pub mod organization_repo;
pub use organization_repo::OrganizationRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
pub mod customer_repo;
pub use customer_repo::CustomerRepository;
pub mod invoice_repo;
pub use invoice_repo::InvoiceRepository;
pub mod payment_repo;
pub use payment_repo::PaymentRepository;
pub mod employee_repo;
pub use employee_repo::EmployeeRepository;
pub mod leave_repo;
pub use leave_repo::LeaveRepository;
pub mod document_repo;

pub use document_repo::DocumentRepository;
