pub mod auth;
pub mod customer;
pub mod document;
pub mod employee;
pub mod invoice;
pub mod leave;
pub mod organization;
pub mod payment;
pub mod settings;
