//! Entity declarations for the REST API's entity sets.

pub mod crm;
pub mod financial;
pub mod salesinvoice;

pub use crm::Account;
pub use financial::JournalStatus;
pub use salesinvoice::{SalesInvoice, SalesInvoiceLine};
