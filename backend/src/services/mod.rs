//! Business logic services

pub mod audit;
pub mod batch;
pub mod blend;
pub mod document;
pub mod fiscal_year;
pub mod import;

pub use audit::AuditService;
pub use batch::BatchService;
pub use blend::BlendService;
pub use document::DocumentService;
pub use fiscal_year::FiscalYearService;
pub use import::ImportService;
