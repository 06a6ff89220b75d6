//! External service clients

pub mod lab_report;

pub use lab_report::LabReportExtractionClient;
