//! Shared types and models for the Gelatin Production Management Platform
//!
//! This crate contains the pure domain logic shared between the backend and
//! other components of the system: batch and blend models, blend planning
//! mathematics, batch-number bookkeeping and the printable sheet projection.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
