//! HTTP request handlers

pub mod batch;
pub mod blend;
pub mod fiscal_year;
pub mod health;
pub mod import;

pub use batch::*;
pub use blend::*;
pub use fiscal_year::*;
pub use health::*;
pub use import::*;
