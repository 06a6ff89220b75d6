//! Domain models for the Gelatin Production Management Platform

mod batch;
mod blend;
mod blend_sheet;
pub mod fiscal_year;
mod lab_report;
mod numbering;

pub use batch::*;
pub use blend::*;
pub use blend_sheet::*;
pub use fiscal_year::{
    fiscal_year_for_date, fiscal_year_token, format_lot_number, next_fiscal_year, start_year,
    validate_fiscal_year, validate_lot_number, LOT_NUMBER_PREFIX,
};
pub use lab_report::*;
pub use numbering::*;
