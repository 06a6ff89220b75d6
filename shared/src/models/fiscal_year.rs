//! Fiscal-year tokens and document numbering

use chrono::{Datelike, NaiveDate};

/// Prefix for blend lot numbers (e.g. "GLT-2025-26-0042")
pub const LOT_NUMBER_PREFIX: &str = "GLT";

/// Validate a fiscal-year token of the form "2025-26".
///
/// The suffix must be the last two digits of the year after the start year,
/// so "2025-26" is valid and "2025-27" is not.
pub fn validate_fiscal_year(token: &str) -> Result<(), &'static str> {
    let Some((start, suffix)) = token.split_once('-') else {
        return Err("Fiscal year must be in the form YYYY-YY");
    };
    if start.len() != 4 || !start.chars().all(|c| c.is_ascii_digit()) {
        return Err("Fiscal year must start with a 4-digit year");
    }
    if suffix.len() != 2 || !suffix.chars().all(|c| c.is_ascii_digit()) {
        return Err("Fiscal year suffix must be 2 digits");
    }
    let start_year: i32 = start.parse().map_err(|_| "Invalid fiscal year")?;
    let suffix_year: i32 = suffix.parse().map_err(|_| "Invalid fiscal year")?;
    if (start_year + 1) % 100 != suffix_year {
        return Err("Fiscal year suffix must follow the start year");
    }
    Ok(())
}

/// Start year of a valid fiscal-year token
pub fn start_year(token: &str) -> Option<i32> {
    validate_fiscal_year(token).ok()?;
    token.split_once('-')?.0.parse().ok()
}

/// The token for the year following `token` ("2025-26" -> "2026-27")
pub fn next_fiscal_year(token: &str) -> Result<String, &'static str> {
    let start = start_year(token).ok_or("Invalid fiscal year")?;
    Ok(fiscal_year_token(start + 1))
}

/// Build a token from its start year
pub fn fiscal_year_token(start: i32) -> String {
    format!("{}-{:02}", start, (start + 1) % 100)
}

/// Fiscal year a calendar date falls in. The accounting year runs April
/// through March, so 2026-03-31 is still "2025-26".
pub fn fiscal_year_for_date(date: NaiveDate) -> String {
    let start = if date.month() >= 4 {
        date.year()
    } else {
        date.year() - 1
    };
    fiscal_year_token(start)
}

/// Format a blend lot number: GLT-<fiscal year>-<serial, 4 digits>
pub fn format_lot_number(fiscal_year: &str, serial: i32) -> String {
    format!("{}-{}-{:04}", LOT_NUMBER_PREFIX, fiscal_year, serial)
}

/// Validate a lot number produced by [`format_lot_number`]
pub fn validate_lot_number(lot_number: &str) -> Result<(), &'static str> {
    let mut parts = lot_number.splitn(2, '-');
    if parts.next() != Some(LOT_NUMBER_PREFIX) {
        return Err("Lot number must start with GLT-");
    }
    let rest = parts.next().ok_or("Lot number is incomplete")?;
    // rest = "<YYYY-YY>-<NNNN>"
    let Some((fiscal_year, serial)) = rest.rsplit_once('-') else {
        return Err("Lot number is incomplete");
    };
    validate_fiscal_year(fiscal_year)?;
    if serial.len() != 4 || !serial.chars().all(|c| c.is_ascii_digit()) {
        return Err("Lot number serial must be 4 digits");
    }
    Ok(())
}
