//! Validation utilities for the Gelatin Production Management Platform

use rust_decimal::Decimal;

use crate::models::{validate_fiscal_year, validate_lot_number};

// ============================================================================
// Blend Target Validations
// ============================================================================

/// Validate a target bloom range
pub fn validate_bloom_range(min: Decimal, max: Decimal) -> Result<(), &'static str> {
    if min <= Decimal::ZERO || max <= Decimal::ZERO {
        return Err("Bloom targets must be positive");
    }
    if min > max {
        return Err("Bloom range minimum must not exceed the maximum");
    }
    Ok(())
}

/// Validate a bag count used in a blend selection
pub fn validate_bags(bags: i32) -> Result<(), &'static str> {
    if bags <= 0 {
        return Err("Bag count must be a positive integer");
    }
    Ok(())
}

// ============================================================================
// Measurement Validations
// ============================================================================

/// Validate a pH measurement
pub fn validate_ph(ph: Decimal) -> Result<(), &'static str> {
    if ph < Decimal::ZERO || ph > Decimal::from(14) {
        return Err("pH must be between 0 and 14");
    }
    Ok(())
}

/// Validate a moisture percentage
pub fn validate_moisture_percent(moisture: Decimal) -> Result<(), &'static str> {
    if moisture < Decimal::ZERO || moisture > Decimal::from(100) {
        return Err("Moisture must be between 0 and 100%");
    }
    Ok(())
}

/// Check if moisture is in the usual range for finished gelatin
pub fn is_typical_moisture(moisture: Decimal) -> bool {
    moisture >= Decimal::from(8) && moisture <= Decimal::from(13)
}

// ============================================================================
// Identifier Validations
// ============================================================================

/// Validate a fiscal-year token ("2025-26")
pub fn validate_fiscal_year_token(token: &str) -> Result<(), &'static str> {
    validate_fiscal_year(token)
}

/// Validate a blend lot number ("GLT-2025-26-0042")
pub fn validate_blend_lot_number(lot_number: &str) -> Result<(), &'static str> {
    validate_lot_number(lot_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Blend Target Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_bloom_range_valid() {
        assert!(validate_bloom_range(Decimal::from(190), Decimal::from(210)).is_ok());
        assert!(validate_bloom_range(Decimal::from(200), Decimal::from(200)).is_ok());
    }

    #[test]
    fn test_validate_bloom_range_inverted() {
        assert!(validate_bloom_range(Decimal::from(210), Decimal::from(190)).is_err());
    }

    #[test]
    fn test_validate_bloom_range_non_positive() {
        assert!(validate_bloom_range(Decimal::ZERO, Decimal::from(210)).is_err());
        assert!(validate_bloom_range(Decimal::from(-10), Decimal::from(210)).is_err());
    }

    #[test]
    fn test_validate_bags() {
        assert!(validate_bags(1).is_ok());
        assert!(validate_bags(500).is_ok());
        assert!(validate_bags(0).is_err());
        assert!(validate_bags(-3).is_err());
    }

    // ========================================================================
    // Measurement Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_ph() {
        assert!(validate_ph(Decimal::from(5)).is_ok());
        assert!(validate_ph(Decimal::ZERO).is_ok());
        assert!(validate_ph(Decimal::from(14)).is_ok());
        assert!(validate_ph(Decimal::from(15)).is_err());
        assert!(validate_ph(Decimal::from(-1)).is_err());
    }

    #[test]
    fn test_validate_moisture() {
        assert!(validate_moisture_percent(Decimal::from(11)).is_ok());
        assert!(validate_moisture_percent(Decimal::from(101)).is_err());
    }

    #[test]
    fn test_typical_moisture() {
        assert!(is_typical_moisture(Decimal::from(10)));
        assert!(is_typical_moisture(Decimal::from(13)));
        assert!(!is_typical_moisture(Decimal::from(7)));
        assert!(!is_typical_moisture(Decimal::from(14)));
    }

    // ========================================================================
    // Identifier Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_fiscal_year_token_valid() {
        assert!(validate_fiscal_year_token("2025-26").is_ok());
        assert!(validate_fiscal_year_token("1999-00").is_ok());
    }

    #[test]
    fn test_validate_fiscal_year_token_invalid() {
        assert!(validate_fiscal_year_token("2025-27").is_err()); // wrong suffix
        assert!(validate_fiscal_year_token("2025").is_err());
        assert!(validate_fiscal_year_token("25-26").is_err());
        assert!(validate_fiscal_year_token("2025-2026").is_err());
        assert!(validate_fiscal_year_token("abcd-ef").is_err());
    }

    #[test]
    fn test_validate_blend_lot_number_valid() {
        assert!(validate_blend_lot_number("GLT-2025-26-0042").is_ok());
        assert!(validate_blend_lot_number("GLT-2026-27-0001").is_ok());
    }

    #[test]
    fn test_validate_blend_lot_number_invalid() {
        assert!(validate_blend_lot_number("XYZ-2025-26-0042").is_err());
        assert!(validate_blend_lot_number("GLT-2025-26-42").is_err()); // short serial
        assert!(validate_blend_lot_number("GLT-2025-27-0042").is_err()); // bad token
        assert!(validate_blend_lot_number("GLT-2025-26").is_err());
    }
}
