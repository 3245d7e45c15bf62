use crate::utils::error::{LedgerError, Result};
use chrono::{DateTime, Utc};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_finite(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(LedgerError::validation(
            field_name,
            value,
            "Value must be a finite number",
        ));
    }
    Ok(())
}

/// Finite and strictly greater than zero.
pub fn validate_positive(field_name: &str, value: f64) -> Result<()> {
    validate_finite(field_name, value)?;
    if value <= 0.0 {
        return Err(LedgerError::validation(
            field_name,
            value,
            "Value must be greater than zero",
        ));
    }
    Ok(())
}

pub fn validate_non_negative(field_name: &str, value: f64) -> Result<()> {
    validate_finite(field_name, value)?;
    if value < 0.0 {
        return Err(LedgerError::validation(
            field_name,
            value,
            "Value cannot be negative",
        ));
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u32, min_value: u32) -> Result<()> {
    if value < min_value {
        return Err(LedgerError::validation(
            field_name,
            value,
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::validation(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_date_order(
    field_name: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<()> {
    if start >= end {
        return Err(LedgerError::validation(
            field_name,
            format!("{} .. {}", start.to_rfc3339(), end.to_rfc3339()),
            "Start date must be before end date",
        ));
    }
    Ok(())
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(LedgerError::ConfigError {
            field: field_name.to_string(),
            message: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(LedgerError::ConfigError {
            field: field_name.to_string(),
            message: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}
