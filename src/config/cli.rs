use crate::domain::model::{ComplianceStatus, PoolStatus, PoolType};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use std::path::PathBuf;

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected YYYY-MM-DD or RFC 3339 timestamp: {}", e))
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compliance balance from actual intensity and fuel consumed
    Balance {
        #[arg(long)]
        actual: f64,
        /// Fuel consumed, tonnes
        #[arg(long)]
        fuel: f64,
        /// Reporting period whose target applies
        #[arg(long)]
        period: Option<String>,
        /// Explicit target, overrides the period target
        #[arg(long)]
        target: Option<f64>,
    },
    /// Actual intensity versus target
    Compare {
        #[arg(long)]
        actual: f64,
        #[arg(long)]
        period: Option<String>,
        #[arg(long)]
        target: Option<f64>,
    },
    /// Import compliance records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
        /// Set each record's status from its intensity after import
        #[arg(long)]
        evaluate: bool,
    },
    /// List stored compliance records
    Records {
        #[arg(long)]
        ship: Option<String>,
        #[arg(long)]
        route: Option<String>,
        #[arg(long)]
        period: Option<String>,
        #[arg(long)]
        status: Option<ComplianceStatus>,
    },
    /// Aggregate metrics over stored records
    Metrics {
        #[arg(long)]
        ship: Option<String>,
        #[arg(long)]
        route: Option<String>,
        #[arg(long)]
        period: Option<String>,
    },
    /// Bank surplus units for a ship
    Bank {
        #[arg(long)]
        ship: String,
        #[arg(long)]
        units: f64,
        /// Defaults to now
        #[arg(long, value_parser = parse_date)]
        date: Option<DateTime<Utc>>,
        #[arg(long)]
        max_capacity: Option<f64>,
        #[arg(long)]
        validity_years: Option<u32>,
    },
    /// Cover a deficit from a ship's banked units
    Apply {
        #[arg(long)]
        ship: String,
        #[arg(long)]
        deficit: f64,
        #[arg(long, value_parser = parse_date)]
        date: Option<DateTime<Utc>>,
    },
    /// List bank entries
    Entries {
        #[arg(long)]
        ship: Option<String>,
        #[arg(long)]
        expired: Option<bool>,
        #[arg(long, value_parser = parse_date)]
        as_of: Option<DateTime<Utc>>,
    },
    /// Pool management
    Pool {
        #[command(subcommand)]
        command: PoolCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum PoolCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "type")]
        pool_type: PoolType,
        #[arg(long, value_parser = parse_date)]
        start: DateTime<Utc>,
        #[arg(long, value_parser = parse_date)]
        end: DateTime<Utc>,
    },
    Update {
        #[arg(long)]
        pool: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "type")]
        pool_type: Option<PoolType>,
        #[arg(long)]
        status: Option<PoolStatus>,
        #[arg(long, value_parser = parse_date)]
        start: Option<DateTime<Utc>>,
        #[arg(long, value_parser = parse_date)]
        end: Option<DateTime<Utc>>,
        /// New total compliance units
        #[arg(long)]
        total_units: Option<f64>,
    },
    Add {
        #[arg(long)]
        pool: String,
        #[arg(long)]
        ship: String,
        #[arg(long)]
        units: f64,
    },
    Allocate {
        #[arg(long)]
        pool: String,
        #[arg(long)]
        ship: String,
        #[arg(long)]
        units: f64,
    },
    Remove {
        #[arg(long)]
        pool: String,
        #[arg(long)]
        ship: String,
    },
    Members {
        #[arg(long)]
        pool: String,
    },
    /// Compare the pool counter with its member rows
    Audit {
        #[arg(long)]
        pool: String,
    },
    List {
        #[arg(long)]
        status: Option<PoolStatus>,
        #[arg(long)]
        ship: Option<String>,
    },
    Delete {
        #[arg(long)]
        pool: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_date("2024-01-01").unwrap(), expected);
        assert_eq!(parse_date("2024-01-01T00:00:00Z").unwrap(), expected);
        assert_eq!(parse_date("2024-01-01T02:00:00+02:00").unwrap(), expected);
        assert!(parse_date("01/01/2024").is_err());
    }
}
