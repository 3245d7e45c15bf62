use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    Pending,
    UnderReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FuelType {
    Hfo,
    Lfo,
    Mgo,
    Mdo,
    Lng,
    Methanol,
    Biofuel,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolType {
    Voluntary,
    Mandatory,
    Company,
    Fleet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolStatus {
    Pending,
    Active,
    Closed,
    Suspended,
}

/// Parses the wire names (`NON_COMPLIANT`, `FLEET`, ...) case-insensitively.
macro_rules! wire_enum {
    ($ty:ident, $field:literal, { $($name:literal => $variant:ident),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($name => Ok($ty::$variant),)+
                    _ => Err(LedgerError::validation(
                        $field,
                        s,
                        format!("Expected one of: {}", [$($name),+].join(", ")),
                    )),
                }
            }
        }
    };
}

wire_enum!(ComplianceStatus, "compliance_status", {
    "COMPLIANT" => Compliant,
    "NON_COMPLIANT" => NonCompliant,
    "PENDING" => Pending,
    "UNDER_REVIEW" => UnderReview,
});

wire_enum!(FuelType, "fuel_type", {
    "HFO" => Hfo,
    "LFO" => Lfo,
    "MGO" => Mgo,
    "MDO" => Mdo,
    "LNG" => Lng,
    "METHANOL" => Methanol,
    "BIOFUEL" => Biofuel,
    "OTHER" => Other,
});

wire_enum!(PoolType, "pool_type", {
    "VOLUNTARY" => Voluntary,
    "MANDATORY" => Mandatory,
    "COMPANY" => Company,
    "FLEET" => Fleet,
});

wire_enum!(PoolStatus, "pool_status", {
    "PENDING" => Pending,
    "ACTIVE" => Active,
    "CLOSED" => Closed,
    "SUSPENDED" => Suspended,
});

/// One ship/voyage/reporting-period measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceRecord {
    pub id: String,
    pub ship_id: String,
    pub route_id: String,
    pub voyage_id: String,
    pub fuel_type: FuelType,
    /// Tonnes of fuel.
    pub fuel_consumption: f64,
    /// MJ.
    pub energy_content: f64,
    /// gCO2eq/MJ.
    pub ghg_intensity: f64,
    pub compliance_status: ComplianceStatus,
    pub reporting_period: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceCreateInput {
    pub ship_id: String,
    pub route_id: String,
    pub voyage_id: String,
    pub fuel_type: FuelType,
    pub fuel_consumption: f64,
    pub energy_content: f64,
    pub ghg_intensity: f64,
    #[serde(default)]
    pub compliance_status: Option<ComplianceStatus>,
    pub reporting_period: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceUpdateInput {
    pub fuel_type: Option<FuelType>,
    pub fuel_consumption: Option<f64>,
    pub energy_content: Option<f64>,
    pub ghg_intensity: Option<f64>,
    pub compliance_status: Option<ComplianceStatus>,
    pub reporting_period: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplianceFilter {
    pub ship_id: Option<String>,
    pub route_id: Option<String>,
    pub reporting_period: Option<String>,
    pub status: Option<ComplianceStatus>,
}

impl ComplianceFilter {
    pub fn matches(&self, record: &ComplianceRecord) -> bool {
        self.ship_id.as_ref().is_none_or(|s| *s == record.ship_id)
            && self.route_id.as_ref().is_none_or(|r| *r == record.route_id)
            && self
                .reporting_period
                .as_ref()
                .is_none_or(|p| *p == record.reporting_period)
            && self.status.is_none_or(|s| s == record.compliance_status)
    }
}

/// Surplus compliance units set aside by a ship for later use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankEntry {
    pub id: String,
    pub ship_id: String,
    /// Quantity originally banked.
    pub units: f64,
    /// Quantity still available; only ever decreases.
    pub remaining_units: f64,
    pub banked_at: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
}

impl BankEntry {
    pub fn is_expired(&self, at: DateTime<Utc>) -> bool {
        self.expiry_date < at
    }

    pub fn is_usable(&self, at: DateTime<Utc>) -> bool {
        !self.is_expired(at) && self.remaining_units > 0.0
    }

    pub fn consumed_units(&self) -> f64 {
        self.units - self.remaining_units
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankSurplusRequest {
    pub surplus_units: f64,
    pub banking_date: DateTime<Utc>,
    #[serde(default)]
    pub max_banking_capacity: Option<f64>,
    pub banking_validity_years: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankSurplusResult {
    pub banked_units: f64,
    pub banked_at: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
}

impl From<&BankEntry> for BankSurplusResult {
    fn from(entry: &BankEntry) -> Self {
        Self {
            banked_units: entry.units,
            banked_at: entry.banked_at,
            expiry_date: entry.expiry_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedEntry {
    pub id: String,
    pub units_applied: f64,
    /// What is left on the entry after this application.
    pub remaining_units: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyBankedResult {
    pub applied_units: f64,
    pub remaining_deficit: f64,
    pub entries_consumed: Vec<AppliedEntry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BankEntryFilter {
    pub ship_id: Option<String>,
    /// `Some(true)` only expired, `Some(false)` only unexpired, evaluated at `as_of`.
    pub expired: Option<bool>,
    pub as_of: Option<DateTime<Utc>>,
}

impl BankEntryFilter {
    pub fn matches(&self, entry: &BankEntry, now: DateTime<Utc>) -> bool {
        let at = self.as_of.unwrap_or(now);
        self.ship_id.as_ref().is_none_or(|s| *s == entry.ship_id)
            && self.expired.is_none_or(|e| e == entry.is_expired(at))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub pool_type: PoolType,
    pub status: PoolStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_compliance_units: f64,
    pub allocated_compliance_units: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pool {
    pub fn available_units(&self) -> f64 {
        self.total_compliance_units - self.allocated_compliance_units
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolCreateInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub pool_type: PoolType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolUpdateInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub pool_type: Option<PoolType>,
    pub status: Option<PoolStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub total_compliance_units: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolMember {
    pub id: String,
    pub pool_id: String,
    pub ship_id: String,
    pub allocated_units: f64,
    /// Percentage of the pool's total compliance units.
    pub contribution: f64,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolAudit {
    pub pool_id: String,
    pub allocated_compliance_units: f64,
    pub member_sum: f64,
    pub member_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResult {
    pub cb: f64,
    pub actual: f64,
    pub target: f64,
    pub fuel_consumption: f64,
    pub is_surplus: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub actual: f64,
    pub target: f64,
    pub difference: f64,
    pub is_compliant: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceMetrics {
    pub total_ghg_emissions: f64,
    pub average_ghg_intensity: f64,
    pub total_energy_consumed: f64,
    pub compliance_rate: f64,
}
