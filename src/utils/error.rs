use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid value for {field} ({value}): {reason}")]
    Validation {
        field: String,
        value: String,
        reason: String,
    },

    #[error(
        "Banking capacity exceeded for ship {ship_id}: requested {requested}, currently banked {current}, capacity {capacity}"
    )]
    CapacityExceeded {
        ship_id: String,
        requested: f64,
        current: f64,
        capacity: f64,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error(
        "Pool {pool_id} conservation violated: allocated {allocated} + requested {requested} exceeds total {total}"
    )]
    ConservationViolation {
        pool_id: String,
        allocated: f64,
        requested: f64,
        total: f64,
    },

    #[error(
        "Pool {pool_id} reconciliation mismatch: counter {counter} != sum of member allocations {member_sum}"
    )]
    ReconciliationMismatch {
        pool_id: String,
        counter: f64,
        member_sum: f64,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigError { field: String, message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Capacity,
    NotFound,
    Conservation,
    Configuration,
    Infrastructure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl LedgerError {
    pub fn validation(field: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        LedgerError::Validation {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        LedgerError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            LedgerError::Validation { .. } => ErrorCategory::Validation,
            LedgerError::CapacityExceeded { .. } => ErrorCategory::Capacity,
            LedgerError::NotFound { .. } => ErrorCategory::NotFound,
            LedgerError::ConservationViolation { .. }
            | LedgerError::ReconciliationMismatch { .. } => ErrorCategory::Conservation,
            LedgerError::ConfigError { .. } => ErrorCategory::Configuration,
            LedgerError::IoError(_)
            | LedgerError::SerializationError(_)
            | LedgerError::CsvError(_)
            | LedgerError::StorageError { .. } => ErrorCategory::Infrastructure,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LedgerError::Validation { .. } | LedgerError::NotFound { .. } => ErrorSeverity::Medium,
            LedgerError::CapacityExceeded { .. } => ErrorSeverity::Medium,
            LedgerError::ConservationViolation { .. } | LedgerError::ConfigError { .. } => {
                ErrorSeverity::High
            }
            // 對帳不一致代表外部寫入路徑有缺陷
            LedgerError::ReconciliationMismatch { .. } => ErrorSeverity::Critical,
            LedgerError::IoError(_)
            | LedgerError::SerializationError(_)
            | LedgerError::CsvError(_)
            | LedgerError::StorageError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            LedgerError::Validation { field, .. } => {
                format!("Correct the value of '{}' and retry", field)
            }
            LedgerError::CapacityExceeded {
                current, capacity, ..
            } => format!(
                "Bank at most {} units, or wait for existing entries to expire",
                (capacity - current).max(0.0)
            ),
            LedgerError::NotFound { entity, .. } => {
                format!("Create the {} first or check the identifier", entity)
            }
            LedgerError::ConservationViolation {
                allocated, total, ..
            } => format!(
                "Allocate at most {} units or raise the pool's total compliance units",
                (total - allocated).max(0.0)
            ),
            LedgerError::ReconciliationMismatch { .. } => {
                "Audit recent writes to the pool's member rows; the counter was not corrected"
                    .to_string()
            }
            LedgerError::ConfigError { .. } => {
                "Check the TOML configuration file and environment variables".to_string()
            }
            LedgerError::IoError(_) | LedgerError::StorageError { .. } => {
                "Check that the data directory exists and is writable".to_string()
            }
            LedgerError::SerializationError(_) => {
                "The snapshot file may be corrupted; restore it from a backup".to_string()
            }
            LedgerError::CsvError(_) => {
                "Check the CSV header and that every numeric column is a number".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Validation => format!("Invalid input: {}", self),
            ErrorCategory::Capacity => format!("Banking rejected: {}", self),
            ErrorCategory::NotFound => format!("Not found: {}", self),
            ErrorCategory::Conservation => format!("Pool allocation rejected: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Infrastructure => format!("Storage problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
