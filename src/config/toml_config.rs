use crate::core::balance::{
    Regulation, DEFAULT_ENERGY_CONVERSION_FACTOR, DEFAULT_TARGET_GHG_INTENSITY,
};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{LedgerError, Result};
use crate::utils::validation::{
    validate_non_negative, validate_path, validate_positive, validate_positive_number, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_BANKING_VALIDITY_YEARS: u32 = 2;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_SNAPSHOT_FILE: &str = "ledger.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub regulation: RegulationConfig,
    #[serde(default)]
    pub banking: BankingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegulationConfig {
    pub default_target_ghg_intensity: Option<f64>,
    pub energy_conversion_factor: Option<f64>,
    pub targets: Option<HashMap<String, f64>>, // 各報告期的目標值
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BankingConfig {
    pub validity_years: Option<u32>,
    pub max_capacity: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: Option<String>,
    pub snapshot_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>, // "compact" or "json"
}

impl LedgerConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(LedgerError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LedgerError::ConfigError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MAX_CAPACITY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| LedgerError::ConfigError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_positive(
            "regulation.default_target_ghg_intensity",
            self.default_target_ghg_intensity(),
        )?;
        validate_positive(
            "regulation.energy_conversion_factor",
            self.energy_conversion_factor(),
        )?;
        if let Some(targets) = &self.regulation.targets {
            for (period, target) in targets {
                validate_positive(&format!("regulation.targets.{}", period), *target)?;
            }
        }

        validate_positive_number("banking.validity_years", self.banking_validity_years(), 1)?;
        if let Some(capacity) = self.banking.max_capacity {
            validate_non_negative("banking.max_capacity", capacity)?;
        }

        validate_path("storage.data_dir", self.data_dir())?;
        validate_path("storage.snapshot_file", self.snapshot_file())?;

        let valid_formats = ["compact", "json"];
        let format = self.log_format();
        if !valid_formats.contains(&format) {
            return Err(LedgerError::ConfigError {
                field: "logging.format".to_string(),
                message: format!(
                    "Unsupported format '{}'. Valid formats: {}",
                    format,
                    valid_formats.join(", ")
                ),
            });
        }

        Ok(())
    }

    pub fn data_dir(&self) -> &str {
        self.storage.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    pub fn log_format(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .unwrap_or("compact")
    }
}

impl ConfigProvider for LedgerConfig {
    fn default_target_ghg_intensity(&self) -> f64 {
        self.regulation
            .default_target_ghg_intensity
            .unwrap_or(DEFAULT_TARGET_GHG_INTENSITY)
    }

    fn target_ghg_intensity(&self, reporting_period: &str) -> f64 {
        self.regulation
            .targets
            .as_ref()
            .and_then(|t| t.get(reporting_period).copied())
            .unwrap_or_else(|| self.default_target_ghg_intensity())
    }

    fn energy_conversion_factor(&self) -> f64 {
        self.regulation
            .energy_conversion_factor
            .unwrap_or(DEFAULT_ENERGY_CONVERSION_FACTOR)
    }

    fn regulation(&self) -> Regulation {
        Regulation {
            default_target_ghg_intensity: self.default_target_ghg_intensity(),
            energy_conversion_factor: self.energy_conversion_factor(),
            targets: self.regulation.targets.clone().unwrap_or_default(),
        }
    }

    fn banking_validity_years(&self) -> u32 {
        self.banking
            .validity_years
            .unwrap_or(DEFAULT_BANKING_VALIDITY_YEARS)
    }

    fn max_banking_capacity(&self) -> Option<f64> {
        self.banking.max_capacity
    }

    fn snapshot_file(&self) -> &str {
        self.storage
            .snapshot_file
            .as_deref()
            .unwrap_or(DEFAULT_SNAPSHOT_FILE)
    }
}

impl Validate for LedgerConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
