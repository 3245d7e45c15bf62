#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

pub use toml_config::LedgerConfig;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Parser)]
#[command(name = "compliance-ledger")]
#[command(about = "GHG intensity compliance balances, banking and pooling for a fleet")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "ledger.toml")]
    pub config: String,

    /// Override storage.data_dir from the config file
    #[arg(long)]
    pub data_dir: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: cli::Command,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Loads the TOML file if present (defaults otherwise) and applies flag overrides.
    pub fn load_config(&self) -> crate::utils::error::Result<LedgerConfig> {
        let mut config = if std::path::Path::new(&self.config).exists() {
            LedgerConfig::from_file(&self.config)?
        } else {
            LedgerConfig::default()
        };

        if let Some(data_dir) = &self.data_dir {
            config.storage.data_dir = Some(data_dir.clone());
        }
        Ok(config)
    }
}
