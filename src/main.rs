use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use compliance_ledger::config::cli::{Command, PoolCommand};
use compliance_ledger::config::CliConfig;
use compliance_ledger::core::balance::{compute_balance, compute_comparison};
use compliance_ledger::domain::model::{
    BankEntryFilter, ComplianceFilter, PoolCreateInput, PoolUpdateInput,
};
use compliance_ledger::domain::ports::ConfigProvider;
use compliance_ledger::utils::error::{ErrorSeverity, LedgerError};
use compliance_ledger::utils::{logger, validation::Validate};
use compliance_ledger::{LedgerConfig, LedgerEngine, LocalStorage};
use serde_json::{json, Value};

fn to_json<T: serde::Serialize>(value: &T) -> compliance_ledger::Result<Value> {
    Ok(serde_json::to_value(value)?)
}

async fn run(
    command: Command,
    engine: &LedgerEngine,
    config: &LedgerConfig,
) -> compliance_ledger::Result<Value> {
    let regulation = config.regulation();

    match command {
        Command::Balance {
            actual,
            fuel,
            period,
            target,
        } => {
            let target = target.unwrap_or_else(|| match &period {
                Some(p) => regulation.target_for(p),
                None => regulation.default_target_ghg_intensity,
            });
            to_json(&compute_balance(
                actual,
                fuel,
                target,
                regulation.energy_conversion_factor,
            )?)
        }
        Command::Compare {
            actual,
            period,
            target,
        } => {
            let target = target.unwrap_or_else(|| match &period {
                Some(p) => regulation.target_for(p),
                None => regulation.default_target_ghg_intensity,
            });
            to_json(&compute_comparison(actual, target)?)
        }
        Command::Import { csv, evaluate } => {
            let inputs = compliance_ledger::adapters::csv_import::read_records_from_path(&csv)?;
            let mut records = engine.compliance().import(inputs).await?;
            if evaluate {
                for record in records.iter_mut() {
                    *record = engine.compliance().evaluate_record(&record.id).await?;
                }
            }
            to_json(&json!({ "imported": records.len(), "records": records }))
        }
        Command::Records {
            ship,
            route,
            period,
            status,
        } => {
            let filter = ComplianceFilter {
                ship_id: ship,
                route_id: route,
                reporting_period: period,
                status,
            };
            to_json(&engine.compliance().list(&filter).await?)
        }
        Command::Metrics {
            ship,
            route,
            period,
        } => {
            let filter = ComplianceFilter {
                ship_id: ship,
                route_id: route,
                reporting_period: period,
                status: None,
            };
            to_json(&engine.compliance().metrics(&filter).await?)
        }
        Command::Bank {
            ship,
            units,
            date,
            max_capacity,
            validity_years,
        } => {
            let date = date.unwrap_or_else(Utc::now);
            to_json(
                &engine
                    .bank_surplus(&ship, units, date, max_capacity, validity_years)
                    .await?,
            )
        }
        Command::Apply {
            ship,
            deficit,
            date,
        } => {
            let date = date.unwrap_or_else(Utc::now);
            to_json(&engine.apply_banked(&ship, deficit, date).await?)
        }
        Command::Entries {
            ship,
            expired,
            as_of,
        } => {
            let filter = BankEntryFilter {
                ship_id: ship,
                expired,
                as_of,
            };
            to_json(&engine.banking().list_entries(&filter).await?)
        }
        Command::Pool { command } => run_pool(command, engine).await,
    }
}

async fn run_pool(command: PoolCommand, engine: &LedgerEngine) -> compliance_ledger::Result<Value> {
    let pools = engine.pools();

    match command {
        PoolCommand::Create {
            name,
            description,
            pool_type,
            start,
            end,
        } => to_json(
            &pools
                .create_pool(PoolCreateInput {
                    name,
                    description,
                    pool_type,
                    start_date: start,
                    end_date: end,
                })
                .await?,
        ),
        PoolCommand::Update {
            pool,
            name,
            description,
            pool_type,
            status,
            start,
            end,
            total_units,
        } => to_json(
            &pools
                .update_pool(
                    &pool,
                    PoolUpdateInput {
                        name,
                        description,
                        pool_type,
                        status,
                        start_date: start,
                        end_date: end,
                        total_compliance_units: total_units,
                    },
                )
                .await?,
        ),
        PoolCommand::Add { pool, ship, units } => {
            to_json(&pools.add_member(&pool, &ship, units).await?)
        }
        PoolCommand::Allocate { pool, ship, units } => {
            to_json(&pools.allocate_units(&pool, &ship, units).await?)
        }
        PoolCommand::Remove { pool, ship } => {
            let removed = pools.remove_member(&pool, &ship).await?;
            to_json(&json!({ "removed": removed }))
        }
        PoolCommand::Members { pool } => {
            let members = pools.get_members(&pool).await?;
            let total = pools.get_total_allocated_units(&pool).await?;
            to_json(&json!({ "members": members, "totalAllocatedUnits": total }))
        }
        PoolCommand::Audit { pool } => to_json(&pools.reconcile(&pool).await?),
        PoolCommand::List { status, ship } => match ship {
            Some(ship) => to_json(&pools.list_pools_for_ship(&ship).await?),
            None => to_json(&pools.list_pools(status).await?),
        },
        PoolCommand::Delete { pool } => {
            pools.delete_pool(&pool).await?;
            to_json(&json!({ "deleted": pool }))
        }
    }
}

fn exit_code(e: &LedgerError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2, // 輸入錯誤
        ErrorSeverity::High => 1,   // 處理錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 載入配置
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.log_format() == "json" {
        logger::init_json_logger(cli.verbose, config.log_level());
    } else {
        logger::init_cli_logger(cli.verbose, config.log_level());
    }
    tracing::debug!("CLI args: {:?}", cli);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let storage = LocalStorage::new(config.data_dir().to_string());
    let engine = LedgerEngine::open(&config, storage)
        .await
        .with_context(|| format!("opening ledger in {}", config.data_dir()))?;

    match run(cli.command, &engine, &config).await {
        Ok(output) => {
            engine
                .close()
                .await
                .with_context(|| format!("saving {}", config.snapshot_file()))?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Operation failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let code = exit_code(&e);
            if code > 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}
