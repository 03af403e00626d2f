use anyhow::Result;
use clap::{Parser, Subcommand};
use country_ledger::logging::init_tracing;
use country_ledger::{AppConfig, CountryFilter, CountryService, GdpSort};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "country-ledger", version, about = "Country and exchange-rate reconciliation")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "COUNTRY_LEDGER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch both sources and reconcile them into the store
    Refresh,
    /// Show record count and last refresh time
    Status,
    /// List stored countries
    List {
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        currency: Option<String>,
        /// gdp_desc or gdp_asc
        #[arg(long)]
        sort: Option<GdpSort>,
    },
    /// Show one country by name
    Show { name: String },
    /// Delete one country by name
    Delete { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?.with_env_overrides();
    init_tracing(&config.logging)?;

    let service = CountryService::from_config(&config)?;

    match cli.command {
        Command::Refresh => {
            let report = service.run_reconciliation().await?;
            print_json(&report)?;
        }
        Command::Status => print_json(&service.get_status()?)?,
        Command::List {
            region,
            currency,
            sort,
        } => {
            let filter = CountryFilter {
                region,
                currency,
                sort,
            };
            print_json(&service.get_by_filter(&filter)?)?;
        }
        Command::Show { name } => print_json(&service.get_by_name(&name)?)?,
        Command::Delete { name } => {
            service.delete_by_name(&name)?;
            println!("✓ Deleted {}", name);
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
