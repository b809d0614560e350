//! Command-line surface.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rewardbot_common::{load_from_file, AccountId, Amount, LedgerConfig, SystemClock};
use rewardbot_ledger::{LedgerService, Outcome, WithdrawalFilter};
use tracing::info;

use crate::render::{render_outcome, render_withdrawal};
use crate::session::{self, StdoutTransport};

#[derive(Parser, Debug)]
#[command(name = "rewardbot", version, about = "Reward ledger console")]
pub struct Cli {
    /// TOML configuration file. Defaults apply when the file does not exist.
    #[arg(long, default_value = "rewardbot.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read `<account> <command> [args]` lines from stdin and reply on stdout
    Console,

    /// Ledger totals
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Show one account
    Account {
        id: AccountId,
        #[arg(long)]
        json: bool,
    },

    /// List withdrawal requests in id order
    Withdrawals {
        /// Only requests still pending
        #[arg(long)]
        pending: bool,
        #[arg(long)]
        json: bool,
    },

    /// Create or replace an active promo code
    CreatePromo { code: String, amount: Amount },
}

/// Load `path`, or the defaults if it does not exist.
pub fn load_config(path: &Path) -> Result<LedgerConfig> {
    if !path.exists() {
        info!("config {} not found, using defaults", path.display());
        return Ok(LedgerConfig::default());
    }
    let config = load_from_file(path).with_context(|| format!("loading {}", path.display()))?;
    info!("config loaded from {}", path.display());
    Ok(config)
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config)?;
    let service = LedgerService::open(&config, Arc::new(StdoutTransport), Arc::new(SystemClock))
        .with_context(|| format!("opening ledger at {}", config.data_dir))?;

    match cli.cmd {
        Commands::Console => session::run(service).await?,

        Commands::Stats { json } => {
            let stats = service.accounts().aggregate_stats()?;
            if json {
                let value = serde_json::json!({
                    "accounts": stats.accounts,
                    "total_balance": stats.total_balance.to_string(),
                    "total_withdrawn": stats.total_withdrawn.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", render_outcome(&Outcome::Stats(stats)));
            }
        }

        Commands::Account { id, json } => {
            let account = service.accounts().get(id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&account)?);
            } else {
                println!("{}", render_outcome(&Outcome::Profile(account)));
                if let Some(chest) = service.chest().state(id)? {
                    println!("Last chest: {}", chest.last_open);
                }
            }
        }

        Commands::Withdrawals { pending, json } => {
            let filter = if pending { WithdrawalFilter::Pending } else { WithdrawalFilter::All };
            let requests = service.withdrawals().list(filter)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&requests)?);
            } else if requests.is_empty() {
                println!("no withdrawal requests");
            } else {
                for request in &requests {
                    println!("{}", render_withdrawal(request));
                }
            }
        }

        Commands::CreatePromo { code, amount } => {
            let promo = service.promos().create_code(&code, amount)?;
            println!("promo {} active with reward {}", promo.code, promo.reward);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from(["rewardbot", "--config", "bot.toml", "withdrawals", "--pending"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("bot.toml"));
        assert!(matches!(cli.cmd, Commands::Withdrawals { pending: true, json: false }));

        let cli = Cli::try_parse_from(["rewardbot", "create-promo", "PROMO10", "10.5"]).unwrap();
        assert!(matches!(
            cli.cmd,
            Commands::CreatePromo { ref code, amount } if code == "PROMO10" && amount == Amount::from_minor(1050)
        ));

        let cli = Cli::try_parse_from(["rewardbot", "account", "7726017677", "--json"]).unwrap();
        assert!(matches!(cli.cmd, Commands::Account { id, json: true } if id == AccountId::new(7_726_017_677)));

        assert!(Cli::try_parse_from(["rewardbot", "create-promo", "PROMO10", "1.005"]).is_err());
    }

    #[test]
    fn test_load_config_missing_and_present() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(missing.bot_username, LedgerConfig::default().bot_username);

        let path = dir.path().join("bot.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "bot_username = \"coin_bot\"\nbroadcast_concurrency = 0").unwrap();
        assert!(load_config(&path).is_err());
    }
}
