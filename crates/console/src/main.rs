//! # rewardbot
//!
//! Console front end for the reward ledger.
//!
//! ## Commands
//! - `console`: interactive session, one `<account> <command> [args]` per line
//! - `stats [--json]`: ledger totals
//! - `account <id> [--json]`: one account
//! - `withdrawals [--pending] [--json]`: withdrawal request ledger
//! - `create-promo <CODE> <AMOUNT>`: create or replace a promo code
//!
//! ## Environment Variables
//! - `RUST_LOG`: log filter (default: `info`)

mod cli;
mod render;
mod session;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    cli::run(Cli::parse()).await
}
