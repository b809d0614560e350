//! Interactive console session.
//!
//! Each input line plays one chat message:
//!
//! ```text
//! <account>[@name] <command> [args]
//!
//!   start [referrer]        profile           ref
//!   chest                   promo <CODE>      withdraw
//!   stats                   mode fake|real|toggle
//!   create-promo <CODE> <amount>              broadcast <text>
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Unsolicited messages
//! (reminders, broadcasts) are printed by [`StdoutTransport`].

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rewardbot_common::{AccountId, PayoutMode};
use rewardbot_ledger::{Command, Inbound, LedgerService, Outbound, Transport, TransportError};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::render::{render_error, render_outbound, render_outcome};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("expected `<account> <command> [args]`")]
    Incomplete,

    #[error("invalid account id {0:?}")]
    BadAccount(String),

    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("`{command}` needs {what}")]
    MissingArgument { command: &'static str, what: &'static str },

    #[error("invalid payout mode {0:?}")]
    BadMode(String),
}

/// Parse one console line. Returns `Ok(None)` for blank lines and comments.
pub fn parse_line(line: &str) -> Result<Option<Inbound>, LineError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (who, rest) = line.split_once(char::is_whitespace).ok_or(LineError::Incomplete)?;
    let (id, name) = match who.split_once('@') {
        Some((id, name)) if !name.is_empty() => (id, Some(name)),
        Some((id, _)) => (id, None),
        None => (who, None),
    };
    let account: AccountId = id.parse().map_err(|_| LineError::BadAccount(id.to_owned()))?;

    let rest = rest.trim_start();
    let (verb, args) = match rest.split_once(char::is_whitespace) {
        Some((verb, args)) => (verb, args.trim()),
        None => (rest, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "start" => {
            let referrer = if args.is_empty() {
                None
            } else {
                Some(args.parse().map_err(|_| LineError::BadAccount(args.to_owned()))?)
            };
            Command::Start { referrer }
        }
        "profile" => Command::GetProfile,
        "ref" | "link" => Command::GetReferralLink,
        "chest" => Command::OpenChest,
        "promo" => Command::RedeemPromo(required(args, "promo", "a code")?),
        "withdraw" => Command::RequestWithdrawal,
        "stats" => Command::GetStats,
        "mode" => match args.to_ascii_lowercase().as_str() {
            "toggle" => Command::TogglePayoutMode,
            "" => return Err(LineError::MissingArgument { command: "mode", what: "fake, real or toggle" }),
            other => Command::SetPayoutMode(other.parse::<PayoutMode>().map_err(|_| LineError::BadMode(other.to_owned()))?),
        },
        "create-promo" => Command::CreatePromoCode(required(args, "create-promo", "`<CODE> <amount>`")?),
        "broadcast" => Command::Broadcast(required(args, "broadcast", "a message")?),
        other => return Err(LineError::UnknownCommand(other.to_owned())),
    };

    let mut inbound = Inbound::new(account, command);
    if let Some(name) = name {
        inbound = inbound.with_display_name(name);
    }
    Ok(Some(inbound))
}

fn required(args: &str, command: &'static str, what: &'static str) -> Result<String, LineError> {
    if args.is_empty() {
        Err(LineError::MissingArgument { command, what })
    } else {
        Ok(args.to_owned())
    }
}

/// Prints unsolicited messages as `-> <account>: <text>`.
#[derive(Debug, Default)]
pub struct StdoutTransport;

#[async_trait]
impl Transport for StdoutTransport {
    async fn deliver(&self, to: AccountId, message: &Outbound) -> Result<(), TransportError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "-> {}: {}", to, render_outbound(message)).map_err(|e| TransportError::Failed(e.to_string()))
    }
}

/// Feed every line of `input` through `service`, writing replies to `out`.
/// Returns the number of commands handled.
pub async fn drive<R, W>(service: &LedgerService, input: R, out: &mut W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut handled = 0;
    while let Some(line) = lines.next_line().await? {
        let inbound = match parse_line(&line) {
            Ok(Some(inbound)) => inbound,
            Ok(None) => continue,
            Err(e) => {
                writeln!(out, "! {}", e)?;
                continue;
            }
        };
        let account = inbound.account;
        match service.handle(inbound).await {
            Ok(outcome) => writeln!(out, "<- {}: {}", account, render_outcome(&outcome))?,
            Err(e) => {
                if e.is_retryable() {
                    warn!("command from {} failed: {}", account, e);
                }
                writeln!(out, "<- {}: {}", account, render_error(&e))?;
            }
        }
        handled += 1;
    }
    Ok(handled)
}

/// Run the console on stdin with the reminder worker in the background.
pub async fn run(service: LedgerService) -> Result<()> {
    let shutdown = Arc::new(Notify::new());
    let worker = Arc::new(service.reminder_worker(Arc::clone(&shutdown)));
    let handle = worker.start();

    info!("console ready, one command per line (Ctrl-D to quit)");
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let result = drive(&service, stdin, &mut std::io::stdout()).await;

    shutdown.notify_one();
    if let Err(e) = handle.await {
        warn!("reminder worker ended abnormally: {}", e);
    }
    let handled = result?;
    info!("console closed after {} commands", handled);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewardbot_common::{LedgerConfig, ManualClock, DEFAULT_ADMIN_ID};
    use rewardbot_ledger::MockTransport;
    use tempfile::tempdir;

    fn inbound(line: &str) -> Inbound {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn test_parse_user_commands() {
        assert_eq!(inbound("100 start"), Inbound::new(AccountId::new(100), Command::Start { referrer: None }));
        assert_eq!(
            inbound("100@misha start 50"),
            Inbound::new(AccountId::new(100), Command::Start { referrer: Some(AccountId::new(50)) })
                .with_display_name("misha")
        );
        assert_eq!(inbound("  7 CHEST  ").command, Command::OpenChest);
        assert_eq!(inbound("7 promo promo10").command, Command::RedeemPromo("promo10".into()));
        assert_eq!(inbound("7 withdraw").command, Command::RequestWithdrawal);
        assert_eq!(inbound("7 ref").command, Command::GetReferralLink);
        assert_eq!(parse_line("   "), Ok(None));
        assert_eq!(parse_line("# note"), Ok(None));
    }

    #[test]
    fn test_parse_admin_commands() {
        assert_eq!(inbound("1 mode real").command, Command::SetPayoutMode(PayoutMode::Real));
        assert_eq!(inbound("1 mode toggle").command, Command::TogglePayoutMode);
        assert_eq!(inbound("1 create-promo PROMO10 10").command, Command::CreatePromoCode("PROMO10 10".into()));
        assert_eq!(inbound("1 broadcast hello  all").command, Command::Broadcast("hello  all".into()));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_line("100"), Err(LineError::Incomplete));
        assert_eq!(parse_line("abc chest"), Err(LineError::BadAccount("abc".into())));
        assert_eq!(parse_line("1 dance"), Err(LineError::UnknownCommand("dance".into())));
        assert_eq!(parse_line("1 mode sometimes"), Err(LineError::BadMode("sometimes".into())));
        assert!(matches!(parse_line("1 promo"), Err(LineError::MissingArgument { command: "promo", .. })));
        assert!(matches!(parse_line("1 start x"), Err(LineError::BadAccount(_))));
    }

    #[tokio::test]
    async fn test_drive_session() {
        let dir = tempdir().unwrap();
        let mut config = LedgerConfig::default();
        config.data_dir = dir.path().to_string_lossy().into_owned();
        let service = LedgerService::open(&config, Arc::new(MockTransport::new()), Arc::new(ManualClock::new(0))).unwrap();

        let script = format!(
            "50 start\n100 start 50\n{admin} create-promo PROMO10 10\n100 promo promo10\n100 promo PROMO10\n100 stats\n100 fly\n",
            admin = DEFAULT_ADMIN_ID
        );
        let mut out = Vec::new();
        let handled = drive(&service, script.as_bytes(), &mut out).await.unwrap();
        assert_eq!(handled, 6);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.contains(&"<- 100: Promo PROMO10 credited 10.00. Balance: 10.00"));
        assert!(lines.contains(&"<- 100: Promo code is invalid or already used"));
        assert!(lines.contains(&"<- 100: Not allowed"));
        assert!(lines.contains(&"! unknown command \"fly\""));
        assert_eq!(service.accounts().get(AccountId::new(50)).unwrap().balance.to_string(), "15.00");
    }
}
