//! Plain-text rendering of ledger outcomes.

use rewardbot_ledger::{
    ChestOutcome, LedgerError, Outbound, Outcome, PromoOutcome, PromoRejection, ReferralCredit, WithdrawalOutcome,
    WithdrawalRejection, WithdrawalRequest, WithdrawalStatus,
};

/// `1h 05m`, `12m 30s`, `45s`.
pub fn format_duration(secs: u64) -> String {
    let (h, m, s) = (secs / 3_600, (secs % 3_600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {:02}m", h, m)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

pub fn render_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Started(reg) => {
            let mut out = if reg.created {
                format!("Welcome, {}! Your balance is {}.", reg.account.id, reg.account.balance)
            } else {
                format!("Welcome back, {}! Your balance is {}.", reg.account.id, reg.account.balance)
            };
            match &reg.referral {
                ReferralCredit::Credited { referrer, .. } => {
                    out.push_str(&format!("\nYou joined through {}'s link.", referrer));
                }
                ReferralCredit::ReferrerNotFound { referrer } => {
                    out.push_str(&format!("\nReferral link of {} is not valid.", referrer));
                }
                _ => {}
            }
            out
        }
        Outcome::Profile(account) => format!(
            "Account {}{}\nBalance: {}\nWithdrawn: {}\nReferrals: {}",
            account.id,
            account
                .display_name
                .as_deref()
                .map(|n| format!(" ({})", n))
                .unwrap_or_default(),
            account.balance,
            account.withdrawn,
            account.referral_count,
        ),
        Outcome::ReferralLink { link, bonus, referral_count, cap } => format!(
            "Your referral link: {}\n+{} for every friend ({}/{} used)",
            link, bonus, referral_count, cap
        ),
        Outcome::Chest(ChestOutcome::Granted { reward, balance, .. }) => {
            format!("Chest opened: +{}! Balance: {}", reward, balance)
        }
        Outcome::Chest(ChestOutcome::Locked { remaining_secs, .. }) => {
            format!("Chest is locked. Come back in {}", format_duration(*remaining_secs))
        }
        Outcome::Promo(PromoOutcome::Credited { code, amount, balance }) => {
            format!("Promo {} credited {}. Balance: {}", code, amount, balance)
        }
        Outcome::Promo(PromoOutcome::Rejected(PromoRejection::InvalidOrUsed)) => {
            "Promo code is invalid or already used".to_string()
        }
        Outcome::Withdrawal(WithdrawalOutcome::Accepted { request }) => format!(
            "Withdrawal #{} of {} accepted, processing takes up to 24 hours",
            request.id, request.amount
        ),
        Outcome::Withdrawal(WithdrawalOutcome::Settled { request, .. }) => {
            format!("Payout #{} of {} sent", request.id, request.amount)
        }
        Outcome::Withdrawal(WithdrawalOutcome::Rejected(WithdrawalRejection::BelowMinimum { balance, minimum })) => {
            format!("Minimum withdrawal is {} (your balance: {})", minimum, balance)
        }
        Outcome::Stats(stats) => format!(
            "Accounts: {}\nTotal balance: {}\nPaid out: {}",
            stats.accounts, stats.total_balance, stats.total_withdrawn
        ),
        Outcome::PayoutMode(mode) => format!("Payout mode: {}", mode),
        Outcome::PromoCreated(promo) => format!("Promo code {} created ({})", promo.code, promo.reward),
        Outcome::Broadcast(report) => {
            let mut out = format!("Broadcast delivered {}/{}", report.delivered, report.attempted);
            if !report.failed.is_empty() {
                let failed: Vec<String> = report.failed.iter().map(ToString::to_string).collect();
                out.push_str(&format!("\nFailed: {}", failed.join(", ")));
            }
            out
        }
    }
}

pub fn render_outbound(message: &Outbound) -> String {
    match message {
        Outbound::ChestReady => "Your chest is ready again!".to_string(),
        Outbound::Text(text) => text.clone(),
    }
}

pub fn render_error(err: &LedgerError) -> String {
    match err {
        LedgerError::PermissionDenied { .. } => "Not allowed".to_string(),
        LedgerError::Store(_) => format!("Temporary failure, try again ({})", err),
        other => other.to_string(),
    }
}

pub fn render_withdrawal(request: &WithdrawalRequest) -> String {
    let status = match request.status {
        WithdrawalStatus::Pending => "pending",
        WithdrawalStatus::Settled => "settled",
    };
    format!(
        "#{:<5} {:>20} {:>12} {:<8} {}",
        request.id,
        request.account.get(),
        request.amount.to_string(),
        status,
        request.created_at
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewardbot_common::{AccountId, Amount, Capability, PayoutMode};
    use rewardbot_ledger::BroadcastReport;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(61), "1m 01s");
        assert_eq!(format_duration(86_399), "23h 59m");
    }

    #[test]
    fn test_render_outcomes() {
        assert_eq!(
            render_outcome(&Outcome::Chest(ChestOutcome::Locked { remaining_secs: 3_900, next_available: 0 })),
            "Chest is locked. Come back in 1h 05m"
        );
        assert_eq!(
            render_outcome(&Outcome::Promo(PromoOutcome::Rejected(PromoRejection::InvalidOrUsed))),
            "Promo code is invalid or already used"
        );
        assert_eq!(render_outcome(&Outcome::PayoutMode(PayoutMode::Real)), "Payout mode: REAL");
        assert_eq!(
            render_outcome(&Outcome::Withdrawal(WithdrawalOutcome::Rejected(
                WithdrawalRejection::BelowMinimum {
                    balance: Amount::from_units(250),
                    minimum: Amount::from_units(300),
                }
            ))),
            "Minimum withdrawal is 300.00 (your balance: 250.00)"
        );
        assert_eq!(
            render_outcome(&Outcome::Broadcast(BroadcastReport {
                attempted: 3,
                delivered: 1,
                failed: vec![AccountId::new(2), AccountId::new(3)],
            })),
            "Broadcast delivered 1/3\nFailed: 2, 3"
        );
    }

    #[test]
    fn test_render_errors_and_outbound() {
        let denied = LedgerError::PermissionDenied {
            caller: AccountId::new(1),
            capability: Capability::Broadcast,
        };
        assert_eq!(render_error(&denied), "Not allowed");
        assert_eq!(
            render_error(&LedgerError::NotFound { account: AccountId::new(4) }),
            "account 4 not found"
        );
        assert_eq!(render_outbound(&Outbound::ChestReady), "Your chest is ready again!");
        assert_eq!(render_outbound(&Outbound::Text("hi".into())), "hi");
    }
}
