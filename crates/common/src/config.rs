//! Ledger configuration loaded from TOML with serde.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! stock reward schedule: referral bonus 15, referral cap 19, minimum
//! withdrawal 300, chest reward 5 every 24 hours, payout mode FAKE.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::amount::{self, Amount};
use crate::ids::AccountId;
use crate::policy::{Capability, PayoutMode};
use crate::time::SECS_PER_HOUR;

/// Admin that ships with the default configuration.
pub const DEFAULT_ADMIN_ID: i64 = 7_726_017_677;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Reward schedule.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RewardConfig {
    /// Credit given to a referrer for each new account they bring in.
    #[serde(with = "amount::units")]
    pub ref_bonus: Amount,

    /// Referrals that earn a bonus; later referrals are recorded but unpaid.
    pub max_referrals: u32,

    /// Smallest balance that may be withdrawn.
    #[serde(with = "amount::units")]
    pub min_withdraw: Amount,

    #[serde(with = "amount::units")]
    pub chest_reward: Amount,

    pub chest_cooldown_hours: u64,
}

impl RewardConfig {
    #[must_use]
    pub fn chest_cooldown_secs(&self) -> u64 {
        self.chest_cooldown_hours.saturating_mul(SECS_PER_HOUR)
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig {
            ref_bonus: Amount::from_units(15),
            max_referrals: 19,
            min_withdraw: Amount::from_units(300),
            chest_reward: Amount::from_units(5),
            chest_cooldown_hours: 24,
        }
    }
}

/// One entry of the admin role table.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct AdminEntry {
    pub id: AccountId,

    /// Granted capabilities. Empty means every capability.
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

impl AdminEntry {
    #[must_use]
    pub fn full(id: AccountId) -> Self {
        Self {
            id,
            capabilities: Vec::new(),
        }
    }

    #[must_use]
    pub fn effective_capabilities(&self) -> HashSet<Capability> {
        if self.capabilities.is_empty() {
            Capability::ALL.into_iter().collect()
        } else {
            self.capabilities.iter().copied().collect()
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LedgerConfig {
    /// Directory holding the LMDB environment.
    pub data_dir: String,

    /// Bot handle used to build referral links.
    pub bot_username: String,

    /// Payout mode at startup. Mode changes are not persisted.
    pub default_payout_mode: PayoutMode,

    /// Maximum in-flight deliveries during a broadcast.
    pub broadcast_concurrency: usize,

    /// Interval between reminder sweeps.
    pub reminder_poll_secs: u64,

    pub rewards: RewardConfig,

    pub admins: Vec<AdminEntry>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            data_dir: "./ledger-data".to_string(),
            bot_username: "rewardbot".to_string(),
            default_payout_mode: PayoutMode::Fake,
            broadcast_concurrency: 8,
            reminder_poll_secs: 30,
            rewards: RewardConfig::default(),
            admins: vec![AdminEntry::full(AccountId::new(DEFAULT_ADMIN_ID))],
        }
    }
}

impl LedgerConfig {
    /// Rejects values that would make an engine meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.rewards;
        if r.chest_cooldown_hours == 0 {
            return Err(ConfigError::Invalid("rewards.chest_cooldown_hours must be > 0".into()));
        }
        if r.max_referrals == 0 {
            return Err(ConfigError::Invalid("rewards.max_referrals must be > 0".into()));
        }
        if r.chest_reward.is_zero() {
            return Err(ConfigError::Invalid("rewards.chest_reward must be > 0".into()));
        }
        if r.min_withdraw.is_zero() {
            return Err(ConfigError::Invalid("rewards.min_withdraw must be > 0".into()));
        }
        if self.broadcast_concurrency == 0 {
            return Err(ConfigError::Invalid("broadcast_concurrency must be > 0".into()));
        }
        if self.reminder_poll_secs == 0 {
            return Err(ConfigError::Invalid("reminder_poll_secs must be > 0".into()));
        }
        if self.bot_username.trim().is_empty() {
            return Err(ConfigError::Invalid("bot_username must not be empty".into()));
        }
        Ok(())
    }
}

/// Load and validate config from a TOML file path.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<LedgerConfig, ConfigError> {
    let s = fs::read_to_string(path.as_ref())?;
    let cfg: LedgerConfig = toml::from_str(&s)?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let def = LedgerConfig::default();
        assert!(def.validate().is_ok());
        assert_eq!(def.rewards.ref_bonus, Amount::from_units(15));
        assert_eq!(def.rewards.max_referrals, 19);
        assert_eq!(def.rewards.min_withdraw, Amount::from_units(300));
        assert_eq!(def.rewards.chest_reward, Amount::from_units(5));
        assert_eq!(def.rewards.chest_cooldown_secs(), 86_400);
        assert_eq!(def.default_payout_mode, PayoutMode::Fake);
        assert_eq!(def.admins[0].id, AccountId::new(DEFAULT_ADMIN_ID));
    }

    #[test]
    fn test_load_from_file_roundtrip() {
        use std::io::Write;
        let tmp = tempfile::NamedTempFile::new().expect("temp file");
        let toml = r#"
            data_dir = "./mydata"
            bot_username = "bear_bot"
            default_payout_mode = "real"

            [rewards]
            ref_bonus = "2.50"
            chest_reward = 1.5
            chest_cooldown_hours = 12

            [[admins]]
            id = 42

            [[admins]]
            id = 43
            capabilities = ["view_stats"]
        "#;
        let mut f = tmp.reopen().expect("reopen");
        write!(f, "{}", toml).expect("write");

        let cfg = load_from_file(tmp.path()).expect("load");
        assert_eq!(cfg.data_dir, "./mydata");
        assert_eq!(cfg.default_payout_mode, PayoutMode::Real);
        assert_eq!(cfg.rewards.ref_bonus, Amount::from_minor(250));
        assert_eq!(cfg.rewards.chest_reward, Amount::from_minor(150));
        assert_eq!(cfg.rewards.chest_cooldown_secs(), 12 * 3_600);
        // unspecified fields keep their defaults
        assert_eq!(cfg.rewards.max_referrals, 19);
        assert_eq!(cfg.admins.len(), 2);
        assert_eq!(cfg.admins[0].effective_capabilities().len(), Capability::ALL.len());
        assert_eq!(
            cfg.admins[1].effective_capabilities(),
            [Capability::ViewStats].into_iter().collect()
        );
    }

    #[test]
    fn test_validate_rejects_zero_cooldown() {
        let mut cfg = LedgerConfig::default();
        cfg.rewards.chest_cooldown_hours = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let res = load_from_file(dir.path().join("absent.toml"));
        assert!(matches!(res, Err(ConfigError::Io(_))));
    }
}
