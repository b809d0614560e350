//! # rewardbot Common Crate
//!
//! Types shared by the ledger and its front ends.
//!
//! ## Modules
//! - `ids`: `AccountId`, the external identity of an account
//! - `amount`: fixed-point `Amount` in minor units
//! - `time`: `Timestamp`, `Clock`, `SystemClock`, `ManualClock`
//! - `policy`: `PayoutMode` and admin `Capability`
//! - `config`: TOML configuration (`LedgerConfig`)

pub mod amount;
pub mod config;
pub mod ids;
pub mod policy;
pub mod time;

pub use amount::{Amount, AmountParseError};
pub use config::{load_from_file, AdminEntry, ConfigError, LedgerConfig, RewardConfig, DEFAULT_ADMIN_ID};
pub use ids::AccountId;
pub use policy::{Capability, PayoutMode};
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
