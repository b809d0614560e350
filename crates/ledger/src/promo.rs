//! Promo codes: admin-issued tokens redeemable once per account.
//!
//! Codes are stored uppercase. Redemption normalizes the raw input first, so
//! `promo10` redeems `PROMO10`. An unknown, inactive or already redeemed code
//! is reported with the single reason [`PromoRejection::InvalidOrUsed`].

use std::str::FromStr;

use rewardbot_common::{AccountId, Amount};
use tracing::{debug, info};

use crate::accounts::credit_in;
use crate::db::{LedgerDb, LedgerRead};
use crate::error::{LedgerResult, ValidationError};
use crate::model::PromoCode;

pub const MIN_CODE_LEN: usize = 4;

/// Trim and uppercase.
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Accepts uppercase ASCII letters and digits, at least [`MIN_CODE_LEN`] long.
pub fn validate_code(code: &str) -> Result<(), ValidationError> {
    let well_formed = code.len() >= MIN_CODE_LEN
        && code.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::InvalidPromoCode {
            code: code.to_owned(),
            min_len: MIN_CODE_LEN,
        })
    }
}

/// Parsed form of the admin input `<CODE> <amount>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatePromoRequest {
    pub code: String,
    pub reward: Amount,
}

impl FromStr for CreatePromoRequest {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_create_request(s)
    }
}

/// Parse `<CODE> <amount>`. The code must already be uppercase; the amount
/// is a non-negative decimal with at most two fractional digits.
pub fn parse_create_request(text: &str) -> Result<CreatePromoRequest, ValidationError> {
    let mut parts = text.split_whitespace();
    let (Some(code), Some(amount), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ValidationError::MalformedPromoRequest(text.to_owned()));
    };
    validate_code(code)?;
    let reward: Amount = amount.parse()?;
    Ok(CreatePromoRequest { code: code.to_owned(), reward })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromoRejection {
    InvalidOrUsed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromoOutcome {
    Credited {
        code: String,
        amount: Amount,
        balance: Amount,
    },
    Rejected(PromoRejection),
}

#[derive(Clone, Debug)]
pub struct PromoEngine {
    db: LedgerDb,
}

impl PromoEngine {
    #[must_use]
    pub fn new(db: LedgerDb) -> Self {
        Self { db }
    }

    /// Redeem `raw_code` for `account`. The lookup, the redemption check, the
    /// credit and the redemption record share one write unit.
    pub fn redeem(&self, account: AccountId, raw_code: &str) -> LedgerResult<PromoOutcome> {
        let code = normalize_code(raw_code);
        self.db.write(|txn| {
            let promo = match txn.promo_code(&code)? {
                Some(p) if p.active => p,
                _ => {
                    debug!("promo {:?} unknown or inactive for {}", code, account);
                    return Ok(PromoOutcome::Rejected(PromoRejection::InvalidOrUsed));
                }
            };
            if txn.has_redeemed(account, &code)? {
                debug!("promo {} already redeemed by {}", code, account);
                return Ok(PromoOutcome::Rejected(PromoRejection::InvalidOrUsed));
            }

            let credited = credit_in(txn, account, promo.reward)?;
            txn.put_redemption(account, &code)?;

            info!("promo {} redeemed by {}: +{}", code, account, promo.reward);
            Ok(PromoOutcome::Credited {
                code,
                amount: promo.reward,
                balance: credited.balance,
            })
        })
    }

    /// Insert or replace `code`, marking it active.
    pub fn create_code(&self, code: &str, reward: Amount) -> LedgerResult<PromoCode> {
        validate_code(code)?;
        if reward.is_zero() {
            return Err(ValidationError::ZeroReward.into());
        }
        let promo = PromoCode {
            code: code.to_owned(),
            reward,
            active: true,
        };
        self.db.write(|txn| txn.put_promo_code(&promo))?;
        info!("promo {} created with reward {}", promo.code, promo.reward);
        Ok(promo)
    }

    pub fn create_from_request(&self, request: &CreatePromoRequest) -> LedgerResult<PromoCode> {
        self.create_code(&request.code, request.reward)
    }

    pub fn get_code(&self, raw_code: &str) -> LedgerResult<Option<PromoCode>> {
        let code = normalize_code(raw_code);
        self.db.read(|v| v.promo_code(&code))
    }
}
