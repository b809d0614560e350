//! Payout modes and administrative capabilities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How withdrawal requests are settled.
///
/// | Mode | Effect |
/// |------|--------|
/// | `Fake` | request is recorded as pending, balance untouched |
/// | `Real` | request is settled at once, balance moved to `withdrawn` |
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutMode {
    #[default]
    Fake,
    Real,
}

impl PayoutMode {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            PayoutMode::Fake => PayoutMode::Real,
            PayoutMode::Real => PayoutMode::Fake,
        }
    }
}

impl fmt::Display for PayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayoutMode::Fake => write!(f, "FAKE"),
            PayoutMode::Real => write!(f, "REAL"),
        }
    }
}

impl FromStr for PayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fake" => Ok(PayoutMode::Fake),
            "real" => Ok(PayoutMode::Real),
            other => Err(format!("unknown payout mode: {other}")),
        }
    }
}

/// An administrative action that must be granted explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewStats,
    SetPayoutMode,
    ManagePromos,
    Broadcast,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::ViewStats,
        Capability::SetPayoutMode,
        Capability::ManagePromos,
        Capability::Broadcast,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::ViewStats => "view_stats",
            Capability::SetPayoutMode => "set_payout_mode",
            Capability::ManagePromos => "manage_promos",
            Capability::Broadcast => "broadcast",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payout_mode_parse_and_toggle() {
        assert_eq!("REAL".parse::<PayoutMode>(), Ok(PayoutMode::Real));
        assert_eq!(" fake ".parse::<PayoutMode>(), Ok(PayoutMode::Fake));
        assert!("maybe".parse::<PayoutMode>().is_err());
        assert_eq!(PayoutMode::default(), PayoutMode::Fake);
        assert_eq!(PayoutMode::Fake.toggled(), PayoutMode::Real);
        assert_eq!(PayoutMode::Real.toggled(), PayoutMode::Fake);
    }
}
