//! Value types shared by ledger entries and merged records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Ledger account address (`0x` followed by 40 hex digits), stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| DomainError::validation(format!("address `{trimmed}` lacks 0x prefix")))?;

        if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::validation(format!(
                "address `{trimmed}` must contain exactly 40 hex digits"
            )));
        }

        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    /// Placeholder owner for tombstoned rows the ledger returns zeroed.
    pub fn zero() -> Self {
        Self(format!("0x{}", "0".repeat(40)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reputation tier read from the badge contract.
///
/// Tiers gate voting: only `Wooden` and above may vote, and higher tiers
/// carry more weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTier {
    #[default]
    Newbie,
    Seedling,
    Wooden,
    Bronze,
    Silver,
    Gold,
}

impl BadgeTier {
    /// Map the contract's tier id; unknown ids read as `Newbie`.
    pub fn from_id(id: u64) -> Self {
        match id {
            1 => BadgeTier::Seedling,
            2 => BadgeTier::Wooden,
            3 => BadgeTier::Bronze,
            4 => BadgeTier::Silver,
            5 => BadgeTier::Gold,
            _ => BadgeTier::Newbie,
        }
    }

    pub fn id(self) -> u8 {
        match self {
            BadgeTier::Newbie => 0,
            BadgeTier::Seedling => 1,
            BadgeTier::Wooden => 2,
            BadgeTier::Bronze => 3,
            BadgeTier::Silver => 4,
            BadgeTier::Gold => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BadgeTier::Newbie => "Newbie",
            BadgeTier::Seedling => "Seedling",
            BadgeTier::Wooden => "Wooden",
            BadgeTier::Bronze => "Bronze",
            BadgeTier::Silver => "Silver",
            BadgeTier::Gold => "Gold",
        }
    }

    /// Multiplier applied to this tier's votes.
    pub fn vote_weight(self) -> u32 {
        match self {
            BadgeTier::Newbie | BadgeTier::Seedling => 0,
            BadgeTier::Wooden => 1,
            BadgeTier::Bronze => 2,
            BadgeTier::Silver => 3,
            BadgeTier::Gold => 5,
        }
    }

    pub fn can_vote(self) -> bool {
        self.vote_weight() > 0
    }

    /// Feedback submissions needed before this badge can be claimed.
    /// `Newbie` is the unclaimed starting tier.
    pub fn required_feedback(self) -> Option<u32> {
        match self {
            BadgeTier::Newbie => None,
            BadgeTier::Seedling => Some(1),
            BadgeTier::Wooden => Some(5),
            BadgeTier::Bronze => Some(10),
            BadgeTier::Silver => Some(15),
            BadgeTier::Gold => Some(20),
        }
    }
}

/// Accepts a tier name (`bronze`) or its contract id (`3`).
impl FromStr for BadgeTier {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Ok(id) = trimmed.parse::<u64>() {
            return match id {
                0..=5 => Ok(BadgeTier::from_id(id)),
                _ => Err(DomainError::validation(format!("unknown badge tier id {id}"))),
            };
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "newbie" => Ok(BadgeTier::Newbie),
            "seedling" => Ok(BadgeTier::Seedling),
            "wooden" => Ok(BadgeTier::Wooden),
            "bronze" => Ok(BadgeTier::Bronze),
            "silver" => Ok(BadgeTier::Silver),
            "gold" => Ok(BadgeTier::Gold),
            _ => Err(DomainError::validation(format!("unknown badge tier `{trimmed}`"))),
        }
    }
}

impl fmt::Display for BadgeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
