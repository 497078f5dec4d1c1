//! Rank tiers for epic missions.
//!
//! # Invariants
//! - Order is fixed: `F < E < D < C < B < A < S < SS < SSS`.
//! - `order_index` is the only ordering used by selection and sorting.
//! - Manual missions carry no rank; their wire sentinel is `M`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Wire sentinel used by manual missions in place of a rank.
pub const MANUAL_RANK_SENTINEL: &str = "M";

/// Ordinal tier of an epic mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    F,
    E,
    D,
    C,
    B,
    A,
    S,
    #[serde(rename = "SS")]
    Ss,
    #[serde(rename = "SSS")]
    Sss,
}

impl Rank {
    /// All ranks in ascending order.
    pub const ALL: [Rank; 9] = [
        Rank::F,
        Rank::E,
        Rank::D,
        Rank::C,
        Rank::B,
        Rank::A,
        Rank::S,
        Rank::Ss,
        Rank::Sss,
    ];

    /// Position in the fixed rank sequence, `F = 0`.
    pub fn order_index(self) -> usize {
        match self {
            Rank::F => 0,
            Rank::E => 1,
            Rank::D => 2,
            Rank::C => 3,
            Rank::B => 4,
            Rank::A => 5,
            Rank::S => 6,
            Rank::Ss => 7,
            Rank::Sss => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rank::F => "F",
            Rank::E => "E",
            Rank::D => "D",
            Rank::C => "C",
            Rank::B => "B",
            Rank::A => "A",
            Rank::S => "S",
            Rank::Ss => "SS",
            Rank::Sss => "SSS",
        }
    }
}

impl Display for Rank {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rank text that is not one of `F..SSS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRankError(pub String);

impl Display for ParseRankError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown rank `{}`; expected F|E|D|C|B|A|S|SS|SSS", self.0)
    }
}

impl Error for ParseRankError {}

impl FromStr for Rank {
    type Err = ParseRankError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        Rank::ALL
            .into_iter()
            .find(|rank| rank.as_str() == normalized)
            .ok_or_else(|| ParseRankError(value.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::Rank;

    #[test]
    fn order_index_is_strictly_increasing() {
        for pair in Rank::ALL.windows(2) {
            assert!(pair[0].order_index() < pair[1].order_index());
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn parses_case_insensitive_names() {
        assert_eq!("sss".parse::<Rank>().unwrap(), Rank::Sss);
        assert_eq!(" e ".parse::<Rank>().unwrap(), Rank::E);
        assert!("M".parse::<Rank>().is_err());
    }

    #[test]
    fn serializes_double_letter_ranks_verbatim() {
        assert_eq!(serde_json::to_string(&Rank::Ss).unwrap(), "\"SS\"");
        let decoded: Rank = serde_json::from_str("\"SSS\"").unwrap();
        assert_eq!(decoded, Rank::Sss);
    }
}
