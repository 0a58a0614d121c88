//! Common Types and Constants
//!
//! Shared data structures used by the position calculator, the scheduler and
//! the snapshot codec.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SchedulerError;

// ==================== Constants ====================

/// Consecutive KNOWN judgments that graduate an item
pub const GRADUATION_RUN: usize = 6;

/// Smallest accepted base offset
pub const MIN_OFFSET: u32 = 1;

/// Largest accepted base offset
pub const MAX_OFFSET: u32 = 100;

/// Default re-insertion depth for UNFAMILIAR
pub const DEFAULT_BASE_LOW: u32 = 10;

/// Default re-insertion depth for SHAKY
pub const DEFAULT_BASE_MEDIUM: u32 = 15;

// ==================== Judgment ====================

/// 用户对当前单词的判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Judgment {
    Unfamiliar,
    Shaky,
    Known,
}

impl Judgment {
    pub const ALL: [Judgment; 3] = [Judgment::Unfamiliar, Judgment::Shaky, Judgment::Known];

    /// Single-character code used in snapshots.
    pub const fn symbol(self) -> char {
        match self {
            Judgment::Unfamiliar => 'U',
            Judgment::Shaky => 'S',
            Judgment::Known => 'K',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        let symbol = symbol.to_ascii_uppercase();
        Self::ALL.into_iter().find(|j| j.symbol() == symbol)
    }
}

impl fmt::Display for Judgment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown judgment: {0:?}")]
pub struct ParseJudgmentError(pub String);

impl FromStr for Judgment {
    type Err = ParseJudgmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "u" | "unfamiliar" => Ok(Judgment::Unfamiliar),
            "s" | "shaky" => Ok(Judgment::Shaky),
            "k" | "known" => Ok(Judgment::Known),
            _ => Err(ParseJudgmentError(s.to_string())),
        }
    }
}

/// 将判定历史编码为紧凑字符串，例如 `"USK"`
pub fn encode_history(history: &[Judgment]) -> String {
    history.iter().map(|j| j.symbol()).collect()
}

/// Decodes a stored history string. Returns the first unknown character on failure.
pub fn decode_history(raw: &str) -> Result<Vec<Judgment>, char> {
    raw.chars()
        .map(|c| Judgment::from_symbol(c).ok_or(c))
        .collect()
}

// ==================== Item ====================

/// A word/definition pair with its judgment history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: Uuid,
    pub word: String,
    pub definition: String,
    /// Text as loaded, kept so a source rewriter can relocate the record
    pub original_word: String,
    pub original_definition: String,
    pub history: Vec<Judgment>,
    pub graduated: bool,
}

impl Item {
    pub fn new(word: impl Into<String>, definition: impl Into<String>) -> Self {
        let word = word.into();
        let definition = definition.into();
        Self {
            id: Uuid::new_v4(),
            original_word: word.clone(),
            original_definition: definition.clone(),
            word,
            definition,
            history: Vec::new(),
            graduated: false,
        }
    }

    pub fn with_history(mut self, history: Vec<Judgment>) -> Self {
        self.history = history;
        self
    }

    pub fn history_string(&self) -> String {
        encode_history(&self.history)
    }
}

// ==================== Offsets ====================

/// Base offsets controlling re-insertion depth, both within `MIN_OFFSET..=MAX_OFFSET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offsets {
    base_low: u32,
    base_medium: u32,
}

impl Offsets {
    pub fn new(base_low: u32, base_medium: u32) -> Result<Self, SchedulerError> {
        let range = MIN_OFFSET..=MAX_OFFSET;
        if !range.contains(&base_low) || !range.contains(&base_medium) {
            return Err(SchedulerError::InvalidConfiguration {
                base_low,
                base_medium,
            });
        }
        Ok(Self {
            base_low,
            base_medium,
        })
    }

    pub fn base_low(&self) -> u32 {
        self.base_low
    }

    pub fn base_medium(&self) -> u32 {
        self.base_medium
    }
}

impl Default for Offsets {
    fn default() -> Self {
        Self {
            base_low: DEFAULT_BASE_LOW,
            base_medium: DEFAULT_BASE_MEDIUM,
        }
    }
}

// ==================== Results ====================

/// Where a resolved item went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Placement {
    /// Re-inserted into the pending queue at a 0-based index
    Reinserted { index: usize },
    Graduated,
}

/// Queue counters and configuration, the status line every front end renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub pending: usize,
    pub graduated: usize,
    pub base_low: u32,
    pub base_medium: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_judgment_parse_is_case_insensitive() {
        assert_eq!("k".parse::<Judgment>().unwrap(), Judgment::Known);
        assert_eq!(" Shaky ".parse::<Judgment>().unwrap(), Judgment::Shaky);
        assert_eq!("U".parse::<Judgment>().unwrap(), Judgment::Unfamiliar);
        assert!("H".parse::<Judgment>().is_err());
    }

    #[test]
    fn test_history_codec() {
        let history = vec![Judgment::Unfamiliar, Judgment::Shaky, Judgment::Known];
        assert_eq!(encode_history(&history), "USK");
        assert_eq!(decode_history("usk").unwrap(), history);
        assert_eq!(decode_history("UXK"), Err('X'));
    }

    #[test]
    fn test_offsets_range() {
        assert!(Offsets::new(1, 100).is_ok());
        assert!(Offsets::new(0, 10).is_err());
        assert!(Offsets::new(10, 101).is_err());
        assert_eq!(Offsets::default().base_low(), DEFAULT_BASE_LOW);
    }

    #[test]
    fn test_new_item_keeps_original_text() {
        let item = Item::new("abate", "to lessen");
        assert_eq!(item.original_word, "abate");
        assert_eq!(item.original_definition, "to lessen");
        assert!(item.history.is_empty());
        assert!(!item.graduated);
    }
}
