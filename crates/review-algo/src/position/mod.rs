//! Position Calculator
//!
//! Maps a judgment and the item's history (already including that judgment)
//! to a 0-based target index in the pending queue, or to graduation.
//!
//! - UNFAMILIAR → `base_low - 1`
//! - SHAKY → `base_medium - 1`
//! - KNOWN → `base * (k + 1)! - 1`, where `k` is the trailing KNOWN run and
//!   `base` is `base_low` when the judgment preceding the run is UNFAMILIAR,
//!   `base_medium` otherwise
//!
//! Graduation is checked first: a KNOWN first judgment, or a trailing KNOWN
//! run of [`GRADUATION_RUN`].

use crate::types::{Judgment, Offsets, GRADUATION_RUN};

/// 位置计算结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Graduate,
    /// Unclamped 0-based index
    Index(usize),
}

/// Length of the maximal suffix of `history` made of `symbol`.
pub fn trailing_run(history: &[Judgment], symbol: Judgment) -> usize {
    history.iter().rev().take_while(|&&j| j == symbol).count()
}

pub fn trailing_known(history: &[Judgment]) -> usize {
    trailing_run(history, Judgment::Known)
}

/// 判断本次判定后是否直接毕业
pub fn should_graduate(judgment: Judgment, history: &[Judgment]) -> bool {
    if judgment != Judgment::Known {
        return false;
    }
    history.len() == 1 || trailing_known(history) >= GRADUATION_RUN
}

pub fn target(judgment: Judgment, history: &[Judgment], offsets: Offsets) -> Target {
    if should_graduate(judgment, history) {
        return Target::Graduate;
    }

    let index = match judgment {
        Judgment::Unfamiliar => offsets.base_low() as usize - 1,
        Judgment::Shaky => offsets.base_medium() as usize - 1,
        Judgment::Known => known_index(history, offsets),
    };
    Target::Index(index)
}

/// Clamps a target index to `[0, pending_len]`; `pending_len` means append.
pub fn clamp_index(index: usize, pending_len: usize) -> usize {
    index.min(pending_len)
}

fn known_index(history: &[Judgment], offsets: Offsets) -> usize {
    let run = trailing_known(history);
    let preceding = history.len().checked_sub(run + 1).map(|i| history[i]);
    let base = match preceding {
        Some(Judgment::Unfamiliar) => offsets.base_low(),
        _ => offsets.base_medium(),
    };

    (base as usize)
        .saturating_mul(factorial(run + 1))
        .saturating_sub(1)
}

fn factorial(n: usize) -> usize {
    (2..=n).fold(1usize, |acc, i| acc.saturating_mul(i))
}
