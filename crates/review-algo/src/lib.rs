//! # vocab-review-algo - 词汇复习调度核心
//!
//! Pure queue-reordering scheduler for vocabulary review. Items move through a
//! pending queue driven only by ordinal position and judgment history; there is
//! no wall-clock component.
//!
//! ## 模块结构
//!
//! - [`types`] - Item, Judgment, Offsets and shared constants
//! - [`position`] - target index / graduation for a judgment
//! - [`scheduler`] - pending queue, graduated list, presented item, undo slot
//! - [`snapshot`] - versioned snapshot record, fingerprint, file helpers
//!
//! ## 使用示例
//!
//! ```rust
//! use vocab_review_algo::{Judgment, Offsets, Placement, Scheduler};
//!
//! let mut scheduler = Scheduler::initialize(
//!     Offsets::new(10, 15).unwrap(),
//!     [("abate", "to lessen"), ("bask", "to lie in warmth")],
//! );
//! scheduler.advance();
//! assert_eq!(scheduler.judge(Judgment::Known), Some(Placement::Graduated));
//! ```

pub mod error;
pub mod position;
pub mod scheduler;
pub mod snapshot;
pub mod types;

pub use error::{SchedulerError, SnapshotError};
pub use scheduler::{Scheduler, UndoEntry, UndoSlot};
pub use snapshot::{ItemRecord, SnapshotRecord, SNAPSHOT_VERSION};
pub use types::*;
