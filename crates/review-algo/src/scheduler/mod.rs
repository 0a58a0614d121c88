//! Review Queue Scheduler
//!
//! Owns the pending queue, the graduated list, the presented item and the
//! single-slot undo buffer.
//!
//! Sizing assumption: corpora are hundreds to low thousands of items, so the
//! pending queue is a plain `VecDeque` and re-insertion is a linear splice.

mod undo;

pub use undo::{UndoEntry, UndoSlot};

use std::collections::VecDeque;

use uuid::Uuid;

use crate::error::SchedulerError;
use crate::position::{self, Target};
use crate::types::{Item, Judgment, Offsets, Placement, QueueStatus};

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    offsets: Offsets,
    pending: VecDeque<Item>,
    graduated: Vec<Item>,
    /// Presented and not yet resolved
    current: Option<Item>,
    undo: UndoSlot,
}

impl Scheduler {
    pub fn new(offsets: Offsets, items: impl IntoIterator<Item = Item>) -> Self {
        Self {
            offsets,
            pending: items.into_iter().collect(),
            graduated: Vec::new(),
            current: None,
            undo: UndoSlot::default(),
        }
    }

    /// 从 (单词, 释义) 列表初始化，保持原有顺序
    pub fn initialize<W, D>(offsets: Offsets, pairs: impl IntoIterator<Item = (W, D)>) -> Self
    where
        W: Into<String>,
        D: Into<String>,
    {
        Self::new(
            offsets,
            pairs
                .into_iter()
                .map(|(word, definition)| Item::new(word, definition)),
        )
    }

    pub(crate) fn from_parts(
        offsets: Offsets,
        pending: VecDeque<Item>,
        graduated: Vec<Item>,
        current: Option<Item>,
        undo: UndoSlot,
    ) -> Self {
        Self {
            offsets,
            pending,
            graduated,
            current,
            undo,
        }
    }

    // ==================== Accessors ====================

    pub fn offsets(&self) -> Offsets {
        self.offsets
    }

    pub fn pending(&self) -> &VecDeque<Item> {
        &self.pending
    }

    pub fn graduated(&self) -> &[Item] {
        &self.graduated
    }

    pub fn current(&self) -> Option<&Item> {
        self.current.as_ref()
    }

    /// Lookahead: the item the next `advance` would present.
    pub fn peek_next(&self) -> Option<&Item> {
        self.pending.front()
    }

    pub fn undo_entry(&self) -> Option<&UndoEntry> {
        self.undo.peek()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Nothing presented and nothing pending.
    pub fn is_exhausted(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            pending: self.pending.len(),
            graduated: self.graduated.len(),
            base_low: self.offsets.base_low(),
            base_medium: self.offsets.base_medium(),
        }
    }

    /// Total items known to the scheduler, presented one included.
    pub fn len(&self) -> usize {
        self.pending.len() + self.graduated.len() + usize::from(self.current.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ==================== Operations ====================

    /// Presents the next item. An unresolved current item is returned again;
    /// `None` means the queue is exhausted.
    pub fn advance(&mut self) -> Option<&Item> {
        if self.current.is_none() {
            self.current = self.pending.pop_front();
        }
        self.current.as_ref()
    }

    /// Resolves the presented item with a judgment. Returns `None` when
    /// nothing is presented.
    pub fn judge(&mut self, judgment: Judgment) -> Option<Placement> {
        let item = self.current.take()?;
        let id = item.id;
        let placement = self.judge_item(item, judgment);

        self.undo.record(UndoEntry {
            item_id: id,
            appended: Some(judgment),
            graduated: placement == Placement::Graduated,
        });
        Some(placement)
    }

    /// Appends `judgment` to the item's history and places it: graduated, or
    /// re-inserted at the clamped target index. Does not touch the undo slot.
    pub fn judge_item(&mut self, mut item: Item, judgment: Judgment) -> Placement {
        item.history.push(judgment);

        if item.graduated {
            self.graduated.push(item);
            return Placement::Graduated;
        }

        match position::target(judgment, &item.history, self.offsets) {
            Target::Graduate => {
                item.graduated = true;
                self.graduated.push(item);
                Placement::Graduated
            }
            Target::Index(raw) => {
                let index = position::clamp_index(raw, self.pending.len());
                self.pending.insert(index, item);
                Placement::Reinserted { index }
            }
        }
    }

    /// Reverses the most recent resolution, one step deep. Any unresolved
    /// current item goes back to the front of the queue. An item that was
    /// re-inserted at the front and presented again is restored in place.
    pub fn undo(&mut self) -> Result<&Item, SchedulerError> {
        let entry = *self.undo.peek().ok_or(SchedulerError::NothingToUndo)?;
        let presented_again = self
            .current
            .as_ref()
            .is_some_and(|current| current.id == entry.item_id);

        let mut item = if presented_again {
            self.current.take()
        } else {
            self.remove_resolved(entry.item_id)
        }
        .ok_or(SchedulerError::NothingToUndo)?;
        self.undo.clear();

        if let Some(judgment) = entry.appended {
            if item.history.last() == Some(&judgment) {
                item.history.pop();
            }
        }
        if entry.graduated {
            item.graduated = false;
        }

        if let Some(current) = self.current.take() {
            self.pending.push_front(current);
        }
        let restored: &Item = self.current.insert(item);
        Ok(restored)
    }

    /// Adds a new item seeded with one UNFAMILIAR judgment at the UNFAMILIAR
    /// depth. Returns the index it landed at.
    pub fn insert_new(
        &mut self,
        word: impl Into<String>,
        definition: impl Into<String>,
    ) -> (usize, &Item) {
        let item = Item::new(word, definition).with_history(vec![Judgment::Unfamiliar]);
        let raw = self.offsets.base_low() as usize - 1;
        let index = position::clamp_index(raw, self.pending.len());
        self.pending.insert(index, item);
        (index, &self.pending[index])
    }

    /// Rewrites word and definition in place. Original text and history are kept.
    pub fn edit(
        &mut self,
        id: Uuid,
        word: impl Into<String>,
        definition: impl Into<String>,
    ) -> Option<&Item> {
        let item = self.find_mut(id)?;
        item.word = word.into();
        item.definition = definition.into();
        Some(&*item)
    }

    /// Graduates an item from the presented slot or the pending queue without
    /// consulting its history. Returns `None` if it is already graduated or unknown.
    pub fn promote(&mut self, id: Uuid) -> Option<&Item> {
        let from_current = self.current.as_ref().map(|c| c.id == id).unwrap_or(false);

        let mut item = if from_current {
            self.current.take()?
        } else {
            let index = self.pending.iter().position(|i| i.id == id)?;
            if self.undo.refers_to(id) {
                self.undo.clear();
            }
            self.pending.remove(index)?
        };

        item.graduated = true;
        if from_current {
            self.undo.record(UndoEntry {
                item_id: id,
                appended: None,
                graduated: true,
            });
        }
        self.graduated.push(item);
        self.graduated.last()
    }

    pub fn set_offsets(&mut self, base_low: u32, base_medium: u32) -> Result<Offsets, SchedulerError> {
        self.offsets = Offsets::new(base_low, base_medium)?;
        Ok(self.offsets)
    }

    fn find_mut(&mut self, id: Uuid) -> Option<&mut Item> {
        if let Some(current) = self.current.as_mut().filter(|c| c.id == id) {
            return Some(current);
        }
        if let Some(item) = self.pending.iter_mut().find(|i| i.id == id) {
            return Some(item);
        }
        self.graduated.iter_mut().find(|i| i.id == id)
    }

    fn remove_resolved(&mut self, id: Uuid) -> Option<Item> {
        if let Some(index) = self.pending.iter().position(|i| i.id == id) {
            return self.pending.remove(index);
        }
        let index = self.graduated.iter().position(|i| i.id == id)?;
        Some(self.graduated.remove(index))
    }
}
