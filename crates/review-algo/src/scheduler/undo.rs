use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Judgment;

/// What the most recent resolution did, enough to reverse it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoEntry {
    pub item_id: Uuid,
    /// Judgment appended by the resolution; `None` for a promotion
    pub appended: Option<Judgment>,
    /// Whether the resolution moved the item to the graduated list
    pub graduated: bool,
}

/// Single-slot undo buffer. Recording overwrites; taking empties it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoSlot {
    entry: Option<UndoEntry>,
}

impl UndoSlot {
    pub fn new(entry: Option<UndoEntry>) -> Self {
        Self { entry }
    }

    pub fn record(&mut self, entry: UndoEntry) {
        self.entry = Some(entry);
    }

    pub fn take(&mut self) -> Option<UndoEntry> {
        self.entry.take()
    }

    pub fn peek(&self) -> Option<&UndoEntry> {
        self.entry.as_ref()
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub fn refers_to(&self, id: Uuid) -> bool {
        self.entry.map(|e| e.item_id == id).unwrap_or(false)
    }
}
