//! Snapshot Codec
//!
//! Converts scheduler state to and from [`SnapshotRecord`], a versioned JSON
//! schema, and checks it against a fingerprint of the source list.
//!
//! Migration policy: fields added after version 1 must carry
//! `#[serde(default)]` and get an arm in [`migrate`]. Records newer than
//! [`SNAPSHOT_VERSION`] are rejected as corrupt.

use std::collections::{HashSet, VecDeque};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::SnapshotError;
use crate::scheduler::{Scheduler, UndoEntry, UndoSlot};
use crate::types::{decode_history, encode_history, Item, Offsets};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Item as stored in a snapshot; history is a symbol string such as `"USK"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub id: Uuid,
    pub word: String,
    pub definition: String,
    pub original_word: String,
    pub original_definition: String,
    #[serde(default)]
    pub history: String,
    #[serde(default)]
    pub graduated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub version: u32,
    pub base_low: u32,
    pub base_medium: u32,
    pub pending: Vec<ItemRecord>,
    #[serde(default)]
    pub graduated: Vec<ItemRecord>,
    #[serde(default)]
    pub current: Option<ItemRecord>,
    /// Undo slot: the most recently resolved item, by id
    #[serde(default)]
    pub previous: Option<UndoEntry>,
    /// Front of the pending queue when saved; recomputed on load
    #[serde(default)]
    pub lookahead: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
}

impl From<&Item> for ItemRecord {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            word: item.word.clone(),
            definition: item.definition.clone(),
            original_word: item.original_word.clone(),
            original_definition: item.original_definition.clone(),
            history: encode_history(&item.history),
            graduated: item.graduated,
        }
    }
}

impl TryFrom<ItemRecord> for Item {
    type Error = SnapshotError;

    fn try_from(record: ItemRecord) -> Result<Self, Self::Error> {
        let history = decode_history(&record.history).map_err(|symbol| {
            SnapshotError::Corrupt(format!(
                "item {} has unknown judgment symbol {symbol:?}",
                record.id
            ))
        })?;
        Ok(Item {
            id: record.id,
            word: record.word,
            definition: record.definition,
            original_word: record.original_word,
            original_definition: record.original_definition,
            history,
            graduated: record.graduated,
        })
    }
}

/// 计算源文件内容指纹 (SHA-256, 小写十六进制)
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Captures the full scheduler state.
pub fn save(
    scheduler: &Scheduler,
    source_fingerprint: Option<&str>,
    source: Option<&str>,
) -> SnapshotRecord {
    let offsets = scheduler.offsets();
    SnapshotRecord {
        version: SNAPSHOT_VERSION,
        base_low: offsets.base_low(),
        base_medium: offsets.base_medium(),
        pending: scheduler.pending().iter().map(ItemRecord::from).collect(),
        graduated: scheduler.graduated().iter().map(ItemRecord::from).collect(),
        current: scheduler.current().map(ItemRecord::from),
        previous: scheduler.undo_entry().copied(),
        lookahead: scheduler.peek_next().map(|item| item.id),
        source_fingerprint: source_fingerprint.map(str::to_string),
        source: source.map(str::to_string),
        saved_at: Some(chrono::Utc::now().to_rfc3339()),
    }
}

/// Restores a scheduler. A record carrying a fingerprint that differs from
/// `current_fingerprint` is stale; a record without one (database-backed
/// sources) or a caller without one skips the check.
pub fn load(
    record: SnapshotRecord,
    current_fingerprint: Option<&str>,
) -> Result<Scheduler, SnapshotError> {
    if let (Some(saved), Some(current)) = (record.source_fingerprint.as_deref(), current_fingerprint) {
        if !saved.eq_ignore_ascii_case(current) {
            return Err(SnapshotError::Stale);
        }
    }

    let record = migrate(record)?;
    let offsets = Offsets::new(record.base_low, record.base_medium)
        .map_err(|err| SnapshotError::Corrupt(err.to_string()))?;

    let mut seen = HashSet::new();
    let mut convert = |record: ItemRecord, graduated: bool| -> Result<Item, SnapshotError> {
        if !seen.insert(record.id) {
            return Err(SnapshotError::Corrupt(format!("duplicate item id {}", record.id)));
        }
        if record.graduated != graduated {
            return Err(SnapshotError::Corrupt(format!(
                "item {} graduated flag does not match its collection",
                record.id
            )));
        }
        Item::try_from(record)
    };

    let pending = record
        .pending
        .into_iter()
        .map(|r| convert(r, false))
        .collect::<Result<VecDeque<_>, _>>()?;
    let graduated = record
        .graduated
        .into_iter()
        .map(|r| convert(r, true))
        .collect::<Result<Vec<_>, _>>()?;
    let current = record.current.map(|r| convert(r, false)).transpose()?;

    if let Some(entry) = record.previous {
        let resolved = pending
            .iter()
            .chain(graduated.iter())
            .chain(current.iter())
            .any(|item| item.id == entry.item_id);
        if !resolved {
            return Err(SnapshotError::Corrupt(format!(
                "undo entry refers to unknown item {}",
                entry.item_id
            )));
        }
    }

    Ok(Scheduler::from_parts(
        offsets,
        pending,
        graduated,
        current,
        UndoSlot::new(record.previous),
    ))
}

fn migrate(record: SnapshotRecord) -> Result<SnapshotRecord, SnapshotError> {
    match record.version {
        SNAPSHOT_VERSION => Ok(record),
        other => Err(SnapshotError::Corrupt(format!(
            "unsupported snapshot version {other}"
        ))),
    }
}

/// Writes the record next to `path` first, then renames it into place.
pub fn write_file(path: &Path, record: &SnapshotRecord) -> Result<(), SnapshotError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, record)?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|err| SnapshotError::Io(err.into_error()))?
            .sync_all()?;
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn read_file(path: &Path) -> Result<SnapshotRecord, SnapshotError> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}
