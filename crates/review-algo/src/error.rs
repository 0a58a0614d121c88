use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("invalid offsets: baseLow={base_low}, baseMedium={base_medium} (allowed 1-100)")]
    InvalidConfiguration { base_low: u32, base_medium: u32 },
    #[error("nothing to undo")]
    NothingToUndo,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is stale: source fingerprint changed")]
    Stale,
    #[error("snapshot is corrupt: {0}")]
    Corrupt(String),
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SnapshotError {
    /// Stale and corrupt snapshots are recovered by reloading the raw source.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SnapshotError::Stale | SnapshotError::Corrupt(_))
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Corrupt(err.to_string())
    }
}
