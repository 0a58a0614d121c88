use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;
use vocab_review_algo::snapshot;
use vocab_review_algo::{
    Item, Judgment, Offsets, Placement, QueueStatus, Scheduler, SchedulerError, SnapshotError,
    SnapshotRecord,
};

use crate::auth::SessionKey;
use crate::services::source::{self, SourceError, SourceList};

#[derive(Debug, thiserror::Error)]
pub enum TrainerError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error("progress unreadable: {0}")]
    Progress(SnapshotError),
    #[error("no word is being presented")]
    NoCurrentWord,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("session not found")]
    SessionNotFound,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordView {
    pub id: Uuid,
    pub word: String,
    pub definition: String,
    pub history: String,
    pub graduated: bool,
}

impl From<&Item> for WordView {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            word: item.word.clone(),
            definition: item.definition.clone(),
            history: item.history_string(),
            graduated: item.graduated,
        }
    }
}

/// What every trainer endpoint renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerView {
    #[serde(skip)]
    pub message: String,
    pub source: String,
    pub current: Option<WordView>,
    pub next: Option<WordView>,
    pub status: QueueStatus,
    pub can_undo: bool,
    pub completed: bool,
    /// Item touched by the operation, after the change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word: Option<WordView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
}

/// One scheduler bound to one source file.
#[derive(Debug)]
pub struct TrainerSession {
    source_name: String,
    source_path: PathBuf,
    fingerprint: String,
    progress_path: PathBuf,
    scheduler: Scheduler,
    default_offsets: Offsets,
    last_active: Instant,
    /// State changed since the last successful write
    dirty: bool,
    closed: bool,
}

impl TrainerSession {
    /// Loads the source and restores `owner`'s saved progress when it still matches.
    pub async fn open(
        data_dir: &Path,
        owner: &SessionKey,
        name: &str,
        default_offsets: Offsets,
    ) -> Result<(Self, TrainerView), TrainerError> {
        let source = source::load(data_dir, name).await?;
        let progress_path = source::progress_path(data_dir, owner, &source.name);
        let saved = read_progress(progress_path.clone()).await;
        let (scheduler, message) = restore(&source, saved, default_offsets)?;

        let mut session = Self {
            source_name: source.name,
            source_path: source.path,
            fingerprint: source.fingerprint,
            progress_path,
            scheduler,
            default_offsets,
            last_active: Instant::now(),
            dirty: true,
            closed: false,
        };
        session.scheduler.advance();
        session.persist().await;

        tracing::info!(
            source = %session.source_name,
            pending = session.scheduler.pending().len(),
            graduated = session.scheduler.graduated().len(),
            "trainer session opened"
        );

        let view = session.render(message, None, None);
        Ok((session, view))
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }

    /// After this the session never writes its progress file again.
    pub fn mark_closed(&mut self) {
        self.closed = true;
    }

    /// Persists, then marks closed.
    pub async fn close(&mut self) {
        self.persist().await;
        self.mark_closed();
        tracing::info!(source = %self.source_name, "trainer session closed");
    }

    // ==================== Operations ====================

    pub fn view(&mut self) -> Result<TrainerView, TrainerError> {
        self.begin()?;
        Ok(self.render(String::new(), None, None))
    }

    pub fn next(&mut self) -> Result<TrainerView, TrainerError> {
        self.begin()?;
        let unresolved = self.scheduler.current().is_some();
        self.scheduler.advance();
        self.dirty = true;

        let message = if unresolved {
            "请先对当前单词作出判断".to_string()
        } else {
            String::new()
        };
        Ok(self.render(message, None, None))
    }

    /// Resolves the presented word and presents the next one.
    pub fn judge(&mut self, judgment: Judgment) -> Result<TrainerView, TrainerError> {
        self.begin()?;
        let id = self.current_id()?;
        let placement = self
            .scheduler
            .judge(judgment)
            .ok_or(TrainerError::NoCurrentWord)?;
        self.scheduler.advance();
        self.dirty = true;

        let word = self.find(id);
        let label = word.as_ref().map(|w| w.word.clone()).unwrap_or_default();
        let message = match placement {
            Placement::Reinserted { index } => {
                format!("单词 '{label}' 已移至待学习队列第 {} 位", index + 1)
            }
            Placement::Graduated => format!("单词 '{label}' 已移入已学习队列"),
        };
        tracing::debug!(source = %self.source_name, %id, judgment = %judgment, ?placement, "word judged");
        Ok(self.render(message, word, Some(placement)))
    }

    pub fn undo(&mut self) -> Result<TrainerView, TrainerError> {
        self.begin()?;
        let restored = WordView::from(self.scheduler.undo()?);
        self.dirty = true;

        let message = format!("已撤销对单词 '{}' 的判断", restored.word);
        Ok(self.render(message, Some(restored), None))
    }

    /// Graduates the presented word regardless of its history.
    pub fn promote(&mut self) -> Result<TrainerView, TrainerError> {
        self.begin()?;
        let id = self.current_id()?;
        let promoted = self
            .scheduler
            .promote(id)
            .map(WordView::from)
            .ok_or(TrainerError::NoCurrentWord)?;
        self.scheduler.advance();
        self.dirty = true;

        let message = format!("单词 '{}' 已移入已学习队列", promoted.word);
        Ok(self.render(message, Some(promoted), Some(Placement::Graduated)))
    }

    pub fn add_word(&mut self, word: &str, definition: &str) -> Result<TrainerView, TrainerError> {
        self.begin()?;
        let (word, definition) = validate_pair(word, definition)?;
        let (index, item) = self.scheduler.insert_new(word, definition);
        let added = WordView::from(item);
        if self.scheduler.current().is_none() {
            self.scheduler.advance();
        }
        self.dirty = true;

        let message = format!("单词 '{}' 已插入待学习队列第 {} 位", added.word, index + 1);
        Ok(self.render(
            message,
            Some(added),
            Some(Placement::Reinserted { index }),
        ))
    }

    /// Rewrites the presented word's text.
    pub fn edit_word(&mut self, word: &str, definition: &str) -> Result<TrainerView, TrainerError> {
        self.begin()?;
        let id = self.current_id()?;
        let (word, definition) = validate_pair(word, definition)?;
        let edited = self
            .scheduler
            .edit(id, word, definition)
            .map(WordView::from)
            .ok_or(TrainerError::NoCurrentWord)?;
        self.dirty = true;

        Ok(self.render("单词已更新".to_string(), Some(edited), None))
    }

    pub fn update_params(
        &mut self,
        base_low: u32,
        base_medium: u32,
    ) -> Result<TrainerView, TrainerError> {
        self.begin()?;
        let offsets = self.scheduler.set_offsets(base_low, base_medium)?;
        self.dirty = true;

        tracing::info!(
            source = %self.source_name,
            base_low = offsets.base_low(),
            base_medium = offsets.base_medium(),
            "offsets updated"
        );
        Ok(self.render("参数已更新".to_string(), None, None))
    }

    /// Discards all progress and starts over from the source file.
    pub async fn reset(&mut self, data_dir: &Path) -> Result<TrainerView, TrainerError> {
        self.begin()?;
        let source = source::load(data_dir, &self.source_name).await?;

        self.scheduler = Scheduler::initialize(self.default_offsets, source.entries);
        self.fingerprint = source.fingerprint;
        self.source_path = source.path;
        self.scheduler.advance();
        self.dirty = true;
        self.persist().await;

        tracing::info!(source = %self.source_name, "trainer progress reset");
        Ok(self.render("学习进度已重置".to_string(), None, None))
    }

    /// Writes the snapshot on the blocking pool when the state changed.
    /// Failures are logged and leave the session dirty.
    pub async fn persist(&mut self) {
        if self.closed || !self.dirty {
            return;
        }
        let record = snapshot::save(
            &self.scheduler,
            Some(&self.fingerprint),
            Some(&self.source_name),
        );
        let path = self.progress_path.clone();
        let written = tokio::task::spawn_blocking(move || write_progress(&path, &record)).await;

        match written {
            Ok(Ok(())) => self.dirty = false,
            Ok(Err(err)) => tracing::warn!(
                source = %self.source_name,
                path = %self.progress_path.display(),
                error = %err,
                "failed to persist progress"
            ),
            Err(err) => tracing::warn!(
                source = %self.source_name,
                error = %err,
                "progress writer task failed"
            ),
        }
    }

    // ==================== Helpers ====================

    fn begin(&mut self) -> Result<(), TrainerError> {
        if self.closed {
            return Err(TrainerError::SessionNotFound);
        }
        self.touch();
        Ok(())
    }

    fn current_id(&self) -> Result<Uuid, TrainerError> {
        self.scheduler
            .current()
            .map(|item| item.id)
            .ok_or(TrainerError::NoCurrentWord)
    }

    fn find(&self, id: Uuid) -> Option<WordView> {
        self.scheduler
            .current()
            .into_iter()
            .chain(self.scheduler.pending().iter())
            .chain(self.scheduler.graduated().iter())
            .find(|item| item.id == id)
            .map(WordView::from)
    }

    fn render(
        &self,
        message: String,
        word: Option<WordView>,
        placement: Option<Placement>,
    ) -> TrainerView {
        let completed = self.scheduler.is_exhausted();
        let message = if completed && message.is_empty() {
            "所有单词已学习完毕".to_string()
        } else {
            message
        };

        TrainerView {
            message,
            source: self.source_name.clone(),
            current: self.scheduler.current().map(WordView::from),
            next: self.scheduler.peek_next().map(WordView::from),
            status: self.scheduler.status(),
            can_undo: self.scheduler.can_undo(),
            completed,
            word,
            placement,
        }
    }
}

async fn read_progress(path: PathBuf) -> Result<SnapshotRecord, SnapshotError> {
    tokio::task::spawn_blocking(move || snapshot::read_file(&path))
        .await
        .unwrap_or_else(|err| Err(SnapshotError::Io(std::io::Error::other(err))))
}

fn write_progress(path: &Path, record: &SnapshotRecord) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    snapshot::write_file(path, record)
}

/// Stale or corrupt progress falls back to the raw source. Any other read
/// failure is surfaced so the saved file is never overwritten blindly.
fn restore(
    source: &SourceList,
    saved: Result<SnapshotRecord, SnapshotError>,
    defaults: Offsets,
) -> Result<(Scheduler, String), TrainerError> {
    let fresh = || Scheduler::initialize(defaults, source.entries.iter().cloned());

    match saved.and_then(|record| snapshot::load(record, Some(&source.fingerprint))) {
        Ok(scheduler) => Ok((scheduler, "已恢复上次的学习进度".to_string())),
        Err(SnapshotError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            Ok((fresh(), format!("已加载 {} 个单词", source.entries.len())))
        }
        Err(err) if err.is_recoverable() => {
            tracing::warn!(source = %source.name, error = %err, "progress rejected, starting fresh");
            let message = match err {
                SnapshotError::Stale => "词汇文件已更改，已重新开始",
                _ => "进度文件已损坏，已重新开始",
            };
            Ok((fresh(), message.to_string()))
        }
        Err(err) => Err(TrainerError::Progress(err)),
    }
}

fn validate_pair<'a>(word: &'a str, definition: &'a str) -> Result<(&'a str, &'a str), TrainerError> {
    let word = word.trim();
    let definition = definition.trim();
    if word.is_empty() || definition.is_empty() {
        return Err(TrainerError::Validation("单词和释义不能为空".to_string()));
    }
    Ok((word, definition))
}
