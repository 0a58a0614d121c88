use std::path::{Path, PathBuf};

use vocab_review_algo::snapshot;

use crate::auth::SessionKey;

const PROGRESS_EXTENSION: &str = "progress";
const PROGRESS_DIR: &str = ".progress";
const BOM: char = '\u{feff}';

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source {name} unreadable: {reason}")]
    Unreadable { name: String, reason: String },
    #[error("source {name} io error: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    fn unreadable(name: &str, reason: impl Into<String>) -> Self {
        Self::Unreadable {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// A word list read from the data directory.
#[derive(Debug, Clone)]
pub struct SourceList {
    pub name: String,
    pub path: PathBuf,
    pub fingerprint: String,
    pub entries: Vec<(String, String)>,
}

/// Maps a plain file name onto the data directory.
pub fn resolve(data_dir: &Path, name: &str) -> Result<PathBuf, SourceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SourceError::unreadable(name, "empty name"));
    }
    if trimmed.starts_with('.')
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains("..")
    {
        return Err(SourceError::unreadable(name, "not a plain file name"));
    }
    let path = data_dir.join(trimmed);
    if path.extension().and_then(|ext| ext.to_str()) == Some(PROGRESS_EXTENSION) {
        return Err(SourceError::unreadable(name, "progress files are not sources"));
    }
    Ok(path)
}

/// Progress of `owner` on `words.txt` lives in
/// `.progress/<owner storage id>/words.txt.progress`.
pub fn progress_path(data_dir: &Path, owner: &SessionKey, source_name: &str) -> PathBuf {
    data_dir
        .join(PROGRESS_DIR)
        .join(owner.storage_id())
        .join(progress_file_name(source_name))
}

fn progress_file_name(source_name: &str) -> String {
    format!("{}.{PROGRESS_EXTENSION}", source_name.trim())
}

pub async fn load(data_dir: &Path, name: &str) -> Result<SourceList, SourceError> {
    let path = resolve(data_dir, name)?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|err| SourceError::unreadable(name, err.to_string()))?;
    let text = std::str::from_utf8(&bytes)
        .map_err(|_| SourceError::unreadable(name, "not valid UTF-8"))?;

    let entries = parse_entries(text);
    tracing::debug!(source = %name, entries = entries.len(), "source loaded");

    Ok(SourceList {
        name: name.trim().to_string(),
        path,
        fingerprint: snapshot::fingerprint(&bytes),
        entries,
    })
}

/// One `word<TAB>definition` per line. Extra tabs stay in the definition.
pub fn parse_entries(text: &str) -> Vec<(String, String)> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(|line| match line.split_once('\t') {
            Some((word, definition)) => (word.trim().to_string(), definition.trim().to_string()),
            None => (line.trim().to_string(), String::new()),
        })
        .collect()
}

/// Deletes the source and every owner's progress on it. Returns whether the
/// source existed.
pub async fn remove(data_dir: &Path, name: &str) -> Result<bool, SourceError> {
    let path = resolve(data_dir, name)?;
    let existed = match tokio::fs::remove_file(&path).await {
        Ok(()) => true,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => false,
        Err(err) => {
            return Err(SourceError::Io {
                name: name.to_string(),
                source: err,
            })
        }
    };

    let removed = remove_progress(data_dir, name).await;
    tracing::debug!(source = %name, progress_files = removed, "progress removed");

    Ok(existed)
}

async fn remove_progress(data_dir: &Path, name: &str) -> usize {
    let root = data_dir.join(PROGRESS_DIR);
    let mut owners = match tokio::fs::read_dir(&root).await {
        Ok(owners) => owners,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return 0,
        Err(err) => {
            tracing::warn!(source = %name, error = %err, "failed to list progress directory");
            return 0;
        }
    };

    let file_name = progress_file_name(name);
    let mut removed = 0;
    loop {
        let owner = match owners.next_entry().await {
            Ok(Some(owner)) => owner,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(source = %name, error = %err, "failed to list progress directory");
                break;
            }
        };
        match tokio::fs::remove_file(owner.path().join(&file_name)).await {
            Ok(()) => removed += 1,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(source = %name, error = %err, "failed to remove progress file");
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entries() {
        let text = "\u{feff}abate\tto lessen\n\nbask\tto lie\tin warmth\r\nlonely\n   \n";
        let entries = parse_entries(text);
        assert_eq!(
            entries,
            vec![
                ("abate".to_string(), "to lessen".to_string()),
                ("bask".to_string(), "to lie\tin warmth".to_string()),
                ("lonely".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_resolve_rejects_paths() {
        let dir = Path::new("/data");
        assert!(resolve(dir, "../etc/passwd").is_err());
        assert!(resolve(dir, "a/b.txt").is_err());
        assert!(resolve(dir, "a\\b.txt").is_err());
        assert!(resolve(dir, "  ").is_err());
        assert!(resolve(dir, "words.progress").is_err());
        assert!(resolve(dir, ".progress").is_err());
        assert!(resolve(dir, ".hidden.txt").is_err());
        assert_eq!(resolve(dir, "words.txt").unwrap(), dir.join("words.txt"));
    }

    #[test]
    fn test_progress_path_keeps_full_source_name() {
        let dir = Path::new("/data");
        let owner = SessionKey::new("alice").unwrap();
        let txt = progress_path(dir, &owner, "words.txt");
        let csv = progress_path(dir, &owner, "words.csv");
        let bare = progress_path(dir, &owner, "words");

        assert_eq!(txt.file_name().unwrap(), "words.txt.progress");
        assert_ne!(txt, csv);
        assert_ne!(txt, bare);
        assert!(txt.starts_with(dir.join(".progress")));
    }

    #[test]
    fn test_progress_path_is_per_owner() {
        let dir = Path::new("/data");
        let alice = progress_path(dir, &SessionKey::new("alice").unwrap(), "words.txt");
        let bob = progress_path(dir, &SessionKey::new("bob").unwrap(), "words.txt");
        assert_ne!(alice, bob);
        assert_eq!(alice.file_name(), bob.file_name());
    }

    #[tokio::test]
    async fn test_load_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("words.txt"), "abate\tto lessen\n").unwrap();
        let owners = [SessionKey::new("alice").unwrap(), SessionKey::new("bob").unwrap()];
        for owner in &owners {
            let path = progress_path(dir.path(), owner, "words.txt");
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, "{}").unwrap();
        }
        let other = progress_path(dir.path(), &owners[0], "other.txt");
        std::fs::write(&other, "{}").unwrap();

        let source = load(dir.path(), "words.txt").await.unwrap();
        assert_eq!(source.entries.len(), 1);
        assert_eq!(source.fingerprint, snapshot::fingerprint(b"abate\tto lessen\n"));

        assert!(remove(dir.path(), "words.txt").await.unwrap());
        for owner in &owners {
            assert!(!progress_path(dir.path(), owner, "words.txt").exists());
        }
        assert!(other.exists());
        assert!(!remove(dir.path(), "words.txt").await.unwrap());
        assert!(load(dir.path(), "words.txt").await.is_err());
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.txt"), [0xff, 0xfe, 0x00]).unwrap();
        let err = load(dir.path(), "bad.txt").await.unwrap_err();
        assert!(matches!(err, SourceError::Unreadable { .. }));
    }
}
