/// Undo support for organize runs.
///
/// [`UndoManager`] is a stack of the moves made by the latest run. Undoing
/// pops the newest move and puts the file back where it came from.
///
/// [`HistoryJournal`] writes that stack into the organized directory so a
/// later process can still undo the run.
use crate::file_organizer::{FileOperation, OrganizeError, OrganizeResult};
use crate::path_resolver::move_file;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Name of the journal file kept in an organized directory.
pub const HISTORY_FILE_NAME: &str = ".foldersort_history.json";

/// LIFO history of the moves made by one organize run.
#[derive(Debug, Clone, Default)]
pub struct UndoManager {
    operations: Vec<FileOperation>,
}

impl UndoManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_operations(operations: Vec<FileOperation>) -> Self {
        Self { operations }
    }

    /// Appends a completed move.
    pub fn record(&mut self, operation: FileOperation) {
        self.operations.push(operation);
    }

    pub fn clear(&mut self) {
        self.operations.clear();
    }

    /// Recorded moves, oldest first.
    pub fn operations(&self) -> &[FileOperation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Moves the file of `operation` back to its source path.
    ///
    /// Missing parent directories of the source are recreated. If another
    /// file now occupies the source path it is renamed to
    /// `<name>.bak.<timestamp>` first.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::OperationNotReversible` if the moved file is
    /// gone, or `OrganizeError::MoveFailed` if it cannot be moved back.
    pub fn undo(operation: &FileOperation) -> OrganizeResult<()> {
        if !operation.destination.exists() {
            return Err(OrganizeError::OperationNotReversible(
                operation.destination.clone(),
            ));
        }

        if let Some(parent) = operation.source.parent() {
            fs::create_dir_all(parent).map_err(|source| OrganizeError::DirectoryCreation {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        if operation.source.exists() {
            let backup_path = generate_backup_path(&operation.source);
            fs::rename(&operation.source, &backup_path).map_err(|source| {
                OrganizeError::MoveFailed {
                    from: operation.source.clone(),
                    to: backup_path.clone(),
                    source,
                }
            })?;
            warn!(
                path = %operation.source.display(),
                backup = %backup_path.display(),
                "Backed up conflicting file before undo"
            );
        }

        move_file(&operation.destination, &operation.source).map_err(|source| {
            OrganizeError::MoveFailed {
                from: operation.destination.clone(),
                to: operation.source.clone(),
                source,
            }
        })?;

        info!(
            from = %operation.destination.display(),
            to = %operation.source.display(),
            "Undid move"
        );
        Ok(())
    }

    /// Pops the newest move and reverts it.
    ///
    /// The popped move is discarded even when reverting it fails, so a
    /// broken entry cannot block the rest of the history.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::NoHistory` if nothing is recorded, otherwise
    /// any error of [`UndoManager::undo`].
    pub fn undo_last(&mut self) -> OrganizeResult<FileOperation> {
        let operation = self.operations.pop().ok_or(OrganizeError::NoHistory)?;
        Self::undo(&operation)?;
        Ok(operation)
    }
}

/// Generates a backup path for a file by appending a timestamp.
///
/// Example: `file.txt` becomes `file.txt.bak.20251109-143052`
fn generate_backup_path(original_path: &Path) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let filename = original_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());

    let backup_name = format!("{}.bak.{}", filename, timestamp);

    match original_path.parent() {
        Some(parent) => parent.join(backup_name),
        None => PathBuf::from(backup_name),
    }
}

/// The undo history of one run, as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryJournal {
    /// RFC 3339 time the run finished.
    pub timestamp: String,
    /// The directory that was organized.
    pub base_path: PathBuf,
    /// Moves in the order they were made.
    pub operations: Vec<FileOperation>,
}

impl HistoryJournal {
    pub fn new(base_path: &Path, operations: Vec<FileOperation>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            base_path: base_path.to_path_buf(),
            operations,
        }
    }

    /// Returns the path of the journal file for `base_path`.
    pub fn file_path(base_path: &Path) -> PathBuf {
        base_path.join(HISTORY_FILE_NAME)
    }

    /// Writes the journal into `base_path`.
    pub fn save(&self, base_path: &Path) -> OrganizeResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(Self::file_path(base_path), json).map_err(OrganizeError::JournalWrite)
    }

    /// Reads the journal of `base_path`, or `None` if there is none.
    pub fn load(base_path: &Path) -> OrganizeResult<Option<Self>> {
        let path = Self::file_path(base_path);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(OrganizeError::JournalRead(e)),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Removes the journal of `base_path` if it exists.
    pub fn delete(base_path: &Path) -> OrganizeResult<()> {
        match fs::remove_file(Self::file_path(base_path)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OrganizeError::JournalWrite(e)),
        }
    }

    /// Saves `operations` for `base_path`, or deletes the journal when empty.
    pub fn store(base_path: &Path, operations: &[FileOperation]) -> OrganizeResult<()> {
        if operations.is_empty() {
            Self::delete(base_path)
        } else {
            Self::new(base_path, operations.to_vec()).save(base_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_organizer::OperationKind;
    use tempfile::TempDir;

    /// Moves `name` from `dir` into `dir/category` and returns the record.
    fn moved(dir: &Path, name: &str, category: &str) -> FileOperation {
        let source = dir.join(name);
        fs::write(&source, name).expect("Failed to write test file");
        let category_dir = dir.join(category);
        fs::create_dir_all(&category_dir).expect("Failed to create category directory");
        let destination = category_dir.join(name);
        fs::rename(&source, &destination).expect("Failed to move file");
        FileOperation {
            kind: OperationKind::Move,
            source,
            destination,
            category: category.to_string(),
        }
    }

    #[test]
    fn test_undo_last_empty_history() {
        let mut manager = UndoManager::new();
        assert!(matches!(manager.undo_last(), Err(OrganizeError::NoHistory)));
    }

    #[test]
    fn test_undo_single_file() {
        let temp_dir = TempDir::new().unwrap();
        let operation = moved(temp_dir.path(), "test.txt", "documents");

        let mut manager = UndoManager::new();
        manager.record(operation.clone());
        let undone = manager.undo_last().unwrap();

        assert_eq!(undone, operation);
        assert!(operation.source.exists());
        assert!(!operation.destination.exists());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_undo_pops_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let first = moved(temp_dir.path(), "a.png", "images");
        let second = moved(temp_dir.path(), "b.pdf", "documents");

        let mut manager = UndoManager::from_operations(vec![first.clone(), second.clone()]);

        assert_eq!(manager.undo_last().unwrap(), second);
        assert!(second.source.exists());
        assert!(!first.source.exists());

        assert_eq!(manager.undo_last().unwrap(), first);
        assert!(first.source.exists());
    }

    #[test]
    fn test_undo_missing_file_is_not_reversible_and_discarded() {
        let temp_dir = TempDir::new().unwrap();
        let operation = moved(temp_dir.path(), "gone.txt", "documents");
        fs::remove_file(&operation.destination).unwrap();

        let mut manager = UndoManager::from_operations(vec![operation]);
        let result = manager.undo_last();

        assert!(matches!(result, Err(OrganizeError::OperationNotReversible(_))));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_undo_recreates_missing_source_directory() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("kept.txt");
        fs::write(&destination, "content").unwrap();
        let operation = FileOperation {
            kind: OperationKind::Move,
            source: temp_dir.path().join("was").join("here").join("kept.txt"),
            destination,
            category: "documents".to_string(),
        };

        UndoManager::undo(&operation).unwrap();
        assert_eq!(fs::read_to_string(&operation.source).unwrap(), "content");
    }

    #[test]
    fn test_undo_backs_up_conflicting_file() {
        let temp_dir = TempDir::new().unwrap();
        let operation = moved(temp_dir.path(), "test.txt", "documents");
        fs::write(&operation.source, "new content").unwrap();

        UndoManager::undo(&operation).unwrap();

        assert_eq!(fs::read_to_string(&operation.source).unwrap(), "test.txt");
        let backups: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .flatten()
            .filter(|entry| entry.file_name().to_string_lossy().contains(".bak."))
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn test_journal_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let operation = moved(temp_dir.path(), "a.pdf", "docs");

        HistoryJournal::store(temp_dir.path(), std::slice::from_ref(&operation)).unwrap();
        let journal = HistoryJournal::load(temp_dir.path()).unwrap().unwrap();

        assert_eq!(journal.base_path, temp_dir.path());
        assert_eq!(journal.operations, vec![operation]);
    }

    #[test]
    fn test_journal_store_empty_deletes_file() {
        let temp_dir = TempDir::new().unwrap();
        let operation = moved(temp_dir.path(), "a.pdf", "docs");
        HistoryJournal::store(temp_dir.path(), &[operation]).unwrap();
        assert!(HistoryJournal::file_path(temp_dir.path()).exists());

        HistoryJournal::store(temp_dir.path(), &[]).unwrap();
        assert!(HistoryJournal::load(temp_dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_journal_invalid_format() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(HistoryJournal::file_path(temp_dir.path()), "{]").unwrap();

        let result = HistoryJournal::load(temp_dir.path());
        assert!(matches!(result, Err(OrganizeError::JournalFormat(_))));
    }
}
