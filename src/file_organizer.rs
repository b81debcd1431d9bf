/// Directory organization engine.
///
/// [`FileOrganizer`] scans the top level of a directory, classifies each
/// file by extension and moves it into a subdirectory named after its
/// category. Every move is recorded so it can be undone.
///
/// Files are processed in byte-wise file name order. The list is taken
/// before any category directory is created, so a run never picks up the
/// folders it makes.
use crate::file_category::Classifier;
use crate::path_resolver::{move_file, unique_destination};
use crate::rules::{RuleError, RuleSet, RuleStore, is_plain_category};
use crate::undo::{HISTORY_FILE_NAME, UndoManager};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

/// The kind of change a [`FileOperation`] made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Move,
}

/// Record of one file moved during an organize run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOperation {
    pub kind: OperationKind,
    /// Where the file was before the run.
    pub source: PathBuf,
    /// Where the file was moved to.
    pub destination: PathBuf,
    /// The category that selected the destination folder.
    pub category: String,
}

/// Counters produced by one organize run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrganizationStats {
    /// Files seen at the top level of the directory.
    pub total: usize,
    /// Files with a matching category (moved, or counted only in a dry run).
    pub organized: usize,
    /// Files no rule matched.
    pub skipped: usize,
    /// Files that failed to move.
    pub errors: usize,
}

/// The files each category would receive, without touching the disk.
///
/// Unmatched files do not appear in any list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreviewResult {
    groups: BTreeMap<String, Vec<String>>,
}

impl PreviewResult {
    fn push(&mut self, category: &str, file_name: String) {
        self.groups
            .entry(category.to_string())
            .or_default()
            .push(file_name);
    }

    /// File names planned for `category`, in processing order.
    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.groups.get(category).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups
            .iter()
            .map(|(category, files)| (category.as_str(), files.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of categories with at least one file.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Number of files across all categories.
    pub fn file_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Errors raised by organize, preview and undo.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The directory to organize does not exist or is not a directory.
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    /// The directory listing could not be read.
    #[error("Failed to read directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A category directory could not be created.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A file could not be moved.
    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The category name would place files outside the organized directory.
    #[error("Category '{0}' is not a plain folder name")]
    UnsafeCategory(String),
    /// There is nothing left to undo.
    #[error("No operation to undo")]
    NoHistory,
    /// The moved file is no longer where the operation left it.
    #[error("Cannot undo: {} no longer exists", .0.display())]
    OperationNotReversible(PathBuf),
    /// The undo journal could not be written or removed.
    #[error("Failed to write history file: {0}")]
    JournalWrite(#[source] io::Error),
    /// The undo journal could not be read.
    #[error("Failed to read history file: {0}")]
    JournalRead(#[source] io::Error),
    /// The undo journal is not valid JSON.
    #[error("Invalid history file format: {0}")]
    JournalFormat(#[from] serde_json::Error),
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// What happened to one file during a run.
enum FileOutcome {
    Moved(FileOperation),
    Planned,
    Unmatched,
}

/// Organizes directories according to a [`RuleStore`] and keeps the
/// history needed to undo the last run.
///
/// `organize` and the undo methods take `&mut self`, so one engine cannot
/// run two of them at once. Share an engine between threads behind a
/// `Mutex`.
#[derive(Debug)]
pub struct FileOrganizer {
    store: RuleStore,
    history: UndoManager,
}

impl FileOrganizer {
    pub fn new(store: RuleStore) -> Self {
        Self {
            store,
            history: UndoManager::new(),
        }
    }

    /// The rules currently in effect.
    pub fn rules(&self) -> &RuleSet {
        self.store.rules()
    }

    pub fn rule_store(&self) -> &RuleStore {
        &self.store
    }

    pub fn add_rule(&mut self, category: &str, extensions: Vec<String>) {
        self.store.add(category, extensions);
    }

    pub fn remove_rule(&mut self, category: &str) {
        self.store.remove(category);
    }

    pub fn rename_rule(&mut self, old: &str, new: &str, extensions: Vec<String>) {
        self.store.rename(old, new, extensions);
    }

    pub fn import_rules(&mut self, path: &Path) -> Result<(), RuleError> {
        self.store.import(path)
    }

    pub fn export_rules(&self, path: &Path) -> Result<(), RuleError> {
        self.store.export(path)
    }

    /// Moves recorded by the most recent run that have not been undone yet.
    pub fn history(&self) -> &[FileOperation] {
        self.history.operations()
    }

    /// Replaces the undo history, e.g. with one loaded from a journal.
    pub fn restore_history(&mut self, operations: Vec<FileOperation>) {
        self.history = UndoManager::from_operations(operations);
    }

    /// Lists which files would go to which category.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::DirectoryNotFound` if `directory` is not an
    /// existing directory.
    pub fn preview(&self, directory: &Path) -> OrganizeResult<PreviewResult> {
        let files = scan_files(directory)?;
        let classifier = Classifier::new(self.store.rules());

        let mut preview = PreviewResult::default();
        for path in &files {
            if let Some(category) = classifier.classify_path(path) {
                preview.push(category, file_name(path));
            }
        }
        Ok(preview)
    }

    /// Organizes `directory` without progress reporting.
    ///
    /// See [`FileOrganizer::organize_with_progress`].
    pub fn organize(
        &mut self,
        directory: &Path,
        create_dirs: bool,
    ) -> OrganizeResult<OrganizationStats> {
        self.organize_with_progress(directory, create_dirs, |_, _| {})
    }

    /// Organizes the top-level files of `directory`.
    ///
    /// With `create_dirs` set, each matched file is moved into
    /// `directory/<category>/`, renamed with a `_N` suffix if the name is
    /// taken, and recorded for undo. Without it nothing on disk changes,
    /// but matched files are still counted as organized.
    ///
    /// A file that fails is logged and counted in `errors`; the run
    /// continues with the next file. `on_progress(processed, total)` is
    /// called inline after every file.
    ///
    /// The undo history is cleared when the run starts.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::DirectoryNotFound` if `directory` is not an
    /// existing directory, or `OrganizeError::ReadDir` if it cannot be listed.
    pub fn organize_with_progress<F>(
        &mut self,
        directory: &Path,
        create_dirs: bool,
        mut on_progress: F,
    ) -> OrganizeResult<OrganizationStats>
    where
        F: FnMut(usize, usize),
    {
        let files = match scan_files(directory) {
            Ok(files) => files,
            Err(e) => {
                error!("{}", e);
                return Err(e);
            }
        };
        self.history.clear();

        let total_files = files.len();
        let mut stats = OrganizationStats::default();
        info!(
            directory = %directory.display(),
            files = total_files,
            create_dirs,
            "Organizing directory"
        );

        for (index, path) in files.iter().enumerate() {
            stats.total += 1;
            match self.organize_file(directory, path, create_dirs) {
                Ok(FileOutcome::Moved(operation)) => {
                    info!(
                        file = %file_name(path),
                        category = %operation.category,
                        destination = %operation.destination.display(),
                        "Moved file"
                    );
                    self.history.record(operation);
                    stats.organized += 1;
                }
                Ok(FileOutcome::Planned) => stats.organized += 1,
                Ok(FileOutcome::Unmatched) => {
                    info!(file = %file_name(path), "Skipped file: no matching category");
                    stats.skipped += 1;
                }
                Err(e) => {
                    error!(file = %file_name(path), "Error processing file: {}", e);
                    stats.errors += 1;
                }
            }
            on_progress(index + 1, total_files);
        }

        info!(
            total = stats.total,
            organized = stats.organized,
            skipped = stats.skipped,
            errors = stats.errors,
            "Organize run finished"
        );
        Ok(stats)
    }

    fn organize_file(
        &self,
        directory: &Path,
        path: &Path,
        create_dirs: bool,
    ) -> OrganizeResult<FileOutcome> {
        let Some(category) = Classifier::new(self.store.rules()).classify_path(path) else {
            return Ok(FileOutcome::Unmatched);
        };
        debug!(file = %file_name(path), category, "Classified file");
        if !is_plain_category(category) {
            return Err(OrganizeError::UnsafeCategory(category.to_string()));
        }

        if !create_dirs {
            info!(file = %file_name(path), category, "File would be moved");
            return Ok(FileOutcome::Planned);
        }

        let category_dir = directory.join(category);
        ensure_dir(&category_dir)?;

        let destination = unique_destination(&category_dir.join(file_name(path)));
        move_file(path, &destination).map_err(|source| OrganizeError::MoveFailed {
            from: path.to_path_buf(),
            to: destination.clone(),
            source,
        })?;

        Ok(FileOutcome::Moved(FileOperation {
            kind: OperationKind::Move,
            source: path.to_path_buf(),
            destination,
            category: category.to_string(),
        }))
    }

    /// Reverts one operation. See [`UndoManager::undo`].
    pub fn undo(&self, operation: &FileOperation) -> OrganizeResult<()> {
        UndoManager::undo(operation)
    }

    /// Pops and reverts the most recent move. See [`UndoManager::undo_last`].
    pub fn undo_last(&mut self) -> OrganizeResult<FileOperation> {
        self.history.undo_last()
    }
}

/// Lists the regular files directly inside `directory`, sorted by name.
///
/// The undo journal is left out.
fn scan_files(directory: &Path) -> OrganizeResult<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(OrganizeError::DirectoryNotFound(directory.to_path_buf()));
    }

    let entries = fs::read_dir(directory).map_err(|source| OrganizeError::ReadDir {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.file_name().is_some_and(|name| name != HISTORY_FILE_NAME))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!(directory = %directory.display(), files = files.len(), "Scanned directory");
    Ok(files)
}

fn ensure_dir(path: &Path) -> OrganizeResult<()> {
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(source) => Err(OrganizeError::DirectoryCreation {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
