//! foldersort - sort a directory's files into category folders
//!
//! This library classifies files by extension against an editable rule set,
//! previews or performs the moves into per-category subdirectories, and
//! undoes the moves of the latest run.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod logging;
pub mod output;
pub mod path_resolver;
pub mod rules;
pub mod undo;

pub use config::{AppConfig, ConfigError};
pub use file_category::{Classifier, extension_of};
pub use file_organizer::{
    FileOperation, FileOrganizer, OperationKind, OrganizationStats, OrganizeError,
    OrganizeResult, PreviewResult,
};
pub use path_resolver::unique_destination;
pub use rules::{Rule, RuleError, RuleSet, RuleStore, is_plain_category};
pub use undo::{HistoryJournal, UndoManager};

pub use cli::{Cli, Command, RulesCommand, resolve_directory, run_cli};
