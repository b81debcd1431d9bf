//! Command-line interface module for foldersort.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Preview and organize runs with progress output
//! - Undo across invocations through the history journal
//! - Rule editing, import and export

use crate::config::AppConfig;
use crate::file_organizer::{FileOrganizer, OrganizeError};
use crate::output::OutputFormatter;
use crate::rules::RuleStore;
use crate::undo::HistoryJournal;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Sort the files of a directory into category folders by extension.
#[derive(Parser, Debug)]
#[command(name = "foldersort")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Rules file to use instead of the configured one
    #[arg(short, long, global = true)]
    pub rules: Option<PathBuf>,

    /// Log at debug level and echo it to the terminal
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Represents a CLI command to execute.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show which files would be moved where
    Preview {
        /// Directory to inspect
        directory: PathBuf,
    },
    /// Move files into category folders
    Organize {
        /// Directory to organize
        directory: PathBuf,
        /// Count what would be organized without moving anything
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
    /// Undo moves of the last organize run
    Undo {
        /// Directory that was organized
        directory: PathBuf,
        /// Undo every remaining move instead of only the latest
        #[arg(short, long)]
        all: bool,
    },
    /// Inspect or edit the extension rules
    #[command(subcommand)]
    Rules(RulesCommand),
}

#[derive(Subcommand, Debug, Clone)]
pub enum RulesCommand {
    /// List rules, optionally filtered by category or extension
    List {
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Add a category or replace its extensions
    Add {
        category: String,
        /// Extensions such as `.pdf`; comma-separated lists are accepted
        #[arg(required = true, num_args = 1..)]
        extensions: Vec<String>,
    },
    /// Remove a category
    Remove { category: String },
    /// Change the extensions of a category, optionally renaming it
    Edit {
        category: String,
        /// New name for the category
        #[arg(long)]
        rename: Option<String>,
        #[arg(required = true, num_args = 1..)]
        extensions: Vec<String>,
    },
    /// Replace all rules with those in a JSON file
    Import { file: PathBuf },
    /// Write the current rules to a JSON file
    Export { file: PathBuf },
}

/// Runs one command against the rules and settings in `config`.
///
/// # Examples
///
/// ```no_run
/// use foldersort::cli::{run_cli, Command};
/// use foldersort::config::AppConfig;
/// use std::path::PathBuf;
///
/// let command = Command::Organize { directory: PathBuf::from("/tmp/downloads"), dry_run: true };
/// if let Err(e) = run_cli(command, &AppConfig::default()) {
///     eprintln!("Error: {:#}", e);
/// }
/// ```
pub fn run_cli(command: Command, config: &AppConfig) -> Result<()> {
    let rules_path = config.rules_path();
    let store = RuleStore::open(&rules_path)
        .with_context(|| format!("Error loading rules from {}", rules_path.display()))?;
    let mut organizer = FileOrganizer::new(store);

    match command {
        Command::Preview { directory } => preview(&organizer, &resolve_directory(&directory)?),
        Command::Organize { directory, dry_run } => organize(
            &mut organizer,
            &resolve_directory(&directory)?,
            dry_run,
            config.persist_history,
        ),
        Command::Undo { directory, all } => {
            undo(&mut organizer, &resolve_directory(&directory)?, all)
        }
        Command::Rules(command) => run_rules(&mut organizer, command),
    }
}

/// Turns `directory` into an absolute, symlink-free path.
///
/// Journal entries are recorded from this path, so they stay valid when a
/// later invocation runs from another working directory.
pub fn resolve_directory(directory: &Path) -> Result<PathBuf, OrganizeError> {
    match fs::canonicalize(directory) {
        Ok(path) if path.is_dir() => Ok(path),
        Ok(_) => Err(OrganizeError::DirectoryNotFound(directory.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(OrganizeError::DirectoryNotFound(directory.to_path_buf()))
        }
        Err(source) => Err(OrganizeError::ReadDir {
            path: directory.to_path_buf(),
            source,
        }),
    }
}

fn preview(organizer: &FileOrganizer, directory: &Path) -> Result<()> {
    OutputFormatter::info(&format!("Preview of: {}", directory.display()));
    let preview = organizer.preview(directory)?;
    OutputFormatter::preview(&preview);
    Ok(())
}

fn organize(
    organizer: &mut FileOrganizer,
    directory: &Path,
    dry_run: bool,
    persist_history: bool,
) -> Result<()> {
    if dry_run {
        OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", directory.display()));
    } else {
        OutputFormatter::info(&format!("Organizing contents of: {}", directory.display()));
    }

    let pb = OutputFormatter::create_progress_bar(0);
    let stats = organizer.organize_with_progress(directory, !dry_run, |done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    })?;
    pb.finish_and_clear();

    OutputFormatter::stats_table(&stats);

    if dry_run {
        OutputFormatter::dry_run_notice("No files were modified.");
        return Ok(());
    }

    if persist_history {
        match HistoryJournal::store(directory, organizer.history()) {
            Ok(()) if !organizer.history().is_empty() => OutputFormatter::plain(&format!(
                "History saved. Use 'foldersort undo {}' to revert changes.",
                directory.display()
            )),
            Ok(()) => {}
            Err(e) => {
                warn!("Could not save history: {}", e);
                OutputFormatter::warning(&format!("Could not save history: {}", e));
            }
        }
    } else if let Err(e) = HistoryJournal::delete(directory) {
        // A journal from an earlier run must not be undone after this one.
        warn!("Could not remove stale history: {}", e);
        OutputFormatter::warning(&format!("Could not remove stale history: {}", e));
    }

    if stats.errors > 0 {
        OutputFormatter::warning("Some files could not be organized. See the log for details.");
    } else {
        OutputFormatter::success("Organization complete!");
    }
    Ok(())
}

fn undo(organizer: &mut FileOrganizer, directory: &Path, all: bool) -> Result<()> {
    let journal = HistoryJournal::load(directory)?.ok_or(OrganizeError::NoHistory)?;
    if journal.operations.is_empty() {
        return Err(OrganizeError::NoHistory.into());
    }
    organizer.restore_history(journal.operations);

    let mut failures = 0usize;
    let mut last_error = None;
    loop {
        match organizer.undo_last() {
            Ok(operation) => OutputFormatter::undone(&operation),
            Err(OrganizeError::NoHistory) => break,
            Err(e) => {
                OutputFormatter::error(&e.to_string());
                failures += 1;
                last_error = Some(e);
            }
        }
        if !all {
            break;
        }
    }

    // Popped entries are gone whether or not their undo worked.
    HistoryJournal::store(directory, organizer.history())?;

    let remaining = organizer.history().len();
    if remaining > 0 {
        OutputFormatter::plain(&format!("{} move(s) left to undo.", remaining));
    }

    match last_error {
        Some(e) if !all => Err(e.into()),
        Some(_) => anyhow::bail!("{} move(s) could not be undone", failures),
        None => Ok(()),
    }
}

fn run_rules(organizer: &mut FileOrganizer, command: RulesCommand) -> Result<()> {
    match command {
        RulesCommand::List { filter } => {
            let rules = organizer
                .rule_store()
                .search(filter.as_deref().unwrap_or(""));
            OutputFormatter::rules_table(&rules);
        }
        RulesCommand::Add {
            category,
            extensions,
        } => {
            organizer.add_rule(&category, split_extensions(&extensions));
            OutputFormatter::success(&format!("Rule '{}' saved.", category));
        }
        RulesCommand::Remove { category } => {
            if !organizer.rules().contains(&category) {
                anyhow::bail!("Rule '{}' does not exist", category);
            }
            organizer.remove_rule(&category);
            OutputFormatter::success(&format!("Rule '{}' removed.", category));
        }
        RulesCommand::Edit {
            category,
            rename,
            extensions,
        } => {
            if !organizer.rules().contains(&category) {
                anyhow::bail!("Rule '{}' does not exist", category);
            }
            let new_name = rename.unwrap_or_else(|| category.clone());
            organizer.rename_rule(&category, &new_name, split_extensions(&extensions));
            OutputFormatter::success(&format!("Rule '{}' saved.", new_name));
        }
        RulesCommand::Import { file } => {
            organizer
                .import_rules(&file)
                .with_context(|| format!("Failed to import rules from {}", file.display()))?;
            OutputFormatter::success(&format!(
                "Imported {} rule(s) from {}.",
                organizer.rules().len(),
                file.display()
            ));
        }
        RulesCommand::Export { file } => {
            organizer
                .export_rules(&file)
                .with_context(|| format!("Failed to export rules to {}", file.display()))?;
            OutputFormatter::success(&format!("Rules exported to {}.", file.display()));
        }
    }
    Ok(())
}

/// Flattens `[".a,.b", " .c "]` into `[".a", ".b", ".c"]`.
fn split_extensions(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .map(str::to_string)
        .collect()
}
