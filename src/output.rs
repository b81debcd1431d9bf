//! Output formatting and styling module.
//!
//! Every line the CLI prints goes through [`OutputFormatter`], so colors and
//! layout stay consistent between commands.

use crate::file_organizer::{FileOperation, OrganizationStats, PreviewResult};
use crate::rules::Rule;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar for an organize run of `total` files.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use foldersort::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.set_position(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints what `preview` found, one block per category.
    pub fn preview(preview: &PreviewResult) {
        if preview.is_empty() {
            Self::plain("No files match any category.");
            return;
        }
        for (category, files) in preview.iter() {
            let file_word = if files.len() == 1 { "file" } else { "files" };
            println!(
                "\n{} ({} {})",
                category.bold(),
                files.len().to_string().green(),
                file_word
            );
            for file in files {
                println!("  - {}", file);
            }
        }
        println!(
            "\n{} {} would be organized.",
            preview.file_count().to_string().green().bold(),
            if preview.file_count() == 1 { "file" } else { "files" }
        );
    }

    /// Prints the counters of an organize run as a table.
    pub fn stats_table(stats: &OrganizationStats) {
        Self::header("SUMMARY");

        let rows = [
            ("Total", stats.total.to_string().bold()),
            ("Organized", stats.organized.to_string().green()),
            ("Skipped", stats.skipped.to_string().yellow()),
            ("Errors", stats.errors.to_string().red()),
        ];
        println!("{}", "-".repeat(20));
        for (label, value) in rows {
            println!("{:<10} | {}", label, value);
        }
        println!("{}", "-".repeat(20));
    }

    /// Prints rules as a two-column table.
    pub fn rules_table(rules: &[&Rule]) {
        if rules.is_empty() {
            Self::plain("No rules.");
            return;
        }

        // Categories are often CJK; pad by char count to keep columns close.
        let width = rules
            .iter()
            .map(|rule| rule.category.chars().count())
            .max()
            .unwrap_or(0)
            .max(8);

        println!(
            "{}{} | {}",
            "Category".bold(),
            " ".repeat(width - 8),
            "Extensions".bold()
        );
        println!("{}", "-".repeat(width + 20));
        for rule in rules {
            let padding = width - rule.category.chars().count();
            println!(
                "{}{} | {}",
                rule.category,
                " ".repeat(padding),
                rule.extensions.join(", ").cyan()
            );
        }
    }

    /// Prints one undone move.
    pub fn undone(operation: &FileOperation) {
        Self::success(&format!(
            "Restored {} (from {})",
            operation.source.display(),
            operation.destination.display()
        ));
    }
}
