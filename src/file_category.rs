/// File classification by extension.
///
/// A [`Classifier`] looks a file name up in a [`RuleSet`] and reports the
/// first category that lists the file's extension.
///
/// # Examples
///
/// ```
/// use foldersort::file_category::Classifier;
/// use foldersort::rules::RuleSet;
///
/// let rules = RuleSet::defaults();
/// let classifier = Classifier::new(&rules);
/// assert_eq!(classifier.classify("report.PDF"), Some("文档"));
/// assert_eq!(classifier.classify("data.xyz"), None);
/// assert_eq!(classifier.classify("Makefile"), None);
/// ```
use crate::rules::RuleSet;
use std::path::Path;

/// Returns the lower-cased extension of `file_name`, including the leading dot.
///
/// Names without an extension, dotfiles such as `.bashrc` and names ending
/// in a bare dot yield `None`.
///
/// # Examples
///
/// ```
/// use foldersort::file_category::extension_of;
///
/// assert_eq!(extension_of("photo.JPG"), Some(".jpg".to_string()));
/// assert_eq!(extension_of("backup.tar.gz"), Some(".gz".to_string()));
/// assert_eq!(extension_of(".bashrc"), None);
/// ```
pub fn extension_of(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_string_lossy();
    if ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_lowercase()))
}

/// Maps file names to categories using a borrowed rule set.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    rules: &'a RuleSet,
}

impl<'a> Classifier<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self { rules }
    }

    /// Returns the category for `file_name`, or `None` when no rule matches.
    pub fn classify(&self, file_name: &str) -> Option<&'a str> {
        let extension = extension_of(file_name)?;
        self.rules
            .iter()
            .find(|rule| rule.matches(&extension))
            .map(|rule| rule.category.as_str())
    }

    /// Classifies the final component of `path`.
    pub fn classify_path(&self, path: &Path) -> Option<&'a str> {
        let name = path.file_name()?.to_string_lossy();
        self.classify(&name)
    }
}
