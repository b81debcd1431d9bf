//! Extension rules and their persistence.
//!
//! A [`RuleSet`] maps category names to the file extensions that belong to
//! them. The set is ordered: classification walks it front to back and the
//! first category listing an extension wins, so two categories may share an
//! extension.
//!
//! Rules are stored as a JSON object keyed by category name:
//!
//! ```json
//! {
//!     "文档": [".doc", ".pdf", ".txt"],
//!     "图片": [".jpg", ".png"]
//! }
//! ```
//!
//! [`RuleStore`] owns a rule set together with the path it is persisted to.
//! Every mutation is written back immediately; a failed write is logged and
//! does not undo the in-memory change.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors raised while reading or writing a rules file.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The rules file exists but could not be read or written.
    #[error("Failed to access rules file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The rules file is not a JSON object of string lists.
    #[error("Invalid rules file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One category and the extensions filed under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub category: String,
    pub extensions: Vec<String>,
}

impl Rule {
    /// Returns true if `extension` (with its leading dot) belongs to this rule.
    ///
    /// Comparison ignores case on both sides.
    pub fn matches(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|ext| ext.to_lowercase() == extension.to_lowercase())
    }
}

/// Ordered mapping from category name to extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in rules used when no rules file exists yet.
    pub fn defaults() -> Self {
        let mut set = Self::new();
        set.insert("文档", strings(&[".doc", ".docx", ".pdf", ".txt", ".md"]));
        set.insert("图片", strings(&[".jpg", ".jpeg", ".png", ".gif", ".bmp"]));
        set.insert("音频", strings(&[".mp3", ".wav", ".flac", ".m4a"]));
        set.insert("视频", strings(&[".mp4", ".avi", ".mkv", ".mov"]));
        set.insert("压缩文件", strings(&[".zip", ".rar", ".7z", ".tar", ".gz"]));
        set.insert("程序", strings(&[".exe", ".msi", ".app"]));
        set.insert("代码", strings(&[".py", ".java", ".cpp", ".js", ".html", ".css"]));
        set
    }

    /// Inserts a category or overwrites the extensions of an existing one.
    ///
    /// An existing category keeps its position; a new one is appended.
    pub fn insert(&mut self, category: impl Into<String>, extensions: Vec<String>) {
        let category = category.into();
        match self.rules.iter_mut().find(|rule| rule.category == category) {
            Some(rule) => rule.extensions = extensions,
            None => self.rules.push(Rule {
                category,
                extensions,
            }),
        }
    }

    /// Removes a category, returning its rule if it was present.
    pub fn remove(&mut self, category: &str) -> Option<Rule> {
        let index = self.rules.iter().position(|rule| rule.category == category)?;
        Some(self.rules.remove(index))
    }

    pub fn get(&self, category: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.category == category)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.get(category).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Parses a rule set from the JSON rules format.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Renders the rule set in the JSON rules format.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl Serialize for RuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rules.len()))?;
        for rule in &self.rules {
            map.serialize_entry(&rule.category, &rule.extensions)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RuleSetVisitor)
    }
}

/// Reads map entries in document order so the rule order survives a round trip.
struct RuleSetVisitor;

impl<'de> Visitor<'de> for RuleSetVisitor {
    type Value = RuleSet;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of category names to extension lists")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RuleSet, A::Error> {
        let mut set = RuleSet::new();
        while let Some((category, extensions)) = access.next_entry::<String, Vec<String>>()? {
            set.insert(category, extensions);
        }
        Ok(set)
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// A rule set bound to the file it is persisted in.
#[derive(Debug)]
pub struct RuleStore {
    path: PathBuf,
    rules: RuleSet,
}

impl RuleStore {
    /// Opens the rules stored at `path`.
    ///
    /// A missing file is not an error: the built-in defaults are used and
    /// the file is left uncreated until the first mutation.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::Io` if the file exists but cannot be read, and
    /// `RuleError::Parse` if it is not valid rules JSON.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RuleError> {
        let path = path.into();
        let rules = Self::load(&path)?;
        Ok(Self { path, rules })
    }

    /// Creates a store with the given rules without touching the disk.
    pub fn with_rules(path: impl Into<PathBuf>, rules: RuleSet) -> Self {
        Self {
            path: path.into(),
            rules,
        }
    }

    /// Reads a rules file, falling back to the defaults when it is absent.
    pub fn load(path: &Path) -> Result<RuleSet, RuleError> {
        if !path.exists() {
            info!(path = %path.display(), "Rules file not found, using default rules");
            return Ok(RuleSet::defaults());
        }
        Self::read_file(path)
    }

    fn read_file(path: &Path) -> Result<RuleSet, RuleError> {
        let content = fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        RuleSet::from_json(&content).map_err(|source| RuleError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_file(rules: &RuleSet, path: &Path) -> Result<(), RuleError> {
        let json = rules.to_json().map_err(|source| RuleError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| RuleError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, json).map_err(|source| RuleError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Writes the current rules to the backing file.
    pub fn save(&self) -> Result<(), RuleError> {
        Self::write_file(&self.rules, &self.path)?;
        info!(path = %self.path.display(), "Rules saved");
        Ok(())
    }

    /// Saves, logging instead of returning a failure.
    fn persist(&self) {
        if let Err(e) = self.save() {
            error!("Failed to save rules: {}", e);
        }
    }

    /// Adds a category or replaces its extensions, then saves.
    pub fn add(&mut self, category: &str, extensions: Vec<String>) {
        if !is_plain_category(category) {
            warn!(
                category,
                "Category is not a plain folder name; files will not be moved into it"
            );
        }
        for ext in extensions.iter().filter(|ext| !ext.starts_with('.')) {
            warn!(category, extension = %ext, "Extension has no leading '.' and will never match");
        }
        info!(category, extensions = ?extensions, "Rule added");
        self.rules.insert(category, extensions);
        self.persist();
    }

    /// Removes a category, then saves. Unknown categories only log a warning.
    pub fn remove(&mut self, category: &str) {
        if self.rules.remove(category).is_some() {
            info!(category, "Rule removed");
            self.persist();
        } else {
            warn!(category, "Rule does not exist");
        }
    }

    /// Replaces `old` with `new`, dropping the old name if it changed.
    pub fn rename(&mut self, old: &str, new: &str, extensions: Vec<String>) {
        if old != new {
            self.remove(old);
        }
        self.add(new, extensions);
    }

    /// Returns the rules whose category or extension list contains `query`.
    ///
    /// Matching is a case-insensitive substring test; an empty query
    /// returns every rule.
    pub fn search(&self, query: &str) -> Vec<&Rule> {
        let query = query.to_lowercase();
        self.rules
            .iter()
            .filter(|rule| {
                rule.category.to_lowercase().contains(&query)
                    || rule.extensions.join(", ").to_lowercase().contains(&query)
            })
            .collect()
    }

    /// Replaces every rule with the contents of another rules file, then saves.
    ///
    /// Nothing beyond successful parsing is checked.
    pub fn import(&mut self, path: &Path) -> Result<(), RuleError> {
        let rules = Self::read_file(path)?;
        for rule in rules.iter().filter(|rule| !is_plain_category(&rule.category)) {
            warn!(
                category = %rule.category,
                "Category is not a plain folder name; files will not be moved into it"
            );
        }
        info!(path = %path.display(), categories = rules.len(), "Rules imported");
        self.rules = rules;
        self.persist();
        Ok(())
    }

    /// Writes the current rules to `path` in the rules file format.
    pub fn export(&self, path: &Path) -> Result<(), RuleError> {
        Self::write_file(&self.rules, path)?;
        info!(path = %path.display(), "Rules exported");
        Ok(())
    }
}

/// Whether `category` can be used as a single folder name directly inside
/// the organized directory.
///
/// Names with path separators, `.`, `..` or a root would place files
/// elsewhere.
pub fn is_plain_category(category: &str) -> bool {
    if category.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(category).components();
    matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_order_and_content() {
        let rules = RuleSet::defaults();
        let names: Vec<_> = rules.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(
            names,
            vec!["文档", "图片", "音频", "视频", "压缩文件", "程序", "代码"]
        );
        assert!(rules.get("文档").unwrap().matches(".pdf"));
        assert!(rules.get("图片").unwrap().matches(".JPG"));
    }

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut rules = RuleSet::new();
        rules.insert("a", strings(&[".a"]));
        rules.insert("b", strings(&[".b"]));
        rules.insert("a", strings(&[".x"]));

        let names: Vec<_> = rules.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(rules.get("a").unwrap().extensions, strings(&[".x"]));
    }

    #[test]
    fn test_json_preserves_document_order() {
        let json = r#"{"zeta": [".z"], "alpha": [".a"], "mid": [".m"]}"#;
        let rules = RuleSet::from_json(json).unwrap();
        let names: Vec<_> = rules.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);

        let reparsed = RuleSet::from_json(&rules.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, rules);
    }

    #[test]
    fn test_json_keeps_non_ascii_verbatim() {
        let json = RuleSet::defaults().to_json().unwrap();
        assert!(json.contains("\"文档\""));
    }

    #[test]
    fn test_open_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.json");

        let store = RuleStore::open(&path).unwrap();
        assert_eq!(store.rules(), &RuleSet::defaults());
        assert!(!path.exists());
    }

    #[test]
    fn test_open_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.json");
        fs::write(&path, "{ not json").unwrap();

        let result = RuleStore::open(&path);
        assert!(matches!(result, Err(RuleError::Parse { .. })));
    }

    #[test]
    fn test_add_persists_immediately() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config").join("rules.json");

        let mut store = RuleStore::open(&path).unwrap();
        store.add("电子书", strings(&[".epub", ".mobi"]));

        let reloaded = RuleStore::open(&path).unwrap();
        assert_eq!(
            reloaded.rules().get("电子书").unwrap().extensions,
            strings(&[".epub", ".mobi"])
        );
        assert_eq!(reloaded.rules().len(), 8);
    }

    #[test]
    fn test_remove_missing_category_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.json");

        let mut store = RuleStore::open(&path).unwrap();
        store.remove("does-not-exist");
        assert_eq!(store.rules().len(), 7);
        assert!(!path.exists());

        store.remove("程序");
        assert!(!store.rules().contains("程序"));
        assert!(!RuleStore::open(&path).unwrap().rules().contains("程序"));
    }

    #[test]
    fn test_save_failure_keeps_in_memory_change() {
        let temp_dir = TempDir::new().unwrap();
        // A directory cannot be written as a file.
        let path = temp_dir.path().to_path_buf();

        let mut store = RuleStore::with_rules(&path, RuleSet::new());
        store.add("docs", strings(&[".pdf"]));

        assert!(store.rules().contains("docs"));
        assert!(store.save().is_err());
    }

    #[test]
    fn test_rename_moves_extensions_to_new_name() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = RuleStore::open(temp_dir.path().join("rules.json")).unwrap();

        store.rename("代码", "source", strings(&[".rs"]));
        assert!(!store.rules().contains("代码"));
        assert_eq!(store.rules().get("source").unwrap().extensions, strings(&[".rs"]));
    }

    #[test]
    fn test_search_matches_category_and_extensions() {
        let store = RuleStore::with_rules("unused.json", RuleSet::defaults());

        let hits: Vec<_> = store.search("MP").iter().map(|r| r.category.clone()).collect();
        assert_eq!(hits, vec!["图片", "音频", "视频"]);
        assert_eq!(store.search("图").len(), 1);
        assert_eq!(store.search("").len(), 7);
    }

    #[test]
    fn test_import_replaces_everything() {
        let temp_dir = TempDir::new().unwrap();
        let import_path = temp_dir.path().join("import.json");
        fs::write(&import_path, r#"{"only": ["pdf", ".X"]}"#).unwrap();

        let mut store = RuleStore::open(temp_dir.path().join("rules.json")).unwrap();
        store.import(&import_path).unwrap();

        assert_eq!(store.rules().len(), 1);
        assert_eq!(
            store.rules().get("only").unwrap().extensions,
            strings(&["pdf", ".X"])
        );
    }

    #[test]
    fn test_import_invalid_file_leaves_rules_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let import_path = temp_dir.path().join("import.json");
        fs::write(&import_path, r#"["not", "a", "map"]"#).unwrap();

        let mut store = RuleStore::open(temp_dir.path().join("rules.json")).unwrap();
        assert!(store.import(&import_path).is_err());
        assert_eq!(store.rules(), &RuleSet::defaults());
    }

    #[test]
    fn test_export_round_trips_through_import() {
        let temp_dir = TempDir::new().unwrap();
        let export_path = temp_dir.path().join("export.json");

        let store = RuleStore::with_rules(temp_dir.path().join("a.json"), RuleSet::defaults());
        store.export(&export_path).unwrap();

        let mut other = RuleStore::with_rules(temp_dir.path().join("b.json"), RuleSet::new());
        other.import(&export_path).unwrap();
        assert_eq!(other.rules(), store.rules());
    }

    #[test]
    fn test_plain_category_names() {
        assert!(is_plain_category("文档"));
        assert!(is_plain_category("My Files"));
        assert!(is_plain_category(".hidden"));

        assert!(!is_plain_category(""));
        assert!(!is_plain_category("."));
        assert!(!is_plain_category(".."));
        assert!(!is_plain_category("../outside"));
        assert!(!is_plain_category("/abs"));
        assert!(!is_plain_category("a/b"));
        assert!(!is_plain_category("a\\b"));
    }

    #[test]
    fn test_add_keeps_unsafe_category() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = RuleStore::with_rules(temp_dir.path().join("rules.json"), RuleSet::new());

        // Only a warning at edit time; the organizer refuses to use it.
        store.add("../outside", strings(&[".pdf"]));
        assert!(store.rules().contains("../outside"));
    }
}
