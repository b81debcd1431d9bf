//! Destination naming and file moves.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Returns a path that does not exist yet, derived from `target`.
///
/// If `target` is free it is returned unchanged. Otherwise `_1`, `_2`, ...
/// is appended to the file stem until an unused name is found in the same
/// directory, so `report.pdf` becomes `report_1.pdf`.
///
/// The check and the later move are not atomic; a concurrent writer could
/// claim the name in between.
///
/// # Examples
///
/// ```no_run
/// use foldersort::path_resolver::unique_destination;
/// use std::path::Path;
///
/// let dest = unique_destination(Path::new("/data/documents/report.pdf"));
/// assert!(!dest.exists());
/// ```
pub fn unique_destination(target: &Path) -> PathBuf {
    if !target.exists() {
        return target.to_path_buf();
    }

    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = target.extension().map(|e| e.to_string_lossy().into_owned());
    let parent = target.parent().unwrap_or_else(|| Path::new(""));

    (1u64..)
        .map(|counter| {
            let name = match &extension {
                Some(ext) => format!("{}_{}.{}", stem, counter, ext),
                None => format!("{}_{}", stem, counter),
            };
            parent.join(name)
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| target.to_path_buf())
}

/// Moves `source` to `destination`.
///
/// Tries a rename first. When that fails (for example across filesystems)
/// the file is copied, the copy's size is checked against the source, and
/// only then is the source removed.
pub fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(rename_error) => {
            let source_size = match fs::metadata(source) {
                Ok(meta) => meta.len(),
                Err(_) => return Err(rename_error),
            };
            fs::copy(source, destination)?;

            let dest_size = fs::metadata(destination)?.len();
            if dest_size != source_size {
                let _ = fs::remove_file(destination);
                return Err(io::Error::other(format!(
                    "copy verification failed: source {} bytes, destination {} bytes",
                    source_size, dest_size
                )));
            }

            fs::remove_file(source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_free_path_is_returned_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("report.pdf");

        assert_eq!(unique_destination(&target), target);
    }

    #[test]
    fn test_counts_past_existing_collisions() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        for name in ["report.pdf", "report_1.pdf", "report_2.pdf"] {
            fs::write(dir.join(name), "x").unwrap();
        }

        let dest = unique_destination(&dir.join("report.pdf"));
        assert_eq!(dest, dir.join("report_3.pdf"));
        assert!(!dest.exists());
    }

    #[test]
    fn test_gap_in_sequence_is_reused() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("a.txt"), "x").unwrap();
        fs::write(dir.join("a_2.txt"), "x").unwrap();

        assert_eq!(unique_destination(&dir.join("a.txt")), dir.join("a_1.txt"));
    }

    #[test]
    fn test_name_without_extension() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("LICENSE"), "x").unwrap();

        assert_eq!(unique_destination(&dir.join("LICENSE")), dir.join("LICENSE_1"));
    }

    #[test]
    fn test_only_last_extension_is_kept_apart() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("backup.tar.gz"), "x").unwrap();

        assert_eq!(
            unique_destination(&dir.join("backup.tar.gz")),
            dir.join("backup.tar_1.gz")
        );
    }

    #[test]
    fn test_move_file_relocates_content() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("in.txt");
        let destination = temp_dir.path().join("out.txt");
        fs::write(&source, "payload").unwrap();

        move_file(&source, &destination).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&destination).unwrap(), "payload");
    }

    #[test]
    fn test_move_file_missing_source_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = move_file(
            &temp_dir.path().join("missing.txt"),
            &temp_dir.path().join("out.txt"),
        );
        assert!(result.is_err());
    }
}
