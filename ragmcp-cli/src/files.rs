//! Collecting local text files for ingestion

use anyhow::{bail, Result};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file read for ingestion
#[derive(Debug, Clone)]
pub struct TextFile {
    pub path: PathBuf,
    pub content: String,
}

impl TextFile {
    /// Metadata sent alongside the file's text
    pub fn metadata(&self, added_at: &str) -> Value {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        json!({
            "source": self.path.display().to_string(),
            "file_name": file_name,
            "added_at": added_at,
        })
    }
}

/// Whether the guessed MIME type of a path is `text/*`
pub fn is_text_path(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .is_some_and(|mime| mime.type_() == mime_guess::mime::TEXT)
}

/// Expand files and directories into readable UTF-8 text files.
///
/// Files named explicitly are always read; files found by walking a
/// directory are kept only when they look like text. Unreadable or non-UTF-8
/// files are skipped with a warning.
pub fn collect_text_files(paths: &[PathBuf]) -> Result<Vec<TextFile>> {
    let mut candidates = Vec::new();

    for path in paths {
        if path.is_dir() {
            candidates.extend(
                WalkDir::new(path)
                    .follow_links(true)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .filter(|e| is_text_path(e.path()))
                    .map(|e| e.into_path()),
            );
        } else if path.is_file() {
            candidates.push(path.clone());
        } else {
            bail!("Path not found: {}", path.display());
        }
    }

    let mut files = Vec::new();
    for path in candidates {
        match std::fs::read_to_string(&path) {
            Ok(content) if !content.trim().is_empty() => files.push(TextFile { path, content }),
            Ok(_) => tracing::warn!("Skipping empty file {}", path.display()),
            Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_is_text_path() {
        assert!(is_text_path(Path::new("notes.txt")));
        assert!(is_text_path(Path::new("README.md")));
        assert!(!is_text_path(Path::new("photo.png")));
        assert!(!is_text_path(Path::new("archive.zip")));
    }

    #[test]
    fn test_collect_walks_directories() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("b.md"), "# beta").unwrap();
        fs::write(dir.path().join("image.png"), [0x89u8, 0x50, 0x4e, 0x47]).unwrap();
        fs::write(dir.path().join("empty.txt"), "  \n").unwrap();

        let files = collect_text_files(&[dir.path().to_path_buf()]).unwrap();
        let contents: Vec<&str> = files.iter().map(|f| f.content.as_str()).collect();
        assert_eq!(contents, vec!["alpha", "# beta"]);
    }

    #[test]
    fn test_explicit_file_is_always_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.custom");
        fs::write(&path, "explicit").unwrap();

        let files = collect_text_files(&[path]).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content, "explicit");
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let err = collect_text_files(&[PathBuf::from("/definitely/not/here.txt")]).unwrap_err();
        assert!(err.to_string().contains("Path not found"));
    }

    #[test]
    fn test_metadata() {
        let file = TextFile {
            path: PathBuf::from("docs/guide.md"),
            content: "text".to_string(),
        };
        let metadata = file.metadata("2025-01-01T00:00:00+00:00");
        assert_eq!(metadata["file_name"], "guide.md");
        assert_eq!(metadata["source"], "docs/guide.md");
        assert_eq!(metadata["added_at"], "2025-01-01T00:00:00+00:00");
    }
}
