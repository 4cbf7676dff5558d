use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::constants::batch::IMAGE_EXTENSIONS;
use crate::types::{Result, ScribeError};

/// Enumerates the scanned-page images of one input directory.
///
/// Non-recursive; hidden files are skipped and extensions compare
/// case-insensitively. Results are sorted by path so `limit` always picks
/// the same files.
pub struct InputScanner {
    root: PathBuf,
    extensions: Vec<String>,
    limit: usize,
}

impl InputScanner {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extensions: IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            limit: 0,
        }
    }

    pub fn with_extensions(mut self, extensions: &[String]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Keep at most `limit` files (0 = unbounded)
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(ScribeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input directory not found: {}", self.root.display()),
            )));
        }

        let walker = WalkBuilder::new(&self.root)
            .max_depth(Some(1))
            .standard_filters(false)
            .hidden(true)
            .follow_links(false)
            .build();

        let mut files: Vec<PathBuf> = walker
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| self.has_image_extension(path))
            .collect();

        files.sort();
        if self.limit > 0 {
            files.truncate(self.limit);
        }

        Ok(files)
    }

    fn has_image_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"img").unwrap();
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.png");
        touch(dir.path(), "a.JPG");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), ".hidden.png");
        fs::create_dir(dir.path().join("nested")).unwrap();
        touch(&dir.path().join("nested"), "c.png");

        let files = InputScanner::new(dir.path()).scan().unwrap();
        assert_eq!(names(&files), vec!["a.JPG", "b.png"]);
    }

    #[test]
    fn test_limit_applies_after_sorting() {
        let dir = TempDir::new().unwrap();
        for name in ["p3.png", "p1.png", "p2.png"] {
            touch(dir.path(), name);
        }

        let files = InputScanner::new(dir.path()).with_limit(2).scan().unwrap();
        assert_eq!(names(&files), vec!["p1.png", "p2.png"]);
    }

    #[test]
    fn test_custom_extensions() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "scan.tif");
        touch(dir.path(), "scan.png");

        let files = InputScanner::new(dir.path())
            .with_extensions(&[".TIF".to_string()])
            .scan()
            .unwrap();
        assert_eq!(names(&files), vec!["scan.tif"]);
    }

    #[test]
    fn test_missing_directory_is_error() {
        let result = InputScanner::new("/nonexistent/docscribe-input").scan();
        assert!(matches!(result, Err(ScribeError::Io(_))));
    }
}
