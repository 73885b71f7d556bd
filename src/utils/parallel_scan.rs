//! Parallel discovery of rendered pages in a documentation tree.
//!
//! Subdirectories are walked with rayon when there is more than one of them.
//! The order of the returned paths is not deterministic; callers that print
//! or report pages sort them first.

use log::warn;
use rayon::prelude::*;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{PAGE_EXTENSIONS, SKIP_DIRECTORIES};

/// Check if a file or directory is hidden (starts with '.')
pub fn is_hidden_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

pub fn should_skip_directory(name: &str) -> bool {
    SKIP_DIRECTORIES.contains(&name)
}

pub fn is_page(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| PAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Collect every page file below `dir`.
///
/// Unreadable subdirectories are logged and skipped; only a failure to read
/// `dir` itself is an error.
pub fn collect_pages(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut pages = Vec::new();
    scan_directory(dir, &mut pages)?;
    Ok(pages)
}

fn scan_directory(dir: &Path, pages: &mut Vec<PathBuf>) -> Result<(), Box<dyn Error>> {
    let entries: Vec<_> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;

    let mut directories = Vec::new();
    for entry in entries {
        let path = entry.path();
        if is_hidden_file(&path) {
            continue;
        }

        if path.is_dir() {
            let Some(name) = path.file_name() else {
                continue;
            };
            if !should_skip_directory(&name.to_string_lossy()) {
                directories.push(path);
            }
        } else if path.is_file() && is_page(&path) {
            pages.push(path);
        }
    }

    if directories.len() > 1 {
        let nested: Vec<Vec<PathBuf>> = directories
            .par_iter()
            .filter_map(|subdir| match collect_pages(subdir) {
                Ok(found) => Some(found),
                Err(e) => {
                    warn!("Failed to scan directory '{}': {e}", subdir.display());
                    None
                }
            })
            .collect();

        for found in nested {
            pages.extend(found);
        }
    } else {
        for subdir in directories {
            if let Err(e) = scan_directory(&subdir, pages) {
                warn!("Failed to scan directory '{}': {e}", subdir.display());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_page() {
        assert!(is_page(Path::new("docs/index.html")));
        assert!(is_page(Path::new("docs/README.HTM")));
        assert!(!is_page(Path::new("docs/README.md")));
        assert!(!is_page(Path::new("docs/html")));
    }

    #[test]
    fn test_collect_pages_nested() {
        let temp_dir = TempDir::new().unwrap();
        let guide = temp_dir.path().join("guide");
        let api = temp_dir.path().join("api");
        fs::create_dir(&guide).unwrap();
        fs::create_dir(&api).unwrap();

        fs::write(temp_dir.path().join("index.html"), "<p></p>").unwrap();
        fs::write(guide.join("audio.html"), "<p></p>").unwrap();
        fs::write(api.join("ref.htm"), "<p></p>").unwrap();
        fs::write(api.join("notes.md"), "# notes").unwrap();

        let pages = collect_pages(temp_dir.path()).unwrap();
        assert_eq!(pages.len(), 3);
    }

    #[test]
    fn test_collect_pages_skips_hidden_and_vendor_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let modules = temp_dir.path().join("node_modules");
        fs::create_dir(&modules).unwrap();
        fs::write(modules.join("vendor.html"), "").unwrap();
        fs::write(temp_dir.path().join(".draft.html"), "").unwrap();
        fs::write(temp_dir.path().join("page.html"), "").unwrap();

        let pages = collect_pages(temp_dir.path()).unwrap();
        assert_eq!(pages, vec![temp_dir.path().join("page.html")]);
    }

    #[test]
    fn test_collect_pages_missing_dir() {
        assert!(collect_pages(Path::new("/this/path/does/not/exist/12345")).is_err());
    }
}
