//! Input checks shared by the CLI commands.

use owo_colors::OwoColorize;
use std::error::Error;
use std::path::Path;

use super::parallel_scan::is_page;

/// Validate that a path exists.
///
/// # Arguments
///
/// * `path` - The path to validate
///
/// # Returns
///
/// * `Ok(())` if the path exists
/// * `Err` with a coloured message naming the missing path
///
/// # Example
///
/// ```ignore
/// use docwave::utils::validation::validate_path_exists;
/// use std::path::Path;
///
/// validate_path_exists(Path::new("~/Music/take1.wav"))?;
/// ```
pub fn validate_path_exists(path: &Path) -> Result<(), Box<dyn Error>> {
    if !path.exists() {
        return Err(format!(
            "{} Path does not exist: {}",
            "Error:".red().bold(),
            path.display()
        )
        .into());
    }
    Ok(())
}

/// Validate the target of `docwave scan`.
///
/// # Arguments
///
/// * `path` - A directory of pages or a single `.html`/`.htm` file
///
/// # Returns
///
/// * `Ok(())` for an existing directory or page
/// * `Err` if the path is missing or is a file that is not a page
///
/// # Example
///
/// ```ignore
/// use docwave::utils::validation::validate_scan_target;
/// use std::path::Path;
///
/// validate_scan_target(Path::new("site/_book"))?;
/// ```
pub fn validate_scan_target(path: &Path) -> Result<(), Box<dyn Error>> {
    validate_path_exists(path)?;
    if path.is_file() && !is_page(path) {
        return Err(format!(
            "{} Not an HTML page: {}",
            "Error:".red().bold(),
            path.display()
        )
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_validate_path_exists_invalid() {
        let path = Path::new("/this/path/does/not/exist/hopefully/12345");
        let result = validate_path_exists(path);
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_validate_scan_target() {
        let temp_dir = TempDir::new().unwrap();
        let page = temp_dir.path().join("index.html");
        let notes = temp_dir.path().join("notes.txt");
        fs::write(&page, "<p></p>").unwrap();
        fs::write(&notes, "notes").unwrap();

        assert!(validate_scan_target(temp_dir.path()).is_ok());
        assert!(validate_scan_target(&page).is_ok());
        assert!(
            validate_scan_target(&notes)
                .unwrap_err()
                .to_string()
                .contains("Not an HTML page")
        );
    }
}
