//! Spinner and progress bar styling shared by the CLI commands.
//!
//! `scan` shows the spinner while it walks the tree and the bar while pages
//! are being transformed, so both use the same colours and glyphs.

use crate::constants::SPINNER_CHARS;
use indicatif::{ProgressBar, ProgressStyle};

/// Create the spinner shown while pages are being discovered.
///
/// # Returns
///
/// A `ProgressBar` in spinner mode with cyan styling and the shared
/// spinner glyphs.
///
/// # Example
///
/// ```ignore
/// use docwave::utils::progress::create_progress_spinner;
///
/// let spinner = create_progress_spinner();
/// spinner.set_message("Looking for pages...");
/// // ... walk the tree ...
/// spinner.finish_and_clear();
/// ```
pub fn create_progress_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(SPINNER_CHARS);
    spinner.set_style(style);
    spinner
}

/// Create the bar advanced once per transformed page.
///
/// # Arguments
///
/// * `total` - Number of pages that will be transformed
///
/// # Returns
///
/// A `ProgressBar` with the cyan/blue scheme and a `pos/len` counter.
///
/// # Example
///
/// ```ignore
/// use docwave::utils::progress::create_progress_bar;
///
/// let pb = create_progress_bar(pages.len() as u64);
/// for page in &pages {
///     // ... transform the page ...
///     pb.inc(1);
/// }
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
