//! Project-wide constants used across multiple modules.
//!
//! This module centralizes constant definitions to avoid duplication and ensure
//! consistency across the codebase.

/// Spinner animation characters for progress indicators
pub const SPINNER_CHARS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Link targets ending in one of these (case-insensitive) become players
pub const AUDIO_EXTENSIONS: &[&str] = &[
    ".m4a", ".mp3", ".wav", ".aac", ".wma", ".flac", ".opus", ".ogg",
];

/// Directories to skip when scanning a documentation tree
pub const SKIP_DIRECTORIES: &[&str] = &["node_modules", ".git", "_sidebar"];

/// Page file extensions picked up by directory scans
pub const PAGE_EXTENSIONS: &[&str] = &["html", "htm"];

/// Fallback waveform colour when `--wave-color` is unset or empty
pub const DEFAULT_WAVE_COLOR: &str = "#ababab";

/// Fallback progress colour when `--progress-color` is unset or empty
pub const DEFAULT_PROGRESS_COLOR: &str = "#dadada";

/// Period of the per-player time readout refresh
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 100;

/// Rate multiplier applied while fast-forward is engaged
pub const DEFAULT_FAST_FORWARD_FACTOR: f64 = 10.0;

/// Speed slider position that maps to a rate of exactly 1.0
pub const SPEED_SLIDER_DEFAULT: u8 = 50;

/// Upper bound of the speed slider
pub const SPEED_SLIDER_MAX: u8 = 100;

/// CSS class of the generated player container
pub const PLAYER_CLASS: &str = "docwave-player";
