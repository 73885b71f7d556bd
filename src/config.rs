//! Application configuration management.
//!
//! Holds the fallback player theme, the readout refresh period, the
//! fast-forward factor, the base URL used to resolve relative audio links and
//! the log file of the terminal player. Configuration is stored in the user's
//! config directory (typically ~/.config/docwave/config.toml); a missing file
//! means defaults.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_FAST_FORWARD_FACTOR, DEFAULT_PROGRESS_COLOR, DEFAULT_UPDATE_INTERVAL_MS,
    DEFAULT_WAVE_COLOR,
};
use crate::page::Theme;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_wave_color")]
    pub wave_color: String,
    #[serde(default = "default_progress_color")]
    pub progress_color: String,
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    #[serde(default = "default_fast_forward_factor")]
    pub fast_forward_factor: f64,
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

fn default_wave_color() -> String {
    DEFAULT_WAVE_COLOR.to_string()
}

fn default_progress_color() -> String {
    DEFAULT_PROGRESS_COLOR.to_string()
}

fn default_update_interval_ms() -> u64 {
    DEFAULT_UPDATE_INTERVAL_MS
}

fn default_fast_forward_factor() -> f64 {
    DEFAULT_FAST_FORWARD_FACTOR
}

fn default_log_file() -> String {
    "/tmp/docwave-player.log".to_string()
}

/// `#rgb` or `#rrggbb`
fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            wave_color: default_wave_color(),
            progress_color: default_progress_color(),
            update_interval_ms: default_update_interval_ms(),
            fast_forward_factor: default_fast_forward_factor(),
            base_url: String::new(),
            log_file: default_log_file(),
        }
    }

    pub fn config_dir() -> Result<PathBuf, Box<dyn Error>> {
        // Check for XDG_CONFIG_HOME first (useful for testing)
        let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config).join("docwave")
        } else {
            dirs::config_dir()
                .ok_or("Unable to find config directory")?
                .join("docwave")
        };
        Ok(config_dir)
    }

    pub fn config_path() -> Result<PathBuf, Box<dyn Error>> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn load() -> Result<Self, Box<dyn Error>> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Default::default());
        }

        let contents = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), Box<dyn Error>> {
        let config_dir = Self::config_dir()?;

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        let config_path = Self::config_path()?;
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(&config_path, toml_string)?;

        Ok(())
    }

    pub fn exists() -> Result<bool, Box<dyn Error>> {
        Ok(Self::config_path()?.exists())
    }

    /// Colours used when a page declares none of its own
    pub fn theme(&self) -> Theme {
        Theme {
            wave_color: self.wave_color.clone(),
            progress_color: self.progress_color.clone(),
        }
    }

    /// Base URL for relative links, `None` when unset
    pub fn base_url(&self) -> Option<&str> {
        (!self.base_url.is_empty()).then_some(self.base_url.as_str())
    }

    /// Log file path with `~` and environment variables expanded
    pub fn log_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::full(&self.log_file).map_or_else(
            |_| self.log_file.clone(),
            |expanded| expanded.into_owned(),
        ))
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        match key {
            "wave_color" | "progress_color" => {
                if !is_hex_color(value) {
                    return Err("Value must be a hex colour like #abc or #aabbcc".into());
                }
                if key == "wave_color" {
                    self.wave_color = value.to_string();
                } else {
                    self.progress_color = value.to_string();
                }
            }
            "update_interval_ms" => {
                let interval = value
                    .parse::<u64>()
                    .map_err(|_| "Value must be a whole number of milliseconds")?;
                if interval == 0 {
                    return Err("Update interval must be greater than zero".into());
                }
                self.update_interval_ms = interval;
            }
            "fast_forward_factor" => {
                let factor = value
                    .parse::<f64>()
                    .map_err(|_| "Value must be a number")?;
                if !factor.is_finite() || factor <= 1.0 {
                    return Err("Fast-forward factor must be greater than 1".into());
                }
                self.fast_forward_factor = factor;
            }
            "base_url" => self.base_url = value.trim().to_string(),
            "log_file" => self.log_file = value.to_string(),
            _ => return Err(format!("Unknown configuration key: {key}").into()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Tests that modify environment variables must not run concurrently
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_config_new() {
        let config = Config::new();
        assert_eq!(config.wave_color, "#ababab");
        assert_eq!(config.progress_color, "#dadada");
        assert_eq!(config.update_interval_ms, 100);
        assert_eq!(config.fast_forward_factor, 10.0);
        assert!(config.base_url().is_none());
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config: Config = toml::from_str("wave_color = \"#112233\"").unwrap();
        assert_eq!(config.wave_color, "#112233");
        assert_eq!(config.progress_color, "#dadada");
        assert_eq!(config.update_interval_ms, 100);
    }

    #[test]
    fn test_hex_color_validation() {
        assert!(is_hex_color("#abc"));
        assert!(is_hex_color("#A0b1C2"));
        assert!(!is_hex_color("abc"));
        assert!(!is_hex_color("#abcd"));
        assert!(!is_hex_color("#ggg"));
    }

    #[test]
    fn test_set_value() {
        let mut config = Config::new();

        config.set_value("wave_color", "#123").unwrap();
        assert_eq!(config.wave_color, "#123");
        assert!(config.set_value("progress_color", "red").is_err());

        config.set_value("update_interval_ms", "250").unwrap();
        assert_eq!(config.update_interval_ms, 250);
        assert!(config.set_value("update_interval_ms", "0").is_err());
        assert!(config.set_value("update_interval_ms", "fast").is_err());

        config.set_value("fast_forward_factor", "4").unwrap();
        assert_eq!(config.fast_forward_factor, 4.0);
        assert!(config.set_value("fast_forward_factor", "1").is_err());

        config.set_value("base_url", "https://docs.example.com/").unwrap();
        assert_eq!(config.base_url(), Some("https://docs.example.com/"));

        assert!(config.set_value("unknown_key", "value").is_err());
    }

    #[test]
    fn test_log_path_expands_home() {
        let mut config = Config::new();
        assert_eq!(config.log_path(), PathBuf::from("/tmp/docwave-player.log"));

        config.log_file = "~/docwave.log".to_string();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.log_path(), home.join("docwave.log"));
        }
    }

    #[test]
    fn test_config_save_and_load() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let temp_dir = TempDir::new().unwrap();
        let original_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }

        let mut config = Config::new();
        config.progress_color = "#00ff00".to_string();
        config.save().unwrap();

        let config_path = Config::config_path().unwrap();
        assert!(config_path.exists());
        assert!(config_path.starts_with(temp_dir.path().join("docwave")));

        let loaded = Config::load().unwrap();
        assert_eq!(loaded.progress_color, "#00ff00");
        assert_eq!(loaded.wave_color, "#ababab");

        unsafe {
            if let Some(original) = original_xdg {
                std::env::set_var("XDG_CONFIG_HOME", original);
            } else {
                std::env::remove_var("XDG_CONFIG_HOME");
            }
        }
    }

    #[test]
    fn test_config_exists() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let temp_dir = TempDir::new().unwrap();
        let original_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }

        let expected_path = temp_dir.path().join("docwave").join("config.toml");
        assert!(!Config::exists().unwrap());
        assert_eq!(Config::load().unwrap(), Config::new());

        Config::new().save().unwrap();
        assert!(expected_path.exists());
        assert!(Config::exists().unwrap());

        unsafe {
            if let Some(original) = original_xdg {
                std::env::set_var("XDG_CONFIG_HOME", original);
            } else {
                std::env::remove_var("XDG_CONFIG_HOME");
            }
        }
    }
}
