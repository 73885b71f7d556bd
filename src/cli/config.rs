use docwave::config::Config;
use owo_colors::OwoColorize;
use std::error::Error;
use std::process::Command;

pub fn handle_config_view() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;

    println!("{}", "Current docwave configuration:".bold());
    println!("  wave_color: {}", config.wave_color);
    println!("  progress_color: {}", config.progress_color);
    println!("  update_interval_ms: {}", config.update_interval_ms);
    println!("  fast_forward_factor: {}", config.fast_forward_factor);
    println!(
        "  base_url: {}",
        config.base_url().unwrap_or("(none)")
    );
    println!("  log_file: {}", config.log_path().display());

    Ok(())
}

pub fn handle_config_set(key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;

    config.set_value(key, value)?;
    config.save()?;

    println!("{} {key} = {value}", "Configuration updated:".green());

    Ok(())
}

pub fn handle_config_edit() -> Result<(), Box<dyn Error>> {
    if !Config::exists()? {
        return Err("docwave not initialized. Run 'docwave init' first.".into());
    }

    let config_path = Config::config_path()?;
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    println!("Opening {} in {}", config_path.display(), editor);

    let status = Command::new(&editor)
        .arg(&config_path)
        .status()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                format!("Editor '{editor}' not found. Set $EDITOR to a valid editor path.")
            } else {
                format!("Failed to launch editor '{editor}': {e}")
            }
        })?;

    if !status.success() {
        return Err(format!("Editor '{editor}' exited with error").into());
    }

    // Re-parse so a broken edit is reported right away
    match Config::load() {
        Ok(_) => println!("Configuration saved successfully"),
        Err(e) => {
            return Err(format!("Configuration validation failed: {e}").into());
        }
    }

    Ok(())
}
