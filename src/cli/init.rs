use dialoguer::{Confirm, theme::ColorfulTheme};
use docwave::config::Config;
use owo_colors::OwoColorize;
use std::error::Error;

pub fn handle_init() -> Result<(), Box<dyn Error>> {
    if Config::exists()? {
        let overwrite = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Configuration already exists at {}. Overwrite with defaults?",
                Config::config_path()?.display().to_string().cyan()
            ))
            .default(false)
            .interact()?;

        if !overwrite {
            println!("{}", "Keeping existing configuration".bright_black());
            return Ok(());
        }
    }

    let config = Config::new();
    config.save()?;

    println!("{} docwave initialized", "✓".green().bold());
    println!(
        "  {} {}",
        "Configuration:".bright_black(),
        Config::config_path()?.display().to_string().cyan()
    );
    println!(
        "  {} {}",
        "Log file:".bright_black(),
        config.log_path().display().to_string().cyan()
    );

    Ok(())
}
