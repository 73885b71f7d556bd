//! docwave - waveform players for rendered documentation pages.
//!
//! Two surfaces share the library core:
//!
//! 1. **Page transformation**: `docwave scan` runs the post-render hook over
//!    static HTML pages, replacing `<audio>` elements and audio links with
//!    player containers (play/pause, toolbar, speed, volume and time panels).
//!
//! 2. **Terminal player** (optional feature): `docwave play` opens an audio
//!    file, or the audio sources found in a page, in a ratatui player with a
//!    waveform overview and the same controls, driven by a rodio engine.

use clap::{CommandFactory, Parser, Subcommand, builder::PossibleValuesParser};
use clap_complete::{Generator, Shell, generate};
use std::error::Error;
use std::io;

mod cli;

#[cfg(feature = "player")]
mod player;

#[derive(Parser)]
#[command(name = "docwave")]
#[command(about = "Waveform audio players for documentation pages")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Replace audio elements and links in HTML pages with players
    Scan {
        /// A page or a directory of pages
        path: String,
        /// Base URL for resolving relative audio links
        #[arg(short, long)]
        base_url: Option<String>,
        /// Write transformed pages here instead of only reporting
        #[arg(short, long)]
        output: Option<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Log scanner activity to stderr
        #[arg(short, long)]
        verbose: bool,
    },
    /// Play an audio file, or the audio found in a page, in the terminal
    Play {
        /// Audio file or HTML page
        target: String,
        /// Which audio source of the page to open first
        #[arg(short, long, default_value_t = 0)]
        index: usize,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// View current configuration
    View,
    /// Set a configuration value
    Set {
        /// Configuration key
        #[arg(value_parser = PossibleValuesParser::new([
            "wave_color",
            "progress_color",
            "update_interval_ms",
            "fast_forward_factor",
            "base_url",
            "log_file",
        ]))]
        key: String,
        /// Configuration value
        value: String,
    },
    /// Edit configuration file in your editor
    Edit,
}

fn print_completions<G: Generator>(generator: G, cmd: &mut clap::Command) {
    generate(
        generator,
        cmd,
        cmd.get_name().to_string(),
        &mut io::stdout(),
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            cli::init::handle_init()?;
        }
        Commands::Config { action } => match action {
            ConfigAction::View => {
                cli::config::handle_config_view()?;
            }
            ConfigAction::Set { key, value } => {
                cli::config::handle_config_set(&key, &value)?;
            }
            ConfigAction::Edit => {
                cli::config::handle_config_edit()?;
            }
        },
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            print_completions(shell, &mut cmd);
        }
        Commands::Scan {
            path,
            base_url,
            output,
            json,
            verbose,
        } => {
            let options = cli::scan::ScanOptions {
                base_url,
                output,
                json,
                verbose,
            };
            cli::scan::handle_scan(&path, &options)?;
        }
        Commands::Play { target, index } => {
            cli::play::handle_play(&target, index)?;
        }
    }

    Ok(())
}
