pub mod app;
pub mod audio;
pub mod ui;
pub mod waveform;

use docwave::config::Config;
use docwave::page::{self, AudioSource, SourceKind, Theme};
use docwave::session::SessionConfig;
use docwave::utils::{parallel_scan::is_page, validation::validate_path_exists};
use std::error::Error;
use std::fs;
use std::path::PathBuf;

use app::App;
use audio::EngineFactory;

/// Open `target` (an audio file or an HTML page) in the terminal player
pub fn run(target: &str, index: usize) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let path = PathBuf::from(shellexpand::tilde(target).as_ref());
    validate_path_exists(&path)?;

    let (sources, theme, base_dir) = if is_page(&path) {
        let html = fs::read_to_string(&path)?;
        // Links resolve against the page's directory, not the site URL
        let sources = page::find_audio_sources(&html, None);
        let theme = Theme::from_page(&html, &config.theme());
        (sources, theme, path.parent().map(|p| p.to_path_buf()))
    } else {
        let source = AudioSource {
            url: path.to_string_lossy().to_string(),
            description: path
                .file_name()
                .map(|name| name.to_string_lossy().to_string()),
            kind: SourceKind::Link,
            span: 0..0,
        };
        (vec![source], config.theme(), None)
    };

    if sources.is_empty() {
        return Err(format!("No audio sources found in {}", path.display()).into());
    }
    if index >= sources.len() {
        return Err(format!(
            "Index {index} is out of range; {} has {} audio sources",
            path.display(),
            sources.len()
        )
        .into());
    }

    let mut app = App::new(
        sources,
        theme,
        SessionConfig::from(&config),
        EngineFactory::new(base_dir),
    );
    app.selected = index;
    app::run(app, &config.log_path())
}
