use docwave::config::Config;
use docwave::page::SourceKind;
use docwave::plugin::{DetachedFactory, Plugin, RenderedPage, WavePlugin};
use docwave::session::SessionConfig;
use docwave::utils::{
    parallel_scan, progress::create_progress_bar, progress::create_progress_spinner,
    validation::validate_scan_target,
};
use log::{LevelFilter, debug, warn};
use owo_colors::OwoColorize;
use rayon::prelude::*;
use serde::Serialize;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

pub struct ScanOptions {
    pub base_url: Option<String>,
    pub output: Option<String>,
    pub json: bool,
    pub verbose: bool,
}

#[derive(Debug, Serialize)]
struct PlayerEntry {
    id: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    kind: SourceKind,
}

#[derive(Debug, Serialize)]
struct FailureEntry {
    url: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct PageReport {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    written_to: Option<String>,
    wave_color: String,
    progress_color: String,
    players: Vec<PlayerEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<FailureEntry>,
}

#[derive(Debug, Serialize)]
struct ScanReport {
    generated: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    total_pages: usize,
    total_players: usize,
    pages: Vec<PageReport>,
}

pub fn handle_scan(path: &str, options: &ScanOptions) -> Result<(), Box<dyn Error>> {
    if options.verbose {
        simplelog::TermLogger::init(
            LevelFilter::Debug,
            simplelog::Config::default(),
            simplelog::TerminalMode::Stderr,
            simplelog::ColorChoice::Auto,
        )?;
    }

    let config = Config::load()?;
    let root = PathBuf::from(shellexpand::tilde(path).as_ref());
    validate_scan_target(&root)?;

    let base_url = options
        .base_url
        .clone()
        .or_else(|| config.base_url().map(str::to_string));

    let pages = if root.is_file() {
        vec![root.clone()]
    } else {
        let spinner = create_progress_spinner();
        spinner.set_message("Looking for pages...");
        let mut pages = parallel_scan::collect_pages(&root)?;
        pages.sort();
        spinner.finish_and_clear();
        pages
    };

    if pages.is_empty() {
        println!(
            "{} No pages found in {}",
            "⚠".yellow(),
            root.display().to_string().cyan()
        );
        return Ok(());
    }

    let output = options
        .output
        .as_ref()
        .map(|o| PathBuf::from(shellexpand::tilde(o).as_ref()));

    let pb = create_progress_bar(pages.len() as u64);
    pb.set_message("Transforming pages...");

    // Players hold single-threaded handles, so each page builds its own plugin
    let results: Vec<Result<PageReport, String>> = pages
        .par_iter()
        .map(|page_path| {
            let result = scan_page(
                page_path,
                &root,
                output.as_deref(),
                base_url.as_deref(),
                &config,
            )
            .map_err(|e| format!("{}: {e}", page_path.display()));
            pb.inc(1);
            result
        })
        .collect();

    pb.finish_and_clear();

    let mut reports = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                warn!("Skipping page {e}");
                eprintln!("{} {}", "Warning:".yellow(), e);
            }
        }
    }

    let report = ScanReport {
        generated: chrono::Utc::now().to_rfc3339(),
        base_url,
        total_pages: reports.len(),
        total_players: reports.iter().map(|r| r.players.len()).sum(),
        pages: reports,
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

fn scan_page(
    page_path: &Path,
    root: &Path,
    output: Option<&Path>,
    base_url: Option<&str>,
    config: &Config,
) -> Result<PageReport, Box<dyn Error>> {
    let html = fs::read_to_string(page_path)?;
    debug!("Scanning {}", page_path.display());

    let mut plugin = WavePlugin::new(
        DetachedFactory,
        SessionConfig::from(config),
        config.theme(),
    );
    let mut page = RenderedPage::new(html);
    if let Some(base) = base_url {
        page = page.with_base_url(base);
    }
    plugin.done_each(&mut page);

    let players = plugin
        .players()
        .iter()
        .map(|player| PlayerEntry {
            id: player.id().to_string(),
            url: player.source().url.clone(),
            description: player.description().map(str::to_string),
            kind: player.source().kind,
        })
        .collect();
    let failures = plugin
        .failures()
        .iter()
        .map(|(source, error)| FailureEntry {
            url: source.url.clone(),
            error: error.clone(),
        })
        .collect();

    let written_to = match output {
        Some(output) => {
            let target = output_path(page_path, root, output);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, &page.html)?;
            Some(target.display().to_string())
        }
        None => None,
    };

    Ok(PageReport {
        path: page_path.display().to_string(),
        written_to,
        wave_color: plugin.theme().wave_color.clone(),
        progress_color: plugin.theme().progress_color.clone(),
        players,
        failures,
    })
}

/// Where a transformed page goes: the tree below `root` is mirrored under
/// `output`, and a single page may also be written straight to a file path
fn output_path(page_path: &Path, root: &Path, output: &Path) -> PathBuf {
    if root.is_file() {
        if output.is_dir() {
            return output.join(page_path.file_name().unwrap_or_default());
        }
        return output.to_path_buf();
    }

    match page_path.strip_prefix(root) {
        Ok(relative) => output.join(relative),
        Err(_) => output.join(page_path.file_name().unwrap_or_default()),
    }
}

fn print_summary(report: &ScanReport) {
    for page in &report.pages {
        println!(
            "{} {}",
            if page.players.is_empty() {
                "·".bright_black().to_string()
            } else {
                "✓".green().bold().to_string()
            },
            page.path.cyan()
        );

        for player in &page.players {
            let label = player.description.as_deref().unwrap_or("(no description)");
            println!(
                "    {} {} {}",
                player.id.bright_black(),
                player.url,
                label.italic()
            );
        }
        for failure in &page.failures {
            println!(
                "    {} {} {}",
                "✗".red().bold(),
                failure.url,
                failure.error.red()
            );
        }
        if let Some(written_to) = &page.written_to {
            println!("    {} {}", "→".bright_black(), written_to.cyan());
        }
    }

    println!();
    println!(
        "{} {} players in {} pages",
        "Scan complete:".green().bold(),
        report.total_players.to_string().cyan(),
        report.total_pages.to_string().cyan()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_output_path_mirrors_tree() {
        let root = Path::new("/docs");
        let page = Path::new("/docs/guide/audio.html");
        assert_eq!(
            output_path(page, root, Path::new("/out")),
            PathBuf::from("/out/guide/audio.html")
        );
    }

    #[test]
    fn test_scan_page_writes_output() {
        let temp_dir = TempDir::new().unwrap();
        let page_path = temp_dir.path().join("index.html");
        fs::write(
            &page_path,
            r#"<p>Listen: <a href="media/intro.mp3">Intro</a></p>"#,
        )
        .unwrap();
        let out = temp_dir.path().join("out.html");

        let report = scan_page(
            &page_path,
            &page_path,
            Some(out.as_path()),
            Some("https://docs.example.com/"),
            &Config::new(),
        )
        .unwrap();

        assert_eq!(report.players.len(), 1);
        assert_eq!(report.players[0].url, "https://docs.example.com/media/intro.mp3");
        assert_eq!(report.players[0].description.as_deref(), Some("Intro"));

        let written = fs::read_to_string(&out).unwrap();
        assert!(written.contains("docwave-player"));
        assert!(!written.contains("<a href"));
    }
}
