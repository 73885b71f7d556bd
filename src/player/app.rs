//! State and control flow of the terminal player.
//!
//! The app owns the list of audio sources found in the target, at most one
//! live `Player` for the selected source, and the overview peaks for the
//! waveform region. Key presses map onto the same `Control`s a page player
//! exposes; controls hidden behind the closed toolbar are not reachable.

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use docwave::handle::{DetachedHandle, PlaybackHandle};
use docwave::page::{self, AudioSource, Theme};
use docwave::panels::Panel;
use docwave::plugin::HandleFactory;
use docwave::session::SessionConfig;
use docwave::widget::{Control, Player};
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::error::Error;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use super::audio::AudioEngine;
use super::ui;

/// Peaks kept per track; the UI resamples them to the terminal width
const OVERVIEW_BUCKETS: usize = 1024;
const SPEED_STEP: u8 = 5;
const VOLUME_STEP: f64 = 0.05;
const SEEK_STEP_SECS: f64 = 5.0;
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// What the frame loop needs from an engine beyond the playback seam
pub trait FrameDriven: PlaybackHandle {
    /// Called once per frame before the session ticks
    fn poll(&mut self) {}

    fn peaks(&self, _buckets: usize) -> Vec<f32> {
        Vec::new()
    }
}

impl FrameDriven for AudioEngine {
    fn poll(&mut self) {
        AudioEngine::poll(self);
    }

    fn peaks(&self, buckets: usize) -> Vec<f32> {
        self.audio().peaks(buckets)
    }
}

impl FrameDriven for DetachedHandle {}

pub struct App<F: HandleFactory> {
    pub should_quit: bool,
    pub sources: Vec<AudioSource>,
    pub selected: usize,
    pub player: Option<Player<F::Handle>>,
    pub theme: Theme,
    pub peaks: Vec<f32>,
    /// Text typed after `g`, while the seek prompt is open
    pub seek_input: Option<String>,
    pub status: Option<String>,
    status_timer: Option<Instant>,
    factory: F,
    config: SessionConfig,
}

impl<F> App<F>
where
    F: HandleFactory,
    F::Handle: FrameDriven,
{
    pub fn new(sources: Vec<AudioSource>, theme: Theme, config: SessionConfig, factory: F) -> Self {
        Self {
            should_quit: false,
            sources,
            selected: 0,
            player: None,
            theme,
            peaks: Vec::new(),
            seek_input: None,
            status: None,
            status_timer: None,
            factory,
            config,
        }
    }

    /// Tear down the current player and open the selected source
    pub fn open_selected(&mut self) {
        if let Some(mut previous) = self.player.take() {
            previous.dispose();
        }
        self.peaks.clear();

        let Some(source) = self.sources.get(self.selected).cloned() else {
            return;
        };

        match self.factory.create(&source, &self.theme) {
            Ok(handle) => {
                self.peaks = handle.peaks(OVERVIEW_BUCKETS);
                let id = page::player_id(&source.url, self.selected);
                info!("Opened {} as {id}", source.url);
                self.player = Some(Player::new(id, source, handle, self.config.clone()));
            }
            Err(e) => {
                error!("Could not open {}: {e}", source.url);
                self.set_status(format!("Could not open {}: {e}", source.url));
            }
        }
    }

    pub fn select_next(&mut self) {
        if self.sources.len() > 1 {
            self.selected = (self.selected + 1) % self.sources.len();
            self.open_selected();
        }
    }

    pub fn select_previous(&mut self) {
        if self.sources.len() > 1 {
            self.selected = (self.selected + self.sources.len() - 1) % self.sources.len();
            self.open_selected();
        }
    }

    /// Advance the engine and the session by one frame
    pub fn tick(&mut self, now: Instant) {
        if let Some(player) = &mut self.player {
            player.session_mut().handle_mut().poll();
            player.session_mut().tick(now);
        }

        if let Some(timer) = self.status_timer
            && now.duration_since(timer) > STATUS_TIMEOUT
        {
            self.status = None;
            self.status_timer.take();
        }
    }

    pub fn set_status(&mut self, message: String) {
        self.status = Some(message);
        self.status_timer = Some(Instant::now());
    }

    /// Fraction of the track already played, for the waveform split
    pub fn progress(&self) -> f64 {
        let Some(player) = &self.player else {
            return 0.0;
        };
        let handle = player.session().handle();
        let duration = handle.duration();
        if duration.is_finite() && duration > 0.0 {
            (handle.current_time() / duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn activate(&mut self, control: Control) {
        let Some(player) = &mut self.player else {
            return;
        };
        if player.is_visible(control) {
            player.activate(control);
        } else if Control::TOOLBAR.contains(&control) {
            self.set_status("Open the toolbar first [t]".to_string());
        }
    }

    /// Left/right: move the open slider, or seek when no slider is open
    fn adjust(&mut self, direction: i8) {
        let Some(player) = &mut self.player else {
            return;
        };
        let panels = player.panels();

        if panels.is_shown(Panel::Speed) {
            let slider = player.session().speed_slider();
            let slider = if direction < 0 {
                slider.saturating_sub(SPEED_STEP)
            } else {
                slider.saturating_add(SPEED_STEP)
            };
            player.input_speed(slider);
        } else if panels.is_shown(Panel::Volume) {
            let volume = player.session().volume_slider() + VOLUME_STEP * direction as f64;
            player.input_volume((volume * 100.0).round() / 100.0);
        } else {
            let session = player.session_mut();
            let target = session.handle().current_time() + SEEK_STEP_SECS * direction as f64;
            session.handle_mut().seek_to(target.max(0.0));
            session.pump_events();
        }
    }

    /// Backspace: the reset button of whichever slider panel is open
    fn reset_open_panel(&mut self) {
        let Some(player) = &self.player else {
            return;
        };
        if player.is_visible(Control::SpeedReset) {
            self.activate(Control::SpeedReset);
        } else if player.is_visible(Control::VolumeReset) {
            self.activate(Control::VolumeReset);
        }
    }

    fn submit_seek(&mut self) {
        let Some(text) = self.seek_input.take() else {
            return;
        };
        let Some(player) = &mut self.player else {
            return;
        };
        if !player.session_mut().seek_to_typed(&text) {
            self.set_status(format!("Not a time: {text:?} (use M:SS.mmm)"));
        }
    }
}

pub fn handle_key_event<F>(app: &mut App<F>, key: KeyEvent)
where
    F: HandleFactory,
    F::Handle: FrameDriven,
{
    if app.seek_input.is_some() {
        handle_seek_keys(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char(' ') => app.activate(Control::PlayPause),
        KeyCode::Enter => app.activate(Control::Label),
        KeyCode::Char('t') => app.activate(Control::ToolbarToggle),
        KeyCode::Char('l') => app.activate(Control::Loop),
        KeyCode::Char('0') | KeyCode::Home => app.activate(Control::SeekStart),
        KeyCode::Char('f') => app.activate(Control::FastForward),
        KeyCode::Char('s') => app.activate(Control::SpeedToggle),
        KeyCode::Char('v') => app.activate(Control::VolumeToggle),
        KeyCode::Char('r') => app.activate(Control::TimeToggle),
        KeyCode::Left => app.adjust(-1),
        KeyCode::Right => app.adjust(1),
        KeyCode::Backspace | KeyCode::Char('x') => app.reset_open_panel(),
        KeyCode::Char('g') => {
            if app.player.is_some() {
                app.seek_input = Some(String::new());
            }
        }
        KeyCode::Char('n') | KeyCode::Down | KeyCode::Tab => app.select_next(),
        KeyCode::Char('p') | KeyCode::Up | KeyCode::BackTab => app.select_previous(),
        _ => {}
    }
}

fn handle_seek_keys<F>(app: &mut App<F>, key: KeyEvent)
where
    F: HandleFactory,
    F::Handle: FrameDriven,
{
    match key.code {
        KeyCode::Enter => app.submit_seek(),
        KeyCode::Esc => app.seek_input = None,
        KeyCode::Backspace => {
            if let Some(input) = &mut app.seek_input {
                input.pop();
            }
        }
        KeyCode::Char(c) if c.is_ascii_digit() || c == ':' || c == '.' => {
            if let Some(input) = &mut app.seek_input {
                input.push(c);
            }
        }
        _ => {}
    }
}

pub fn run<F>(mut app: App<F>, log_path: &Path) -> Result<(), Box<dyn Error>>
where
    F: HandleFactory,
    F::Handle: FrameDriven,
{
    init_logging(log_path)?;
    info!("Starting docwave player with {} sources", app.sources.len());

    app.open_selected();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Some(mut player) = app.player.take() {
        player.dispose();
    }
    result
}

fn run_app<B, F>(terminal: &mut Terminal<B>, app: &mut App<F>) -> Result<(), Box<dyn Error>>
where
    B: ratatui::backend::Backend,
    F: HandleFactory,
    F::Handle: FrameDriven,
{
    loop {
        app.tick(Instant::now());

        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(50))?
            && let Event::Key(key) = event::read()?
        {
            handle_key_event(app, key);
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn init_logging(log_path: &Path) -> Result<(), Box<dyn Error>> {
    use simplelog::*;
    use std::fs::File;

    if let Some(parent) = log_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    CombinedLogger::init(vec![WriteLogger::new(
        LevelFilter::Debug,
        Config::default(),
        File::create(log_path)?,
    )])?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use docwave::page::SourceKind;
    use docwave::plugin::DetachedFactory;
    use docwave::session::PlayIcon;

    fn source(url: &str, description: Option<&str>) -> AudioSource {
        AudioSource {
            url: url.to_string(),
            description: description.map(str::to_string),
            kind: SourceKind::Link,
            span: 0..0,
        }
    }

    fn app_with(sources: Vec<AudioSource>) -> App<DetachedFactory> {
        let mut app = App::new(
            sources,
            Theme::default(),
            SessionConfig::default(),
            DetachedFactory,
        );
        app.open_selected();
        app
    }

    fn press(app: &mut App<DetachedFactory>, code: KeyCode) {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn player(app: &App<DetachedFactory>) -> &Player<DetachedHandle> {
        app.player.as_ref().unwrap()
    }

    #[test]
    fn test_new_app_initial_state() {
        let app = App::new(
            vec![source("a.wav", None)],
            Theme::default(),
            SessionConfig::default(),
            DetachedFactory,
        );
        assert!(!app.should_quit);
        assert!(app.player.is_none());
        assert!(app.seek_input.is_none());
        assert_eq!(app.progress(), 0.0);
    }

    #[test]
    fn test_space_toggles_play() {
        let mut app = app_with(vec![source("a.wav", None)]);
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(
            player(&app).session().state().play_button.icon,
            PlayIcon::Pause
        );
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(
            player(&app).session().state().play_button.icon,
            PlayIcon::Play
        );
    }

    #[test]
    fn test_enter_only_plays_with_description() {
        let mut app = app_with(vec![source("a.wav", None)]);
        press(&mut app, KeyCode::Enter);
        assert!(!player(&app).session().handle().is_playing());

        let mut app = app_with(vec![source("a.wav", Some("Intro"))]);
        press(&mut app, KeyCode::Enter);
        assert!(player(&app).session().handle().is_playing());
    }

    #[test]
    fn test_toolbar_gates_loop() {
        let mut app = app_with(vec![source("a.wav", None)]);
        press(&mut app, KeyCode::Char('l'));
        assert!(!player(&app).session().state().looping);
        assert!(app.status.is_some());

        press(&mut app, KeyCode::Char('t'));
        press(&mut app, KeyCode::Char('l'));
        assert!(player(&app).session().state().looping);
    }

    #[test]
    fn test_arrows_move_speed_slider() {
        let mut app = app_with(vec![source("a.wav", None)]);
        press(&mut app, KeyCode::Char('t'));
        press(&mut app, KeyCode::Char('s'));
        press(&mut app, KeyCode::Right);
        assert_eq!(player(&app).session().speed_slider(), 55);
        assert_eq!(player(&app).session().speed_readout().text(), "1.70x");

        press(&mut app, KeyCode::Backspace);
        assert_eq!(player(&app).session().speed_slider(), 50);
        assert_eq!(player(&app).session().speed_readout().text(), "1.00x");
    }

    #[test]
    fn test_arrows_move_volume_slider() {
        let mut app = app_with(vec![source("a.wav", None)]);
        press(&mut app, KeyCode::Char('t'));
        press(&mut app, KeyCode::Char('v'));
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Left);
        assert_eq!(player(&app).session().volume_slider(), 0.9);
        assert_eq!(player(&app).session().volume_readout().text(), "090%");
    }

    #[test]
    fn test_typed_seek() {
        let mut app = app_with(vec![source("a.wav", None)]);
        app.player
            .as_mut()
            .unwrap()
            .session_mut()
            .handle_mut()
            .finish_loading(120.0);

        press(&mut app, KeyCode::Char('g'));
        for c in "1:05.5".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);

        assert!(app.seek_input.is_none());
        assert_eq!(player(&app).session().handle().current_time(), 65.5);
        assert_eq!(player(&app).session().elapsed_readout().text(), "1:05.500");
    }

    #[test]
    fn test_bad_typed_seek_reports() {
        let mut app = app_with(vec![source("a.wav", None)]);
        press(&mut app, KeyCode::Char('g'));
        press(&mut app, KeyCode::Char(':'));
        press(&mut app, KeyCode::Enter);

        assert_eq!(player(&app).session().handle().current_time(), 0.0);
        assert!(app.status.as_deref().unwrap().starts_with("Not a time"));
    }

    #[test]
    fn test_switching_sources_replaces_player() {
        let mut app = app_with(vec![source("a.wav", None), source("b.wav", None)]);
        let first = player(&app).id().to_string();

        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.selected, 1);
        assert_eq!(player(&app).source().url, "b.wav");
        assert_ne!(player(&app).id(), first);

        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_quit() {
        let mut app = app_with(vec![source("a.wav", None)]);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }
}
