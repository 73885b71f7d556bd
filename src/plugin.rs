//! Host integration: post-render hooks and the waveform plugin.
//!
//! A documentation host keeps a `PluginRegistry` and calls `done_each` after
//! every page render. `install` registers the waveform plugin explicitly, in
//! front of any plugins already registered. On each render the plugin tears
//! down the players of the previous page, scans the new one and splices a
//! player container over every audio element and audio link it finds.

use log::{debug, error, info};
use std::any::Any;
use std::error::Error;

use crate::handle::{DetachedHandle, PlaybackHandle};
use crate::page::{self, AudioSource, Theme};
use crate::session::SessionConfig;
use crate::widget::Player;

/// A page as the host hands it to post-render hooks
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub html: String,
    pub base_url: Option<String>,
}

impl RenderedPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = (!base_url.is_empty()).then_some(base_url);
        self
    }
}

pub trait Plugin {
    fn name(&self) -> &str;
    /// Called after each page render completes
    fn done_each(&mut self, page: &mut RenderedPage);
    fn as_any(&self) -> &dyn Any;
}

#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Run every plugin's post-render hook in registration order
    pub fn done_each(&mut self, page: &mut RenderedPage) {
        for plugin in &mut self.plugins {
            plugin.done_each(page);
        }
    }

    pub fn find<T: Plugin + 'static>(&self) -> Option<&T> {
        self.plugins
            .iter()
            .find_map(|plugin| plugin.as_any().downcast_ref::<T>())
    }
}

/// Creates the external player for one audio source
pub trait HandleFactory {
    type Handle: PlaybackHandle;

    fn create(
        &mut self,
        source: &AudioSource,
        theme: &Theme,
    ) -> Result<Self::Handle, Box<dyn Error>>;
}

/// Factory for players that are rendered but never play
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedFactory;

impl HandleFactory for DetachedFactory {
    type Handle = DetachedHandle;

    fn create(
        &mut self,
        _source: &AudioSource,
        _theme: &Theme,
    ) -> Result<Self::Handle, Box<dyn Error>> {
        Ok(DetachedHandle::new())
    }
}

pub struct WavePlugin<F: HandleFactory> {
    factory: F,
    config: SessionConfig,
    fallback_theme: Theme,
    theme: Theme,
    players: Vec<Player<F::Handle>>,
    failures: Vec<(AudioSource, String)>,
}

impl<F: HandleFactory> WavePlugin<F> {
    pub fn new(factory: F, config: SessionConfig, fallback_theme: Theme) -> Self {
        Self {
            factory,
            config,
            theme: fallback_theme.clone(),
            fallback_theme,
            players: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Players of the most recently rendered page
    pub fn players(&self) -> &[Player<F::Handle>] {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut [Player<F::Handle>] {
        &mut self.players
    }

    /// Sources whose player could not be created, with the reason
    pub fn failures(&self) -> &[(AudioSource, String)] {
        &self.failures
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Dispose every live player; the host calls this when the page goes away
    pub fn teardown(&mut self) {
        for player in &mut self.players {
            player.dispose();
        }
        self.players.clear();
        self.failures.clear();
    }

    fn transform(&mut self, page: &mut RenderedPage) {
        self.teardown();

        let theme = Theme::from_page(&page.html, &self.fallback_theme);
        let sources = page::find_audio_sources(&page.html, page.base_url.as_deref());
        debug!("Found {} audio sources", sources.len());

        let mut replacements = Vec::with_capacity(sources.len());
        for (index, source) in sources.into_iter().enumerate() {
            match self.factory.create(&source, &theme) {
                Ok(handle) => {
                    let id = page::player_id(&source.url, index);
                    let span = source.span.clone();
                    let player = Player::new(id, source, handle, self.config.clone());
                    replacements.push((span, page::render_player(&player, &theme)));
                    self.players.push(player);
                }
                Err(e) => {
                    // The element stays as it was; other players are unaffected
                    error!("Could not create player for {}: {e}", source.url);
                    self.failures.push((source, e.to_string()));
                }
            }
        }

        page.html = page::splice(&page.html, &replacements);
        self.theme = theme;
        info!(
            "Page transformed: {} players, {} failures",
            self.players.len(),
            self.failures.len()
        );
    }
}

impl<F: HandleFactory + 'static> Plugin for WavePlugin<F> {
    fn name(&self) -> &str {
        "docwave"
    }

    fn done_each(&mut self, page: &mut RenderedPage) {
        self.transform(page);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Register the waveform plugin ahead of the host's existing plugins
pub fn install<F: HandleFactory + 'static>(registry: &mut PluginRegistry, plugin: WavePlugin<F>) {
    registry.plugins.insert(0, Box::new(plugin));
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        seen: Vec<String>,
    }

    impl Plugin for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn done_each(&mut self, page: &mut RenderedPage) {
            self.seen.push(page.html.clone());
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct FailingFactory;

    impl HandleFactory for FailingFactory {
        type Handle = DetachedHandle;

        fn create(
            &mut self,
            source: &AudioSource,
            _theme: &Theme,
        ) -> Result<Self::Handle, Box<dyn Error>> {
            if source.url.contains("broken") {
                Err("decode failed".into())
            } else {
                Ok(DetachedHandle::new())
            }
        }
    }

    #[test]
    fn test_install_runs_before_existing_plugins() {
        let mut registry = PluginRegistry::new();
        registry.push(Box::new(Recorder { seen: Vec::new() }));
        install(
            &mut registry,
            WavePlugin::new(DetachedFactory, SessionConfig::default(), Theme::default()),
        );

        assert_eq!(registry.names(), vec!["docwave", "recorder"]);

        let mut page = RenderedPage::new(r#"<a href="a.mp3">A</a>"#);
        registry.done_each(&mut page);

        let recorder = registry.find::<Recorder>().unwrap();
        assert!(recorder.seen[0].contains("docwave-player"));
    }

    #[test]
    fn test_failure_leaves_element_and_keeps_others() {
        let mut plugin = WavePlugin::new(FailingFactory, SessionConfig::default(), Theme::default());
        let mut page =
            RenderedPage::new(r#"<a href="broken.mp3">B</a><a href="fine.mp3">F</a>"#);

        plugin.done_each(&mut page);

        assert_eq!(plugin.players().len(), 1);
        assert_eq!(plugin.failures().len(), 1);
        assert!(page.html.starts_with(r#"<a href="broken.mp3">B</a>"#));
        assert!(page.html.contains(r#"data-src="fine.mp3""#));
    }

    #[test]
    fn test_next_render_disposes_previous_players() {
        let mut plugin =
            WavePlugin::new(DetachedFactory, SessionConfig::default(), Theme::default());

        let mut first = RenderedPage::new(r#"<a href="a.mp3">A</a><a href="b.mp3">B</a>"#);
        plugin.done_each(&mut first);
        assert_eq!(plugin.players().len(), 2);

        let mut second = RenderedPage::new("<p>No audio here</p>");
        plugin.done_each(&mut second);
        assert!(plugin.players().is_empty());
        assert_eq!(second.html, "<p>No audio here</p>");
    }

    #[test]
    fn test_page_theme_is_used() {
        let mut plugin =
            WavePlugin::new(DetachedFactory, SessionConfig::default(), Theme::default());
        let mut page = RenderedPage::new(
            r#"<style>:root { --wave-color: #ff0000; }</style><a href="a.wav">A</a>"#,
        );
        plugin.done_each(&mut page);

        assert_eq!(plugin.theme().wave_color, "#ff0000");
        assert!(page.html.contains(r##"data-wave-color="#ff0000""##));
    }
}
