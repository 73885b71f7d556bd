//! One player instance: its source, its panels and its session.
//!
//! Every control a player shows maps to a `Control`. Hosts translate their
//! clicks, key presses or button events into `Player::activate`, which keeps
//! all per-player state in this one record instead of scattering it over the
//! widgets.

use log::debug;

use crate::handle::PlaybackHandle;
use crate::page::AudioSource;
use crate::panels::{Panel, PanelVisibility};
use crate::session::{PlayerSession, SessionConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    PlayPause,
    /// The description label shares the play button's action
    Label,
    ToolbarToggle,
    Loop,
    SeekStart,
    FastForward,
    SpeedToggle,
    VolumeToggle,
    TimeToggle,
    /// The speed panel's label button, which snaps back to 1.00x
    SpeedReset,
    /// The volume panel's label button, which snaps back to 100%
    VolumeReset,
}

impl Control {
    /// Name used in generated markup (`data-control`)
    pub fn name(&self) -> &'static str {
        match self {
            Control::PlayPause => "play-pause",
            Control::Label => "label",
            Control::ToolbarToggle => "toolbar",
            Control::Loop => "loop",
            Control::SeekStart => "seek-start",
            Control::FastForward => "fast-forward",
            Control::SpeedToggle => "speed",
            Control::VolumeToggle => "volume",
            Control::TimeToggle => "time",
            Control::SpeedReset => "speed-reset",
            Control::VolumeReset => "volume-reset",
        }
    }

    /// Controls inside the toolbar, in display order
    pub const TOOLBAR: [Control; 6] = [
        Control::Loop,
        Control::SeekStart,
        Control::FastForward,
        Control::SpeedToggle,
        Control::VolumeToggle,
        Control::TimeToggle,
    ];

    /// Glyph drawn on the control's button
    pub fn glyph(&self) -> &'static str {
        match self {
            Control::PlayPause | Control::Label => "▶️",
            Control::ToolbarToggle => "⚙️",
            Control::Loop => "🔁",
            Control::SeekStart => "⏮️",
            Control::FastForward => "⏩",
            Control::SpeedToggle | Control::SpeedReset => "⚡",
            Control::VolumeToggle | Control::VolumeReset => "🔊",
            Control::TimeToggle => "⏱️",
        }
    }
}

pub struct Player<H: PlaybackHandle> {
    id: String,
    source: AudioSource,
    panels: PanelVisibility,
    session: PlayerSession<H>,
}

impl<H: PlaybackHandle> Player<H> {
    pub fn new(id: String, source: AudioSource, handle: H, config: SessionConfig) -> Self {
        Self {
            id,
            source,
            panels: PanelVisibility::new(),
            session: PlayerSession::attach(handle, config),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &AudioSource {
        &self.source
    }

    pub fn description(&self) -> Option<&str> {
        self.source.description.as_deref()
    }

    pub fn panels(&self) -> &PanelVisibility {
        &self.panels
    }

    pub fn session(&self) -> &PlayerSession<H> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut PlayerSession<H> {
        &mut self.session
    }

    /// Run the action bound to a control
    pub fn activate(&mut self, control: Control) {
        debug!("Player {} control {:?}", self.id, control);
        match control {
            Control::PlayPause => self.session.toggle_play_pause(),
            Control::Label => {
                if self.source.description.is_some() {
                    self.session.toggle_play_pause();
                }
            }
            Control::ToolbarToggle => self.panels.toggle(Panel::Toolbar),
            Control::Loop => {
                self.session.toggle_loop();
            }
            Control::SeekStart => self.session.seek_to_start(),
            Control::FastForward => {
                self.session.toggle_fast_forward();
            }
            Control::SpeedToggle => self.panels.toggle(Panel::Speed),
            Control::VolumeToggle => self.panels.toggle(Panel::Volume),
            Control::TimeToggle => self.panels.toggle(Panel::TimeRatio),
            Control::SpeedReset => self.session.reset_speed(),
            Control::VolumeReset => self.session.reset_volume(),
        }
    }

    /// Whether a control is highlighted right now
    pub fn is_highlighted(&self, control: Control) -> bool {
        let state = self.session.state();
        match control {
            Control::PlayPause => state.play_button.highlighted,
            Control::Label => state.label_highlighted,
            Control::ToolbarToggle => self.panels.is_highlighted(Panel::Toolbar),
            Control::Loop => state.looping,
            Control::FastForward => state.fast_forwarding,
            Control::SpeedToggle => self.panels.is_highlighted(Panel::Speed),
            Control::VolumeToggle => self.panels.is_highlighted(Panel::Volume),
            Control::TimeToggle => self.panels.is_highlighted(Panel::TimeRatio),
            Control::SeekStart | Control::SpeedReset | Control::VolumeReset => false,
        }
    }

    /// Whether a control is currently reachable
    pub fn is_visible(&self, control: Control) -> bool {
        match control {
            Control::PlayPause | Control::ToolbarToggle => true,
            Control::Label => self.source.description.is_some(),
            Control::Loop
            | Control::SeekStart
            | Control::FastForward
            | Control::SpeedToggle
            | Control::VolumeToggle
            | Control::TimeToggle => self.panels.toggle_buttons_shown(),
            Control::SpeedReset => self.panels.is_shown(Panel::Speed),
            Control::VolumeReset => self.panels.is_shown(Panel::Volume),
        }
    }

    pub fn input_speed(&mut self, slider: u8) {
        self.session.set_speed_slider(slider);
    }

    pub fn input_volume(&mut self, volume: f64) {
        self.session.set_volume_slider(volume);
    }

    /// Tear the player down; the handle stays alive until the player drops
    pub fn dispose(&mut self) {
        self.session.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::DetachedHandle;
    use crate::page::SourceKind;
    use crate::session::PlayIcon;

    fn player(description: Option<&str>) -> Player<DetachedHandle> {
        let source = AudioSource {
            url: "media/intro.mp3".to_string(),
            description: description.map(str::to_string),
            kind: SourceKind::Link,
            span: 0..0,
        };
        Player::new(
            "p0".to_string(),
            source,
            DetachedHandle::with_duration(12.0),
            SessionConfig::default(),
        )
    }

    #[test]
    fn test_label_and_button_share_action() {
        let mut player = player(Some("Intro"));

        player.activate(Control::Label);
        assert!(player.session().handle().is_playing());
        assert!(player.is_highlighted(Control::Label));
        assert!(player.is_highlighted(Control::PlayPause));

        player.activate(Control::PlayPause);
        assert!(!player.session().handle().is_playing());
        assert!(!player.is_highlighted(Control::Label));
        assert_eq!(player.session().state().play_button.icon, PlayIcon::Play);
    }

    #[test]
    fn test_label_missing_without_description() {
        let mut player = player(None);
        assert!(!player.is_visible(Control::Label));

        player.activate(Control::Label);
        assert!(!player.session().handle().is_playing());
    }

    #[test]
    fn test_toolbar_gates_toggle_buttons() {
        let mut player = player(None);
        assert!(player.is_visible(Control::PlayPause));
        assert!(!player.is_visible(Control::Loop));
        assert!(!player.is_visible(Control::SpeedToggle));

        player.activate(Control::ToolbarToggle);
        assert!(player.is_visible(Control::Loop));
        assert!(player.is_visible(Control::TimeToggle));
        assert!(!player.is_visible(Control::SpeedReset));

        player.activate(Control::SpeedToggle);
        assert!(player.is_visible(Control::SpeedReset));
        assert!(player.is_highlighted(Control::SpeedToggle));

        player.activate(Control::VolumeToggle);
        assert!(!player.is_visible(Control::SpeedReset));
        assert!(player.is_visible(Control::VolumeReset));
    }

    #[test]
    fn test_loop_highlight() {
        let mut player = player(None);
        player.activate(Control::Loop);
        assert!(player.is_highlighted(Control::Loop));
        player.activate(Control::Loop);
        assert!(!player.is_highlighted(Control::Loop));
    }

    #[test]
    fn test_speed_reset_control() {
        let mut player = player(None);
        player.input_speed(80);
        player.activate(Control::SpeedReset);
        assert_eq!(player.session().speed_readout().text(), "1.00x");
    }
}
