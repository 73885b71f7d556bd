//! Player session: the bridge between a playback handle and the readouts.
//!
//! A session owns one handle for its whole life. It subscribes forwarding
//! listeners for every notification the handle emits and drains them on each
//! operation and timer tick, so the play button, the time readouts and the
//! speed/volume readouts always reflect the handle. Every listener it
//! registers is tracked and removed again by `dispose`, which also cancels
//! the refresh timer.

use log::{debug, info, warn};
use std::rc::Rc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::constants::{
    DEFAULT_FAST_FORWARD_FACTOR, DEFAULT_UPDATE_INTERVAL_MS, SPEED_SLIDER_DEFAULT,
    SPEED_SLIDER_MAX,
};
use crate::format::{format_rate, format_ratio, format_time, format_volume, parse_time};
use crate::handle::{Listener, PlaybackEvent, PlaybackHandle};
use crate::rate::map_slider_to_rate;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub update_interval: Duration,
    pub fast_forward_factor: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_millis(DEFAULT_UPDATE_INTERVAL_MS),
            fast_forward_factor: DEFAULT_FAST_FORWARD_FACTOR,
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            update_interval: Duration::from_millis(config.update_interval_ms.max(1)),
            fast_forward_factor: config.fast_forward_factor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayIcon {
    Play,
    Pause,
}

impl PlayIcon {
    pub fn glyph(&self) -> &'static str {
        match self {
            PlayIcon::Play => "▶️",
            PlayIcon::Pause => "⏸️",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayButton {
    pub icon: PlayIcon,
    pub highlighted: bool,
}

/// Per-player flags that the controls read and write
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub looping: bool,
    pub fast_forwarding: bool,
    pub play_button: PlayButton,
    pub label_highlighted: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            looping: false,
            fast_forwarding: false,
            play_button: PlayButton {
                icon: PlayIcon::Play,
                highlighted: false,
            },
            label_highlighted: false,
        }
    }
}

/// A text sink that only accepts writes which change its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readout {
    text: String,
    writes: u64,
}

impl Readout {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            text: initial.into(),
            writes: 0,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of writes that actually changed the text
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Returns whether the text changed
    pub fn set(&mut self, text: String) -> bool {
        if self.text == text {
            return false;
        }
        self.text = text;
        self.writes += 1;
        true
    }
}

/// Fixed-period timer polled from the host loop
#[derive(Debug, Clone)]
pub struct UpdateTimer {
    period: Duration,
    next_due: Instant,
}

impl UpdateTimer {
    pub fn start(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next_due: now + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// True once per elapsed period
    pub fn fire(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.period;
        true
    }
}

pub struct PlayerSession<H: PlaybackHandle> {
    handle: H,
    config: SessionConfig,
    state: SessionState,
    speed_slider: u8,
    volume_slider: f64,
    speed: Readout,
    volume: Readout,
    elapsed: Readout,
    total: Readout,
    ratio: Readout,
    timer: Option<UpdateTimer>,
    events: mpsc::Receiver<PlaybackEvent>,
    subscriptions: Vec<(PlaybackEvent, Listener)>,
    replay: Listener,
}

impl<H: PlaybackHandle> PlayerSession<H> {
    pub fn attach(handle: H, config: SessionConfig) -> Self {
        Self::attach_at(handle, config, Instant::now())
    }

    /// Attach with an explicit start time for the refresh timer
    pub fn attach_at(mut handle: H, config: SessionConfig, now: Instant) -> Self {
        let (tx, events) = mpsc::channel();
        let mut subscriptions = Vec::with_capacity(PlaybackEvent::ALL.len());

        for event in PlaybackEvent::ALL {
            let tx = tx.clone();
            let forward: Listener = Rc::new(move |_: &mut dyn PlaybackHandle| {
                let _ = tx.send(event);
            });
            handle.on(event, Rc::clone(&forward));
            subscriptions.push((event, forward));
        }

        let replay: Listener = Rc::new(|handle: &mut dyn PlaybackHandle| handle.play());
        let volume_slider = handle.volume().clamp(0.0, 1.0);
        let timer = Some(UpdateTimer::start(config.update_interval, now));

        let mut session = Self {
            handle,
            config,
            state: SessionState::default(),
            speed_slider: SPEED_SLIDER_DEFAULT,
            volume_slider,
            speed: Readout::new(format_rate(1.0)),
            volume: Readout::new(format_volume(volume_slider)),
            elapsed: Readout::new(format_time(0.0)),
            total: Readout::new(format_time(0.0)),
            ratio: Readout::new(format_ratio(0.0, 0.0)),
            timer,
            events,
            subscriptions,
            replay,
        };
        session.refresh_time();
        session.sync_play_state(session.handle.is_playing());
        session
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Direct access for hosts that need to drive the engine itself
    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn speed_slider(&self) -> u8 {
        self.speed_slider
    }

    pub fn volume_slider(&self) -> f64 {
        self.volume_slider
    }

    pub fn speed_readout(&self) -> &Readout {
        &self.speed
    }

    pub fn volume_readout(&self) -> &Readout {
        &self.volume
    }

    pub fn elapsed_readout(&self) -> &Readout {
        &self.elapsed
    }

    pub fn total_readout(&self) -> &Readout {
        &self.total
    }

    pub fn ratio_readout(&self) -> &Readout {
        &self.ratio
    }

    pub fn is_disposed(&self) -> bool {
        self.timer.is_none()
    }

    /// Pause when playing, play otherwise.
    ///
    /// Both the play button and the description label call this, so the two
    /// can never disagree about the play state.
    pub fn toggle_play_pause(&mut self) {
        if self.handle.is_playing() {
            self.handle.pause();
        } else {
            self.handle.play();
        }
        self.pump_events();
    }

    /// Returns whether looping is now enabled. A disposed session never
    /// subscribes again.
    pub fn toggle_loop(&mut self) -> bool {
        if self.is_disposed() {
            warn!("Ignoring loop toggle on a disposed session");
            return false;
        }
        self.state.looping = !self.state.looping;
        if self.state.looping {
            self.handle
                .on(PlaybackEvent::Finish, Rc::clone(&self.replay));
        } else {
            self.handle.un(PlaybackEvent::Finish, &self.replay);
        }
        info!(
            "Loop {}",
            if self.state.looping {
                "enabled"
            } else {
                "disabled"
            }
        );
        self.state.looping
    }

    pub fn toggle_fast_forward(&mut self) -> bool {
        self.state.fast_forwarding = !self.state.fast_forwarding;
        self.apply_rate();
        info!(
            "Fast forward {} at {}",
            if self.state.fast_forwarding {
                "on"
            } else {
                "off"
            },
            self.speed.text()
        );
        self.state.fast_forwarding
    }

    pub fn seek_to_start(&mut self) {
        self.handle.seek_to(0.0);
        self.pump_events();
    }

    /// Seek to a typed `M:SS.mmm` time. Unparseable input leaves the playhead alone.
    pub fn seek_to_typed(&mut self, text: &str) -> bool {
        match parse_time(text) {
            Some(seconds) => {
                self.handle.seek_to(seconds);
                self.pump_events();
                true
            }
            None => {
                debug!("Ignoring unparseable seek time {text:?}");
                false
            }
        }
    }

    pub fn set_speed_slider(&mut self, slider: u8) {
        self.speed_slider = slider.min(SPEED_SLIDER_MAX);
        self.apply_rate();
    }

    /// Back to 1.00x; also drops fast-forward
    pub fn reset_speed(&mut self) {
        self.state.fast_forwarding = false;
        self.set_speed_slider(SPEED_SLIDER_DEFAULT);
    }

    pub fn set_volume_slider(&mut self, volume: f64) {
        self.volume_slider = volume.clamp(0.0, 1.0);
        self.handle.set_volume(self.volume_slider);
        self.volume.set(format_volume(self.volume_slider));
    }

    pub fn reset_volume(&mut self) {
        self.set_volume_slider(1.0);
    }

    /// Drain notifications, then refresh the time readouts if the timer fired.
    pub fn tick(&mut self, now: Instant) {
        self.pump_events();
        let due = self.timer.as_mut().is_some_and(|timer| timer.fire(now));
        if due {
            self.refresh_time();
        }
    }

    /// Apply every notification received since the last call
    pub fn pump_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                PlaybackEvent::Play => self.sync_play_state(true),
                PlaybackEvent::Pause | PlaybackEvent::Finish => self.sync_play_state(false),
                PlaybackEvent::TimeUpdate | PlaybackEvent::Seek | PlaybackEvent::Ready => {
                    self.refresh_time();
                }
            }
        }
    }

    /// Re-read position and duration; returns whether any readout changed
    pub fn refresh_time(&mut self) -> bool {
        let current = self.handle.current_time();
        let duration = self.handle.duration();

        let elapsed = self.elapsed.set(format_time(current));
        let total = self.total.set(format_time(duration));
        let ratio = self.ratio.set(format_ratio(current, duration));
        elapsed || total || ratio
    }

    /// Cancel the timer and remove every listener this session registered
    pub fn dispose(&mut self) {
        if self.timer.take().is_none() {
            return;
        }

        for (event, listener) in self.subscriptions.drain(..) {
            self.handle.un(event, &listener);
        }
        if self.state.looping {
            self.handle.un(PlaybackEvent::Finish, &self.replay);
            self.state.looping = false;
        }
        debug!("Session disposed");
    }

    fn apply_rate(&mut self) {
        let mut rate = map_slider_to_rate(self.speed_slider);
        if self.state.fast_forwarding {
            rate *= self.config.fast_forward_factor;
        }
        self.handle.set_playback_rate(rate);
        self.speed.set(format_rate(rate));
    }

    fn sync_play_state(&mut self, playing: bool) {
        self.state.play_button = PlayButton {
            icon: if playing {
                PlayIcon::Pause
            } else {
                PlayIcon::Play
            },
            highlighted: playing,
        };
        self.state.label_highlighted = playing;
    }
}

impl<H: PlaybackHandle> Drop for PlayerSession<H> {
    fn drop(&mut self) {
        self.dispose();
    }
}
