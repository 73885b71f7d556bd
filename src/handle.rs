//! The seam between a player and the engine that actually plays audio.
//!
//! Decoding, waveform drawing and output are owned by an external engine. A
//! player only ever talks to it through `PlaybackHandle`: transport calls,
//! position/duration/rate/volume queries and listener subscription. Listener
//! identity is the `Rc` allocation, so unsubscribing requires the same
//! `Listener` value that was subscribed.

use std::rc::Rc;

/// Notifications a handle delivers to its listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackEvent {
    Play,
    Pause,
    TimeUpdate,
    Seek,
    Ready,
    Finish,
}

impl PlaybackEvent {
    pub const ALL: [PlaybackEvent; 6] = [
        PlaybackEvent::Play,
        PlaybackEvent::Pause,
        PlaybackEvent::TimeUpdate,
        PlaybackEvent::Seek,
        PlaybackEvent::Ready,
        PlaybackEvent::Finish,
    ];
}

/// Callback invoked with the handle that emitted the event
pub type Listener = Rc<dyn Fn(&mut dyn PlaybackHandle)>;

pub trait PlaybackHandle {
    /// Current position in seconds
    fn current_time(&self) -> f64;
    /// Total length in seconds; NaN or 0 until the source has loaded
    fn duration(&self) -> f64;
    fn is_playing(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);
    fn seek_to(&mut self, seconds: f64);
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64);
    fn volume(&self) -> f64;
    fn set_volume(&mut self, volume: f64);
    fn on(&mut self, event: PlaybackEvent, listener: Listener);
    fn un(&mut self, event: PlaybackEvent, listener: &Listener);
}

/// Listener bookkeeping shared by handle implementations.
#[derive(Default)]
pub struct Listeners {
    entries: Vec<(PlaybackEvent, Listener)>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, event: PlaybackEvent, listener: Listener) {
        self.entries.push((event, listener));
    }

    /// Remove one registration of exactly this listener for `event`
    pub fn remove(&mut self, event: PlaybackEvent, listener: &Listener) -> bool {
        let position = self
            .entries
            .iter()
            .position(|(e, l)| *e == event && Rc::ptr_eq(l, listener));

        match position {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Listeners for `event`, cloned so they may re-enter the handle
    pub fn snapshot(&self, event: PlaybackEvent) -> Vec<Listener> {
        self.entries
            .iter()
            .filter(|(e, _)| *e == event)
            .map(|(_, l)| Rc::clone(l))
            .collect()
    }

    pub fn count(&self, event: PlaybackEvent) -> usize {
        self.entries.iter().filter(|(e, _)| *e == event).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Call each listener with the handle that emitted the event.
pub fn emit<H: PlaybackHandle>(handle: &mut H, listeners: Vec<Listener>) {
    for listener in listeners {
        listener(&mut *handle);
    }
}

/// A handle with no audio output behind it.
///
/// Transport state lives in memory and time only moves through `advance`.
/// Page scans use it to build players without opening an audio device, and
/// it doubles as the stand-in engine in tests.
pub struct DetachedHandle {
    position: f64,
    duration: f64,
    playing: bool,
    rate: f64,
    volume: f64,
    listeners: Listeners,
}

impl DetachedHandle {
    /// A handle whose duration is not known yet
    pub fn new() -> Self {
        Self {
            position: 0.0,
            duration: f64::NAN,
            playing: false,
            rate: 1.0,
            volume: 1.0,
            listeners: Listeners::new(),
        }
    }

    pub fn with_duration(duration: f64) -> Self {
        let mut handle = Self::new();
        handle.duration = duration;
        handle
    }

    /// Report the duration as known and notify `Ready` listeners
    pub fn finish_loading(&mut self, duration: f64) {
        self.duration = duration;
        let listeners = self.listeners.snapshot(PlaybackEvent::Ready);
        emit(self, listeners);
    }

    /// Move the playhead by `seconds` of wall time scaled by the rate.
    ///
    /// Reaching the end pauses playback and notifies `Finish` listeners.
    pub fn advance(&mut self, seconds: f64) {
        if !self.playing {
            return;
        }

        self.position += seconds * self.rate;
        let listeners = self.listeners.snapshot(PlaybackEvent::TimeUpdate);
        emit(self, listeners);

        if self.duration.is_finite() && self.position >= self.duration {
            self.position = self.duration;
            self.playing = false;
            let listeners = self.listeners.snapshot(PlaybackEvent::Finish);
            emit(self, listeners);
        }
    }

    pub fn listener_count(&self, event: PlaybackEvent) -> usize {
        self.listeners.count(event)
    }

    pub fn total_listeners(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for DetachedHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackHandle for DetachedHandle {
    fn current_time(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn play(&mut self) {
        // Playing from the end starts over, like a media element does
        if self.duration.is_finite() && self.position >= self.duration {
            self.position = 0.0;
        }
        self.playing = true;
        let listeners = self.listeners.snapshot(PlaybackEvent::Play);
        emit(self, listeners);
    }

    fn pause(&mut self) {
        self.playing = false;
        let listeners = self.listeners.snapshot(PlaybackEvent::Pause);
        emit(self, listeners);
    }

    fn seek_to(&mut self, seconds: f64) {
        let upper = if self.duration.is_finite() {
            self.duration
        } else {
            f64::MAX
        };
        self.position = seconds.clamp(0.0, upper);
        let listeners = self.listeners.snapshot(PlaybackEvent::Seek);
        emit(self, listeners);
    }

    fn playback_rate(&self) -> f64 {
        self.rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn on(&mut self, event: PlaybackEvent, listener: Listener) {
        self.listeners.add(event, listener);
    }

    fn un(&mut self, event: PlaybackEvent, listener: &Listener) {
        self.listeners.remove(event, listener);
    }
}
