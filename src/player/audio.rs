//! Audio playback engine behind the terminal player.
//!
//! Files are decoded once into interleaved `f32` samples (WAV through hound,
//! FLAC through claxon, everything else through rodio's decoder) and played
//! by a rodio sink. rodio cannot seek an appended source, so seeking reloads
//! the sink from the target sample. The engine implements `PlaybackHandle`;
//! `poll` must be called once per frame to deliver time updates and detect
//! the end of the track.

use docwave::handle::{Listener, Listeners, PlaybackEvent, PlaybackHandle, emit};
use docwave::page::{AudioSource, Theme};
use docwave::plugin::HandleFactory;
use log::{debug, error, info};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use super::waveform;

/// Slowest speed handed to the sink; a zero-speed sink cannot resample
const MIN_SINK_SPEED: f32 = 0.01;

/// Interleaved samples normalised to [-1, 1]
pub struct DecodedAudio {
    samples: Arc<Vec<f32>>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn open(path: &Path) -> Result<Self, Box<dyn Error>> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let audio = match ext.as_str() {
            "wav" => Self::from_wav(hound::WavReader::new(BufReader::new(File::open(path)?))?)?,
            "flac" => Self::from_flac(claxon::FlacReader::open(path)?)?,
            "mp3" | "ogg" => Self::from_decoder(Decoder::new(BufReader::new(File::open(path)?))?)?,
            _ => return Err(format!("Unsupported audio format: {ext}").into()),
        };

        info!(
            "Decoded {}: {} Hz, {} channels, {:.3}s",
            path.display(),
            audio.sample_rate,
            audio.channels,
            audio.duration_secs()
        );
        Ok(audio)
    }

    pub fn from_wav<R: Read>(mut reader: hound::WavReader<R>) -> Result<Self, Box<dyn Error>> {
        let spec = reader.spec();

        let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, _) => reader.samples::<f32>().collect::<Result<_, _>>()?,
            (hound::SampleFormat::Int, 8) => reader
                .samples::<i8>()
                .map(|s| s.map(|s| s as f32 / 128.0))
                .collect::<Result<_, _>>()?,
            (hound::SampleFormat::Int, 16) => reader
                .samples::<i16>()
                .map(|s| s.map(|s| s as f32 / 32768.0))
                .collect::<Result<_, _>>()?,
            (hound::SampleFormat::Int, bits @ (24 | 32)) => {
                let scale = (1u64 << (bits - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / scale))
                    .collect::<Result<_, _>>()?
            }
            (_, bits) => return Err(format!("Unsupported bit depth: {bits}").into()),
        };

        Ok(Self {
            samples: Arc::new(samples),
            channels: spec.channels,
            sample_rate: spec.sample_rate,
        })
    }

    fn from_flac<R: Read>(mut reader: claxon::FlacReader<R>) -> Result<Self, Box<dyn Error>> {
        let info = reader.streaminfo();
        let scale = (1u64 << (info.bits_per_sample - 1)) as f32;

        let mut samples = Vec::new();
        for sample in reader.samples() {
            samples.push(sample? as f32 / scale);
        }

        Ok(Self {
            samples: Arc::new(samples),
            channels: info.channels as u16,
            sample_rate: info.sample_rate,
        })
    }

    fn from_decoder(decoder: Decoder<BufReader<File>>) -> Result<Self, Box<dyn Error>> {
        let channels = decoder.channels();
        let sample_rate = decoder.sample_rate();
        let samples: Vec<f32> = decoder.convert_samples::<f32>().collect();
        if samples.is_empty() {
            return Err("Decoded stream contains no samples".into());
        }

        Ok(Self {
            samples: Arc::new(samples),
            channels,
            sample_rate,
        })
    }

    fn samples_per_second(&self) -> f64 {
        self.sample_rate as f64 * self.channels.max(1) as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.samples_per_second()
    }

    /// Sample index of the frame at `seconds`
    fn sample_at(&self, seconds: f64) -> usize {
        let frame = (seconds.max(0.0) * self.sample_rate as f64) as usize;
        (frame * self.channels.max(1) as usize).min(self.samples.len())
    }

    pub fn peaks(&self, buckets: usize) -> Vec<f32> {
        waveform::compute_peaks(&self.samples, self.channels, buckets)
    }
}

/// Source that replays decoded samples and reports how far it got
struct PcmSource {
    samples: Arc<Vec<f32>>,
    position: usize,
    channels: u16,
    sample_rate: u32,
    played: Arc<AtomicUsize>,
}

impl Iterator for PcmSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let sample = *self.samples.get(self.position)?;
        self.position += 1;
        self.played.store(self.position, Ordering::Relaxed);
        Some(sample)
    }
}

impl Source for PcmSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        let seconds = self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64);
        Some(Duration::from_secs_f64(seconds))
    }
}

pub struct AudioEngine {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    sink: Sink,
    audio: DecodedAudio,
    played: Arc<AtomicUsize>,
    playing: bool,
    rate: f64,
    last_reported: f64,
    listeners: Listeners,
}

impl AudioEngine {
    /// Decode `path` and queue it paused on the default output device
    pub fn open(path: &Path) -> Result<Self, Box<dyn Error>> {
        let audio = DecodedAudio::open(path)?;
        if audio.is_empty() {
            return Err(format!("{} contains no audio", path.display()).into());
        }

        let (stream, stream_handle) = OutputStream::try_default()?;
        let sink = Sink::try_new(&stream_handle)?;

        let mut engine = Self {
            _stream: stream,
            stream_handle,
            sink,
            audio,
            played: Arc::new(AtomicUsize::new(0)),
            playing: false,
            rate: 1.0,
            last_reported: 0.0,
            listeners: Listeners::new(),
        };
        engine.queue_from(0)?;
        Ok(engine)
    }

    pub fn audio(&self) -> &DecodedAudio {
        &self.audio
    }

    /// Deliver time updates and detect the end of the track
    pub fn poll(&mut self) {
        if !self.playing {
            return;
        }

        let position = self.current_time();
        if position != self.last_reported {
            self.last_reported = position;
            let listeners = self.listeners.snapshot(PlaybackEvent::TimeUpdate);
            emit(self, listeners);
        }

        if self.sink.empty() {
            info!("Playback finished");
            self.playing = false;
            self.played.store(self.audio.len(), Ordering::Relaxed);
            let listeners = self.listeners.snapshot(PlaybackEvent::Finish);
            emit(self, listeners);
        }
    }

    /// Replace the sink with one that starts at `start_sample`
    fn queue_from(&mut self, start_sample: usize) -> Result<(), Box<dyn Error>> {
        let volume = self.sink.volume();
        self.sink.stop();
        self.sink = Sink::try_new(&self.stream_handle)?;
        self.sink.set_volume(volume);
        self.sink.set_speed((self.rate as f32).max(MIN_SINK_SPEED));

        self.played.store(start_sample, Ordering::Relaxed);
        self.sink.append(PcmSource {
            samples: Arc::clone(&self.audio.samples),
            position: start_sample,
            channels: self.audio.channels,
            sample_rate: self.audio.sample_rate,
            played: Arc::clone(&self.played),
        });

        if !self.playing {
            self.sink.pause();
        }
        debug!("Queued from sample {start_sample}");
        Ok(())
    }
}

impl PlaybackHandle for AudioEngine {
    fn current_time(&self) -> f64 {
        self.played.load(Ordering::Relaxed) as f64 / self.audio.samples_per_second()
    }

    fn duration(&self) -> f64 {
        self.audio.duration_secs()
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn play(&mut self) {
        // A drained sink restarts from the top
        if self.sink.empty()
            && let Err(e) = self.queue_from(0)
        {
            error!("Could not restart playback: {e}");
            return;
        }
        self.playing = true;
        self.sink.play();
        let listeners = self.listeners.snapshot(PlaybackEvent::Play);
        emit(self, listeners);
    }

    fn pause(&mut self) {
        self.playing = false;
        self.sink.pause();
        let listeners = self.listeners.snapshot(PlaybackEvent::Pause);
        emit(self, listeners);
    }

    fn seek_to(&mut self, seconds: f64) {
        let target = self.audio.sample_at(seconds.min(self.duration()));
        if let Err(e) = self.queue_from(target) {
            error!("Seek failed: {e}");
            return;
        }
        if self.playing {
            self.sink.play();
        }
        info!("Seek to {seconds:.3}s (sample {target})");
        let listeners = self.listeners.snapshot(PlaybackEvent::Seek);
        emit(self, listeners);
    }

    fn playback_rate(&self) -> f64 {
        self.rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.rate = rate.max(0.0);
        self.sink.set_speed((self.rate as f32).max(MIN_SINK_SPEED));
    }

    fn volume(&self) -> f64 {
        self.sink.volume() as f64
    }

    fn set_volume(&mut self, volume: f64) {
        self.sink.set_volume(volume.clamp(0.0, 1.0) as f32);
    }

    fn on(&mut self, event: PlaybackEvent, listener: Listener) {
        self.listeners.add(event, listener);
    }

    fn un(&mut self, event: PlaybackEvent, listener: &Listener) {
        self.listeners.remove(event, listener);
    }
}

/// Opens local audio for the sources of one page or one file
pub struct EngineFactory {
    base_dir: Option<PathBuf>,
}

impl EngineFactory {
    /// Relative source URLs resolve against `base_dir`
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self { base_dir }
    }

    pub fn local_path(&self, url: &str) -> Result<PathBuf, Box<dyn Error>> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        if path.contains("://") {
            return Err(format!("Remote audio is not supported: {url}").into());
        }
        let path = path.split(['?', '#']).next().unwrap_or(path);

        let path = PathBuf::from(shellexpand::tilde(path).as_ref());
        Ok(match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        })
    }
}

impl HandleFactory for EngineFactory {
    type Handle = AudioEngine;

    fn create(
        &mut self,
        source: &AudioSource,
        _theme: &Theme,
    ) -> Result<Self::Handle, Box<dyn Error>> {
        let path = self.local_path(&source.url)?;
        AudioEngine::open(&path)
    }
}
