use crate::model::Track;
use anyhow::{Context, Result};
use crossterm::execute;
use crossterm::terminal::SetTitle;
use rodio::Source;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use std::fs::File;
use std::io::stdout;
use std::time::{Duration, Instant};

const MAX_VOLUME: f32 = 2.5;

/// Single-track media backend. `load` only stages a track; playback begins on
/// an explicit `play`, which may fail and must leave the player paused when it
/// does.
pub trait MediaPlayer {
    fn load(&mut self, track: &Track);
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn stop(&mut self);
    fn position(&self) -> Option<Duration>;
    fn duration(&self) -> Option<Duration>;
    fn seek_to(&mut self, position: Duration) -> Result<()>;
    fn is_finished(&self) -> bool;
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);
    fn output_name(&self) -> Option<String>;
}

pub struct RodioPlayer {
    stream: OutputStream,
    sink: Sink,
    current: Option<Track>,
    track_duration: Option<Duration>,
    load_error: Option<String>,
    volume: f32,
}

impl RodioPlayer {
    pub fn new() -> Result<Self> {
        let (stream, sink) = Self::open_output_stream()?;
        Ok(Self {
            stream,
            sink,
            current: None,
            track_duration: None,
            load_error: None,
            volume: 1.0,
        })
    }

    fn open_output_stream() -> Result<(OutputStream, Sink)> {
        let mut stream = OutputStreamBuilder::from_default_device()
            .context("failed to open default system output stream")?
            .with_error_callback(|_| {})
            .open_stream_or_fallback()
            .context("failed to start output stream")?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());
        Ok((stream, sink))
    }
}

impl MediaPlayer for RodioPlayer {
    fn load(&mut self, track: &Track) {
        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.sink.set_volume(self.volume);
        self.sink.pause();
        self.current = Some(track.clone());
        self.track_duration = None;
        self.load_error = None;

        // Decode failures are remembered, not raised: they surface when the
        // caller asks for playback, like a media element's error state.
        match File::open(&track.url) {
            Ok(file) => match Decoder::try_from(file) {
                Ok(source) => {
                    self.track_duration = source.total_duration();
                    self.sink.append(source);
                }
                Err(err) => {
                    self.load_error = Some(format!("failed to decode {}: {err}", track.url));
                }
            },
            Err(err) => {
                self.load_error = Some(format!("failed to open {}: {err}", track.url));
            }
        }

        set_now_playing_title(track);
    }

    fn play(&mut self) -> Result<()> {
        if self.current.is_none() {
            anyhow::bail!("no track loaded");
        }
        if let Some(reason) = &self.load_error {
            anyhow::bail!("cannot start playback: {reason}");
        }
        self.sink.play();
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn stop(&mut self) {
        self.sink.stop();
        self.current = None;
        self.track_duration = None;
        self.load_error = None;
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.sink.get_pos())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        if self.current.is_none() {
            anyhow::bail!("no active track");
        }
        self.sink
            .try_seek(position)
            .map_err(|err| anyhow::anyhow!("failed to seek current track: {err:?}"))
    }

    fn is_finished(&self) -> bool {
        self.current.is_some() && !self.sink.is_paused() && self.sink.empty()
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, MAX_VOLUME);
        self.sink.set_volume(self.volume);
    }

    fn output_name(&self) -> Option<String> {
        Some(String::from("System default output"))
    }
}

// Terminal-title stand-in for platform "now playing" metadata display.
fn set_now_playing_title(track: &Track) {
    let title = if track.artist.is_empty() {
        format!("aria - {}", track.title)
    } else {
        format!("aria - {} / {}", track.title, track.artist)
    };
    let _ = execute!(stdout(), SetTitle(title));
}

/// Keeps transport state on a logical clock when no audio device is usable.
pub struct SimulatedPlayer {
    current: Option<Track>,
    paused: bool,
    started_at: Option<Instant>,
    position_offset: Duration,
    track_duration: Option<Duration>,
    volume: f32,
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        Self {
            current: None,
            paused: true,
            started_at: None,
            position_offset: Duration::ZERO,
            track_duration: None,
            volume: 1.0,
        }
    }

    fn estimate_duration(url: &str) -> Option<Duration> {
        let file = File::open(url).ok()?;
        let source = Decoder::try_from(file).ok()?;
        source
            .total_duration()
            .filter(|duration| !duration.is_zero())
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if !self.paused
            && self.current.is_some()
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        if let Some(duration) = self.track_duration {
            return position.min(duration);
        }
        position
    }
}

impl Default for SimulatedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaPlayer for SimulatedPlayer {
    fn load(&mut self, track: &Track) {
        self.current = Some(track.clone());
        self.paused = true;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = Self::estimate_duration(&track.url);
    }

    fn play(&mut self) -> Result<()> {
        if self.current.is_none() {
            anyhow::bail!("no track loaded");
        }
        self.paused = false;
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn pause(&mut self) {
        self.position_offset = self.current_position();
        self.started_at = None;
        self.paused = true;
    }

    fn stop(&mut self) {
        self.current = None;
        self.paused = true;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = None;
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.current_position())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        if self.current.is_none() {
            anyhow::bail!("no active track");
        }
        self.position_offset = self
            .track_duration
            .map_or(position, |duration| position.min(duration));
        self.started_at = if self.paused {
            None
        } else {
            Some(Instant::now())
        };
        Ok(())
    }

    fn is_finished(&self) -> bool {
        let Some(duration) = self.track_duration else {
            return false;
        };
        self.current.is_some() && !self.paused && self.current_position() >= duration
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, MAX_VOLUME);
    }

    fn output_name(&self) -> Option<String> {
        Some(String::from("Simulated output"))
    }
}

#[cfg(test)]
mod tests {
    use super::{MediaPlayer, SimulatedPlayer};
    use crate::model::Track;
    use std::thread;
    use std::time::Duration;

    fn track(url: &str) -> Track {
        Track {
            id: 1,
            title: String::from("fixture"),
            artist: String::new(),
            url: String::from(url),
            cover: None,
        }
    }

    #[test]
    fn simulated_load_does_not_start_the_clock() {
        let mut player = SimulatedPlayer::new();
        player.load(&track("nonexistent-track.flac"));

        thread::sleep(Duration::from_millis(20));
        let position = player.position().expect("position should be present");
        assert_eq!(position, Duration::ZERO, "load must stage, not play");
    }

    #[test]
    fn simulated_position_advances_only_while_playing() {
        let mut player = SimulatedPlayer::new();
        player.load(&track("nonexistent-track.flac"));
        player.play().expect("play should work in simulated mode");

        thread::sleep(Duration::from_millis(20));
        let playing = player.position().expect("position should be present");
        assert!(playing > Duration::ZERO);

        player.pause();
        let paused = player.position().expect("position should be present");
        thread::sleep(Duration::from_millis(20));
        let paused_later = player.position().expect("position should be present");
        assert_eq!(paused_later, paused, "position should freeze while paused");
    }

    #[test]
    fn simulated_seek_moves_logical_position() {
        let mut player = SimulatedPlayer::new();
        player.load(&track("nonexistent-track.flac"));
        player.play().expect("play should work in simulated mode");

        let target = Duration::from_secs(12);
        player.seek_to(target).expect("seek should succeed");
        let position = player.position().expect("position should be present");
        assert!(position >= target);
    }

    #[test]
    fn simulated_play_without_load_is_refused() {
        let mut player = SimulatedPlayer::new();
        assert!(player.play().is_err());
    }

    #[test]
    fn simulated_unknown_duration_never_finishes() {
        let mut player = SimulatedPlayer::new();
        player.load(&track("nonexistent-track.flac"));
        player.play().expect("play should work in simulated mode");
        assert_eq!(player.duration(), None);

        thread::sleep(Duration::from_millis(40));
        assert!(!player.is_finished());
    }
}
