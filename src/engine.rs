use crate::model::{PlaybackSnapshot, Track};
use crate::player::MediaPlayer;
use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::time::Duration;

type Listener = Box<dyn FnMut(&PlaybackSnapshot)>;

/// Owns the queue, both orderings, the cursors and the media player, and
/// republishes every state change as a whole [`PlaybackSnapshot`].
///
/// Transport contract: `load_queue` stages a track without starting playback;
/// `next`, `previous`, `shuffle`, `reset_shuffle` and `play_track` always
/// attempt to start it.
pub struct PlayerEngine {
    player: Box<dyn MediaPlayer>,
    queue: Vec<Track>,
    index: usize,
    shuffle_order: Vec<usize>,
    shuffle_cursor: usize,
    shuffled: bool,
    current: Option<Track>,
    playing: bool,
    elapsed: Duration,
    duration: Option<Duration>,
    repairs: u32,
    rng: SmallRng,
    listeners: Vec<Listener>,
}

impl PlayerEngine {
    pub fn new(player: Box<dyn MediaPlayer>) -> Self {
        Self {
            player,
            queue: Vec::new(),
            index: 0,
            shuffle_order: Vec::new(),
            shuffle_cursor: 0,
            shuffled: false,
            current: None,
            playing: false,
            elapsed: Duration::ZERO,
            duration: None,
            repairs: 0,
            rng: SmallRng::from_os_rng(),
            listeners: Vec::new(),
        }
    }

    /// Registers a listener and immediately delivers the latest snapshot, so
    /// surfaces joining mid-session never start blank.
    pub fn subscribe(&mut self, mut listener: impl FnMut(&PlaybackSnapshot) + 'static) {
        listener(&self.snapshot());
        self.listeners.push(Box::new(listener));
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let progress = match self.duration {
            Some(duration) if !duration.is_zero() => {
                (self.elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
            }
            _ => 0.0,
        };
        PlaybackSnapshot {
            current: self.current.clone(),
            playing: self.playing,
            shuffled: self.shuffled,
            progress,
            elapsed: self.elapsed,
            duration: self.duration,
            queue: self.active_queue(),
            index: self.active_index(),
        }
    }

    pub fn active_queue(&self) -> Vec<Track> {
        if self.shuffled {
            self.shuffle_order
                .iter()
                .filter_map(|&idx| self.queue.get(idx))
                .cloned()
                .collect()
        } else {
            self.queue.clone()
        }
    }

    pub fn active_index(&self) -> usize {
        if self.shuffled {
            self.shuffle_cursor
        } else {
            self.index
        }
    }

    /// Queue in listing order, for playlist surfaces.
    pub fn queue(&self) -> &[Track] {
        &self.queue
    }

    /// Times a stale-permutation lookup had to be repaired. Stays zero unless
    /// a queue invariant was broken elsewhere.
    pub fn permutation_repairs(&self) -> u32 {
        self.repairs
    }

    /// Replaces both orderings with a copy of `tracks` and stages the track at
    /// the clamped `start_index`. Never starts playback and never touches the
    /// play/pause flag.
    pub fn load_queue(&mut self, tracks: &[Track], start_index: usize) {
        self.queue = tracks.to_vec();
        self.reshuffle();
        self.elapsed = Duration::ZERO;
        self.duration = None;

        if self.queue.is_empty() {
            self.index = 0;
            self.current = None;
            self.player.stop();
            self.publish();
            return;
        }

        self.index = start_index.min(self.queue.len() - 1);
        if self.shuffled {
            let id = self.queue[self.index].id;
            self.shuffle_cursor = self.locate_shuffled(id).unwrap_or(0);
        }
        self.stage_active();
        self.publish();
    }

    /// Requests playback start. A refusal is surfaced to the caller and the
    /// play flag stays down; nothing else changes.
    pub fn play(&mut self) -> Result<()> {
        self.player.play()?;
        self.playing = true;
        self.publish();
        Ok(())
    }

    pub fn pause(&mut self) {
        self.player.pause();
        self.playing = false;
        self.publish();
    }

    pub fn toggle(&mut self) -> Result<()> {
        if self.playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Seeks to `fraction` of the reported duration; silent no-op while the
    /// duration is unknown.
    pub fn seek_to(&mut self, fraction: f64) {
        if !fraction.is_finite() {
            return;
        }
        let Some(duration) = self.player.duration().filter(|d| !d.is_zero()) else {
            return;
        };
        let target = duration.mul_f64(fraction.clamp(0.0, 1.0));
        if self.player.seek_to(target).is_ok() {
            self.elapsed = target;
            self.duration = Some(duration);
            self.publish();
        }
    }

    pub fn next(&mut self) -> Result<()> {
        self.step(1)
    }

    pub fn previous(&mut self) -> Result<()> {
        self.step(-1)
    }

    fn step(&mut self, delta: isize) -> Result<()> {
        let len = self.queue.len();
        if len == 0 {
            return Ok(());
        }
        let cursor = self.active_index() as isize;
        let moved = (cursor + delta).rem_euclid(len as isize) as usize;
        if self.shuffled {
            self.shuffle_cursor = moved;
        } else {
            self.index = moved;
        }
        self.stage_active();
        self.publish();
        self.play()
    }

    /// Enables shuffle mode. Always regenerates the permutation, restarts from
    /// its first track and attempts playback.
    pub fn shuffle(&mut self) -> Result<()> {
        self.shuffled = true;
        self.reshuffle();
        if self.queue.is_empty() {
            self.publish();
            return Ok(());
        }
        self.stage_active();
        self.publish();
        self.play()
    }

    /// Disables shuffle mode, keeping the same current track: the linear
    /// cursor is moved to it rather than the other way round.
    pub fn reset_shuffle(&mut self) -> Result<()> {
        self.shuffled = false;
        if let Some(id) = self.current.as_ref().map(|track| track.id) {
            self.index = self.locate_linear(id).unwrap_or(0);
        }
        self.publish();
        if self.current.is_none() {
            return Ok(());
        }
        self.play()
    }

    /// Jumps to an arbitrary track picked from a playlist surface and starts
    /// playback. A stale shuffled permutation is regenerated once; the retry
    /// cannot miss because the permutation covers the same tracks.
    pub fn play_track(&mut self, track: &Track, linear_index: usize) -> Result<()> {
        if self.queue.is_empty() {
            return Ok(());
        }
        self.index = linear_index.min(self.queue.len() - 1);
        if self.shuffled {
            self.shuffle_cursor = match self.locate_shuffled(track.id) {
                Some(position) => position,
                None => {
                    self.repairs += 1;
                    self.reshuffle();
                    self.locate_shuffled(track.id).unwrap_or(0)
                }
            };
        }
        self.current = Some(track.clone());
        self.elapsed = Duration::ZERO;
        self.player.load(track);
        self.duration = self.player.duration();
        self.publish();
        self.play()
    }

    /// Pumps the adapter's position report and auto-advances on end-of-track.
    /// Driven by the app's event loop.
    pub fn tick(&mut self) -> Result<()> {
        if self.current.is_none() {
            return Ok(());
        }
        if self.playing && self.player.is_finished() {
            return self.next();
        }
        let elapsed = self.player.position().unwrap_or_default();
        let duration = self.player.duration();
        if elapsed != self.elapsed || duration != self.duration {
            self.elapsed = elapsed;
            self.duration = duration;
            self.publish();
        }
        Ok(())
    }

    pub fn volume(&self) -> f32 {
        self.player.volume()
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.player.set_volume(volume);
    }

    pub fn output_name(&self) -> Option<String> {
        self.player.output_name()
    }

    fn stage_active(&mut self) {
        let track = if self.shuffled {
            self.shuffle_order
                .get(self.shuffle_cursor)
                .and_then(|&idx| self.queue.get(idx))
        } else {
            self.queue.get(self.index)
        }
        .cloned();

        if let Some(track) = track {
            self.elapsed = Duration::ZERO;
            self.player.load(&track);
            self.duration = self.player.duration();
            self.current = Some(track);
        }
    }

    fn locate_linear(&self, id: u32) -> Option<usize> {
        self.queue.iter().position(|track| track.id == id)
    }

    fn locate_shuffled(&self, id: u32) -> Option<usize> {
        self.shuffle_order
            .iter()
            .position(|&idx| self.queue.get(idx).is_some_and(|track| track.id == id))
    }

    fn reshuffle(&mut self) {
        self.shuffle_order = (0..self.queue.len()).collect();
        self.shuffle_order.shuffle(&mut self.rng);
        self.shuffle_cursor = 0;
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        for listener in &mut self.listeners {
            listener(&snapshot);
        }
    }
}
