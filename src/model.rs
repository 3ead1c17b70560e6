use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub artist: String,
    pub url: String,
    #[serde(default)]
    pub cover: Option<String>,
}

/// Everything a playback surface needs to render, published as one value so
/// no subscriber can observe a half-updated mix of fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackSnapshot {
    pub current: Option<Track>,
    pub playing: bool,
    pub shuffled: bool,
    pub progress: f64,
    pub elapsed: Duration,
    pub duration: Option<Duration>,
    pub queue: Vec<Track>,
    pub index: usize,
}
