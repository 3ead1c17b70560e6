use crate::model::Track;
use anyhow::{Context, Result};
use lofty::prelude::{Accessor, TaggedFileExt};
use lofty::probe::Probe;
use serde::Deserialize;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "ogg", "flac"];

const COVER_SEEDS: &[u32] = &[
    1001, 1002, 1003, 1004, 1005, 1006, 1007, 1008, 1009, 1010,
];

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

#[derive(Debug, Deserialize)]
struct ListingEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    download_url: Option<String>,
}

pub fn load_listing(path: &Path) -> Result<Vec<Track>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read listing {}", path.display()))?;
    tracks_from_listing(&raw)
}

/// Maps a remote content-listing document (an array of file entries) to
/// tracks. Ids are assigned 1-based over the audio-extension matches in
/// listing order, titles are the file stems, and covers are derived from
/// `(title, id)` so the same listing always yields the same artwork.
pub fn tracks_from_listing(json: &str) -> Result<Vec<Track>> {
    let entries: Vec<ListingEntry> =
        serde_json::from_str(json).context("failed to parse track listing")?;

    let tracks = entries
        .into_iter()
        .filter(|entry| entry.kind == "file" && is_audio_name(&entry.name))
        .enumerate()
        .map(|(position, entry)| {
            let title = file_stem(&entry.name);
            let id = (position + 1) as u32;
            let cover = cover_for(&title, id);
            Track {
                id,
                title,
                artist: String::new(),
                url: entry.download_url.unwrap_or_default(),
                cover: Some(cover),
            }
        })
        .collect();
    Ok(tracks)
}

/// Offline provider: walks a folder and applies the same construction rule,
/// with embedded tags upgrading title and artist when present.
pub fn scan_folder(root: &Path) -> Vec<Track> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_audio_path(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    files
        .iter()
        .enumerate()
        .map(|(position, path)| {
            let stem = path
                .file_stem()
                .and_then(OsStr::to_str)
                .unwrap_or("unknown")
                .to_string();
            let (title, artist) = tagged_title_artist(path, stem);
            let id = (position + 1) as u32;
            let cover = cover_for(&title, id);
            Track {
                id,
                title,
                artist,
                url: path.to_string_lossy().to_string(),
                cover: Some(cover),
            }
        })
        .collect()
}

fn tagged_title_artist(path: &Path, fallback_title: String) -> (String, String) {
    let Ok(tagged_file) = Probe::open(path).and_then(|probe| probe.read()) else {
        return (fallback_title, String::new());
    };

    let tag = tagged_file.primary_tag();
    let title = tag
        .and_then(Accessor::title)
        .map(|value| value.to_string())
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(fallback_title);
    let artist = tag
        .and_then(Accessor::artist)
        .map(|value| value.to_string())
        .unwrap_or_default();
    (title, artist)
}

pub fn cover_for(title: &str, id: u32) -> String {
    let hash = fnv1a(&format!("{title}::{id}"));
    let seed = COVER_SEEDS[hash as usize % COVER_SEEDS.len()];
    format!("https://picsum.photos/seed/abstract-{seed}/600/600")
}

// 32-bit FNV-1a over UTF-16 code units, kept bit-compatible with the artwork
// addressing already deployed against the same listing.
fn fnv1a(value: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for unit in value.encode_utf16() {
        hash ^= u32::from(unit);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or(name)
        .to_string()
}

fn is_audio_name(name: &str) -> bool {
    is_audio_path(Path::new(name))
}

fn is_audio_path(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}
