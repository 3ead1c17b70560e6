use crate::config::{self, Settings};
use crate::engine::PlayerEngine;
use crate::listing;
use crate::model::{PlaybackSnapshot, Track};
use crate::player::{MediaPlayer, RodioPlayer, SimulatedPlayer};
use crate::ui;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const SEEK_STEP_SECONDS: i64 = 10;

#[derive(Debug, Default)]
pub struct AppOptions {
    pub listing: Option<PathBuf>,
    pub folder: Option<PathBuf>,
    pub start_index: usize,
    pub silent: bool,
}

pub fn run(options: AppOptions) -> Result<()> {
    let mut settings = config::load_settings()?;
    if let Some(listing) = &options.listing {
        settings.listing = Some(listing.clone());
        settings.folder = None;
    }
    if let Some(folder) = &options.folder {
        settings.folder = Some(folder.clone());
        settings.listing = None;
    }

    let (tracks, mut status) = load_tracks(&settings);

    let player: Box<dyn MediaPlayer> = if options.silent {
        Box::new(SimulatedPlayer::new())
    } else {
        match RodioPlayer::new() {
            Ok(player) => Box::new(player),
            Err(_) => Box::new(SimulatedPlayer::new()),
        }
    };
    let mut engine = PlayerEngine::new(player);
    engine.set_volume(settings.saved_volume);
    let output = engine.output_name();

    let latest = Arc::new(Mutex::new(PlaybackSnapshot::default()));
    let dirty = Arc::new(AtomicBool::new(true));
    {
        let latest = Arc::clone(&latest);
        let dirty = Arc::clone(&dirty);
        engine.subscribe(move |snapshot| {
            if let Ok(mut guard) = latest.lock() {
                *guard = snapshot.clone();
            }
            dirty.store(true, Ordering::Relaxed);
        });
    }

    engine.load_queue(&tracks, options.start_index);

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut selected = if tracks.is_empty() {
        0
    } else {
        options.start_index.min(tracks.len() - 1)
    };
    let mut last_tick = Instant::now();

    let result: Result<()> = loop {
        if let Err(err) = engine.tick() {
            status = format!("playback error: {err:#}");
            dirty.store(true, Ordering::Relaxed);
        }

        if dirty.swap(false, Ordering::Relaxed) || last_tick.elapsed() > Duration::from_millis(250)
        {
            let snapshot = latest
                .lock()
                .map(|guard| guard.clone())
                .unwrap_or_default();
            let volume = engine.volume();
            let drawn = terminal.draw(|frame| {
                ui::draw(
                    frame,
                    &snapshot,
                    &tracks,
                    selected,
                    &status,
                    output.as_deref(),
                    volume,
                )
            });
            if let Err(err) = drawn {
                break Err(err.into());
            }
            last_tick = Instant::now();
        }

        match event::poll(Duration::from_millis(33)) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(err) => break Err(err.into()),
        }

        let key = match event::read() {
            Ok(Event::Key(key)) => key,
            Ok(_) => continue,
            Err(err) => break Err(err.into()),
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let transport = |label: &str, outcome: Result<()>| match outcome {
            Ok(()) => None,
            Err(err) => Some(format!("{label} failed: {err:#}")),
        };

        let report = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break Ok(()),
            KeyCode::Char('q') => break Ok(()),
            KeyCode::Char(' ') => transport("play/pause", engine.toggle()),
            KeyCode::Char('n') => transport("next", engine.next()),
            KeyCode::Char('b') => transport("previous", engine.previous()),
            KeyCode::Char('s') => transport("shuffle", engine.shuffle()),
            KeyCode::Char('r') => transport("linear order", engine.reset_shuffle()),
            KeyCode::Down => {
                if !tracks.is_empty() {
                    selected = (selected + 1).min(tracks.len() - 1);
                    dirty.store(true, Ordering::Relaxed);
                }
                None
            }
            KeyCode::Up => {
                selected = selected.saturating_sub(1);
                dirty.store(true, Ordering::Relaxed);
                None
            }
            KeyCode::Enter => match tracks.get(selected) {
                Some(track) => {
                    let track = track.clone();
                    transport("play selection", engine.play_track(&track, selected))
                }
                None => None,
            },
            KeyCode::Left => {
                seek_relative(&mut engine, -SEEK_STEP_SECONDS);
                None
            }
            KeyCode::Right => {
                seek_relative(&mut engine, SEEK_STEP_SECONDS);
                None
            }
            KeyCode::Char('+') | KeyCode::Char('=') => Some(adjust_volume(&mut engine, 0.05)),
            KeyCode::Char('-') => Some(adjust_volume(&mut engine, -0.05)),
            _ => None,
        };

        if let Some(message) = report {
            status = message;
            dirty.store(true, Ordering::Relaxed);
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    settings.saved_volume = engine.volume();
    let save_result = config::save_settings(&settings);
    result?;
    save_result?;
    Ok(())
}

fn load_tracks(settings: &Settings) -> (Vec<Track>, String) {
    if let Some(path) = &settings.listing {
        return match listing::load_listing(path) {
            Ok(tracks) if !tracks.is_empty() => {
                let message = format!("Loaded {} tracks from listing", tracks.len());
                (tracks, message)
            }
            Ok(_) => (Vec::new(), String::from("Listing contained no audio tracks")),
            Err(err) => (Vec::new(), format!("no tracks available: {err:#}")),
        };
    }

    if let Some(folder) = &settings.folder {
        let tracks = listing::scan_folder(folder);
        let message = if tracks.is_empty() {
            format!("No audio files under {}", folder.display())
        } else {
            format!("Scanned {} tracks from {}", tracks.len(), folder.display())
        };
        return (tracks, message);
    }

    (
        Vec::new(),
        String::from("No track source configured. Use --listing <file> or --folder <dir>"),
    )
}

fn seek_relative(engine: &mut PlayerEngine, delta_seconds: i64) {
    let snapshot = engine.snapshot();
    if let Some(fraction) =
        relative_seek_fraction(snapshot.elapsed, snapshot.duration, delta_seconds)
    {
        engine.seek_to(fraction);
    }
}

fn relative_seek_fraction(
    elapsed: Duration,
    duration: Option<Duration>,
    delta_seconds: i64,
) -> Option<f64> {
    let duration = duration.filter(|value| !value.is_zero())?;
    let target = (elapsed.as_secs_f64() + delta_seconds as f64).max(0.0);
    Some((target / duration.as_secs_f64()).clamp(0.0, 1.0))
}

fn adjust_volume(engine: &mut PlayerEngine, delta: f32) -> String {
    let next = (engine.volume() + delta).clamp(0.0, 2.0);
    engine.set_volume(next);
    format!("Volume: {}%", (next * 100.0).round() as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_tracks_prefers_the_listing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("songs.json");
        fs::write(
            &path,
            r#"[{"name": "One.mp3", "type": "file", "download_url": "one.mp3"}]"#,
        )
        .expect("write listing");

        let settings = Settings {
            listing: Some(path),
            ..Settings::default()
        };
        let (tracks, status) = load_tracks(&settings);
        assert_eq!(tracks.len(), 1);
        assert!(status.contains("Loaded 1 tracks"));
    }

    #[test]
    fn unreadable_listing_degrades_to_no_tracks() {
        let settings = Settings {
            listing: Some(PathBuf::from("missing-listing.json")),
            ..Settings::default()
        };
        let (tracks, status) = load_tracks(&settings);
        assert!(tracks.is_empty());
        assert!(status.contains("no tracks available"));
    }

    #[test]
    fn no_source_reports_usage_hint() {
        let (tracks, status) = load_tracks(&Settings::default());
        assert!(tracks.is_empty());
        assert!(status.contains("--listing"));
    }

    #[test]
    fn relative_seek_clamps_to_the_track() {
        let duration = Some(Duration::from_secs(100));
        let fraction = relative_seek_fraction(Duration::from_secs(40), duration, 10);
        assert!((fraction.expect("fraction") - 0.5).abs() < 1e-9);

        let fraction = relative_seek_fraction(Duration::from_secs(3), duration, -10);
        assert_eq!(fraction, Some(0.0));

        let fraction = relative_seek_fraction(Duration::from_secs(95), duration, 10);
        assert_eq!(fraction, Some(1.0));
    }

    #[test]
    fn relative_seek_without_duration_is_none() {
        assert_eq!(
            relative_seek_fraction(Duration::from_secs(5), None, 10),
            None
        );
    }
}
