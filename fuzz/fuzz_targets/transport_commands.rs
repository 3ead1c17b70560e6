#![no_main]

use aria::engine::PlayerEngine;
use aria::model::Track;
use aria::player::SimulatedPlayer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut engine = PlayerEngine::new(Box::new(SimulatedPlayer::new()));
    let len = (data.len() % 16).max(1);
    let tracks: Vec<Track> = (0..len)
        .map(|idx| Track {
            id: (idx + 1) as u32,
            title: format!("track_{idx}"),
            artist: String::new(),
            url: format!("track_{idx}.mp3"),
            cover: None,
        })
        .collect();
    engine.load_queue(&tracks, data.first().copied().unwrap_or(0) as usize);

    for byte in data {
        match byte % 8 {
            0 => {
                let _ = engine.next();
            }
            1 => {
                let _ = engine.previous();
            }
            2 => {
                let _ = engine.shuffle();
            }
            3 => {
                let _ = engine.reset_shuffle();
            }
            4 => {
                let _ = engine.toggle();
            }
            5 => engine.seek_to(f64::from(*byte) / 255.0),
            6 => {
                let pick = *byte as usize % tracks.len();
                let _ = engine.play_track(&tracks[pick], pick);
            }
            _ => engine.pause(),
        }

        let snapshot = engine.snapshot();
        assert!(snapshot.index < snapshot.queue.len());
        assert_eq!(snapshot.queue.len(), tracks.len());
    }
});
