use anyhow::Result;
use aria::engine::PlayerEngine;
use aria::model::{PlaybackSnapshot, Track};
use aria::player::MediaPlayer;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Default)]
struct PlayerState {
    loaded: Vec<String>,
    plays: u32,
    has_track: bool,
    paused: bool,
    position: Duration,
    duration: Option<Duration>,
    finished: bool,
    refuse_play: bool,
}

struct ScriptedPlayer {
    state: Rc<RefCell<PlayerState>>,
}

impl ScriptedPlayer {
    fn new() -> (Self, Rc<RefCell<PlayerState>>) {
        let state = Rc::new(RefCell::new(PlayerState {
            paused: true,
            ..PlayerState::default()
        }));
        (
            Self {
                state: Rc::clone(&state),
            },
            state,
        )
    }
}

impl MediaPlayer for ScriptedPlayer {
    fn load(&mut self, track: &Track) {
        let mut state = self.state.borrow_mut();
        state.loaded.push(track.url.clone());
        state.has_track = true;
        state.paused = true;
        state.position = Duration::ZERO;
        state.finished = false;
    }

    fn play(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.has_track {
            anyhow::bail!("no track loaded");
        }
        if state.refuse_play {
            anyhow::bail!("playback refused");
        }
        state.paused = false;
        state.plays += 1;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.borrow_mut().paused = true;
    }

    fn stop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.has_track = false;
        state.paused = true;
        state.position = Duration::ZERO;
        state.duration = None;
        state.finished = false;
    }

    fn position(&self) -> Option<Duration> {
        let state = self.state.borrow();
        state.has_track.then_some(state.position)
    }

    fn duration(&self) -> Option<Duration> {
        self.state.borrow().duration
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.has_track {
            anyhow::bail!("no active track");
        }
        state.position = position;
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.state.borrow().finished
    }

    fn volume(&self) -> f32 {
        1.0
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn output_name(&self) -> Option<String> {
        Some(String::from("scripted"))
    }
}

fn three_tracks() -> Vec<Track> {
    ["Alpha", "Bravo", "Charlie"]
        .iter()
        .enumerate()
        .map(|(position, title)| Track {
            id: (position + 1) as u32,
            title: (*title).to_string(),
            artist: String::new(),
            url: format!("{}.mp3", title.to_lowercase()),
            cover: None,
        })
        .collect()
}

fn current_title(engine: &PlayerEngine) -> Option<String> {
    engine.snapshot().current.map(|track| track.title)
}

#[test]
fn transport_flow_end_to_end() {
    let (player, _) = ScriptedPlayer::new();
    let mut engine = PlayerEngine::new(Box::new(player));
    let tracks = three_tracks();

    engine.load_queue(&tracks, 0);
    assert_eq!(current_title(&engine).as_deref(), Some("Alpha"));
    assert!(!engine.snapshot().playing, "load must not start playback");

    engine.next().expect("next");
    assert_eq!(current_title(&engine).as_deref(), Some("Bravo"));
    engine.next().expect("next");
    assert_eq!(current_title(&engine).as_deref(), Some("Charlie"));
    engine.next().expect("next");
    assert_eq!(
        current_title(&engine).as_deref(),
        Some("Alpha"),
        "cursor wraps around the queue"
    );
    assert!(engine.snapshot().playing);

    engine.shuffle().expect("shuffle");
    let snapshot = engine.snapshot();
    assert!(snapshot.shuffled);
    assert_eq!(snapshot.index, 0);
    assert_eq!(snapshot.current, Some(snapshot.queue[0].clone()));

    let before = current_title(&engine);
    engine.reset_shuffle().expect("reset shuffle");
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.current.map(|track| track.title), before);
    let titles: Vec<&str> = snapshot
        .queue
        .iter()
        .map(|track| track.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Alpha", "Bravo", "Charlie"]);
}

#[test]
fn end_of_track_auto_advances_and_keeps_playing() {
    let (player, state) = ScriptedPlayer::new();
    let mut engine = PlayerEngine::new(Box::new(player));
    engine.load_queue(&three_tracks(), 0);
    engine.play().expect("play");

    state.borrow_mut().finished = true;
    engine.tick().expect("tick");

    assert_eq!(current_title(&engine).as_deref(), Some("Bravo"));
    assert!(engine.snapshot().playing);
    assert_eq!(state.borrow().plays, 2);
}

#[test]
fn playback_refusal_reaches_the_caller() {
    let (player, state) = ScriptedPlayer::new();
    let mut engine = PlayerEngine::new(Box::new(player));
    engine.load_queue(&three_tracks(), 0);

    state.borrow_mut().refuse_play = true;
    assert!(engine.play().is_err());
    assert!(!engine.snapshot().playing);

    state.borrow_mut().refuse_play = false;
    engine.play().expect("play succeeds once allowed");
    assert!(engine.snapshot().playing);
}

#[test]
fn late_subscriber_receives_the_latest_state_immediately() {
    let (player, _) = ScriptedPlayer::new();
    let mut engine = PlayerEngine::new(Box::new(player));
    engine.load_queue(&three_tracks(), 2);

    let seen: Rc<RefCell<Vec<PlaybackSnapshot>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    engine.subscribe(move |snapshot| sink.borrow_mut().push(snapshot.clone()));

    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(
        seen.borrow()[0].current.as_ref().map(|t| t.title.clone()),
        Some(String::from("Charlie"))
    );
}

#[test]
fn fractional_seek_uses_the_reported_duration() {
    let (player, state) = ScriptedPlayer::new();
    let mut engine = PlayerEngine::new(Box::new(player));
    engine.load_queue(&three_tracks(), 0);

    state.borrow_mut().duration = Some(Duration::from_secs(200));
    engine.seek_to(0.5);
    assert_eq!(engine.snapshot().elapsed, Duration::from_secs(100));

    state.borrow_mut().duration = None;
    engine.seek_to(0.25);
    assert_eq!(
        engine.snapshot().elapsed,
        Duration::from_secs(100),
        "seek without a duration is ignored"
    );
}

#[test]
fn selecting_a_track_from_the_playlist_plays_it() {
    let (player, state) = ScriptedPlayer::new();
    let mut engine = PlayerEngine::new(Box::new(player));
    let tracks = three_tracks();
    engine.load_queue(&tracks, 0);
    engine.shuffle().expect("shuffle");

    engine.play_track(&tracks[1], 1).expect("play selection");
    assert_eq!(current_title(&engine).as_deref(), Some("Bravo"));
    assert!(engine.snapshot().playing);
    assert_eq!(engine.permutation_repairs(), 0);
    assert!(
        state
            .borrow()
            .loaded
            .contains(&String::from("bravo.mp3"))
    );
}
