#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use spotclient::{
    Album, AlbumImage, Artist, ExternalUrls, SpotifyError, Track, TrackResponse,
};
use spotrelay::{ConnectionSink, ConnectionWriteError, PlaybackSource, PlayingState, RelayContext};

pub enum Step {
    Playing(TrackResponse),
    Nothing,
    Status(u16),
    /// 200 with a body that is not JSON
    Garbled,
    /// Request that never reaches upstream
    Unreachable,
}

/// Playback source replaying a fixed script; `Nothing` once exhausted
#[derive(Default)]
pub struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    delay: Duration,
    pub fetches: AtomicUsize,
    pub refreshes: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl PlaybackSource for ScriptedSource {
    async fn currently_playing(&self) -> spotclient::Result<Option<TrackResponse>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let step = self.steps.lock().unwrap().pop_front();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match step {
            Some(Step::Playing(response)) => Ok(Some(response)),
            Some(Step::Status(code)) => Err(SpotifyError::from_status_code(code, None)),
            Some(Step::Garbled) => {
                let err = serde_json::from_str::<TrackResponse>("{\"timestamp\": ").unwrap_err();
                Err(SpotifyError::from(err))
            }
            Some(Step::Unreachable) => {
                let err = reqwest::Client::new()
                    .get("not a url")
                    .send()
                    .await
                    .unwrap_err();
                Err(SpotifyError::from(err))
            }
            Some(Step::Nothing) | None => Ok(None),
        }
    }

    async fn refresh(&self) -> spotclient::Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory connection recording every message
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
    pub broken: AtomicBool,
    pub closed: AtomicBool,
}

impl RecordingSink {
    pub fn states(&self) -> Vec<PlayingState> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| serde_json::from_str(m).unwrap())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl ConnectionSink for RecordingSink {
    async fn send_text(&self, text: String) -> Result<(), ConnectionWriteError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(ConnectionWriteError::Closed);
        }
        self.messages.lock().unwrap().push(text);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub fn track_response(name: &str, duration_ms: i64, progress_ms: i64) -> TrackResponse {
    TrackResponse {
        timestamp: 1_700_000_000,
        progress_ms: Some(progress_ms),
        track: Some(Track {
            id: format!("{}-id", name),
            name: name.to_string(),
            album: Album {
                name: "Album".to_string(),
                images: vec![AlbumImage {
                    url: "https://i.scdn.co/image/640".to_string(),
                    height: Some(640),
                    width: Some(640),
                }],
            },
            artists: vec![Artist {
                name: "Artist".to_string(),
                genres: vec![],
            }],
            duration_ms,
            link: ExternalUrls {
                spotify: format!("https://open.spotify.com/track/{}-id", name),
            },
            preview_url: Some("https://p.scdn.co/mp3-preview/x".to_string()),
        }),
        is_playing: true,
        currently_playing_type: "track".to_string(),
    }
}

/// Polls until the last known state satisfies `pred`
pub async fn wait_for_state<F>(ctx: &Arc<RelayContext>, pred: F) -> PlayingState
where
    F: Fn(&PlayingState) -> bool,
{
    for _ in 0..200 {
        let state = ctx.last_state();
        if pred(&state) {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("state never reached: {:?}", ctx.last_state());
}
