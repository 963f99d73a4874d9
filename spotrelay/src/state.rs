//! Canonical playback snapshot and its reconciliation from upstream payloads
//!
//! [`PlayingState`] is what every client receives. It is built only here,
//! from a [`TrackResponse`] or, when no conclusive data exists, from the
//! previous snapshot with duration and progress marked unknown.

use serde::{Deserialize, Serialize};
use spotclient::{AlbumImage, Track, TrackResponse};

/// Sentinel for unknown duration/progress
pub const UNKNOWN_TIME: i64 = -1;

/// Album artwork as sent to clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub height: u32,
    pub width: u32,
}

impl From<&AlbumImage> for Image {
    fn from(image: &AlbumImage) -> Self {
        Self {
            url: image.url.clone(),
            height: image.height.unwrap_or(0),
            width: image.width.unwrap_or(0),
        }
    }
}

/// Track metadata as sent to clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Music {
    pub id: String,
    pub name: String,
    pub images: Vec<Image>,
    pub artists: Vec<String>,
    pub link: String,
    pub preview_link: String,
}

impl From<&Track> for Music {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id.clone(),
            name: track.name.clone(),
            images: track.album.images.iter().map(Image::from).collect(),
            artists: track.artist_names(),
            link: track.link.spotify.clone(),
            preview_link: track.preview_url.clone().unwrap_or_default(),
        }
    }
}

/// Snapshot broadcast to every connection
///
/// `total_time_in_seconds` and `progress_time_in_seconds` are either both
/// non-negative or both [`UNKNOWN_TIME`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayingState {
    pub timestamp: i64,
    pub total_time_in_seconds: i64,
    pub progress_time_in_seconds: i64,
    pub is_playing: bool,
    pub music: Music,
}

impl PlayingState {
    /// State held before the first broadcast
    pub fn initial() -> Self {
        Self {
            timestamp: 0,
            total_time_in_seconds: UNKNOWN_TIME,
            progress_time_in_seconds: UNKNOWN_TIME,
            is_playing: false,
            music: Music::default(),
        }
    }

    /// Stale copy of `previous`: same track and timestamp, times unknown
    pub fn degraded_from(previous: &PlayingState) -> Self {
        Self {
            timestamp: previous.timestamp,
            total_time_in_seconds: UNKNOWN_TIME,
            progress_time_in_seconds: UNKNOWN_TIME,
            is_playing: false,
            music: previous.music.clone(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.total_time_in_seconds == UNKNOWN_TIME
    }
}

impl Default for PlayingState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Builds the next snapshot
///
/// Any payload with an item is conclusive, whatever its playing type.
/// `None`, or a payload without an item, yields the degraded form of
/// `last_known`.
pub fn reconcile(payload: Option<&TrackResponse>, last_known: &PlayingState) -> PlayingState {
    let Some((response, track)) = payload.and_then(|r| r.track.as_ref().map(|t| (r, t))) else {
        return PlayingState::degraded_from(last_known);
    };

    PlayingState {
        timestamp: response.timestamp,
        total_time_in_seconds: ms_to_secs(track.duration_ms),
        progress_time_in_seconds: ms_to_secs(response.progress_ms.unwrap_or(0)),
        is_playing: response.is_playing,
        music: Music::from(track),
    }
}

// Truncates; negative upstream values clamp to zero.
fn ms_to_secs(ms: i64) -> i64 {
    ms.max(0) / 1000
}
