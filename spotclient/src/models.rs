//! Data models for the Spotify Web API
//!
//! Only the fields the relay consumes are modelled; everything else in the
//! upstream payloads is ignored by serde.

use serde::{Deserialize, Serialize};

/// Response of the token endpoint (`POST /api/token`)
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Response of `GET /v1/me/player/currently-playing`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TrackResponse {
    /// Timestamp reported by upstream
    #[serde(default)]
    pub timestamp: i64,
    /// Playback position in milliseconds
    #[serde(default)]
    pub progress_ms: Option<i64>,
    /// Currently playing item; null for ads and unknown episodes
    #[serde(default, rename = "item")]
    pub track: Option<Track>,
    #[serde(default)]
    pub is_playing: bool,
    /// `track`, `episode`, `ad` or `unknown`
    #[serde(default)]
    pub currently_playing_type: String,
}

impl TrackResponse {
    /// True when the payload describes a music track
    pub fn is_track(&self) -> bool {
        self.currently_playing_type == "track" && self.track.is_some()
    }
}

/// A track object
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Track {
    pub id: String,
    pub name: String,
    /// Absent when the item is a podcast episode
    #[serde(default)]
    pub album: Album,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub duration_ms: i64,
    #[serde(default, rename = "external_urls")]
    pub link: ExternalUrls,
    #[serde(default)]
    pub preview_url: Option<String>,
}

impl Track {
    /// Artist display names, in upstream order
    pub fn artist_names(&self) -> Vec<String> {
        self.artists.iter().map(|a| a.name.clone()).collect()
    }
}

/// Album
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Album {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<AlbumImage>,
}

/// Album artwork; dimensions are null for some user-uploaded images
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AlbumImage {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

/// Artist
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Artist {
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Links
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "timestamp": 1700000000,
        "context": null,
        "progress_ms": 45999,
        "item": {
            "id": "4uLU6hMCjMI75M1A2tKUQC",
            "name": "Never Gonna Give You Up",
            "album": {
                "name": "Whenever You Need Somebody",
                "images": [
                    {"url": "https://i.scdn.co/image/640", "height": 640, "width": 640},
                    {"url": "https://i.scdn.co/image/64", "height": null, "width": null}
                ]
            },
            "artists": [{"name": "Rick Astley"}, {"name": "Someone Else", "genres": ["pop"]}],
            "duration_ms": 213573,
            "external_urls": {"spotify": "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"},
            "preview_url": null
        },
        "currently_playing_type": "track",
        "is_playing": true
    }"#;

    #[test]
    fn test_parse_track_response() {
        let response: TrackResponse = serde_json::from_str(SAMPLE).unwrap();
        assert!(response.is_track());
        assert!(response.is_playing);
        assert_eq!(response.progress_ms, Some(45999));

        let track = response.track.unwrap();
        assert_eq!(track.duration_ms, 213573);
        assert_eq!(track.artist_names(), vec!["Rick Astley", "Someone Else"]);
        assert_eq!(track.album.images[1].height, None);
        assert_eq!(track.preview_url, None);
        assert_eq!(
            track.link.spotify,
            "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"
        );
    }

    #[test]
    fn test_parse_ad_without_item() {
        let response: TrackResponse = serde_json::from_str(
            r#"{"timestamp": 1, "progress_ms": null, "item": null,
                "currently_playing_type": "ad", "is_playing": true}"#,
        )
        .unwrap();
        assert!(!response.is_track());
        assert!(response.track.is_none());
    }

    #[test]
    fn test_parse_episode_item() {
        let response: TrackResponse = serde_json::from_str(
            r#"{"timestamp": 2, "progress_ms": 1000, "is_playing": true,
                "currently_playing_type": "episode",
                "item": {"id": "ep1", "name": "Episode 1", "duration_ms": 60000}}"#,
        )
        .unwrap();
        assert!(!response.is_track());
        assert!(response.track.unwrap().album.images.is_empty());
    }

    #[test]
    fn test_parse_token_response() {
        let token: AccessTokenResponse = serde_json::from_str(
            r#"{"access_token": "NgCXRK", "token_type": "Bearer", "expires_in": 3600}"#,
        )
        .unwrap();
        assert_eq!(token.access_token, "NgCXRK");
        assert_eq!(token.expires_in, Some(3600));
        assert!(token.scope.is_none());
    }
}
