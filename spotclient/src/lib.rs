//! Spotify client library for SpotSocket
//!
//! This crate talks to the Spotify Web API on behalf of a single account:
//!
//! - **Token refresh**: OAuth refresh-token grant, Basic-auth client identity
//! - **Currently playing**: bearer-authenticated fetch of the playback state
//! - **Typed failures**: every HTTP outcome maps to a [`SpotifyError`] variant
//!   with an [`ErrorKind`] discriminant
//! - **Configuration Extension**: [`SpotifyConfigExt`] reads secrets and
//!   endpoints from `spotconfig::Config`
//!
//! # Example
//!
//! ```no_run
//! use spotclient::SpotifyConfigExt;
//! use spotconfig::Config;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::load_config("")?;
//! let client = config.build_spotify_client()?;
//! client.refresh_access_token().await?;
//! let playing = client.get_currently_playing().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config_ext;
pub mod error;
pub mod models;

// Re-exports
pub use client::{ClientBuilder, Credentials, SpotifyClient};
pub use config_ext::SpotifyConfigExt;
pub use error::{AuthExchangeError, ErrorKind, Result, SpotifyError};
pub use models::{AccessTokenResponse, Album, AlbumImage, Artist, ExternalUrls, Track, TrackResponse};
