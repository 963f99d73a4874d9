//! HTTP client for the Spotify Web API
//!
//! The client owns the OAuth credentials of one account and exposes the two
//! calls the relay needs: the refresh-token exchange and the
//! currently-playing fetch.
//!
//! # Example
//!
//! ```no_run
//! use spotclient::{Credentials, SpotifyClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SpotifyClient::new(Credentials::new("id", "secret", "refresh"))?;
//!     client.refresh_access_token().await?;
//!
//!     match client.get_currently_playing().await? {
//!         Some(playing) => println!("{:?}", playing.track.map(|t| t.name)),
//!         None => println!("Nothing playing"),
//!     }
//!     Ok(())
//! }
//! ```

use crate::error::{AuthExchangeError, Result, SpotifyError};
use crate::models::{AccessTokenResponse, TrackResponse};
use base64::Engine;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Default token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Default currently-playing endpoint
pub const DEFAULT_PLAYER_URL: &str = "https://api.spotify.com/v1/me/player/currently-playing";

/// Default timeout for HTTP requests (5 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!("SpotSocket/", env!("CARGO_PKG_VERSION"));

/// Immutable client identity and refresh token
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// `Basic base64(client_id:client_secret)`
    pub fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(raw)
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("refresh_token", &"***")
            .finish()
    }
}

/// Spotify HTTP client
///
/// The access token sits behind its own lock: a refresh holds the write
/// side for the whole exchange, so a fetch never reads a half-replaced
/// token and concurrent refreshes are serialized.
pub struct SpotifyClient {
    http: Client,
    token_url: String,
    player_url: String,
    credentials: Credentials,
    access_token: RwLock<Option<String>>,
}

impl SpotifyClient {
    /// Create a new client with default endpoints
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::builder().build(credentials)
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn player_url(&self) -> &str {
        &self.player_url
    }

    /// Current access token, if a refresh has succeeded
    pub async fn access_token(&self) -> Option<String> {
        self.access_token.read().await.clone()
    }

    pub async fn has_access_token(&self) -> bool {
        self.access_token.read().await.is_some()
    }

    /// Exchanges the refresh token for a new access token
    ///
    /// # Errors
    ///
    /// * `SpotifyError::AuthExchange` - transport failure, non-200 status or
    ///   malformed body; the previous access token is kept
    pub async fn refresh_access_token(&self) -> Result<()> {
        let mut token = self.access_token.write().await;

        debug!("POST {} (refresh_token grant)", self.token_url);

        let response = self
            .http
            .post(&self.token_url)
            .header(AUTHORIZATION, self.credentials.basic_auth_header())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.credentials.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(AuthExchangeError::Transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Token refresh rejected ({})", status);
            return Err(AuthExchangeError::Status(status.as_u16()).into());
        }

        let body = response
            .text()
            .await
            .map_err(AuthExchangeError::Transport)?;
        let parsed: AccessTokenResponse =
            serde_json::from_str(&body).map_err(AuthExchangeError::Decode)?;

        info!(expires_in = ?parsed.expires_in, "Spotify access token refreshed");
        *token = Some(parsed.access_token);

        Ok(())
    }

    /// Fetches the playback state of the account
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - nothing is playing (204)
    /// * `Ok(Some(_))` - the parsed payload (200)
    ///
    /// # Errors
    ///
    /// * `ExpiredToken` (401), `BadOAuthRequest` (403), `RateLimited` (429),
    ///   `Upstream` (any other status), `Transport`, `Decode`
    pub async fn get_currently_playing(&self) -> Result<Option<TrackResponse>> {
        let token = self.access_token.read().await.clone().unwrap_or_default();

        debug!("GET {}", self.player_url);

        let response = self
            .http
            .get(&self.player_url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await?;

        let status = response.status();
        debug!("Response status: {}", status);

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        if status != StatusCode::OK {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(SpotifyError::from_status_code(status.as_u16(), retry_after));
        }

        let body = response.text().await?;
        let parsed: TrackResponse = serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse currently-playing response: {}", e);
            SpotifyError::Decode(e)
        })?;

        Ok(Some(parsed))
    }
}

/// Builder for [`SpotifyClient`]
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    token_url: String,
    player_url: String,
    timeout: Duration,
    user_agent: String,
    access_token: Option<String>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            player_url: DEFAULT_PLAYER_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            access_token: None,
        }
    }
}

impl ClientBuilder {
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn player_url(mut self, url: impl Into<String>) -> Self {
        self.player_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Seeds an access token obtained elsewhere
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn build(self, credentials: Credentials) -> Result<SpotifyClient> {
        let http = Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .build()?;

        Ok(SpotifyClient {
            http,
            token_url: self.token_url,
            player_url: self.player_url,
            credentials,
            access_token: RwLock::new(self.access_token),
        })
    }
}
