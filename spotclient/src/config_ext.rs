//! Extension pour intégrer Spotify dans spotconfig
//!
//! This module provides the `SpotifyConfigExt` trait that adds
//! Spotify-specific getters to `spotconfig::Config`.
//!
//! Secrets are looked up in the process environment first
//! (`SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET`, `SPOTIFY_REFRESH_TOKEN`),
//! then under `accounts.spotify` in the configuration tree.

use crate::client::{
    ClientBuilder, Credentials, SpotifyClient, DEFAULT_PLAYER_URL, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_TOKEN_URL,
};
use crate::error::{Result, SpotifyError};
use serde_yaml::Value;
use spotconfig::Config;
use std::env;
use std::time::Duration;

pub const ENV_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";
pub const ENV_REFRESH_TOKEN: &str = "SPOTIFY_REFRESH_TOKEN";

/// Trait d'extension pour la configuration Spotify
pub trait SpotifyConfigExt {
    /// Reads the three required secrets
    ///
    /// # Errors
    ///
    /// `SpotifyError::Configuration` naming every missing or blank value.
    fn get_spotify_credentials(&self) -> Result<Credentials>;

    fn get_spotify_token_url(&self) -> String;

    fn get_spotify_player_url(&self) -> String;

    fn get_spotify_request_timeout(&self) -> Duration;

    /// Builds a client from credentials and endpoint settings
    fn build_spotify_client(&self) -> Result<SpotifyClient>;
}

impl SpotifyConfigExt for Config {
    fn get_spotify_credentials(&self) -> Result<Credentials> {
        credentials_from(self, |key| env::var(key).ok())
    }

    fn get_spotify_token_url(&self) -> String {
        self.get_string(&["accounts", "spotify", "token_url"])
            .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string())
    }

    fn get_spotify_player_url(&self) -> String {
        self.get_string(&["accounts", "spotify", "player_url"])
            .unwrap_or_else(|| DEFAULT_PLAYER_URL.to_string())
    }

    fn get_spotify_request_timeout(&self) -> Duration {
        let secs = match self.get_value(&["accounts", "spotify", "request_timeout_secs"]) {
            Ok(Value::Number(n)) => n.as_u64().unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            _ => DEFAULT_REQUEST_TIMEOUT_SECS,
        };
        Duration::from_secs(secs)
    }

    fn build_spotify_client(&self) -> Result<SpotifyClient> {
        let credentials = self.get_spotify_credentials()?;
        ClientBuilder::default()
            .token_url(self.get_spotify_token_url())
            .player_url(self.get_spotify_player_url())
            .timeout(self.get_spotify_request_timeout())
            .build(credentials)
    }
}

fn credentials_from<F>(config: &Config, lookup_env: F) -> Result<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing = Vec::new();
    let mut lookup = |env_key: &'static str, config_key: &str| {
        let value = lookup_env(env_key)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| config.get_string(&["accounts", "spotify", config_key]));
        if value.is_none() {
            missing.push(env_key);
        }
        value.unwrap_or_default()
    };

    let client_id = lookup(ENV_CLIENT_ID, "client_id");
    let client_secret = lookup(ENV_CLIENT_SECRET, "client_secret");
    let refresh_token = lookup(ENV_REFRESH_TOKEN, "refresh_token");

    if !missing.is_empty() {
        return Err(SpotifyError::Configuration(format!(
            "missing required secret(s): {}",
            missing.join(", ")
        )));
    }

    Ok(Credentials::new(client_id, client_secret, refresh_token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_from_env_win() {
        let config = Config::from_yaml(
            "accounts:\n  spotify:\n    client_id: from-file\n    client_secret: s\n    refresh_token: r\n",
        )
        .unwrap();
        let creds = credentials_from(&config, |key| {
            (key == ENV_CLIENT_ID).then(|| "from-env".to_string())
        })
        .unwrap();
        assert_eq!(creds, Credentials::new("from-env", "s", "r"));
    }

    #[test]
    fn test_missing_credentials_are_named() {
        let config =
            Config::from_yaml("accounts:\n  spotify:\n    client_secret: s\n").unwrap();
        let err = credentials_from(&config, |_| None).unwrap_err();
        match err {
            SpotifyError::Configuration(msg) => {
                assert!(msg.contains(ENV_CLIENT_ID));
                assert!(msg.contains(ENV_REFRESH_TOKEN));
                assert!(!msg.contains(ENV_CLIENT_SECRET));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_env_falls_back_to_config() {
        let config = Config::from_yaml(
            "accounts:\n  spotify:\n    client_id: a\n    client_secret: b\n    refresh_token: c\n",
        )
        .unwrap();
        let creds = credentials_from(&config, |_| Some("   ".to_string())).unwrap();
        assert_eq!(creds, Credentials::new("a", "b", "c"));
    }

    #[test]
    fn test_each_secret_lands_in_its_field() {
        let config = Config::from_yaml(
            "accounts:\n  spotify:\n    client_id: file-id\n    refresh_token: file-refresh\n",
        )
        .unwrap();
        let creds = credentials_from(&config, |key| {
            (key == ENV_CLIENT_SECRET).then(|| "env-secret".to_string())
        })
        .unwrap();
        assert_eq!(creds.client_id, "file-id");
        assert_eq!(creds.client_secret, "env-secret");
        assert_eq!(creds.refresh_token, "file-refresh");
    }

    #[test]
    fn test_endpoint_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.get_spotify_token_url(), DEFAULT_TOKEN_URL);
        assert_eq!(config.get_spotify_player_url(), DEFAULT_PLAYER_URL);
        assert_eq!(config.get_spotify_request_timeout(), Duration::from_secs(5));
    }
}
