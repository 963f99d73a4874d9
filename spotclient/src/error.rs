//! Error types for the Spotify client

use thiserror::Error;

/// Result type alias for Spotify operations
pub type Result<T> = std::result::Result<T, SpotifyError>;

/// Fieldless discriminant of [`SpotifyError`]
///
/// Callers that only need to branch on the failure class match on this
/// instead of comparing error values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    ExpiredToken,
    BadOAuthRequest,
    RateLimited,
    Upstream,
    Decode,
    AuthExchange,
    Configuration,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::ExpiredToken => "expired_token",
            ErrorKind::BadOAuthRequest => "bad_oauth_request",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Upstream => "upstream",
            ErrorKind::Decode => "decode",
            ErrorKind::AuthExchange => "auth_exchange",
            ErrorKind::Configuration => "configuration",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of the refresh-token exchange
#[derive(Error, Debug)]
pub enum AuthExchangeError {
    /// The token endpoint could not be reached
    #[error("token endpoint unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    /// The token endpoint answered with something other than 200
    #[error("token request failed with code {0}")]
    Status(u16),

    /// The token endpoint answered 200 with an unusable body
    #[error("malformed token response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Errors that can occur when talking to Spotify
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// Network failure reaching upstream (connect, timeout, body read)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Access token expired (401)
    #[error("Access token expired")]
    ExpiredToken,

    /// Bad OAuth request (403)
    #[error("Bad OAuth request")]
    BadOAuthRequest,

    /// Rate limit exceeded (429)
    #[error("Exceeded rate limit")]
    RateLimited {
        /// Seconds to wait, from the `Retry-After` header
        retry_after: Option<u64>,
    },

    /// Any other non-success status
    #[error("Unknown error with code: {code}")]
    Upstream { code: u16 },

    /// Malformed response body
    #[error("JSON parsing error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Refresh-token exchange failed
    #[error("Token refresh failed: {0}")]
    AuthExchange(#[from] AuthExchangeError),

    /// Missing or invalid client configuration (client id, secret, refresh token)
    #[error("Spotify configuration error: {0}")]
    Configuration(String),
}

impl SpotifyError {
    /// Maps a non-success HTTP status of the currently-playing endpoint
    pub fn from_status_code(code: u16, retry_after: Option<u64>) -> Self {
        match code {
            401 => Self::ExpiredToken,
            403 => Self::BadOAuthRequest,
            429 => Self::RateLimited { retry_after },
            _ => Self::Upstream { code },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SpotifyError::Transport(_) => ErrorKind::Transport,
            SpotifyError::ExpiredToken => ErrorKind::ExpiredToken,
            SpotifyError::BadOAuthRequest => ErrorKind::BadOAuthRequest,
            SpotifyError::RateLimited { .. } => ErrorKind::RateLimited,
            SpotifyError::Upstream { .. } => ErrorKind::Upstream,
            SpotifyError::Decode(_) => ErrorKind::Decode,
            SpotifyError::AuthExchange(_) => ErrorKind::AuthExchange,
            SpotifyError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Vérifie si l'erreur impose un rafraîchissement du token
    pub fn is_expired_token(&self) -> bool {
        matches!(self, SpotifyError::ExpiredToken)
    }

    /// Vérifie si l'erreur est une erreur de rate limiting
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, SpotifyError::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            SpotifyError::from_status_code(401, None).kind(),
            ErrorKind::ExpiredToken
        );
        assert_eq!(
            SpotifyError::from_status_code(403, None).kind(),
            ErrorKind::BadOAuthRequest
        );
        assert!(matches!(
            SpotifyError::from_status_code(429, Some(7)),
            SpotifyError::RateLimited {
                retry_after: Some(7)
            }
        ));
        assert!(matches!(
            SpotifyError::from_status_code(502, None),
            SpotifyError::Upstream { code: 502 }
        ));
    }

    #[test]
    fn test_messages() {
        assert_eq!(SpotifyError::ExpiredToken.to_string(), "Access token expired");
        assert_eq!(
            SpotifyError::Upstream { code: 500 }.to_string(),
            "Unknown error with code: 500"
        );
        assert_eq!(
            SpotifyError::from(AuthExchangeError::Status(400)).to_string(),
            "Token refresh failed: token request failed with code 400"
        );
    }

    #[test]
    fn test_helpers() {
        assert!(SpotifyError::ExpiredToken.is_expired_token());
        assert!(!SpotifyError::BadOAuthRequest.is_expired_token());
        assert!(SpotifyError::RateLimited { retry_after: None }.is_rate_limit());
        assert_eq!(ErrorKind::RateLimited.to_string(), "rate_limited");
    }
}
