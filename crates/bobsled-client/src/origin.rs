//! The backend origin and the URLs derived from it.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::ClientError;

/// Origin used when none is configured (the backend's default bind).
pub const DEFAULT_ORIGIN: &str = "http://localhost:8000";

/// Scheme, host and port of the bobsled backend.
///
/// Both API and channel URLs hang off the same origin; channels use `wss`
/// exactly when the origin is `https`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin(Url);

impl Origin {
    /// Parse an origin such as `https://bobsled.example.org`.
    ///
    /// Any path, query or fragment is dropped.
    pub fn parse(text: &str) -> Result<Self, ClientError> {
        let mut url = Url::parse(text).map_err(|_| ClientError::InvalidOrigin(text.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
            return Err(ClientError::InvalidOrigin(text.to_string()));
        }

        url.set_path("/");
        url.set_query(None);
        url.set_fragment(None);
        Ok(Self(url))
    }

    /// Returns true if the origin uses TLS.
    pub fn is_secure(&self) -> bool {
        self.0.scheme() == "https"
    }

    /// URL of an API endpoint; each segment is percent-encoded.
    pub fn api_url(&self, segments: &[&str]) -> Url {
        with_segments(self.0.clone(), segments)
    }

    /// URL of a push channel on the same host.
    pub fn channel_url(&self, segments: &[&str]) -> Url {
        let mut url = self.0.clone();
        let scheme = if self.is_secure() { "wss" } else { "ws" };
        // http(s) -> ws(s) stays within the special schemes, which always succeeds.
        let _ = url.set_scheme(scheme);
        with_segments(url, segments)
    }
}

fn with_segments(mut url: Url, segments: &[&str]) -> Url {
    if let Ok(mut path) = url.path_segments_mut() {
        path.clear().extend(segments);
    }
    url
}

impl FromStr for Origin {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_str().trim_end_matches('/'))
    }
}
