//! API endpoint resolution
//!
//! Deployments configure either the REST root (`https://host/api`) or the
//! bare server URL; both resolve to the same [`ApiConfig`]. Media paths
//! returned by the backend are relative to the server root, not the REST
//! root.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ClientError, ClientResult};

const API_SUFFIX: &str = "/api";

/// Default timeout for a single request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Resolved endpoints and credentials for the REST API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// REST root, always ending in `/api`
    pub base_url: String,
    /// Server root used for media paths
    pub media_url: String,
    /// Bearer token sent with every request
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    /// Per-request timeout
    #[serde(default = "default_timeout", with = "secs")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

fn is_localhost(url: &str) -> bool {
    url.contains("localhost") || url.contains("127.0.0.1")
}

fn trim_url(url: &str) -> &str {
    url.trim().trim_end_matches('/')
}

impl ApiConfig {
    /// Resolve endpoints from a configured base URL
    ///
    /// Trailing slashes are trimmed and `/api` is appended when missing.
    /// The media root is `media_url` if given, otherwise the base URL
    /// without `/api`. A localhost media URL in a release build is replaced
    /// by the derived root.
    pub fn resolve(base_url: &str, media_url: Option<&str>) -> ClientResult<Self> {
        let base = trim_url(base_url);
        if base.is_empty() {
            return Err(ClientError::MissingBaseUrl);
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(base.to_string()));
        }

        let release = !cfg!(debug_assertions);
        if release && is_localhost(base) {
            warn!(base_url = base, "API base URL points at localhost in a release build");
        }

        let base_url = if base.ends_with(API_SUFFIX) {
            base.to_string()
        } else {
            format!("{base}{API_SUFFIX}")
        };
        let derived_media = base_url
            .strip_suffix(API_SUFFIX)
            .unwrap_or(&base_url)
            .to_string();

        let media_url = match media_url.map(trim_url).filter(|m| !m.is_empty()) {
            Some(media) if release && is_localhost(media) => {
                warn!(
                    media_url = media,
                    derived = %derived_media,
                    "Media URL is localhost in a release build, deriving from base URL"
                );
                derived_media
            }
            Some(media) => media.strip_suffix(API_SUFFIX).unwrap_or(media).to_string(),
            None => derived_media,
        };

        Ok(Self {
            base_url,
            media_url,
            token: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Collection endpoint for sales profiles
    pub fn profiles_url(&self) -> String {
        format!("{}/sales-profiles", self.base_url)
    }

    /// Endpoint of a single sales profile
    pub fn profile_url(&self, id: &str) -> String {
        format!("{}/sales-profiles/{id}", self.base_url)
    }

    /// Turn a media path from the backend into an absolute URL
    ///
    /// Localhost URLs leaked from a development database are rewritten onto
    /// the media root; other absolute URLs pass through.
    pub fn media(&self, url: &str) -> Option<String> {
        if url.is_empty() {
            return None;
        }
        if is_localhost(url) {
            let rewritten = url
                .replace("http://localhost:1337", &self.media_url)
                .replace("http://127.0.0.1:1337", &self.media_url);
            return Some(rewritten);
        }
        if url.starts_with("http") || url.starts_with("//") {
            return Some(url.to_string());
        }
        Some(format!("{}{url}", self.media_url))
    }
}
