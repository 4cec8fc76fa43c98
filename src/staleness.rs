//! Staleness Policy
//!
//! Decides whether cached values must be revalidated, and adds a
//! stale-while-revalidate grace period to responses so the HTTP layer can
//! serve a stale copy while it refreshes in the background.

use std::time::Duration;

use http::header::CACHE_CONTROL;
use http::{HeaderMap, HeaderValue};
use tracing::warn;

/// Name of the Cache-Control directive.
pub const STALE_WHILE_REVALIDATE: &str = "stale-while-revalidate";

/// Grace period attached when a response declares none.
pub const DEFAULT_MAX_STALE: Duration = Duration::from_secs(12 * 60 * 60);

// == Staleness Policy Trait ==
pub trait StalenessPolicy: Send + Sync {
    /// Whether the value cached for `url` must be fetched again.
    ///
    /// Expiry is left to the HTTP layer's own response caching, so the
    /// default treats every cached value as fresh.
    fn needs_refresh(&self, url: &str) -> bool {
        let _ = url;
        false
    }

    /// Grace period to declare on responses, `None` to leave them untouched.
    fn max_stale(&self) -> Option<Duration> {
        Some(DEFAULT_MAX_STALE)
    }

    /// Appends `Cache-Control: stale-while-revalidate=<secs>` unless the
    /// response already carries that directive.
    fn decorate_response(&self, headers: &mut HeaderMap) {
        let Some(grace) = self.max_stale() else {
            return;
        };
        if has_stale_while_revalidate(headers) {
            return;
        }
        let directive = format!("{STALE_WHILE_REVALIDATE}={}", grace.as_secs());
        match HeaderValue::from_str(&directive) {
            Ok(value) => {
                headers.append(CACHE_CONTROL, value);
            }
            Err(err) => warn!(%err, "could not build stale-while-revalidate header"),
        }
    }
}

// == Default Policy ==
#[derive(Debug, Clone)]
pub struct DefaultStalenessPolicy {
    max_stale: Option<Duration>,
}

impl DefaultStalenessPolicy {
    pub fn new(max_stale: Option<Duration>) -> Self {
        Self { max_stale }
    }
}

impl Default for DefaultStalenessPolicy {
    fn default() -> Self {
        Self::new(Some(DEFAULT_MAX_STALE))
    }
}

impl StalenessPolicy for DefaultStalenessPolicy {
    fn max_stale(&self) -> Option<Duration> {
        self.max_stale
    }
}

/// Whether any Cache-Control header declares stale-while-revalidate.
pub fn has_stale_while_revalidate(headers: &HeaderMap) -> bool {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|directive| directive.split('=').next())
        .any(|name| name.trim().eq_ignore_ascii_case(STALE_WHILE_REVALIDATE))
}
