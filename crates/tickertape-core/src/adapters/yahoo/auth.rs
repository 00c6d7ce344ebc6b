//! Yahoo cookie/crumb session handling.
//!
//! Yahoo's unofficial API needs a session cookie (set by `fc.yahoo.com`
//! into the client's cookie jar) and a crumb token fetched with that cookie.
//! The crumb is appended to every query and cached for a TTL.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::SourceError;

const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URLS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];
pub(crate) const REFERER: &str = "https://finance.yahoo.com/";

#[derive(Debug, Clone)]
struct Crumb {
    value: String,
    fetched_at: Instant,
}

/// Caches the crumb and serializes refreshes.
#[derive(Debug)]
pub struct YahooAuthManager {
    crumb: Mutex<Option<Crumb>>,
    ttl: Duration,
    auth: HttpAuth,
    timeout_ms: u64,
}

impl YahooAuthManager {
    pub fn new(ttl: Duration, auth: HttpAuth, timeout_ms: u64) -> Self {
        Self {
            crumb: Mutex::new(None),
            ttl,
            auth,
            timeout_ms,
        }
    }

    /// Extra authentication attached to every request.
    pub fn auth(&self) -> &HttpAuth {
        &self.auth
    }

    /// Current crumb, refreshing it when missing or expired.
    ///
    /// The lock is held across the refresh so concurrent callers wait for a
    /// single round trip instead of racing.
    pub async fn crumb(&self, http_client: &Arc<dyn HttpClient>) -> Result<String, SourceError> {
        let mut guard = self.crumb.lock().await;
        if let Some(crumb) = guard.as_ref() {
            if crumb.fetched_at.elapsed() < self.ttl {
                return Ok(crumb.value.clone());
            }
        }

        let value = self.fetch_crumb(http_client).await?;
        *guard = Some(Crumb {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    /// Drop the cached crumb so the next call refreshes it.
    pub async fn invalidate(&self) {
        debug!("invalidating yahoo crumb");
        *self.crumb.lock().await = None;
    }

    async fn fetch_crumb(&self, http_client: &Arc<dyn HttpClient>) -> Result<String, SourceError> {
        // The cookie endpoint answers 404 while still setting the session cookie.
        let cookie_request = HttpRequest::get(COOKIE_URL)
            .with_header("referer", REFERER)
            .with_auth(&self.auth)
            .with_timeout_ms(self.timeout_ms);
        http_client.execute(cookie_request).await.map_err(|error| {
            SourceError::unavailable(format!(
                "failed to fetch yahoo cookie: {}",
                error.message()
            ))
        })?;

        for endpoint in CRUMB_URLS {
            let request = HttpRequest::get(endpoint)
                .with_header("referer", REFERER)
                .with_auth(&self.auth)
                .with_timeout_ms(self.timeout_ms);

            let response = match http_client.execute(request).await {
                Ok(response) => response,
                Err(error) => {
                    warn!(endpoint, error = %error, "crumb request failed");
                    continue;
                }
            };

            let body = response.body.trim();
            if response.status == 429 || body.to_ascii_lowercase().contains("too many requests") {
                return Err(SourceError::rate_limited(
                    "yahoo rate limited while fetching crumb",
                ));
            }
            if response.is_success() && is_plausible_crumb(body) {
                debug!(endpoint, "obtained yahoo crumb");
                return Ok(body.to_owned());
            }
            warn!(endpoint, status = response.status, "unusable crumb response");
        }

        Err(SourceError::unavailable(
            "failed to fetch yahoo crumb from all endpoints",
        ))
    }
}

fn is_plausible_crumb(body: &str) -> bool {
    !body.is_empty()
        && body.len() < 100
        && !body.contains(char::is_whitespace)
        && !body.contains('<')
}
