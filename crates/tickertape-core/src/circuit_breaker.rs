//! Circuit breaker guarding upstream calls.
//!
//! After `failure_threshold` consecutive failures the breaker opens and every
//! call fails fast until `open_timeout` has elapsed; the next call is then let
//! through as a trial (half-open). A successful trial closes the breaker, a
//! failed one reopens it.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::warn;

use crate::SourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            open_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct Breaker {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    config: CircuitBreakerConfig,
    inner: Mutex<Breaker>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            inner: Mutex::new(Breaker {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    /// Fail fast with [`SourceError::unavailable`] while the breaker is open.
    pub fn check(&self) -> Result<(), SourceError> {
        if self.allow_request() {
            Ok(())
        } else {
            Err(SourceError::unavailable(format!(
                "{} circuit breaker is open; skipping upstream call",
                self.name
            )))
        }
    }

    pub fn allow_request(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != CircuitState::Open {
            return true;
        }

        let cooled_down = inner
            .opened_at
            .is_some_and(|opened_at| opened_at.elapsed() >= self.config.open_timeout);
        if cooled_down {
            inner.state = CircuitState::HalfOpen;
            inner.opened_at = None;
        }
        cooled_down
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        let trip = inner.state == CircuitState::HalfOpen
            || inner.consecutive_failures >= self.config.failure_threshold;
        if trip && inner.state != CircuitState::Open {
            warn!(
                breaker = self.name,
                failures = inner.consecutive_failures,
                "circuit breaker opened"
            );
        }
        if trip {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Breaker> {
        self.inner
            .lock()
            .expect("circuit breaker lock is not poisoned")
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new("upstream", CircuitBreakerConfig::default())
    }
}
