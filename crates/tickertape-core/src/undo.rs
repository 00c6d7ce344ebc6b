//! Single-slot holder for a just-deleted record.
//!
//! The record stays restorable until its deadline. Holding a new record
//! finalizes whatever was held before.

use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

/// How long a deleted record can be restored.
pub const DEFAULT_UNDO_WINDOW: Duration = Duration::from_secs(5);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum UndoError {
    #[error("nothing to restore")]
    NothingToRestore,
    #[error("undo window has expired")]
    UndoExpired,
}

#[derive(Debug)]
struct Held<T> {
    value: T,
    deadline: Instant,
}

#[derive(Debug)]
pub struct RecentlyDeleted<T> {
    window: Duration,
    slot: Mutex<Option<Held<T>>>,
}

impl<T> RecentlyDeleted<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            slot: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Hold `value` for the undo window, returning the record it displaced.
    pub fn hold(&self, value: T) -> Option<T> {
        let previous = self.lock().replace(Held {
            value,
            deadline: Instant::now() + self.window,
        });
        if previous.is_some() {
            debug!("finalized previously held delete");
        }
        previous.map(|held| held.value)
    }

    /// Take the held record back if the window is still open.
    ///
    /// An expired record is dropped.
    pub fn take_for_restore(&self) -> Result<T, UndoError> {
        let held = self.lock().take().ok_or(UndoError::NothingToRestore)?;
        if Instant::now() >= held.deadline {
            return Err(UndoError::UndoExpired);
        }
        Ok(held.value)
    }

    /// Drop the held record permanently.
    pub fn finalize(&self) -> Option<T> {
        self.lock().take().map(|held| held.value)
    }

    /// Whether a record is held and still restorable.
    pub fn is_pending(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|held| Instant::now() < held.deadline)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Held<T>>> {
        self.slot
            .lock()
            .expect("recently deleted lock is not poisoned")
    }
}

impl<T> Default for RecentlyDeleted<T> {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_WINDOW)
    }
}
