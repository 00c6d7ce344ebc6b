//! Use-case layer between front ends and the source/store.
//!
//! | Interactor | Drives |
//! |------------|--------|
//! | [`NewTickerInteractor`] | search, quote resolution, adding holdings |
//! | [`PortfolioInteractor`] | valued portfolio, removing holdings |
//! | [`PortfolioDigInteractor`] | positions and splits of one holding, with undo |
//! | [`DigInteractor`] | chart, news, statistics and recommendations of a symbol |
//! | [`HomeInteractor`] | tops, trending and index quotes |
//!
//! Failures are logged here and returned as [`InteractorError`]. Store calls
//! run on the blocking thread pool.

mod dig;
mod home;
mod new_ticker;
mod portfolio;
mod portfolio_dig;

use thiserror::Error;
use tracing::error;

use tickertape_store::{Store, StoreError};

use crate::undo::UndoError;
use crate::{SourceError, ValidationError};

pub use dig::{DigInteractor, DEFAULT_NEWS_LIMIT};
pub use home::{HomeInteractor, INDEX_SYMBOLS};
pub use new_ticker::{NewTicker, NewTickerInteractor, DEFAULT_SEARCH_LIMIT};
pub use portfolio::{Portfolio, PortfolioInteractor};
pub use portfolio_dig::{ChangeStream, PortfolioDigInteractor};

#[derive(Debug, Error)]
pub enum InteractorError {
    #[error("holding for {symbol} ({side}) already exists")]
    Duplicate { symbol: String, side: String },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Undo(#[from] UndoError),

    #[error("background task failed: {0}")]
    Task(String),
}

impl From<StoreError> for InteractorError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Duplicate { symbol, side } => Self::Duplicate { symbol, side },
            other => Self::Store(other),
        }
    }
}

/// Run a store operation on the blocking pool.
pub(crate) async fn blocking<T, F>(store: &Store, operation: F) -> Result<T, InteractorError>
where
    T: Send + 'static,
    F: FnOnce(&Store) -> Result<T, StoreError> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || operation(&store))
        .await
        .map_err(|error| InteractorError::Task(error.to_string()))?
        .map_err(InteractorError::from)
}

/// Log a failed interactor call and pass the result through.
pub(crate) fn logged<T>(
    operation: &'static str,
    result: Result<T, InteractorError>,
) -> Result<T, InteractorError> {
    if let Err(err) = &result {
        error!(operation, error = %err, "interactor call failed");
    }
    result
}
