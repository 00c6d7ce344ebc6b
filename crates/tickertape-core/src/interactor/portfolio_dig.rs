use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use tickertape_store::{
    Change, DbPosition, DbSplit, HoldingId, InsertOutcome, PositionId, SplitId, Store, StoreEvent,
};

use super::{blocking, logged, InteractorError};
use crate::undo::{RecentlyDeleted, DEFAULT_UNDO_WINDOW};

type Filter<T> = Box<dyn Fn(StoreEvent) -> Option<Change<T>> + Send + Sync>;

/// Store changes of one record type, filtered to one holding.
pub struct ChangeStream<T> {
    receiver: broadcast::Receiver<StoreEvent>,
    filter: Filter<T>,
}

impl<T> ChangeStream<T> {
    fn new(receiver: broadcast::Receiver<StoreEvent>, filter: Filter<T>) -> Self {
        Self { receiver, filter }
    }

    /// Next matching change; `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Change<T>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if let Some(change) = (self.filter)(event) {
                        return Some(change);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "change listener fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Positions and splits of individual holdings.
///
/// Reads are served from per-holding maps until a forced read; deletes are
/// held for undo until restored, finalized, or displaced by the next delete.
pub struct PortfolioDigInteractor {
    store: Store,
    positions: Mutex<HashMap<HoldingId, Vec<DbPosition>>>,
    splits: Mutex<HashMap<HoldingId, Vec<DbSplit>>>,
    deleted_position: RecentlyDeleted<DbPosition>,
    deleted_split: RecentlyDeleted<DbSplit>,
}

impl PortfolioDigInteractor {
    pub fn new(store: Store) -> Self {
        Self::with_undo_window(store, DEFAULT_UNDO_WINDOW)
    }

    pub fn with_undo_window(store: Store, window: Duration) -> Self {
        Self {
            store,
            positions: Mutex::new(HashMap::new()),
            splits: Mutex::new(HashMap::new()),
            deleted_position: RecentlyDeleted::new(window),
            deleted_split: RecentlyDeleted::new(window),
        }
    }

    // ------------------------------------------------------------------
    // Positions
    // ------------------------------------------------------------------

    pub async fn positions(
        &self,
        force: bool,
        holding_id: HoldingId,
    ) -> Result<Vec<DbPosition>, InteractorError> {
        let mut cache = self.positions.lock().await;
        if !force {
            if let Some(positions) = cache.get(&holding_id) {
                return Ok(positions.clone());
            }
        }

        let result = blocking(&self.store, move |store| store.query_positions(holding_id)).await;
        let positions = logged("positions", result)?;
        cache.insert(holding_id, positions.clone());
        Ok(positions)
    }

    pub async fn add_position(&self, position: DbPosition) -> Result<InsertOutcome, InteractorError> {
        let holding_id = position.holding_id;
        let result = blocking(&self.store, move |store| store.insert_position(&position)).await;
        let outcome = logged("add_position", result)?;
        self.positions.lock().await.remove(&holding_id);
        Ok(outcome)
    }

    /// Delete a position and hold it for undo.
    pub async fn delete_position(&self, id: PositionId) -> Result<DbPosition, InteractorError> {
        let result = blocking(&self.store, move |store| store.delete_position(id)).await;
        let position = logged("delete_position", result)?;
        self.positions.lock().await.remove(&position.holding_id);
        if let Some(finalized) = self.deleted_position.hold(position.clone()) {
            debug!(id = %finalized.id, "finalized position delete");
        }
        Ok(position)
    }

    /// Re-insert the held position while the undo window is open.
    ///
    /// Failures are logged only; the caller gets the error to decide whether
    /// to tell the user.
    pub async fn restore_position(&self) -> Result<DbPosition, InteractorError> {
        let position = match self.deleted_position.take_for_restore() {
            Ok(position) => position,
            Err(error) => {
                warn!(%error, "position restore failed");
                return Err(error.into());
            }
        };

        let record = position.clone();
        let result = blocking(&self.store, move |store| store.insert_position(&record)).await;
        if let Err(error) = &result {
            warn!(id = %position.id, %error, "position restore failed");
        }
        result?;
        self.positions.lock().await.remove(&position.holding_id);
        info!(id = %position.id, "restored position");
        Ok(position)
    }

    /// Drop the held position permanently.
    pub fn finalize_position_delete(&self) -> Option<DbPosition> {
        self.deleted_position.finalize()
    }

    pub fn has_pending_position_delete(&self) -> bool {
        self.deleted_position.is_pending()
    }

    pub fn listen_for_position_changes(&self, holding_id: HoldingId) -> ChangeStream<DbPosition> {
        ChangeStream::new(
            self.store.subscribe(),
            Box::new(move |event| match event {
                StoreEvent::Position(change) if change.record().holding_id == holding_id => {
                    Some(change)
                }
                _ => None,
            }),
        )
    }

    // ------------------------------------------------------------------
    // Splits
    // ------------------------------------------------------------------

    pub async fn splits(
        &self,
        force: bool,
        holding_id: HoldingId,
    ) -> Result<Vec<DbSplit>, InteractorError> {
        let mut cache = self.splits.lock().await;
        if !force {
            if let Some(splits) = cache.get(&holding_id) {
                return Ok(splits.clone());
            }
        }

        let result = blocking(&self.store, move |store| store.query_splits(holding_id)).await;
        let splits = logged("splits", result)?;
        cache.insert(holding_id, splits.clone());
        Ok(splits)
    }

    pub async fn add_split(&self, split: DbSplit) -> Result<InsertOutcome, InteractorError> {
        let holding_id = split.holding_id;
        let result = blocking(&self.store, move |store| store.insert_split(&split)).await;
        let outcome = logged("add_split", result)?;
        self.splits.lock().await.remove(&holding_id);
        Ok(outcome)
    }

    /// Delete a split and hold it for undo.
    pub async fn delete_split(&self, id: SplitId) -> Result<DbSplit, InteractorError> {
        let result = blocking(&self.store, move |store| store.delete_split(id)).await;
        let split = logged("delete_split", result)?;
        self.splits.lock().await.remove(&split.holding_id);
        if let Some(finalized) = self.deleted_split.hold(split.clone()) {
            debug!(id = %finalized.id, "finalized split delete");
        }
        Ok(split)
    }

    pub async fn restore_split(&self) -> Result<DbSplit, InteractorError> {
        let split = match self.deleted_split.take_for_restore() {
            Ok(split) => split,
            Err(error) => {
                warn!(%error, "split restore failed");
                return Err(error.into());
            }
        };

        let record = split.clone();
        let result = blocking(&self.store, move |store| store.insert_split(&record)).await;
        if let Err(error) = &result {
            warn!(id = %split.id, %error, "split restore failed");
        }
        result?;
        self.splits.lock().await.remove(&split.holding_id);
        info!(id = %split.id, "restored split");
        Ok(split)
    }

    pub fn finalize_split_delete(&self) -> Option<DbSplit> {
        self.deleted_split.finalize()
    }

    pub fn has_pending_split_delete(&self) -> bool {
        self.deleted_split.is_pending()
    }

    pub fn listen_for_split_changes(&self, holding_id: HoldingId) -> ChangeStream<DbSplit> {
        ChangeStream::new(
            self.store.subscribe(),
            Box::new(move |event| match event {
                StoreEvent::Split(change) if change.record().holding_id == holding_id => {
                    Some(change)
                }
                _ => None,
            }),
        )
    }
}
