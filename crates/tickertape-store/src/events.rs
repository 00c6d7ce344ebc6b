//! Realtime change notification for store mutations.

use tokio::sync::broadcast;

use crate::models::{DbHolding, DbPosition, DbSplit};

/// What happened to a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    Insert(T),
    Update(T),
    Delete(T),
}

impl<T> Change<T> {
    pub fn record(&self) -> &T {
        match self {
            Self::Insert(record) | Self::Update(record) | Self::Delete(record) => record,
        }
    }

    pub fn into_record(self) -> T {
        match self {
            Self::Insert(record) | Self::Update(record) | Self::Delete(record) => record,
        }
    }
}

/// A committed mutation on one of the portfolio tables.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Holding(Change<DbHolding>),
    Position(Change<DbPosition>),
    Split(Change<DbSplit>),
}

/// Broadcast bus fanning store events out to listeners.
#[derive(Clone)]
pub struct ChangeBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: StoreEvent) {
        // No listeners is the common case.
        let _ = self.sender.send(event);
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(64)
    }
}
