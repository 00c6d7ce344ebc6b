//! Behavior-driven tests for the on-disk portfolio store.

use std::collections::HashSet;
use std::sync::Barrier;
use std::thread;

use tickertape_store::{
    parse_date, Change, DbHolding, DbPosition, DbSplit, EquityType, InsertOutcome, OptionType,
    Store, StoreConfig, StoreError, StoreEvent, TradeSide,
};

fn open(dir: &tempfile::TempDir) -> Store {
    Store::open(StoreConfig::with_home(dir.path().join("home"))).expect("store opens")
}

fn date(value: &str) -> time::Date {
    parse_date(value).expect("valid date")
}

// =============================================================================
// Store: Persistence
// =============================================================================

#[test]
fn when_store_is_reopened_then_holdings_positions_and_splits_persist() {
    // Given: a store with one holding, a lot and a split
    let dir = tempfile::tempdir().expect("tempdir");
    let holding = DbHolding::new("AAPL", EquityType::Stock, TradeSide::Buy);
    {
        let store = open(&dir);
        store.insert_holding(&holding).expect("holding");
        store
            .insert_position(&DbPosition::new(holding.id, 10.0, 150.0, date("2020-01-02")))
            .expect("position");
        store
            .insert_split(&DbSplit::new(holding.id, 1.0, 4.0, date("2020-08-31")))
            .expect("split");
    }

    // When: the database file is opened again
    let store = open(&dir);

    // Then: every row is still there
    assert_eq!(store.query_holdings().expect("holdings"), vec![holding.clone()]);
    assert_eq!(store.query_positions(holding.id).expect("positions").len(), 1);
    assert_eq!(store.query_splits(holding.id).expect("splits")[0].ratio(), 4.0);
    assert!(store
        .db_path()
        .is_some_and(|path| path.ends_with("home/tickertape.duckdb")));
}

#[test]
fn when_option_holding_is_stored_then_contract_details_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open(&dir);
    let holding = DbHolding::new("AAPL240119C00150000", EquityType::Option, TradeSide::Sell)
        .with_option("AAPL", 150.0, date("2024-01-19"), OptionType::Call);

    store.insert_holding(&holding).expect("holding");

    let stored = store
        .query_holding_by_symbol("AAPL240119C00150000", TradeSide::Sell)
        .expect("query")
        .expect("present");
    assert_eq!(stored, holding);
}

// =============================================================================
// Store: Duplicates and Validation
// =============================================================================

#[test]
fn when_symbol_and_side_already_exist_then_insert_fails_as_duplicate() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open(&dir);
    store
        .insert_holding(&DbHolding::new("TSLA", EquityType::Stock, TradeSide::Buy))
        .expect("first");

    let error = store
        .insert_holding(&DbHolding::new("TSLA", EquityType::Stock, TradeSide::Buy))
        .expect_err("duplicate");

    assert!(matches!(error, StoreError::Duplicate { ref symbol, ref side } if symbol == "TSLA" && side == "buy"));
    assert_eq!(store.query_holdings().expect("holdings").len(), 1);

    // The other side of the same symbol is a separate holding.
    store
        .insert_holding(&DbHolding::new("TSLA", EquityType::Stock, TradeSide::Sell))
        .expect("sell side");
    assert_eq!(store.query_holdings().expect("holdings").len(), 2);
}

#[test]
fn when_two_inserts_race_then_only_one_holding_is_stored() {
    // Given: several connections inserting the same symbol and side at once
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open(&dir);
    let writers = 4;

    for round in 0..20 {
        let symbol = format!("RACE{round}");
        let barrier = Barrier::new(writers);

        // When: every writer is released together
        let results: Vec<Result<(), StoreError>> = thread::scope(|scope| {
            let (symbol, barrier, store) = (&symbol, &barrier, &store);
            let handles: Vec<_> = (0..writers)
                .map(|_| {
                    scope.spawn(move || {
                        let holding = DbHolding::new(symbol.as_str(), EquityType::Stock, TradeSide::Buy);
                        barrier.wait();
                        store.insert_holding(&holding)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("writer thread"))
                .collect()
        });

        // Then: one insert wins and the rest are reported as duplicates
        assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|result| result.as_ref().err())
            .all(|error| matches!(error, StoreError::Duplicate { .. })));
        let stored = store
            .query_holdings()
            .expect("holdings")
            .into_iter()
            .filter(|holding| holding.symbol == symbol)
            .count();
        assert_eq!(stored, 1, "{symbol}");
    }
}

#[test]
fn when_position_is_saved_twice_then_second_save_updates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open(&dir);
    let holding = DbHolding::new("MSFT", EquityType::Stock, TradeSide::Buy);
    store.insert_holding(&holding).expect("holding");

    let mut position = DbPosition::new(holding.id, 5.0, 300.0, date("2023-03-01"));
    assert_eq!(store.insert_position(&position).expect("insert"), InsertOutcome::Inserted);
    position.share_count = 7.0;
    assert_eq!(store.insert_position(&position).expect("update"), InsertOutcome::Updated);

    let stored = store.query_positions(holding.id).expect("positions");
    assert_eq!(stored, vec![position]);
}

#[test]
fn when_split_counts_are_not_positive_then_it_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open(&dir);
    let holding = DbHolding::new("NVDA", EquityType::Stock, TradeSide::Buy);
    store.insert_holding(&holding).expect("holding");

    let error = store
        .insert_split(&DbSplit::new(holding.id, 0.0, 10.0, date("2024-06-10")))
        .expect_err("invalid");
    assert!(matches!(error, StoreError::InvalidData(_)));
}

// =============================================================================
// Store: Cascade and Change Events
// =============================================================================

#[test]
fn when_holding_is_deleted_then_children_go_with_it_and_listeners_hear_each_delete() {
    // Given: a holding with one position and one split, and a listener
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open(&dir);
    let holding = DbHolding::new("AMZN", EquityType::Stock, TradeSide::Buy);
    store.insert_holding(&holding).expect("holding");
    let position = DbPosition::new(holding.id, 2.0, 3000.0, date("2021-05-03"));
    store.insert_position(&position).expect("position");
    let split = DbSplit::new(holding.id, 1.0, 20.0, date("2022-06-06"));
    store.insert_split(&split).expect("split");
    let mut events = store.subscribe();

    // When: the holding is deleted
    store.delete_holding(holding.id).expect("delete");

    // Then: children are gone and one delete event per row was published
    assert!(store.query_all_positions().expect("positions").is_empty());
    assert!(store.query_all_splits().expect("splits").is_empty());
    assert_eq!(
        events.try_recv().expect("position event"),
        StoreEvent::Position(Change::Delete(position))
    );
    assert_eq!(
        events.try_recv().expect("split event"),
        StoreEvent::Split(Change::Delete(split))
    );
    assert_eq!(
        events.try_recv().expect("holding event"),
        StoreEvent::Holding(Change::Delete(holding))
    );
    assert!(events.try_recv().is_err());
}

#[test]
fn when_holding_is_deleted_during_position_inserts_then_events_match_the_table() {
    // Given: a holding that is receiving new positions from another thread
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open(&dir);
    let holding = DbHolding::new("META", EquityType::Stock, TradeSide::Buy);
    store.insert_holding(&holding).expect("holding");
    let mut events = store.subscribe();
    let barrier = Barrier::new(2);

    // When: the holding is deleted while inserts are still arriving
    thread::scope(|scope| {
        let (store, barrier) = (&store, &barrier);
        scope.spawn(move || {
            barrier.wait();
            for day in 1..=24 {
                let purchase = date(&format!("2024-01-{day:02}"));
                let _ = store.insert_position(&DbPosition::new(holding.id, 1.0, 300.0, purchase));
            }
        });
        barrier.wait();
        thread::sleep(std::time::Duration::from_millis(2));
        store.delete_holding(holding.id).expect("delete");
    });

    // Then: every position still stored has an insert event and no delete
    // event, and every removed one was announced
    let (mut inserted, mut deleted) = (HashSet::new(), HashSet::new());
    while let Ok(event) = events.try_recv() {
        match event {
            StoreEvent::Position(Change::Insert(position)) => {
                inserted.insert(position.id);
            }
            StoreEvent::Position(Change::Delete(position)) => {
                deleted.insert(position.id);
            }
            _ => {}
        }
    }
    assert!(deleted.is_subset(&inserted));
    let live: HashSet<_> = inserted.difference(&deleted).copied().collect();
    let stored: HashSet<_> = store
        .query_positions(holding.id)
        .expect("positions")
        .into_iter()
        .map(|position| position.id)
        .collect();
    assert_eq!(stored, live);
}

#[test]
fn when_missing_position_is_deleted_then_not_found_is_returned() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open(&dir);

    let error = store
        .delete_position(tickertape_store::PositionId::generate())
        .expect_err("missing");
    assert!(matches!(error, StoreError::NotFound(_)));
}
