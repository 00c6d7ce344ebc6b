//! Behavior-driven tests for the symbol detail ("dig") view state.

use std::sync::Arc;
use std::time::Duration;

use tickertape_core::{
    ChartRange, DigController, DigInteractor, FakeEndpoint, FakeStockSource, SourceError,
    StockClient, StockSymbol,
};

fn controller(source: &Arc<FakeStockSource>, range: ChartRange) -> DigController {
    let interactor = DigInteractor::new(StockClient::new(Arc::clone(source) as _));
    DigController::new(
        Arc::new(interactor),
        StockSymbol::parse("AAPL").expect("valid symbol"),
        range,
    )
}

// =============================================================================
// Dig: Range Changes
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_range_changes_then_in_flight_fetch_is_cancelled_and_one_new_fetch_runs() {
    // Given: a slow one-year chart fetch already in flight
    let source = Arc::new(
        FakeStockSource::new().with_chart_delay(ChartRange::OneYear, Duration::from_secs(10)),
    );
    let controller = controller(&source, ChartRange::OneDay);
    controller.set_range(ChartRange::OneYear).await;
    tokio::task::yield_now().await;
    assert_eq!(source.chart_calls(ChartRange::OneYear), 1);

    // When: the user switches to five days before it completes
    controller.set_range(ChartRange::FiveDays).await;
    assert!(controller.wait_for_chart().await);

    // Then: exactly one five-day fetch ran and its chart is shown
    assert_eq!(source.chart_calls(ChartRange::FiveDays), 1);
    let state = controller.state().await;
    assert_eq!(state.range, ChartRange::FiveDays);
    assert_eq!(
        state.chart.as_ref().map(|chart| chart.range),
        Some(ChartRange::FiveDays)
    );

    // And: the cancelled one-year fetch never lands
    tokio::time::advance(Duration::from_secs(30)).await;
    tokio::task::yield_now().await;
    assert_eq!(source.chart_calls(ChartRange::OneYear), 1);
    let state = controller.state().await;
    assert_eq!(
        state.chart.as_ref().map(|chart| chart.range),
        Some(ChartRange::FiveDays)
    );
    assert!(state.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn when_range_changes_repeatedly_then_only_the_last_range_is_shown() {
    let source = Arc::new(
        FakeStockSource::new()
            .with_chart_delay(ChartRange::OneMonth, Duration::from_secs(5))
            .with_chart_delay(ChartRange::ThreeMonths, Duration::from_secs(5)),
    );
    let controller = controller(&source, ChartRange::OneDay);

    controller.set_range(ChartRange::OneMonth).await;
    controller.set_range(ChartRange::ThreeMonths).await;
    controller.set_range(ChartRange::Max).await;
    assert!(controller.wait_for_chart().await);

    assert_eq!(source.chart_calls(ChartRange::Max), 1);
    assert!(source.chart_calls(ChartRange::OneMonth) <= 1);
    assert!(source.chart_calls(ChartRange::ThreeMonths) <= 1);
    let state = controller.state().await;
    assert_eq!(state.range, ChartRange::Max);
    assert_eq!(state.chart.map(|chart| chart.range), Some(ChartRange::Max));
}

#[tokio::test]
async fn when_no_range_change_is_pending_then_waiting_returns_false() {
    let source = Arc::new(FakeStockSource::new());
    let controller = controller(&source, ChartRange::OneDay);
    assert!(!controller.wait_for_chart().await);
}

// =============================================================================
// Dig: Loading
// =============================================================================

#[tokio::test]
async fn when_view_loads_then_every_section_is_fetched_once() {
    let source = Arc::new(FakeStockSource::new());
    let controller = controller(&source, ChartRange::FiveDays);

    let state = controller.load(false).await;
    controller.load(false).await;

    assert!(state.chart.is_some());
    assert!(state.statistics.is_some());
    assert!(state.recommendations.is_some());
    assert!(!state.news.is_empty());
    assert_eq!(source.chart_calls(ChartRange::FiveDays), 1);
    assert_eq!(source.calls(FakeEndpoint::News), 1);
    assert_eq!(source.calls(FakeEndpoint::Statistics), 1);
    assert_eq!(source.calls(FakeEndpoint::Recommendations), 1);
}

#[tokio::test(start_paused = true)]
async fn when_load_starts_during_a_range_change_then_the_old_chart_job_is_dropped() {
    let source = Arc::new(
        FakeStockSource::new().with_chart_delay(ChartRange::TwoYears, Duration::from_secs(10)),
    );
    let controller = controller(&source, ChartRange::OneDay);
    controller.set_range(ChartRange::TwoYears).await;
    tokio::task::yield_now().await;

    let state = controller.load(true).await;

    assert!(!controller.wait_for_chart().await);
    assert_eq!(state.range, ChartRange::TwoYears);
    assert_eq!(source.chart_calls(ChartRange::TwoYears), 2);
}

#[tokio::test(start_paused = true)]
async fn when_loads_overlap_then_the_older_load_does_not_overwrite_the_newer() {
    // Given: a load stuck behind a slow one-year chart
    let source = Arc::new(
        FakeStockSource::new().with_chart_delay(ChartRange::OneYear, Duration::from_secs(10)),
    );
    let controller = Arc::new(controller(&source, ChartRange::OneYear));
    let first = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.load(false).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(source.calls(FakeEndpoint::News), 1);

    // When: news goes down and a newer load runs for a faster range
    source.fail(FakeEndpoint::News, SourceError::unavailable("news offline"));
    controller.set_range(ChartRange::FiveDays).await;
    let newer = controller.load(true).await;
    assert!(newer.error.is_some());

    // Then: the older load finishing late leaves the newer results in place
    tokio::time::advance(Duration::from_secs(20)).await;
    first.await.expect("first load joins");
    let state = controller.state().await;
    assert!(state.error.is_some());
    assert!(!state.loading);
    assert_eq!(state.range, ChartRange::FiveDays);
    assert_eq!(
        state.chart.as_ref().map(|chart| chart.range),
        Some(ChartRange::FiveDays)
    );
}
