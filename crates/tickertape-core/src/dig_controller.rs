//! State holder for the detail ("dig") view of one symbol.
//!
//! Range changes replace the in-flight chart job: the old task is aborted
//! and exactly one fetch for the new range is spawned. A generation counter
//! keeps a result that raced the abort out of the state. Overlapping loads
//! are settled the same way: only the most recent `load` writes its sections.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::interactor::{DigInteractor, InteractorError};
use crate::{ChartRange, KeyStatistics, StockChart, StockNews, StockRecommendations, StockSymbol};

/// Snapshot of everything the dig view shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigState {
    pub symbol: StockSymbol,
    pub range: ChartRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<StockChart>,
    pub news: Vec<StockNews>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<KeyStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<StockRecommendations>,
    /// First failure of the last load or chart fetch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub loading: bool,
}

impl DigState {
    fn new(symbol: StockSymbol, range: ChartRange) -> Self {
        Self {
            symbol,
            range,
            chart: None,
            news: Vec::new(),
            statistics: None,
            recommendations: None,
            error: None,
            loading: false,
        }
    }
}

pub struct DigController {
    interactor: Arc<DigInteractor>,
    state: Arc<RwLock<DigState>>,
    chart_job: Mutex<Option<JoinHandle<()>>>,
    generation: Arc<AtomicU64>,
    loads: AtomicU64,
}

impl DigController {
    pub fn new(interactor: Arc<DigInteractor>, symbol: StockSymbol, range: ChartRange) -> Self {
        Self {
            interactor,
            state: Arc::new(RwLock::new(DigState::new(symbol, range))),
            chart_job: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
            loads: AtomicU64::new(0),
        }
    }

    pub async fn state(&self) -> DigState {
        self.state.read().await.clone()
    }

    /// Fetch chart, news, statistics and recommendations concurrently.
    ///
    /// Each result is stored independently; `error` holds the first failure.
    /// A load overtaken by a newer one discards its results and returns the
    /// current snapshot.
    pub async fn load(&self, force: bool) -> DigState {
        self.abort_chart_job();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let load = self.loads.fetch_add(1, Ordering::SeqCst) + 1;

        let (symbol, range) = {
            let mut state = self.state.write().await;
            state.loading = true;
            state.error = None;
            (state.symbol.clone(), state.range)
        };

        let (chart, news, statistics, recommendations) = tokio::join!(
            self.interactor.chart(force, &symbol, range),
            self.interactor.news(force, &symbol),
            self.interactor.statistics(force, &symbol),
            self.interactor.recommendations(force, &symbol),
        );

        let mut state = self.state.write().await;
        if self.loads.load(Ordering::SeqCst) != load {
            debug!(%symbol, "discarding superseded load");
            return state.clone();
        }
        let mut first_error: Option<InteractorError> = None;
        if self.generation.load(Ordering::SeqCst) == generation {
            store_result(&mut state.chart, chart, &mut first_error);
        }
        match news {
            Ok(news) => state.news = news,
            Err(error) => {
                first_error.get_or_insert(error);
            }
        }
        store_result(&mut state.statistics, statistics, &mut first_error);
        store_result(&mut state.recommendations, recommendations, &mut first_error);
        state.error = first_error.map(|error| error.to_string());
        state.loading = false;
        state.clone()
    }

    /// Switch the chart range, replacing any in-flight chart fetch.
    pub async fn set_range(&self, range: ChartRange) {
        self.abort_chart_job();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let symbol = {
            let mut state = self.state.write().await;
            state.range = range;
            state.symbol.clone()
        };
        debug!(%symbol, %range, "chart range changed");

        let interactor = Arc::clone(&self.interactor);
        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);
        let job = tokio::spawn(async move {
            let result = interactor.chart(false, &symbol, range).await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            let mut state = state.write().await;
            match result {
                Ok(chart) => {
                    state.chart = Some(chart);
                    state.error = None;
                }
                Err(error) => state.error = Some(error.to_string()),
            }
        });
        *self.lock_job() = Some(job);
    }

    /// Wait for the current chart job; `false` when there was none.
    pub async fn wait_for_chart(&self) -> bool {
        let job = self.lock_job().take();
        match job {
            Some(job) => {
                let _ = job.await;
                true
            }
            None => false,
        }
    }

    fn abort_chart_job(&self) {
        if let Some(job) = self.lock_job().take() {
            job.abort();
        }
    }

    fn lock_job(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.chart_job.lock().expect("chart job lock is not poisoned")
    }
}

impl Drop for DigController {
    fn drop(&mut self) {
        self.abort_chart_job();
    }
}

fn store_result<T>(
    slot: &mut Option<T>,
    result: Result<T, InteractorError>,
    first_error: &mut Option<InteractorError>,
) {
    match result {
        Ok(value) => *slot = Some(value),
        Err(error) => {
            first_error.get_or_insert(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::StockClient;
    use crate::fake::{FakeEndpoint, FakeStockSource};
    use crate::SourceError;
    use std::time::Duration;

    fn controller(source: Arc<FakeStockSource>) -> DigController {
        let interactor = Arc::new(DigInteractor::new(StockClient::new(source)));
        DigController::new(
            interactor,
            StockSymbol::parse("AAPL").expect("symbol"),
            ChartRange::OneDay,
        )
    }

    #[tokio::test]
    async fn load_fills_every_section() {
        let source = Arc::new(FakeStockSource::new());
        let state = controller(source).load(false).await;

        assert!(state.chart.is_some());
        assert!(!state.news.is_empty());
        assert!(state.statistics.is_some());
        assert!(state.recommendations.is_some());
        assert!(state.error.is_none());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn failed_section_keeps_the_others() {
        let source = Arc::new(FakeStockSource::new());
        source.fail(FakeEndpoint::News, SourceError::unavailable("news down"));
        let state = controller(source).load(false).await;

        assert!(state.chart.is_some());
        assert!(state.news.is_empty());
        assert!(state.error.as_deref().is_some_and(|error| error.contains("news down")));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_controller_aborts_chart_job() {
        let source = Arc::new(
            FakeStockSource::new().with_chart_delay(ChartRange::OneYear, Duration::from_secs(10)),
        );
        let controller = controller(Arc::clone(&source));
        controller.set_range(ChartRange::OneYear).await;
        tokio::task::yield_now().await;
        drop(controller);

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(source.chart_calls(ChartRange::OneYear), 1);
    }
}
