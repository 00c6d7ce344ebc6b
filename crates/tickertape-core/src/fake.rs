//! Deterministic in-memory [`StockSource`].
//!
//! Prices are derived from a hash of the symbol so repeated runs agree. Used
//! by tests and by the CLI's `--offline` mode.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use time::Duration as TimeDuration;

use crate::data_source::{
    ChartRequest, NewsRequest, OptionsRequest, QuoteBatch, QuoteRequest, SearchBatch,
    SearchRequest, SourceFuture, StockSource, TopsRequest,
};
use crate::{
    equity_type_from_quote_type, ChartPoint, ChartRange, KeyStatistics, OptionContract,
    OptionType, SearchResult, SourceError, StatValue, StockChart, StockMarketSession, StockNews,
    StockOptions, StockOptionsQuote, StockQuote, StockRecommendations, StockSymbol, StockTops,
    StockTrending, UtcDateTime,
};

/// Source endpoints, used to script failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeEndpoint {
    Quotes,
    Chart,
    Search,
    Options,
    Statistics,
    News,
    Recommendations,
    Tops,
    Trending,
}

const CATALOG: [(&str, &str, &str); 8] = [
    ("AAPL", "Apple Inc.", "EQUITY"),
    ("MSFT", "Microsoft Corporation", "EQUITY"),
    ("NVDA", "NVIDIA Corporation", "EQUITY"),
    ("TSLA", "Tesla, Inc.", "EQUITY"),
    ("AMZN", "Amazon.com, Inc.", "EQUITY"),
    ("SPY", "SPDR S&P 500 ETF Trust", "ETF"),
    ("BTC-USD", "Bitcoin USD", "CRYPTOCURRENCY"),
    ("ETH-USD", "Ethereum USD", "CRYPTOCURRENCY"),
];

#[derive(Debug, Default)]
struct FakeState {
    calls: HashMap<FakeEndpoint, usize>,
    chart_calls: HashMap<ChartRange, usize>,
    failures: HashMap<FakeEndpoint, SourceError>,
    prices: HashMap<StockSymbol, (f64, f64)>,
    unknown: HashSet<StockSymbol>,
    chart_delays: HashMap<ChartRange, Duration>,
}

#[derive(Debug, Default)]
pub struct FakeStockSource {
    state: Mutex<FakeState>,
}

impl FakeStockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the price and previous close reported for `symbol`.
    pub fn with_price(self, symbol: StockSymbol, price: f64, previous_close: f64) -> Self {
        self.lock().prices.insert(symbol, (price, previous_close));
        self
    }

    /// Make `symbol` absent from quote batches and a not-found elsewhere.
    pub fn with_unknown(self, symbol: StockSymbol) -> Self {
        self.lock().unknown.insert(symbol);
        self
    }

    /// Delay chart responses for `range`.
    pub fn with_chart_delay(self, range: ChartRange, delay: Duration) -> Self {
        self.lock().chart_delays.insert(range, delay);
        self
    }

    /// Fail every call to `endpoint` with `error` until [`Self::clear_failures`].
    pub fn fail(&self, endpoint: FakeEndpoint, error: SourceError) {
        self.lock().failures.insert(endpoint, error);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn calls(&self, endpoint: FakeEndpoint) -> usize {
        self.lock().calls.get(&endpoint).copied().unwrap_or(0)
    }

    /// Chart fetches that started for `range`, including aborted ones.
    pub fn chart_calls(&self, range: ChartRange) -> usize {
        self.lock().chart_calls.get(&range).copied().unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake source lock is not poisoned")
    }

    fn begin(&self, endpoint: FakeEndpoint) -> Result<(), SourceError> {
        let mut state = self.lock();
        *state.calls.entry(endpoint).or_default() += 1;
        match state.failures.get(&endpoint) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn ensure_known(&self, symbol: &StockSymbol) -> Result<(), SourceError> {
        if self.lock().unknown.contains(symbol) {
            return Err(SourceError::not_found(format!("unknown symbol {symbol}")));
        }
        Ok(())
    }

    fn prices(&self, symbol: &StockSymbol) -> (f64, f64) {
        if let Some(prices) = self.lock().prices.get(symbol) {
            return *prices;
        }
        let seed = symbol_seed(symbol);
        let price = 50.0 + (seed % 4_500) as f64 / 10.0;
        let previous_close = price - 2.0 + (seed % 40) as f64 / 10.0;
        (price, previous_close)
    }

    fn quote(&self, symbol: &StockSymbol) -> Result<StockQuote, SourceError> {
        let (price, previous_close) = self.prices(symbol);
        let (name, quote_type) = CATALOG
            .iter()
            .find(|(catalog_symbol, _, _)| *catalog_symbol == symbol.as_str())
            .map(|(_, name, quote_type)| (*name, *quote_type))
            .unwrap_or(("", if symbol.as_str().len() > 15 { "OPTION" } else { "EQUITY" }));

        let regular = StockMarketSession::from_prices(price, previous_close)?
            .with_volume(Some(1_000_000 + symbol_seed(symbol) % 500_000));
        let mut quote = StockQuote::new(
            symbol.clone(),
            name,
            equity_type_from_quote_type(quote_type),
            "USD",
            regular,
        );
        quote.fifty_two_week_low = Some(price * 0.7);
        quote.fifty_two_week_high = Some(price * 1.3);
        if let Some(details) = option_details(symbol) {
            quote.options = Some(details);
        }
        Ok(quote)
    }
}

impl StockSource for FakeStockSource {
    fn quotes<'a>(&'a self, req: QuoteRequest) -> SourceFuture<'a, QuoteBatch> {
        Box::pin(async move {
            self.begin(FakeEndpoint::Quotes)?;
            let quotes = req
                .symbols
                .iter()
                .filter(|symbol| self.ensure_known(symbol).is_ok())
                .map(|symbol| self.quote(symbol))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(QuoteBatch { quotes })
        })
    }

    fn chart<'a>(&'a self, req: ChartRequest) -> SourceFuture<'a, StockChart> {
        Box::pin(async move {
            self.begin(FakeEndpoint::Chart)?;
            let delay = {
                let mut state = self.lock();
                *state.chart_calls.entry(req.range).or_default() += 1;
                state.chart_delays.get(&req.range).copied()
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.ensure_known(&req.symbol)?;

            let (price, previous_close) = self.prices(&req.symbol);
            let step = chart_step(req.range);
            let now = UtcDateTime::now().into_inner();
            let count = 20_usize;
            let seed = symbol_seed(&req.symbol);
            let points = (0..count)
                .filter_map(|index| {
                    let offset = step * (count - index - 1) as i32;
                    let date = UtcDateTime::from_offset_datetime(now - offset).ok()?;
                    let wobble = ((seed + index as u64) % 21) as f64 / 10.0 - 1.0;
                    Some(ChartPoint {
                        date,
                        close: (previous_close + wobble).max(0.0),
                    })
                })
                .collect();
            let reference = req.range.is_intraday().then_some(previous_close);
            StockChart::new(req.symbol, req.range, points, reference, Some(price))
                .map_err(SourceError::from)
        })
    }

    fn search<'a>(&'a self, req: SearchRequest) -> SourceFuture<'a, SearchBatch> {
        Box::pin(async move {
            self.begin(FakeEndpoint::Search)?;
            let needle = req.query.to_ascii_lowercase();
            let results = CATALOG
                .iter()
                .filter(|(symbol, name, _)| {
                    symbol.to_ascii_lowercase().contains(&needle)
                        || name.to_ascii_lowercase().contains(&needle)
                })
                .filter_map(|(symbol, name, quote_type)| {
                    Some(SearchResult {
                        symbol: StockSymbol::parse(symbol).ok()?,
                        name: (*name).to_owned(),
                        equity_type: equity_type_from_quote_type(quote_type),
                        exchange: Some(String::from("NMS")),
                    })
                })
                .take(req.limit)
                .collect();
            Ok(SearchBatch {
                query: req.query,
                results,
            })
        })
    }

    fn options_chain<'a>(&'a self, req: OptionsRequest) -> SourceFuture<'a, StockOptions> {
        Box::pin(async move {
            self.begin(FakeEndpoint::Options)?;
            self.ensure_known(&req.symbol)?;

            let today = UtcDateTime::now().date();
            let expiration_dates = (1..=4)
                .map(|weeks| today + TimeDuration::weeks(weeks))
                .collect::<Vec<_>>();
            let selected = req.expiration.unwrap_or(expiration_dates[0]);
            let (price, _) = self.prices(&req.symbol);
            let center = (price / 5.0).round() * 5.0;
            let strikes = (-2_i32..=2)
                .map(|step| center + f64::from(step) * 5.0)
                .filter(|strike| *strike > 0.0)
                .collect::<Vec<_>>();

            let contracts = |option_type: OptionType| -> Vec<OptionContract> {
                strikes
                    .iter()
                    .filter_map(|&strike| {
                        let intrinsic = match option_type {
                            OptionType::Call => (price - strike).max(0.0),
                            OptionType::Put => (strike - price).max(0.0),
                        };
                        let contract_symbol = StockSymbol::parse(&occ_symbol(
                            &req.symbol,
                            selected,
                            option_type,
                            strike,
                        ))
                        .ok()?;
                        Some(OptionContract {
                            contract_symbol,
                            option_type,
                            strike,
                            last_price: intrinsic + 1.25,
                            change: 0.1,
                            percent_change: 1.0,
                            bid: Some(intrinsic + 1.2),
                            ask: Some(intrinsic + 1.3),
                            volume: Some(100),
                            open_interest: Some(1_000),
                            implied_volatility: Some(0.3),
                            in_the_money: intrinsic > 0.0,
                            expiration: selected,
                        })
                    })
                    .collect()
            };

            Ok(StockOptions {
                calls: contracts(OptionType::Call),
                puts: contracts(OptionType::Put),
                symbol: req.symbol,
                expiration_dates,
                selected_expiration: Some(selected),
                strikes,
            })
        })
    }

    fn key_statistics<'a>(&'a self, symbol: StockSymbol) -> SourceFuture<'a, KeyStatistics> {
        Box::pin(async move {
            self.begin(FakeEndpoint::Statistics)?;
            self.ensure_known(&symbol)?;

            let seed = symbol_seed(&symbol);
            let mut stats = KeyStatistics::new(symbol);
            stats.earnings.pe_trailing = StatValue::new(14.0 + (seed % 200) as f64 / 10.0, None);
            stats.financials.market_cap =
                StatValue::new(5.0e11 + (seed % 300_000) as f64 * 1.0e6, None);
            stats.info.beta = StatValue::new(0.8 + (seed % 10) as f64 / 10.0, None);
            Ok(stats)
        })
    }

    fn news<'a>(&'a self, req: NewsRequest) -> SourceFuture<'a, Vec<StockNews>> {
        Box::pin(async move {
            self.begin(FakeEndpoint::News)?;
            self.ensure_known(&req.symbol)?;

            let now = UtcDateTime::now().into_inner();
            Ok((0..req.limit.min(3))
                .filter_map(|index| {
                    let published_at =
                        UtcDateTime::from_offset_datetime(now - TimeDuration::hours(index as i64))
                            .ok()?;
                    Some(StockNews {
                        id: format!("{}-{index}", req.symbol),
                        symbol: req.symbol.clone(),
                        title: format!("{} headline {}", req.symbol, index + 1),
                        publisher: String::from("Tickertape Wire"),
                        link: format!("https://news.example/{}/{index}", req.symbol),
                        published_at,
                        image_url: None,
                    })
                })
                .collect())
        })
    }

    fn recommendations<'a>(
        &'a self,
        symbol: StockSymbol,
    ) -> SourceFuture<'a, StockRecommendations> {
        Box::pin(async move {
            self.begin(FakeEndpoint::Recommendations)?;
            self.ensure_known(&symbol)?;

            let recommendations = CATALOG
                .iter()
                .filter(|(candidate, _, _)| *candidate != symbol.as_str())
                .take(3)
                .filter_map(|(candidate, _, _)| StockSymbol::parse(candidate).ok())
                .collect();
            Ok(StockRecommendations {
                symbol,
                recommendations,
            })
        })
    }

    fn tops<'a>(&'a self, req: TopsRequest) -> SourceFuture<'a, StockTops> {
        Box::pin(async move {
            self.begin(FakeEndpoint::Tops)?;
            let quotes = CATALOG
                .iter()
                .filter_map(|(symbol, _, _)| StockSymbol::parse(symbol).ok())
                .take(req.count)
                .map(|symbol| self.quote(&symbol))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(StockTops {
                kind: req.kind,
                title: req.kind.title().to_owned(),
                description: None,
                quotes,
            })
        })
    }

    fn trending<'a>(&'a self, count: usize) -> SourceFuture<'a, StockTrending> {
        Box::pin(async move {
            self.begin(FakeEndpoint::Trending)?;
            let symbols = CATALOG
                .iter()
                .rev()
                .filter_map(|(symbol, _, _)| StockSymbol::parse(symbol).ok())
                .take(count)
                .collect::<Vec<_>>();
            let quotes = symbols
                .iter()
                .map(|symbol| self.quote(symbol))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(StockTrending { symbols, quotes })
        })
    }
}

fn symbol_seed(symbol: &StockSymbol) -> u64 {
    symbol.as_str().bytes().fold(0_u64, |acc, byte| {
        acc.wrapping_mul(33).wrapping_add(u64::from(byte))
    })
}

fn chart_step(range: ChartRange) -> TimeDuration {
    match range {
        ChartRange::OneDay => TimeDuration::minutes(5),
        ChartRange::FiveDays => TimeDuration::minutes(15),
        ChartRange::OneMonth => TimeDuration::hours(1),
        ChartRange::ThreeMonths
        | ChartRange::SixMonths
        | ChartRange::YearToDate
        | ChartRange::OneYear => TimeDuration::days(1),
        ChartRange::TwoYears | ChartRange::FiveYears => TimeDuration::weeks(1),
        ChartRange::TenYears | ChartRange::Max => TimeDuration::days(30),
    }
}

fn occ_symbol(
    underlying: &StockSymbol,
    expiration: time::Date,
    option_type: OptionType,
    strike: f64,
) -> String {
    let flag = match option_type {
        OptionType::Call => 'C',
        OptionType::Put => 'P',
    };
    format!(
        "{}{:02}{:02}{:02}{flag}{:08}",
        underlying,
        expiration.year() % 100,
        u8::from(expiration.month()),
        expiration.day(),
        (strike * 1_000.0).round() as u64
    )
}

/// Contract details encoded in an OCC option symbol.
fn option_details(symbol: &StockSymbol) -> Option<StockOptionsQuote> {
    let raw = symbol.as_str();
    if raw.len() < 16 {
        return None;
    }
    let (head, strike) = raw.split_at(raw.len() - 8);
    let (head, flag) = head.split_at(head.len() - 1);
    let (underlying, date) = head.split_at(head.len() - 6);
    let option_type = match flag {
        "C" => OptionType::Call,
        "P" => OptionType::Put,
        _ => return None,
    };
    let year = 2000 + date.get(0..2)?.parse::<i32>().ok()?;
    let month = time::Month::try_from(date.get(2..4)?.parse::<u8>().ok()?).ok()?;
    let day = date.get(4..6)?.parse::<u8>().ok()?;
    let expiration = time::Date::from_calendar_date(year, month, day).ok()?;
    let strike = strike.parse::<u64>().ok()? as f64 / 1_000.0;
    StockOptionsQuote::new(StockSymbol::parse(underlying).ok()?, strike, expiration, option_type)
        .ok()
}
