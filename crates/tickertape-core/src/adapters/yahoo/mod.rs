//! Yahoo Finance adapter.
//!
//! Talks to the unofficial `query1`/`query2.finance.yahoo.com` JSON
//! endpoints:
//!
//! | Endpoint | Used for |
//! |----------|----------|
//! | `v7/finance/quote` | quotes, trending quotes |
//! | `v8/finance/chart/{symbol}` | charts |
//! | `v1/finance/search` | symbol search and news |
//! | `v7/finance/options/{symbol}` | options chains |
//! | `v10/finance/quoteSummary/{symbol}` | key statistics |
//! | `v6/finance/recommendationsbysymbol/{symbol}` | recommendations |
//! | `v1/finance/screener/predefined/saved` | tops lists |
//! | `v1/finance/trending/US` | trending symbols |

mod auth;
mod dto;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

pub use auth::YahooAuthManager;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::data_source::{
    ChartRequest, NewsRequest, OptionsRequest, QuoteBatch, QuoteRequest, SearchBatch,
    SearchRequest, SourceFuture, StockSource, TopsRequest,
};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::{
    KeyStatistics, OptionType, SourceError, StockChart, StockNews, StockOptions,
    StockRecommendations, StockSymbol, StockTops, StockTrending, UtcDateTime,
};

use dto::{
    ChartEnvelope, FinanceEnvelope, OptionsEnvelope, QuoteEnvelope, QuoteSummaryEnvelope,
    RecommendationResult, ScreenerResult, SearchEnvelope, TrendingResult,
};

const QUERY1: &str = "https://query1.finance.yahoo.com";
const QUERY2: &str = "https://query2.finance.yahoo.com";
const SUMMARY_MODULES: &str = "defaultKeyStatistics,financialData,summaryDetail";

/// Connection settings for the Yahoo adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YahooConfig {
    pub timeout_ms: u64,
    pub user_agent: String,
    pub crumb_ttl_secs: u64,
    /// Session cookie sent with every request, for environments where the
    /// cookie endpoint is blocked.
    pub cookie: Option<String>,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            user_agent: String::from(crate::http_client::DEFAULT_USER_AGENT),
            crumb_ttl_secs: 3_600,
            cookie: None,
        }
    }
}

impl YahooConfig {
    /// Defaults plus the `YAHOO_COOKIE` override.
    pub fn from_env() -> Self {
        Self {
            cookie: std::env::var("YAHOO_COOKIE")
                .ok()
                .filter(|cookie| !cookie.trim().is_empty()),
            ..Self::default()
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// [`StockSource`] backed by Yahoo Finance.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    auth_manager: Arc<YahooAuthManager>,
    circuit_breaker: Arc<CircuitBreaker>,
    timeout_ms: u64,
}

impl YahooAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, config: YahooConfig) -> Self {
        let auth = config.cookie.map_or(HttpAuth::None, HttpAuth::Cookie);
        Self {
            http_client,
            auth_manager: Arc::new(YahooAuthManager::new(
                Duration::from_secs(config.crumb_ttl_secs),
                auth,
                config.timeout_ms,
            )),
            circuit_breaker: Arc::new(CircuitBreaker::new(
                "yahoo",
                CircuitBreakerConfig::default(),
            )),
            timeout_ms: config.timeout_ms,
        }
    }

    /// Adapter over a real reqwest transport.
    pub fn connect(config: YahooConfig) -> Result<Self, SourceError> {
        let client = ReqwestHttpClient::new(&config.user_agent)
            .map_err(|error| SourceError::internal(error.message().to_owned()))?;
        Ok(Self::new(Arc::new(client), config))
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// GET a Yahoo endpoint and decode its JSON body.
    ///
    /// A 401/429 invalidates the crumb and retries exactly once.
    async fn fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
        context: &'static str,
    ) -> Result<T, SourceError> {
        self.circuit_breaker.check()?;

        let crumb = self.crumb().await?;
        let mut response = self.send(url, params, &crumb).await?;
        if response.is_auth_failure() {
            debug!(context, status = response.status, "refreshing yahoo crumb and retrying");
            self.auth_manager.invalidate().await;
            let crumb = self.crumb().await?;
            response = self.send(url, params, &crumb).await?;
        }

        match response.status {
            status if (200..300).contains(&status) => self.circuit_breaker.record_success(),
            404 => {
                self.circuit_breaker.record_success();
                return Err(SourceError::not_found(format!("yahoo {context}: not found")));
            }
            429 => {
                self.circuit_breaker.record_failure();
                return Err(SourceError::rate_limited(format!(
                    "yahoo {context}: rate limited after auth refresh"
                )));
            }
            status => {
                self.circuit_breaker.record_failure();
                return Err(SourceError::unavailable(format!(
                    "yahoo {context}: upstream returned status {status}"
                )));
            }
        }

        serde_json::from_str(&response.body).map_err(|error| {
            SourceError::parse(format!("failed to parse yahoo {context} response: {error}"))
        })
    }

    async fn crumb(&self) -> Result<String, SourceError> {
        self.auth_manager
            .crumb(&self.http_client)
            .await
            .inspect_err(|_| self.circuit_breaker.record_failure())
    }

    async fn send(
        &self,
        url: &str,
        params: &[(&str, String)],
        crumb: &str,
    ) -> Result<HttpResponse, SourceError> {
        let request = params
            .iter()
            .fold(HttpRequest::get(url), |request, (name, value)| {
                request.with_query(name, value)
            })
            .with_query("crumb", crumb)
            .with_header("referer", auth::REFERER)
            .with_auth(self.auth_manager.auth())
            .with_timeout_ms(self.timeout_ms);

        self.http_client.execute(request).await.map_err(|error| {
            self.circuit_breaker.record_failure();
            if error.retryable() {
                SourceError::unavailable(format!("yahoo transport error: {}", error.message()))
            } else {
                SourceError::internal(format!("yahoo transport error: {}", error.message()))
            }
        })
    }

    async fn fetch_quotes(&self, req: &QuoteRequest) -> Result<QuoteBatch, SourceError> {
        let url = format!("{QUERY1}/v7/finance/quote");
        let envelope: QuoteEnvelope = self
            .fetch(&url, &[("symbols", req.joined())], "quote")
            .await?;
        let entries = envelope.quote_response.into_all("yahoo quote")?;
        let requested = entries.len();
        let quotes = dto::parse_quote_list(entries);
        debug!(requested, parsed = quotes.len(), "parsed yahoo quotes");
        Ok(QuoteBatch { quotes })
    }
}

impl StockSource for YahooAdapter {
    fn quotes<'a>(&'a self, req: QuoteRequest) -> SourceFuture<'a, QuoteBatch> {
        Box::pin(async move { self.fetch_quotes(&req).await })
    }

    fn chart<'a>(&'a self, req: ChartRequest) -> SourceFuture<'a, StockChart> {
        Box::pin(async move {
            let url = format!(
                "{QUERY1}/v8/finance/chart/{}",
                urlencoding::encode(req.symbol.as_str())
            );
            let params = [
                ("range", req.range.as_str().to_owned()),
                ("interval", req.range.interval().to_owned()),
                ("includePrePost", String::from("false")),
            ];
            let envelope: ChartEnvelope = self.fetch(&url, &params, "chart").await?;
            let result = envelope.chart.into_first("yahoo chart")?;
            dto::chart_from_wire(req.symbol, req.range, result)
        })
    }

    fn search<'a>(&'a self, req: SearchRequest) -> SourceFuture<'a, SearchBatch> {
        Box::pin(async move {
            let url = format!("{QUERY2}/v1/finance/search");
            let params = [
                ("q", req.query.clone()),
                ("quotesCount", req.limit.to_string()),
                ("newsCount", String::from("0")),
            ];
            let envelope: SearchEnvelope = self.fetch(&url, &params, "search").await?;
            let mut results =
                dto::decode_entries(envelope.quotes, "search result", dto::search_result_from_wire);
            results.truncate(req.limit);
            Ok(SearchBatch {
                query: req.query,
                results,
            })
        })
    }

    fn options_chain<'a>(&'a self, req: OptionsRequest) -> SourceFuture<'a, StockOptions> {
        Box::pin(async move {
            let url = format!(
                "{QUERY1}/v7/finance/options/{}",
                urlencoding::encode(req.symbol.as_str())
            );
            let params = req
                .expiration
                .map(|date| vec![("date", date.midnight().assume_utc().unix_timestamp().to_string())])
                .unwrap_or_default();
            let envelope: OptionsEnvelope = self.fetch(&url, &params, "options").await?;
            let result = envelope.option_chain.into_first("yahoo options")?;

            let expiration_dates = result
                .expiration_dates
                .iter()
                .filter_map(|&ts| UtcDateTime::from_unix_timestamp(ts).ok())
                .map(UtcDateTime::date)
                .collect();
            let entry = result.options.into_iter().next();
            let selected_expiration = entry
                .as_ref()
                .and_then(|entry| entry.expiration_date)
                .and_then(|ts| UtcDateTime::from_unix_timestamp(ts).ok())
                .map(UtcDateTime::date)
                .or(req.expiration);
            let (calls, puts) = match entry {
                Some(entry) => (
                    dto::decode_entries(entry.calls, "call contract", |wire| {
                        dto::contract_from_wire(OptionType::Call, wire)
                    }),
                    dto::decode_entries(entry.puts, "put contract", |wire| {
                        dto::contract_from_wire(OptionType::Put, wire)
                    }),
                ),
                None => (Vec::new(), Vec::new()),
            };

            Ok(StockOptions {
                symbol: req.symbol,
                expiration_dates,
                selected_expiration,
                strikes: result
                    .strikes
                    .into_iter()
                    .filter(|strike| strike.is_finite())
                    .collect(),
                calls,
                puts,
            })
        })
    }

    fn key_statistics<'a>(&'a self, symbol: StockSymbol) -> SourceFuture<'a, KeyStatistics> {
        Box::pin(async move {
            let url = format!(
                "{QUERY1}/v10/finance/quoteSummary/{}",
                urlencoding::encode(symbol.as_str())
            );
            let envelope: QuoteSummaryEnvelope = self
                .fetch(&url, &[("modules", String::from(SUMMARY_MODULES))], "quote summary")
                .await?;
            let result = envelope.quote_summary.into_first("yahoo quote summary")?;
            Ok(dto::statistics_from_wire(symbol, result))
        })
    }

    fn news<'a>(&'a self, req: NewsRequest) -> SourceFuture<'a, Vec<StockNews>> {
        Box::pin(async move {
            let url = format!("{QUERY2}/v1/finance/search");
            let params = [
                ("q", req.symbol.to_string()),
                ("quotesCount", String::from("0")),
                ("newsCount", req.limit.to_string()),
            ];
            let envelope: SearchEnvelope = self.fetch(&url, &params, "news").await?;
            let mut news = dto::decode_entries(envelope.news, "news", |wire| {
                dto::news_from_wire(&req.symbol, wire)
            });
            news.sort_by(|a, b| b.published_at.cmp(&a.published_at));
            news.truncate(req.limit);
            Ok(news)
        })
    }

    fn recommendations<'a>(
        &'a self,
        symbol: StockSymbol,
    ) -> SourceFuture<'a, StockRecommendations> {
        Box::pin(async move {
            let url = format!(
                "{QUERY1}/v6/finance/recommendationsbysymbol/{}",
                urlencoding::encode(symbol.as_str())
            );
            let envelope: FinanceEnvelope<RecommendationResult> =
                self.fetch(&url, &[], "recommendations").await?;
            let result = envelope.finance.into_first("yahoo recommendations")?;
            let recommendations = dto::decode_entries(
                result.recommended_symbols,
                "recommendation",
                dto::symbol_from_entry,
            );
            Ok(StockRecommendations {
                symbol,
                recommendations,
            })
        })
    }

    fn tops<'a>(&'a self, req: TopsRequest) -> SourceFuture<'a, StockTops> {
        Box::pin(async move {
            let url = format!("{QUERY1}/v1/finance/screener/predefined/saved");
            let params = [
                ("scrIds", req.kind.screener_id().to_owned()),
                ("count", req.count.to_string()),
            ];
            let envelope: FinanceEnvelope<ScreenerResult> =
                self.fetch(&url, &params, "screener").await?;
            let result = envelope.finance.into_first("yahoo screener")?;
            let mut quotes = dto::parse_quote_list(result.quotes);
            quotes.truncate(req.count);
            Ok(StockTops {
                kind: req.kind,
                title: result
                    .title
                    .unwrap_or_else(|| req.kind.title().to_owned()),
                description: result.description,
                quotes,
            })
        })
    }

    fn trending<'a>(&'a self, count: usize) -> SourceFuture<'a, StockTrending> {
        Box::pin(async move {
            if count == 0 {
                return Err(SourceError::invalid_request(
                    "trending count must be greater than zero",
                ));
            }

            let url = format!("{QUERY1}/v1/finance/trending/US");
            let envelope: FinanceEnvelope<TrendingResult> = self
                .fetch(&url, &[("count", count.to_string())], "trending")
                .await?;
            let result = envelope.finance.into_first("yahoo trending")?;
            let mut symbols =
                dto::decode_entries(result.quotes, "trending symbol", dto::symbol_from_entry);
            symbols.truncate(count);

            let quotes = match QuoteRequest::new(symbols.clone()) {
                Ok(request) => self.fetch_quotes(&request).await?.quotes,
                Err(_) => {
                    warn!("yahoo returned no trending symbols");
                    Vec::new()
                }
            };
            Ok(StockTrending { symbols, quotes })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitState;
    use crate::http_client::HttpError;
    use crate::{ChartRange, SourceErrorKind};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    /// Answers by URL substring; the last response of a route repeats.
    struct CannedHttpClient {
        routes: Mutex<Vec<(&'static str, Vec<Result<HttpResponse, HttpError>>)>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl CannedHttpClient {
        fn new() -> Self {
            Self {
                routes: Mutex::new(vec![
                    ("fc.yahoo.com", vec![Ok(HttpResponse::with_status(404, ""))]),
                    ("getcrumb", vec![Ok(HttpResponse::ok_json("crumb-1"))]),
                ]),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn route(self, pattern: &'static str, responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            self.routes
                .lock()
                .expect("routes lock")
                .insert(0, (pattern, responses));
            self
        }

        fn urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .expect("requests lock")
                .iter()
                .map(|request| request.url.clone())
                .collect()
        }
    }

    impl HttpClient for CannedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            let mut routes = self.routes.lock().expect("routes lock");
            let response = routes
                .iter_mut()
                .find(|(pattern, _)| request.url.contains(pattern))
                .map(|(_, responses)| {
                    if responses.len() > 1 {
                        responses.remove(0)
                    } else {
                        responses[0].clone()
                    }
                })
                .unwrap_or_else(|| Ok(HttpResponse::with_status(404, "")));
            self.requests.lock().expect("requests lock").push(request);
            Box::pin(async move { response })
        }
    }

    fn adapter(client: Arc<CannedHttpClient>) -> YahooAdapter {
        YahooAdapter::new(client, YahooConfig::default())
    }

    fn symbol(value: &str) -> StockSymbol {
        StockSymbol::parse(value).expect("valid symbol")
    }

    #[tokio::test]
    async fn quotes_skip_malformed_entries() {
        let body = r#"{"quoteResponse":{"result":[
            {"symbol":"AAPL","shortName":"Apple","quoteType":"EQUITY","regularMarketPrice":190.0,"regularMarketPreviousClose":200.0,"marketState":"REGULAR"},
            {"symbol":"BROKEN","regularMarketPrice":{"raw":1}},
            {"quoteType":"EQUITY","regularMarketPrice":5.0}
        ],"error":null}}"#;
        let client = Arc::new(CannedHttpClient::new().route("v7/finance/quote", vec![Ok(HttpResponse::ok_json(body))]));
        let adapter = adapter(Arc::clone(&client));

        let batch = adapter
            .quotes(QuoteRequest::new(vec![symbol("AAPL"), symbol("BROKEN")]).expect("request"))
            .await
            .expect("batch survives malformed entries");

        assert_eq!(batch.quotes.len(), 1);
        assert_eq!(batch.quotes[0].company_name, "Apple");
        assert!(client
            .urls()
            .iter()
            .any(|url| url.contains("symbols=AAPL%2CBROKEN") && url.contains("crumb=crumb-1")));
    }

    #[tokio::test]
    async fn unexpected_body_is_a_parse_error() {
        let client = Arc::new(
            CannedHttpClient::new().route("v7/finance/quote", vec![Ok(HttpResponse::ok_json("<html>"))]),
        );
        let error = adapter(client)
            .quotes(QuoteRequest::single(symbol("AAPL")))
            .await
            .expect_err("html is not json");
        assert_eq!(error.kind(), SourceErrorKind::Parse);
    }

    #[tokio::test]
    async fn unauthorized_refreshes_crumb_and_retries_once() {
        let body = r#"{"quoteResponse":{"result":[{"symbol":"MSFT","regularMarketPrice":410.0}]}}"#;
        let client = Arc::new(
            CannedHttpClient::new()
                .route(
                    "getcrumb",
                    vec![
                        Ok(HttpResponse::ok_json("crumb-1")),
                        Ok(HttpResponse::ok_json("crumb-2")),
                    ],
                )
                .route(
                    "v7/finance/quote",
                    vec![
                        Ok(HttpResponse::with_status(401, "")),
                        Ok(HttpResponse::ok_json(body)),
                    ],
                ),
        );

        let batch = adapter(Arc::clone(&client))
            .quotes(QuoteRequest::single(symbol("MSFT")))
            .await
            .expect("retry succeeds");
        assert_eq!(batch.quotes.len(), 1);

        let quote_urls = client
            .urls()
            .into_iter()
            .filter(|url| url.contains("v7/finance/quote"))
            .collect::<Vec<_>>();
        assert_eq!(quote_urls.len(), 2);
        assert!(quote_urls[1].contains("crumb=crumb-2"));
    }

    #[tokio::test]
    async fn breaker_opens_after_repeated_transport_failures() {
        let client = Arc::new(
            CannedHttpClient::new().route("v7/finance/quote", vec![Err(HttpError::new("timeout"))]),
        );
        let adapter = adapter(client);

        for _ in 0..3 {
            let error = adapter
                .quotes(QuoteRequest::single(symbol("AAPL")))
                .await
                .expect_err("transport failure");
            assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        }
        assert_eq!(adapter.circuit_breaker().state(), CircuitState::Open);

        let error = adapter
            .quotes(QuoteRequest::single(symbol("AAPL")))
            .await
            .expect_err("breaker rejects");
        assert!(error.message().contains("circuit breaker is open"));
    }

    #[tokio::test]
    async fn chart_maps_closes_and_reference_price() {
        let body = r#"{"chart":{"result":[{
            "meta":{"regularMarketPrice":102.0,"previousClose":100.0,"chartPreviousClose":99.0},
            "timestamp":[1704196800,1704197100,1704197400],
            "indicators":{"quote":[{"close":[100.5,null,101.5]}]}
        }],"error":null}}"#;
        let client = Arc::new(CannedHttpClient::new().route("v8/finance/chart", vec![Ok(HttpResponse::ok_json(body))]));

        let chart = adapter(Arc::clone(&client))
            .chart(ChartRequest::new(symbol("AAPL"), ChartRange::OneDay))
            .await
            .expect("chart");

        assert_eq!(chart.points.len(), 2);
        assert_eq!(chart.start_price, 100.0);
        assert_eq!(chart.current_price, 102.0);
        assert!(client
            .urls()
            .iter()
            .any(|url| url.contains("range=1d") && url.contains("interval=5m")));
    }

    #[tokio::test]
    async fn chart_not_found_error_is_reported() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let client = Arc::new(CannedHttpClient::new().route("v8/finance/chart", vec![Ok(HttpResponse::ok_json(body))]));

        let error = adapter(client)
            .chart(ChartRequest::new(symbol("ZZZZ"), ChartRange::OneYear))
            .await
            .expect_err("missing symbol");
        assert_eq!(error.kind(), SourceErrorKind::NotFound);
    }

    #[tokio::test]
    async fn trending_resolves_quotes_for_symbols() {
        let trending = r#"{"finance":{"result":[{"quotes":[{"symbol":"NVDA"},{"symbol":"bad symbol!"},{"symbol":"TSLA"}]}],"error":null}}"#;
        let quotes = r#"{"quoteResponse":{"result":[
            {"symbol":"NVDA","regularMarketPrice":900.0},
            {"symbol":"TSLA","regularMarketPrice":180.0}
        ]}}"#;
        let client = Arc::new(
            CannedHttpClient::new()
                .route("trending/US", vec![Ok(HttpResponse::ok_json(trending))])
                .route("v7/finance/quote", vec![Ok(HttpResponse::ok_json(quotes))]),
        );

        let result = adapter(client).trending(5).await.expect("trending");
        assert_eq!(result.symbols, vec![symbol("NVDA"), symbol("TSLA")]);
        assert_eq!(result.quotes.len(), 2);
    }
}
