//! Behavior-driven tests for Yahoo Finance response parsing.
//!
//! Every test runs the public adapter against canned JSON bodies; nothing
//! touches the network.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tickertape_core::{
    HttpClient, HttpError, HttpRequest, HttpResponse, NewsRequest, QuoteRequest, SearchRequest,
    SourceErrorKind, StockSource, StockSymbol, YahooAdapter, YahooConfig,
};

/// Serves one fixed body per URL fragment and records every request.
struct FixtureHttpClient {
    fixtures: Vec<(&'static str, u16, &'static str)>,
    requests: Mutex<Vec<String>>,
}

impl FixtureHttpClient {
    fn serving(fragment: &'static str, body: &'static str) -> Arc<Self> {
        Arc::new(Self {
            fixtures: vec![
                (fragment, 200, body),
                ("getcrumb", 200, "fixture-crumb"),
                ("fc.yahoo.com", 404, ""),
            ],
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requested(&self, fragment: &str) -> usize {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .filter(|url| url.contains(fragment))
            .count()
    }
}

impl HttpClient for FixtureHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let response = self
            .fixtures
            .iter()
            .find(|(fragment, _, _)| request.url.contains(fragment))
            .map(|(_, status, body)| HttpResponse::with_status(*status, *body))
            .unwrap_or_else(|| HttpResponse::with_status(404, ""));
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.url);
        Box::pin(async move { Ok(response) })
    }
}

fn adapter(client: &Arc<FixtureHttpClient>) -> YahooAdapter {
    YahooAdapter::new(Arc::clone(client) as Arc<dyn HttpClient>, YahooConfig::default())
}

fn symbol(value: &str) -> StockSymbol {
    StockSymbol::parse(value).expect("valid symbol")
}

// =============================================================================
// Quotes: Malformed Entries
// =============================================================================

#[tokio::test]
async fn when_one_quote_is_incomplete_then_only_that_entry_is_excluded() {
    // Given: a batch where MSFT has no price and one entry has no symbol
    let client = FixtureHttpClient::serving(
        "v7/finance/quote",
        r#"{"quoteResponse":{"result":[
            {"symbol":"AAPL","shortName":"Apple Inc.","quoteType":"EQUITY","currency":"USD",
             "regularMarketPrice":190.0,"regularMarketPreviousClose":188.0,"marketState":"REGULAR"},
            {"symbol":"MSFT","shortName":"Microsoft","quoteType":"EQUITY"},
            {"shortName":"Nameless","regularMarketPrice":3.0},
            {"symbol":"BTC-USD","shortName":"Bitcoin USD","quoteType":"CRYPTOCURRENCY",
             "regularMarketPrice":64000.0,"regularMarketPreviousClose":63000.0}
        ],"error":null}}"#,
    );

    // When: the quotes are requested
    let request =
        QuoteRequest::new(vec![symbol("AAPL"), symbol("MSFT"), symbol("BTC-USD")]).expect("request");
    let batch = adapter(&client)
        .quotes(request)
        .await
        .expect("malformed entries must not fail the batch");

    // Then: the well-formed quotes survive in order
    let symbols = batch
        .quotes
        .iter()
        .map(|quote| quote.symbol.as_str())
        .collect::<Vec<_>>();
    assert_eq!(symbols, vec!["AAPL", "BTC-USD"]);
    assert!(batch.find(&symbol("MSFT")).is_none());
}

#[tokio::test]
async fn when_every_quote_is_malformed_then_the_batch_is_empty() {
    let client = FixtureHttpClient::serving(
        "v7/finance/quote",
        r#"{"quoteResponse":{"result":[{"symbol":"AAPL","regularMarketPrice":"n/a"}]}}"#,
    );

    let batch = adapter(&client)
        .quotes(QuoteRequest::single(symbol("AAPL")))
        .await
        .expect("batch");

    assert!(batch.quotes.is_empty());
}

#[tokio::test]
async fn when_quote_body_is_not_json_then_a_parse_error_is_returned() {
    let client = FixtureHttpClient::serving("v7/finance/quote", "<html>maintenance</html>");

    let error = adapter(&client)
        .quotes(QuoteRequest::single(symbol("AAPL")))
        .await
        .expect_err("html is not a quote response");

    assert_eq!(error.kind(), SourceErrorKind::Parse);
    assert!(!error.retryable());
}

// =============================================================================
// Search and News: Malformed Entries
// =============================================================================

#[tokio::test]
async fn when_search_hit_has_no_symbol_then_it_is_skipped() {
    let client = FixtureHttpClient::serving(
        "v1/finance/search",
        r#"{"quotes":[
            {"symbol":"AAPL","shortname":"Apple Inc.","quoteType":"EQUITY","exchDisp":"NASDAQ"},
            {"shortname":"No Symbol Corp"},
            {"symbol":"APLE","longname":"Apple Hospitality REIT","quoteType":"EQUITY"}
        ],"news":[]}"#,
    );

    let batch = adapter(&client)
        .search(SearchRequest::new("apple", 10).expect("request"))
        .await
        .expect("search");

    assert_eq!(batch.results.len(), 2);
    assert_eq!(batch.results[0].exchange.as_deref(), Some("NASDAQ"));
    assert_eq!(batch.results[1].name, "Apple Hospitality REIT");
}

#[tokio::test]
async fn when_news_item_lacks_a_title_then_it_is_skipped_and_the_rest_sorted() {
    let client = FixtureHttpClient::serving(
        "v1/finance/search",
        r#"{"quotes":[],"news":[
            {"uuid":"a","title":"Older","publisher":"Wire","link":"https://example.com/a","providerPublishTime":1704067200},
            {"uuid":"b","publisher":"Wire","link":"https://example.com/b","providerPublishTime":1704153600},
            {"uuid":"c","title":"Newer","publisher":"Wire","link":"https://example.com/c","providerPublishTime":1704240000}
        ]}"#,
    );

    let news = adapter(&client)
        .news(NewsRequest::new(symbol("AAPL"), 10).expect("request"))
        .await
        .expect("news");

    let titles = news.iter().map(|item| item.title.as_str()).collect::<Vec<_>>();
    assert_eq!(titles, vec!["Newer", "Older"]);
    assert_eq!(client.requested("v1/finance/search"), 1);
}
