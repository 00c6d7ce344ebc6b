//! Yahoo wire types and their mapping into domain values.
//!
//! List payloads are first decoded as raw JSON values so a single entry with
//! an unexpected shape only drops that entry.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::{
    equity_type_from_quote_type, ChartPoint, ChartRange, KeyStatistics, MarketState,
    OptionContract, OptionType, SearchResult, SourceError, StatValue, StockChart,
    StockMarketSession, StockNews, StockOptionsQuote, StockQuote, StockSymbol, UtcDateTime,
};

/// `{"code": ..., "description": ...}` error object.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct YahooError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl YahooError {
    pub fn into_source_error(self, context: &str) -> SourceError {
        let description = self
            .description
            .unwrap_or_else(|| String::from("no description"));
        match self.code.as_deref() {
            Some("Not Found") => SourceError::not_found(format!("{context}: {description}")),
            Some("Bad Request") => {
                SourceError::invalid_request(format!("{context}: {description}"))
            }
            _ => SourceError::unavailable(format!("{context}: {description}")),
        }
    }
}

/// Common `{ result, error }` wrapper.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct ResultList<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub result: Vec<T>,
    #[serde(default)]
    pub error: Option<YahooError>,
}

impl<T> ResultList<T> {
    /// First result, or the reported error.
    pub fn into_first(self, context: &str) -> Result<T, SourceError> {
        if let Some(error) = self.error {
            return Err(error.into_source_error(context));
        }
        self.result
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::not_found(format!("{context}: empty result")))
    }

    pub fn into_all(self, context: &str) -> Result<Vec<T>, SourceError> {
        if let Some(error) = self.error {
            return Err(error.into_source_error(context));
        }
        Ok(self.result)
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode each raw entry, logging and dropping the ones that fail.
pub(crate) fn decode_entries<T, U>(
    entries: Vec<Value>,
    what: &'static str,
    mut map: impl FnMut(T) -> Result<U, String>,
) -> Vec<U>
where
    T: DeserializeOwned,
{
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let decoded = serde_json::from_value::<T>(entry)
                .map_err(|error| error.to_string())
                .and_then(&mut map);
            match decoded {
                Ok(value) => Some(value),
                Err(reason) => {
                    warn!(kind = what, index, %reason, "skipping malformed entry");
                    None
                }
            }
        })
        .collect()
}

// ============================================================================
// Quotes
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QuoteEnvelope {
    #[serde(rename = "quoteResponse")]
    pub quote_response: ResultList<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct YahooQuote {
    pub symbol: Option<String>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub quote_type: Option<String>,
    pub currency: Option<String>,
    pub market_state: Option<String>,
    pub regular_market_price: Option<f64>,
    pub regular_market_previous_close: Option<f64>,
    pub regular_market_open: Option<f64>,
    pub regular_market_day_high: Option<f64>,
    pub regular_market_day_low: Option<f64>,
    pub regular_market_volume: Option<f64>,
    pub pre_market_price: Option<f64>,
    pub post_market_price: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub exchange_data_delayed_by: Option<u32>,
    pub underlying_symbol: Option<String>,
    pub strike: Option<f64>,
    pub expire_date: Option<i64>,
}

pub(crate) fn quote_from_wire(wire: YahooQuote) -> Result<StockQuote, String> {
    let raw_symbol = wire.symbol.ok_or("missing symbol")?;
    let symbol = StockSymbol::parse(&raw_symbol).map_err(|error| error.to_string())?;
    let price = wire
        .regular_market_price
        .ok_or_else(|| format!("{symbol}: missing regular market price"))?;
    let previous_close = wire.regular_market_previous_close.unwrap_or(price);

    let regular = StockMarketSession::from_prices(price, previous_close)
        .map_err(|error| format!("{symbol}: {error}"))?
        .with_day_range(
            wire.regular_market_open,
            wire.regular_market_day_high,
            wire.regular_market_day_low,
        )
        .with_volume(to_count(wire.regular_market_volume));

    let equity_type = wire
        .quote_type
        .as_deref()
        .map(equity_type_from_quote_type)
        .unwrap_or(crate::EquityType::Stock);
    let company_name = wire
        .long_name
        .or(wire.short_name)
        .unwrap_or_default();

    let mut quote = StockQuote::new(
        symbol,
        company_name,
        equity_type,
        wire.currency.unwrap_or_else(|| String::from("USD")),
        regular,
    );
    quote.market_state = wire
        .market_state
        .as_deref()
        .map(MarketState::from_yahoo)
        .unwrap_or(MarketState::Regular);
    quote.pre_market = wire
        .pre_market_price
        .and_then(|pre| StockMarketSession::from_prices(pre, previous_close).ok());
    quote.after_hours = wire
        .post_market_price
        .and_then(|post| StockMarketSession::from_prices(post, price).ok());
    quote.fifty_two_week_low = wire.fifty_two_week_low.filter(|v| v.is_finite());
    quote.fifty_two_week_high = wire.fifty_two_week_high.filter(|v| v.is_finite());
    quote.data_delay_minutes = wire.exchange_data_delayed_by.unwrap_or(0);

    if quote.equity_type == crate::EquityType::Option {
        quote.options = option_details(
            &quote.symbol,
            wire.underlying_symbol.as_deref(),
            wire.strike,
            wire.expire_date,
        );
    }

    Ok(quote)
}

fn option_details(
    contract: &StockSymbol,
    underlying: Option<&str>,
    strike: Option<f64>,
    expire_date: Option<i64>,
) -> Option<StockOptionsQuote> {
    let underlying = StockSymbol::parse(underlying?).ok()?;
    let expiration = UtcDateTime::from_unix_timestamp(expire_date?).ok()?.date();
    let option_type = occ_option_type(contract.as_str())?;
    StockOptionsQuote::new(underlying, strike?, expiration, option_type).ok()
}

/// Call/put flag of an OCC contract symbol (`AAPL250117C00150000`).
pub(crate) fn occ_option_type(contract: &str) -> Option<OptionType> {
    let bytes = contract.as_bytes();
    if bytes.len() < 16 {
        return None;
    }
    match bytes[bytes.len() - 9] {
        b'C' => Some(OptionType::Call),
        b'P' => Some(OptionType::Put),
        _ => None,
    }
}

pub(crate) fn parse_quote_list(entries: Vec<Value>) -> Vec<StockQuote> {
    decode_entries(entries, "quote", quote_from_wire)
}

fn to_count(value: Option<f64>) -> Option<u64> {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u64)
}

// ============================================================================
// Chart
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChartEnvelope {
    pub chart: ResultList<ChartResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChartResult {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: ChartIndicators,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChartMeta {
    #[serde(default)]
    pub regular_market_price: Option<f64>,
    #[serde(default)]
    pub chart_previous_close: Option<f64>,
    #[serde(default)]
    pub previous_close: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<ChartQuote>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChartQuote {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

pub(crate) fn chart_from_wire(
    symbol: StockSymbol,
    range: ChartRange,
    result: ChartResult,
) -> Result<StockChart, SourceError> {
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|quote| quote.close)
        .unwrap_or_default();

    let points = result
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(&ts, close)| {
            let close = close?;
            let date = UtcDateTime::from_unix_timestamp(ts).ok()?;
            Some(ChartPoint { date, close })
        })
        .collect::<Vec<_>>();

    let reference = if range.is_intraday() {
        result.meta.previous_close.or(result.meta.chart_previous_close)
    } else {
        None
    };

    StockChart::new(
        symbol,
        range,
        points,
        reference,
        result.meta.regular_market_price,
    )
    .map_err(|error| SourceError::parse(format!("invalid chart: {error}")))
}

// ============================================================================
// Search and news
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchEnvelope {
    #[serde(default)]
    pub quotes: Vec<Value>,
    #[serde(default)]
    pub news: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct YahooSearchQuote {
    pub symbol: Option<String>,
    #[serde(rename = "shortname")]
    pub short_name: Option<String>,
    #[serde(rename = "longname")]
    pub long_name: Option<String>,
    pub quote_type: Option<String>,
    #[serde(rename = "exchDisp")]
    pub exchange_display: Option<String>,
    pub exchange: Option<String>,
}

pub(crate) fn search_result_from_wire(wire: YahooSearchQuote) -> Result<SearchResult, String> {
    let raw_symbol = wire.symbol.ok_or("missing symbol")?;
    let symbol = StockSymbol::parse(&raw_symbol).map_err(|error| error.to_string())?;
    let name = wire
        .long_name
        .or(wire.short_name)
        .unwrap_or_else(|| symbol.to_string());

    Ok(SearchResult {
        equity_type: wire
            .quote_type
            .as_deref()
            .map(equity_type_from_quote_type)
            .unwrap_or(crate::EquityType::Stock),
        exchange: wire.exchange_display.or(wire.exchange),
        symbol,
        name,
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct YahooNews {
    pub uuid: Option<String>,
    pub title: Option<String>,
    pub publisher: Option<String>,
    pub link: Option<String>,
    pub provider_publish_time: Option<i64>,
    #[serde(default)]
    pub thumbnail: Option<YahooThumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct YahooThumbnail {
    #[serde(default)]
    pub resolutions: Vec<YahooResolution>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct YahooResolution {
    pub url: String,
}

pub(crate) fn news_from_wire(symbol: &StockSymbol, wire: YahooNews) -> Result<StockNews, String> {
    let title = wire.title.filter(|t| !t.trim().is_empty()).ok_or("missing title")?;
    let link = wire.link.ok_or("missing link")?;
    let published_at = wire
        .provider_publish_time
        .ok_or("missing publish time")
        .and_then(|ts| UtcDateTime::from_unix_timestamp(ts).map_err(|_| "invalid publish time"))?;

    Ok(StockNews {
        id: wire.uuid.unwrap_or_else(|| link.clone()),
        symbol: symbol.clone(),
        title,
        publisher: wire.publisher.unwrap_or_default(),
        link,
        published_at,
        image_url: wire
            .thumbnail
            .and_then(|thumbnail| thumbnail.resolutions.into_iter().next())
            .map(|resolution| resolution.url),
    })
}

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OptionsEnvelope {
    pub option_chain: ResultList<OptionChainResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OptionChainResult {
    #[serde(default)]
    pub expiration_dates: Vec<i64>,
    #[serde(default)]
    pub strikes: Vec<f64>,
    #[serde(default)]
    pub options: Vec<OptionChainEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OptionChainEntry {
    pub expiration_date: Option<i64>,
    #[serde(default)]
    pub calls: Vec<Value>,
    #[serde(default)]
    pub puts: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct YahooOptionContract {
    pub contract_symbol: Option<String>,
    pub strike: Option<f64>,
    pub last_price: Option<f64>,
    pub change: Option<f64>,
    pub percent_change: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub volume: Option<f64>,
    pub open_interest: Option<f64>,
    pub implied_volatility: Option<f64>,
    #[serde(default)]
    pub in_the_money: bool,
    pub expiration: Option<i64>,
}

pub(crate) fn contract_from_wire(
    option_type: OptionType,
    wire: YahooOptionContract,
) -> Result<OptionContract, String> {
    let raw_symbol = wire.contract_symbol.ok_or("missing contract symbol")?;
    let contract_symbol = StockSymbol::parse(&raw_symbol).map_err(|error| error.to_string())?;
    let strike = wire
        .strike
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| format!("{contract_symbol}: missing strike"))?;
    let expiration = wire
        .expiration
        .and_then(|ts| UtcDateTime::from_unix_timestamp(ts).ok())
        .ok_or_else(|| format!("{contract_symbol}: missing expiration"))?
        .date();
    let finite = |value: Option<f64>| value.filter(|v| v.is_finite());

    Ok(OptionContract {
        contract_symbol,
        option_type,
        strike,
        last_price: finite(wire.last_price).unwrap_or(0.0),
        change: finite(wire.change).unwrap_or(0.0),
        percent_change: finite(wire.percent_change).unwrap_or(0.0),
        bid: finite(wire.bid),
        ask: finite(wire.ask),
        volume: to_count(wire.volume),
        open_interest: to_count(wire.open_interest),
        implied_volatility: finite(wire.implied_volatility),
        in_the_money: wire.in_the_money,
        expiration,
    })
}

// ============================================================================
// Quote summary (key statistics)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuoteSummaryEnvelope {
    pub quote_summary: ResultList<QuoteSummaryResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuoteSummaryResult {
    #[serde(default)]
    pub default_key_statistics: Option<Value>,
    #[serde(default)]
    pub financial_data: Option<Value>,
    #[serde(default)]
    pub summary_detail: Option<Value>,
}

/// Read a `{raw, fmt}` value; Yahoo sends `{}` for absent numbers.
fn stat(module: Option<&Value>, key: &str) -> Option<StatValue> {
    let value = module?.get(key)?;
    match value {
        Value::Number(number) => StatValue::new(number.as_f64()?, None),
        Value::Object(fields) => {
            let raw = fields.get("raw")?.as_f64()?;
            let fmt = fields
                .get("fmt")
                .and_then(Value::as_str)
                .map(str::to_owned);
            StatValue::new(raw, fmt)
        }
        _ => None,
    }
}

pub(crate) fn statistics_from_wire(symbol: StockSymbol, result: QuoteSummaryResult) -> KeyStatistics {
    let keys = result.default_key_statistics.as_ref();
    let financial = result.financial_data.as_ref();
    let summary = result.summary_detail.as_ref();

    let mut stats = KeyStatistics::new(symbol);

    stats.earnings.eps_trailing = stat(keys, "trailingEps");
    stats.earnings.eps_forward = stat(keys, "forwardEps");
    stats.earnings.pe_trailing = stat(summary, "trailingPE");
    stats.earnings.pe_forward = stat(summary, "forwardPE").or_else(|| stat(keys, "forwardPE"));
    stats.earnings.peg_ratio = stat(keys, "pegRatio");
    stats.earnings.earnings_quarterly_growth = stat(keys, "earningsQuarterlyGrowth");

    stats.financials.market_cap = stat(summary, "marketCap").or_else(|| stat(keys, "marketCap"));
    stats.financials.enterprise_value = stat(keys, "enterpriseValue");
    stats.financials.total_revenue = stat(financial, "totalRevenue");
    stats.financials.revenue_per_share = stat(financial, "revenuePerShare");
    stats.financials.profit_margins =
        stat(financial, "profitMargins").or_else(|| stat(keys, "profitMargins"));
    stats.financials.operating_margins = stat(financial, "operatingMargins");
    stats.financials.return_on_assets = stat(financial, "returnOnAssets");
    stats.financials.return_on_equity = stat(financial, "returnOnEquity");
    stats.financials.total_cash = stat(financial, "totalCash");
    stats.financials.total_debt = stat(financial, "totalDebt");
    stats.financials.current_ratio = stat(financial, "currentRatio");
    stats.financials.free_cashflow = stat(financial, "freeCashflow");

    stats.info.beta = stat(keys, "beta").or_else(|| stat(summary, "beta"));
    stats.info.shares_outstanding = stat(keys, "sharesOutstanding");
    stats.info.float_shares = stat(keys, "floatShares");
    stats.info.short_ratio = stat(keys, "shortRatio");
    stats.info.held_percent_insiders = stat(keys, "heldPercentInsiders");
    stats.info.held_percent_institutions = stat(keys, "heldPercentInstitutions");
    stats.info.fifty_two_week_change = stat(keys, "52WeekChange");
    stats.info.dividend_yield = stat(summary, "dividendYield");
    stats.info.payout_ratio = stat(summary, "payoutRatio");
    stats.info.ex_dividend_date = stat(summary, "exDividendDate");

    stats
}

// ============================================================================
// Finance lists (recommendations, screener, trending)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FinanceEnvelope<T> {
    pub finance: ResultList<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecommendationResult {
    #[serde(default)]
    pub recommended_symbols: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SymbolEntry {
    pub symbol: Option<String>,
}

pub(crate) fn symbol_from_entry(entry: SymbolEntry) -> Result<StockSymbol, String> {
    let raw = entry.symbol.ok_or("missing symbol")?;
    StockSymbol::parse(&raw).map_err(|error| error.to_string())
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ScreenerResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quotes: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TrendingResult {
    #[serde(default)]
    pub quotes: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skips_quotes_missing_required_fields() {
        let quotes = parse_quote_list(vec![
            json!({"symbol": "AAPL", "regularMarketPrice": 190.5, "regularMarketPreviousClose": 188.0}),
            json!({"symbol": "NOPRICE"}),
            json!({"regularMarketPrice": 10.0}),
            json!({"symbol": "BAD", "regularMarketPrice": "not-a-number"}),
            json!({"symbol": "NEG", "regularMarketPrice": -3.0}),
        ]);

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].symbol.as_str(), "AAPL");
        assert!((quotes[0].regular.amount - 2.5).abs() < 1e-9);
    }

    #[test]
    fn option_quote_carries_contract_details() {
        let quote = quote_from_wire(YahooQuote {
            symbol: Some(String::from("AAPL250117C00150000")),
            quote_type: Some(String::from("OPTION")),
            regular_market_price: Some(12.0),
            underlying_symbol: Some(String::from("AAPL")),
            strike: Some(150.0),
            expire_date: Some(1_737_072_000),
            ..YahooQuote::default()
        })
        .expect("valid option quote");

        let options = quote.options.expect("option details");
        assert_eq!(options.option_type, OptionType::Call);
        assert_eq!(options.underlying_symbol.as_str(), "AAPL");
        assert_eq!(tickertape_store::format_date(options.expiration), "2025-01-17");
    }

    #[test]
    fn reads_raw_and_formatted_statistics() {
        let stats = statistics_from_wire(
            StockSymbol::parse("AAPL").expect("symbol"),
            QuoteSummaryResult {
                default_key_statistics: Some(json!({
                    "beta": {"raw": 1.2, "fmt": "1.20"},
                    "pegRatio": {},
                    "52WeekChange": 0.31
                })),
                financial_data: None,
                summary_detail: Some(json!({"marketCap": {"raw": 2.9e12, "fmt": "2.9T"}})),
            },
        );

        assert_eq!(stats.info.beta.as_ref().map(|v| v.raw), Some(1.2));
        assert!(stats.earnings.peg_ratio.is_none());
        assert_eq!(
            stats.financials.market_cap.and_then(|v| v.fmt).as_deref(),
            Some("2.9T")
        );
        assert_eq!(stats.info.fifty_two_week_change.map(|v| v.raw), Some(0.31));
    }

    #[test]
    fn result_list_decodes_typed_entries_and_treats_missing_as_empty() {
        let list: ResultList<String> =
            serde_json::from_value(json!({"result": ["AAPL", "MSFT"]})).expect("decode");
        assert_eq!(list.into_all("trending").expect("entries"), ["AAPL", "MSFT"]);

        let empty: FinanceEnvelope<String> =
            serde_json::from_value(json!({"finance": {"error": null}})).expect("decode");
        assert!(empty.finance.into_all("trending").expect("entries").is_empty());
    }

    #[test]
    fn yahoo_not_found_maps_to_not_found() {
        let list: ResultList<Value> = serde_json::from_value(json!({
            "result": null,
            "error": {"code": "Not Found", "description": "No data found"}
        }))
        .expect("decode");

        let error = list.into_first("chart").expect_err("must fail");
        assert_eq!(error.kind(), crate::SourceErrorKind::NotFound);
    }
}
