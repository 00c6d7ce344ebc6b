//! CLI argument definitions for tickertape.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `quote` | Latest quotes for symbols |
//! | `chart` | Price chart for one range |
//! | `search` | Search symbols by ticker or name |
//! | `options` | Option chain for an underlying |
//! | `stats` | Key statistics |
//! | `news` | Recent articles |
//! | `recommend` | Related symbols |
//! | `tops` | Screener lists (gainers, losers, ...) |
//! | `trending` | Trending symbols |
//! | `indexes` | Major US index quotes |
//! | `dig` | Chart, news, statistics and recommendations together |
//! | `holding` | Add, list or remove portfolio holdings |
//! | `position` | Add, list or remove purchase lots |
//! | `split` | Add, list or remove split adjustments |
//! | `portfolio` | Valued portfolio with gains |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--timeout-ms` | `10000` | Upstream request timeout in ms |
//! | `--db` | `$TICKERTAPE_HOME/tickertape.duckdb` | Portfolio database file |
//! | `--offline` | `false` | Serve deterministic data without network |
//! | `--refresh` | `false` | Bypass cached responses |
//! | `--verbose` | `false` | Debug logging on stderr |
//!
//! # Examples
//!
//! ```bash
//! tickertape quote AAPL MSFT --pretty
//! tickertape chart AAPL --range 5d
//! tickertape holding add aapl --side buy
//! tickertape position add <holding-id> --shares 10 --price 150 --date 2023-06-01
//! tickertape portfolio --format table
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use tickertape_core::TradeSide;

/// Stock, option and crypto tracker
///
/// Quotes, charts and news from Yahoo Finance plus a local portfolio of
/// holdings, positions and splits.
#[derive(Debug, Parser)]
#[command(
    name = "tickertape",
    author,
    version,
    about = "Stock, option and crypto tracker",
    long_about = "tickertape fetches market data from Yahoo Finance and values a local \
portfolio kept in DuckDB.\n\
\n\
Use 'tickertape <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Upstream request timeout in milliseconds.
    #[arg(long, global = true, default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Portfolio database file.
    ///
    /// Defaults to `tickertape.duckdb` under `TICKERTAPE_HOME`
    /// (or `~/.tickertape`).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Serve deterministic offline data instead of calling Yahoo Finance.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Bypass cached responses.
    #[arg(long, global = true, default_value_t = false)]
    pub refresh: bool,

    /// Log at debug level (overrides TICKERTAPE_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text view for terminals.
    Table,
    /// Single JSON object output.
    Json,
}

/// Trade side of a holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SideArg {
    Buy,
    Sell,
}

impl From<SideArg> for TradeSide {
    fn from(value: SideArg) -> Self {
        match value {
            SideArg::Buy => Self::Buy,
            SideArg::Sell => Self::Sell,
        }
    }
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch latest quote(s) for one or more symbols.
    ///
    /// # Examples
    ///
    ///   tickertape quote AAPL
    ///   tickertape quote AAPL MSFT BTC-USD --pretty
    Quote(QuoteArgs),

    /// Fetch a price chart.
    ///
    /// Ranges: 1d, 5d, 1mo, 3mo, 6mo, ytd, 1y, 2y, 5y, 10y, max.
    Chart(ChartArgs),

    /// Search for symbols by ticker or company name.
    Search(SearchArgs),

    /// Fetch the option chain of an underlying symbol.
    Options(OptionsArgs),

    /// Fetch key statistics (earnings, financials, profile).
    Stats(SymbolArgs),

    /// Fetch recent news for a symbol.
    News(NewsArgs),

    /// Fetch symbols related to a symbol.
    Recommend(SymbolArgs),

    /// Fetch a screener list such as day gainers.
    Tops(TopsArgs),

    /// Fetch trending symbols with quotes.
    Trending(TrendingArgs),

    /// Quotes of the S&P 500, Dow Jones, Nasdaq and Russell 2000.
    Indexes,

    /// Load everything the detail view shows for one symbol.
    Dig(ChartArgs),

    /// Manage portfolio holdings.
    Holding(HoldingArgs),

    /// Manage purchase lots of a holding.
    Position(PositionArgs),

    /// Manage split adjustments of a holding.
    Split(SplitArgs),

    /// Value the portfolio against current quotes.
    Portfolio,
}

/// Arguments for the `quote` command.
#[derive(Debug, Args)]
pub struct QuoteArgs {
    /// One or more symbols (e.g., AAPL, BTC-USD, ^GSPC).
    #[arg(required = true, num_args = 1..)]
    pub symbols: Vec<String>,
}

/// Arguments for commands taking a single symbol.
#[derive(Debug, Args)]
pub struct SymbolArgs {
    pub symbol: String,
}

/// Arguments for the `chart` and `dig` commands.
#[derive(Debug, Args)]
pub struct ChartArgs {
    pub symbol: String,

    /// Chart range.
    #[arg(long, default_value = "1d")]
    pub range: String,
}

/// Arguments for the `search` command.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Free-form query (symbol or company name).
    pub query: String,

    /// Maximum number of results to return.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

/// Arguments for the `options` command.
#[derive(Debug, Args)]
pub struct OptionsArgs {
    /// Underlying symbol.
    pub symbol: String,

    /// Expiration date (YYYY-MM-DD); nearest expiration when omitted.
    #[arg(long)]
    pub expiration: Option<String>,
}

/// Arguments for the `news` command.
#[derive(Debug, Args)]
pub struct NewsArgs {
    pub symbol: String,

    /// Maximum number of articles.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

/// Arguments for the `tops` command.
#[derive(Debug, Args)]
pub struct TopsArgs {
    /// Screener list, e.g. day_gainers, day_losers, most_actives.
    #[arg(long, default_value = "day_gainers")]
    pub kind: String,

    /// Number of quotes to return.
    #[arg(long, default_value_t = 25)]
    pub count: usize,
}

/// Arguments for the `trending` command.
#[derive(Debug, Args)]
pub struct TrendingArgs {
    /// Number of symbols to return.
    #[arg(long, default_value_t = 10)]
    pub count: usize,
}

/// Arguments for the `holding` command group.
#[derive(Debug, Args)]
pub struct HoldingArgs {
    #[command(subcommand)]
    pub command: HoldingCommand,
}

#[derive(Debug, Subcommand)]
pub enum HoldingCommand {
    /// Track a symbol; the quote is resolved before it is stored.
    Add(HoldingAddArgs),
    /// List tracked holdings.
    List,
    /// Remove a holding with its positions and splits.
    Remove(IdArgs),
}

#[derive(Debug, Args)]
pub struct HoldingAddArgs {
    /// Symbol, or OCC option contract symbol.
    pub symbol: String,

    #[arg(long, value_enum, default_value_t = SideArg::Buy)]
    pub side: SideArg,
}

/// Arguments for commands addressing one record.
#[derive(Debug, Args)]
pub struct IdArgs {
    pub id: String,
}

/// Arguments for the `position` command group.
#[derive(Debug, Args)]
pub struct PositionArgs {
    #[command(subcommand)]
    pub command: PositionCommand,
}

#[derive(Debug, Subcommand)]
pub enum PositionCommand {
    /// Add a purchase lot to a holding.
    Add(PositionAddArgs),
    /// List the purchase lots of a holding.
    List(IdArgs),
    /// Delete a purchase lot.
    Remove(IdArgs),
}

#[derive(Debug, Args)]
pub struct PositionAddArgs {
    /// Holding id.
    pub holding: String,

    /// Number of shares (or contracts) bought.
    #[arg(long)]
    pub shares: f64,

    /// Price paid per share.
    #[arg(long)]
    pub price: f64,

    /// Purchase date (YYYY-MM-DD); today when omitted.
    #[arg(long)]
    pub date: Option<String>,
}

/// Arguments for the `split` command group.
#[derive(Debug, Args)]
pub struct SplitArgs {
    #[command(subcommand)]
    pub command: SplitCommand,
}

#[derive(Debug, Subcommand)]
pub enum SplitCommand {
    /// Record a split, e.g. `--from 1 --to 4` for a 4-for-1.
    Add(SplitAddArgs),
    /// List the splits of a holding.
    List(IdArgs),
    /// Delete a split.
    Remove(IdArgs),
}

#[derive(Debug, Args)]
pub struct SplitAddArgs {
    /// Holding id.
    pub holding: String,

    /// Share count before the split.
    #[arg(long)]
    pub from: f64,

    /// Share count after the split.
    #[arg(long)]
    pub to: f64,

    /// Split date (YYYY-MM-DD).
    #[arg(long)]
    pub date: String,
}
