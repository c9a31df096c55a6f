//! CLI definition and dispatch.

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{parse_time, CsvAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::strategy_file::{self, load_descriptor, load_registry};
use crate::domain::backtest::{BacktestEngine, BacktestResult};
use crate::domain::error::TradesimError;
use crate::domain::predicate::Predicate;
use crate::domain::simulator::TradeAction;
use crate::domain::strategy::StrategyDescriptor;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

/// Names a textual condition can use besides indicator keys.
const BAR_FIELDS: [&str; 5] = ["open", "high", "low", "close", "index"];

#[derive(Parser, Debug)]
#[command(name = "tradesim", about = "Long-only strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Strategy descriptor file
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        /// Strategy name, looked up in the strategies directory
        #[arg(short, long)]
        name: Option<String>,
        #[arg(long)]
        strategies_dir: Option<PathBuf>,
        /// Bar data CSV file
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Validate a strategy descriptor
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// List the strategies in a directory
    List {
        #[arg(short, long)]
        dir: PathBuf,
    },
    /// Show the time range of a bar data file
    Info {
        #[arg(short, long)]
        data: PathBuf,
    },
}

/// Where the strategy for a run comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategySource {
    File(PathBuf),
    Named { name: String, dir: PathBuf },
}

/// Fully resolved parameters of a `backtest` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub data_file: PathBuf,
    pub strategy: StrategySource,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

/// Command line values that take precedence over the `[backtest]` section.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub strategy_file: Option<PathBuf>,
    pub strategy_name: Option<String>,
    pub strategies_dir: Option<PathBuf>,
    pub data_file: Option<PathBuf>,
    pub start: Option<String>,
    pub end: Option<String>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            strategy,
            name,
            strategies_dir,
            data,
            start,
            end,
        } => {
            let overrides = RunOverrides {
                strategy_file: strategy,
                strategy_name: name,
                strategies_dir,
                data_file: data,
                start,
                end,
            };
            run_backtest(config.as_ref(), overrides)
        }
        Command::Validate { strategy } => run_validate(&strategy),
        Command::List { dir } => run_list(&dir),
        Command::Info { data } => run_info(&data),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = TradesimError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Merge the `[backtest]` section (if any) with command line overrides.
pub fn build_run_config(
    config: Option<&dyn ConfigPort>,
    overrides: RunOverrides,
) -> Result<RunConfig, TradesimError> {
    let from_config = |key: &str| {
        config
            .and_then(|c| c.get_string("backtest", key))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let data_file = overrides
        .data_file
        .or_else(|| from_config("data_file").map(PathBuf::from))
        .ok_or_else(|| missing("data_file"))?;

    let strategy = if let Some(file) = overrides.strategy_file {
        StrategySource::File(file)
    } else if let Some(name) = overrides.strategy_name {
        StrategySource::Named {
            name,
            dir: overrides
                .strategies_dir
                .or_else(|| from_config("strategies_dir").map(PathBuf::from))
                .ok_or_else(|| missing("strategies_dir"))?,
        }
    } else if let Some(file) = from_config("strategy_file") {
        StrategySource::File(PathBuf::from(file))
    } else if let Some(name) = from_config("strategy") {
        StrategySource::Named {
            name,
            dir: overrides
                .strategies_dir
                .or_else(|| from_config("strategies_dir").map(PathBuf::from))
                .ok_or_else(|| missing("strategies_dir"))?,
        }
    } else {
        return Err(missing("strategy_file"));
    };

    let start = match overrides.start.or_else(|| from_config("start_date")) {
        Some(raw) => Some(parse_bound("start_date", &raw, false)?),
        None => None,
    };
    let end = match overrides.end.or_else(|| from_config("end_date")) {
        Some(raw) => Some(parse_bound("end_date", &raw, true)?),
        None => None,
    };
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(TradesimError::ConfigInvalid {
                section: "backtest".into(),
                key: "end_date".into(),
                reason: "end_date is before start_date".into(),
            });
        }
    }

    Ok(RunConfig {
        data_file,
        strategy,
        start,
        end,
    })
}

fn missing(key: &str) -> TradesimError {
    TradesimError::ConfigMissing {
        section: "backtest".into(),
        key: key.into(),
    }
}

/// Date-only end bounds cover the whole day.
fn parse_bound(key: &str, raw: &str, is_end: bool) -> Result<NaiveDateTime, TradesimError> {
    let raw = raw.trim();
    if is_end {
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            if let Some(dt) = date.and_hms_opt(23, 59, 59) {
                return Ok(dt);
            }
        }
    }
    parse_time(raw).ok_or_else(|| TradesimError::ConfigInvalid {
        section: "backtest".into(),
        key: key.into(),
        reason: format!("invalid date '{}' (expected YYYY-MM-DD)", raw),
    })
}

pub fn resolve_strategy(source: &StrategySource) -> Result<StrategyDescriptor, TradesimError> {
    match source {
        StrategySource::File(path) => load_descriptor(path),
        StrategySource::Named { name, dir } => {
            let registry = load_registry(dir)?;
            registry.require(name).cloned()
        }
    }
}

fn run_backtest(config_path: Option<&PathBuf>, overrides: RunOverrides) -> ExitCode {
    let adapter = match config_path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            match load_config(path) {
                Ok(a) => Some(a),
                Err(code) => return code,
            }
        }
        None => None,
    };

    let run_config =
        match build_run_config(adapter.as_ref().map(|a| a as &dyn ConfigPort), overrides) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

    let data_port = CsvAdapter::new(run_config.data_file.clone());
    match run_backtest_pipeline(&data_port, &run_config) {
        Ok(result) => {
            print_summary(&result);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Resolve the strategy, fetch bars and run the engine.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    run_config: &RunConfig,
) -> Result<BacktestResult, TradesimError> {
    let descriptor = resolve_strategy(&run_config.strategy)?;
    eprintln!("Loaded strategy: {}", descriptor.name);
    for (side, source, err) in descriptor.syntax_errors() {
        eprintln!(
            "warning: {} condition will never fire:\n{}",
            side,
            err.display_with_context(source)
        );
    }

    let bars = data_port.fetch_bars(run_config.start, run_config.end)?;
    if bars.is_empty() {
        return Err(TradesimError::NoData {
            source_name: run_config.data_file.display().to_string(),
        });
    }
    eprintln!(
        "Running backtest: {} bars, {} to {}",
        bars.len(),
        bars[0].time,
        bars[bars.len() - 1].time
    );

    BacktestEngine::new().run(&bars, &descriptor)
}

pub fn print_summary(result: &BacktestResult) {
    eprintln!("\n=== Trades: {} ===", result.strategy_name);
    for trade in &result.trades {
        match trade.action {
            TradeAction::Buy => {
                eprintln!("  {}  BUY   {:>12.4}", trade.time, trade.price);
            }
            TradeAction::Sell => {
                eprintln!(
                    "  {}  SELL  {:>12.4}  {:>+10.4} ({:+.2}%)",
                    trade.time,
                    trade.price,
                    trade.profit.unwrap_or_default(),
                    trade.profit_percent.unwrap_or_default()
                );
            }
        }
    }
    if result.has_open_position() {
        eprintln!("  (position still open)");
    }

    let stats = &result.stats;
    eprintln!("\n=== Statistics ===");
    eprintln!("Total Trades:     {}", stats.total_trades);
    eprintln!("Buy / Sell:       {} / {}", stats.buy_trades, stats.sell_trades);
    eprintln!("Round Trips:      {}", stats.completed_trades);
    eprintln!("Wins / Losses:    {} / {}", stats.wins, stats.losses);
    eprintln!("Win Rate:         {:.1}%", stats.win_rate);
    eprintln!("Avg Win:          {:.4}", stats.avg_win);
    eprintln!("Avg Loss:         {:.4}", stats.avg_loss);
    eprintln!("Total Profit:     {:.4}", stats.total_profit);
    eprintln!("Total Profit %:   {:.2}%", stats.total_profit_percent);
    eprintln!("Max Drawdown:     {:.4}", stats.max_drawdown);

    if !result.failures.is_empty() {
        eprintln!(
            "\nCondition failures: {} buy, {} sell",
            result.failure_count(TradeAction::Buy),
            result.failure_count(TradeAction::Sell)
        );
    }
}

/// Identifiers a descriptor's textual conditions use that no requested
/// indicator or bar field provides. Such conditions never fire.
pub fn unknown_identifiers(descriptor: &StrategyDescriptor) -> Vec<(&'static str, String)> {
    let known: BTreeSet<String> = descriptor
        .indicators
        .requests()
        .iter()
        .flat_map(|r| r.keys())
        .chain(BAR_FIELDS.iter().map(|s| s.to_string()))
        .collect();

    let mut unknown = Vec::new();
    for (side, predicate) in [
        ("buy", &descriptor.conditions.buy),
        ("sell", &descriptor.conditions.sell),
    ] {
        if let Predicate::Expression(e) = predicate {
            if let Some(expr) = e.expr() {
                for ident in expr.identifiers() {
                    if !known.contains(ident) {
                        unknown.push((side, ident.to_string()));
                    }
                }
            }
        }
    }
    unknown
}

fn run_validate(strategy_path: &Path) -> ExitCode {
    eprintln!("Validating strategy: {}", strategy_path.display());
    let descriptor = match load_descriptor(strategy_path) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nName: {}", descriptor.name);
    if !descriptor.description.is_empty() {
        eprintln!("Description: {}", descriptor.description);
    }
    eprintln!("\nIndicators:");
    for indicator in descriptor.indicators.requests() {
        eprintln!("  {} -> {}", indicator, indicator.keys().join(", "));
    }
    eprintln!("Start index: {}", descriptor.indicators.start_index());

    let errors = descriptor.syntax_errors();
    for (side, predicate) in [
        ("buy", &descriptor.conditions.buy),
        ("sell", &descriptor.conditions.sell),
    ] {
        eprintln!("\n{} condition:", side);
        if let Predicate::Expression(e) = predicate {
            match (e.expr(), e.syntax_error()) {
                (Some(expr), _) => {
                    eprintln!("  Parsed: {}", expr);
                    eprintln!("  Raw:    {}", e.source());
                }
                (None, Some(err)) => {
                    eprintln!("  error: {}", err.display_with_context(e.source()));
                }
                (None, None) => {}
            }
        }
    }

    for (side, ident) in unknown_identifiers(&descriptor) {
        eprintln!(
            "warning: {} condition references '{}', which no indicator provides",
            side, ident
        );
    }

    if errors.is_empty() {
        eprintln!("\nStrategy descriptor is valid.");
        ExitCode::SUCCESS
    } else {
        ExitCode::from(4)
    }
}

fn run_list(dir: &Path) -> ExitCode {
    let files = match strategy_file::descriptor_files(dir) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let mut failed = false;
    for path in &files {
        match load_descriptor(path) {
            Ok(d) => println!("{}\t{}", d.name, path.display()),
            Err(e) => {
                eprintln!("error: {}: {}", path.display(), e);
                failed = true;
            }
        }
    }
    eprintln!("{} strategy files found", files.len());

    if failed {
        ExitCode::from(4)
    } else {
        ExitCode::SUCCESS
    }
}

fn run_info(data_path: &Path) -> ExitCode {
    let adapter = CsvAdapter::new(data_path.to_path_buf());
    match adapter.data_range() {
        Ok(Some((first, last, count))) => {
            println!("{}: {} bars, {} to {}", data_path.display(), count, first, last);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            let err = TradesimError::NoData {
                source_name: data_path.display().to_string(),
            };
            eprintln!("error: {err}");
            (&err).into()
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
