//! Backtest engine.
//!
//! A run is a single linear pass: descriptor -> indicators -> simulation ->
//! statistics -> result. The engine holds no state between runs, so one
//! instance can be reused or one built per run.

use log::{info, warn};

use crate::domain::error::TradesimError;
use crate::domain::indicator::{compute_indicators, IndicatorSeries};
use crate::domain::metrics::StatsReport;
use crate::domain::ohlcv::Bar;
use crate::domain::simulator::{simulate, EvalFailure, Marker, Trade, TradeAction};
use crate::domain::strategy::StrategyDescriptor;

/// Everything a run produces. Owned outright by the caller.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub trades: Vec<Trade>,
    pub buy_markers: Vec<Marker>,
    pub sell_markers: Vec<Marker>,
    pub stats: StatsReport,
    pub indicators: IndicatorSeries,
    pub start_index: usize,
    pub failures: Vec<EvalFailure>,
}

impl BacktestResult {
    /// Number of recorded evaluation failures for one side.
    pub fn failure_count(&self, side: TradeAction) -> usize {
        self.failures.iter().filter(|f| f.side == side).count()
    }

    /// True when the last trade is a BUY with no matching SELL.
    pub fn has_open_position(&self) -> bool {
        self.trades
            .last()
            .is_some_and(|t| t.action == TradeAction::Buy)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BacktestEngine;

impl BacktestEngine {
    pub fn new() -> Self {
        BacktestEngine
    }

    /// Run `descriptor` over `bars`, which must be ascending by time.
    ///
    /// Only an invalid descriptor is an error. Predicates that fail to
    /// evaluate are treated as false and reported in `failures`.
    pub fn run(
        &self,
        bars: &[Bar],
        descriptor: &StrategyDescriptor,
    ) -> Result<BacktestResult, TradesimError> {
        descriptor.validate()?;

        let start_index = descriptor.indicators.start_index();
        info!(
            "running '{}' over {} bars (start index {})",
            descriptor.name,
            bars.len(),
            start_index
        );

        let indicators = compute_indicators(bars, &descriptor.indicators);
        let output = simulate(bars, &indicators, &descriptor.conditions, start_index);
        let stats = StatsReport::compute(&output.trades);

        let result = BacktestResult {
            strategy_name: descriptor.name.clone(),
            trades: output.trades,
            buy_markers: output.buy_markers,
            sell_markers: output.sell_markers,
            stats,
            indicators,
            start_index,
            failures: output.failures,
        };

        for side in [TradeAction::Buy, TradeAction::Sell] {
            let count = result.failure_count(side);
            if count > 0 {
                let first = result
                    .failures
                    .iter()
                    .find(|f| f.side == side)
                    .map(|f| f.error.to_string())
                    .unwrap_or_default();
                warn!(
                    "'{}': {} condition recorded {} failures (first: {})",
                    descriptor.name, side, count, first
                );
            }
        }

        info!(
            "finished '{}': {} trades, {} round trips, total profit {:.4}",
            result.strategy_name,
            result.stats.total_trades,
            result.stats.completed_trades,
            result.stats.total_profit
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::EvalError;
    use crate::domain::indicator::test_bars::make_bars;
    use crate::domain::indicator::IndicatorSpec;
    use crate::domain::predicate::Predicate;
    use approx::assert_relative_eq;

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    fn sma_trend() -> StrategyDescriptor {
        StrategyDescriptor::new(
            "SMA Trend",
            IndicatorSpec::new().sma(10),
            Predicate::expression("close > sma10"),
            Predicate::expression("close < sma10"),
        )
    }

    #[test]
    fn monotonic_rise_buys_once_and_never_sells() {
        let bars = make_bars(&rising(25));
        let result = BacktestEngine::new().run(&bars, &sma_trend()).unwrap();

        assert_eq!(result.strategy_name, "SMA Trend");
        assert_eq!(result.start_index, 9);
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].action, TradeAction::Buy);
        assert_eq!(result.trades[0].index, 9);
        assert_relative_eq!(result.trades[0].price, 109.0);
        assert_eq!(result.buy_markers.len(), 1);
        assert!(result.sell_markers.is_empty());
        assert!(result.has_open_position());
        assert!(result.failures.is_empty());

        assert_eq!(result.stats.total_trades, 1);
        assert_eq!(result.stats.completed_trades, 0);
        assert_relative_eq!(result.stats.total_profit, 0.0);
    }

    #[test]
    fn flat_series_rsi_is_defined() {
        let bars = make_bars(&[50.0; 30]);
        let descriptor = StrategyDescriptor::new(
            "Flat RSI",
            IndicatorSpec::new().rsi(14),
            Predicate::expression("rsi < 30"),
            Predicate::expression("rsi > 70"),
        );
        let result = BacktestEngine::new().run(&bars, &descriptor).unwrap();

        assert_eq!(result.start_index, 14);
        let rsi = result.indicators.get("rsi").unwrap();
        for value in &rsi[14..] {
            assert_relative_eq!(value.unwrap(), 50.0);
        }
        assert!(result.trades.is_empty());
        assert!(result.failures.is_empty());
        assert_eq!(result.stats, StatsReport::default());
    }

    #[test]
    fn indicator_series_aligned_with_bars() {
        let bars = make_bars(&rising(40));
        let descriptor = StrategyDescriptor::new(
            "Everything",
            IndicatorSpec::new()
                .sma(5)
                .ema(8)
                .rsi(14)
                .macd(12, 26, 9)
                .bollinger(20, 2.0)
                .volume_sma(10),
            Predicate::expression("false"),
            Predicate::expression("false"),
        );
        let result = BacktestEngine::new().run(&bars, &descriptor).unwrap();

        assert_eq!(result.start_index, 25);
        for (_, line) in result.indicators.iter() {
            assert_eq!(line.len(), bars.len());
        }
    }

    #[test]
    fn runs_do_not_share_state() {
        let engine = BacktestEngine::new();
        let bars = make_bars(&rising(25));

        let first = engine.run(&bars, &sma_trend()).unwrap();
        let second = engine.run(&bars, &sma_trend()).unwrap();
        assert_eq!(first.trades, second.trades);
        assert_eq!(first.stats, second.stats);
    }

    #[test]
    fn bad_expression_does_not_abort_the_run() {
        let bars = make_bars(&rising(5));
        let descriptor = StrategyDescriptor::new(
            "Broken",
            IndicatorSpec::new(),
            Predicate::expression("close >"),
            Predicate::expression("true"),
        );
        let result = BacktestEngine::new().run(&bars, &descriptor).unwrap();

        assert!(result.trades.is_empty());
        assert_eq!(result.failure_count(TradeAction::Buy), 1);
        assert_eq!(result.failure_count(TradeAction::Sell), 0);
        assert!(matches!(result.failures[0].error, EvalError::Syntax(_)));
    }

    #[test]
    fn invalid_descriptor_fails_before_computation() {
        let bars = make_bars(&rising(5));
        let descriptor = StrategyDescriptor::new(
            "",
            IndicatorSpec::new(),
            Predicate::expression("true"),
            Predicate::expression("true"),
        );
        assert!(matches!(
            BacktestEngine::new().run(&bars, &descriptor),
            Err(TradesimError::DescriptorMissing { .. })
        ));
    }

    #[test]
    fn empty_series_yields_empty_result() {
        let result = BacktestEngine::new().run(&[], &sma_trend()).unwrap();
        assert!(result.trades.is_empty());
        assert!(result.indicators.get("sma10").unwrap().is_empty());
    }

    #[test]
    fn round_trip_profit_feeds_stats() {
        let mut prices = rising(15);
        prices.extend([100.0, 95.0, 90.0]);
        let bars = make_bars(&prices);
        let result = BacktestEngine::new().run(&bars, &sma_trend()).unwrap();

        assert_eq!(result.trades.len(), 2);
        let sell = &result.trades[1];
        assert_eq!(sell.action, TradeAction::Sell);
        assert_eq!(sell.index, 15);
        assert_relative_eq!(sell.profit.unwrap(), 100.0 - 109.0);
        assert_relative_eq!(result.stats.total_profit, sell.profit.unwrap());
        assert_eq!(result.stats.losses, 1);
    }
}
