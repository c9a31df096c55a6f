//! Long-only trade simulation.
//!
//! Walks the bars once from the start index with a two-state machine:
//! - Flat: if the buy predicate holds, BUY at the close and go Long
//! - Long: if the sell predicate holds, SELL at the close and go Flat
//!
//! Only the predicate for the current state is evaluated, so there is at
//! most one trade per bar and actions strictly alternate. A position still
//! open at the last bar is left open.

use chrono::NaiveDateTime;
use log::debug;
use std::fmt;

use crate::domain::error::EvalError;
use crate::domain::indicator::IndicatorSeries;
use crate::domain::ohlcv::Bar;
use crate::domain::predicate::{IndicatorValues, Predicate};
use crate::domain::strategy::Conditions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => f.write_str("BUY"),
            TradeAction::Sell => f.write_str("SELL"),
        }
    }
}

/// One simulated fill. Only SELL trades carry profit fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub time: NaiveDateTime,
    pub action: TradeAction,
    pub price: f64,
    pub index: usize,
    pub profit: Option<f64>,
    pub profit_percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerSide {
    BelowBar,
    AboveBar,
}

/// Chart annotation for a trade; carries no simulation state.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub time: NaiveDateTime,
    pub side: MarkerSide,
    pub label: String,
}

/// A predicate that could not be resolved and was treated as false.
///
/// A condition that does not parse fails identically on every bar, so its
/// syntax error is recorded once per side, at the first bar evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalFailure {
    pub index: usize,
    pub side: TradeAction,
    pub error: EvalError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationOutput {
    pub trades: Vec<Trade>,
    pub buy_markers: Vec<Marker>,
    pub sell_markers: Vec<Marker>,
    pub failures: Vec<EvalFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PositionState {
    Flat,
    Long { entry_price: f64 },
}

pub fn simulate(
    bars: &[Bar],
    indicators: &IndicatorSeries,
    conditions: &Conditions,
    start_index: usize,
) -> SimulationOutput {
    let mut out = SimulationOutput::default();
    let mut state = PositionState::Flat;
    let mut log = FailureLog::default();

    for (index, bar) in bars.iter().enumerate().skip(start_index) {
        let values = indicators.defined_at(index);

        match state {
            PositionState::Flat => {
                if log.check(&conditions.buy, TradeAction::Buy, &values, bars, index, &mut out) {
                    out.trades.push(Trade {
                        time: bar.time,
                        action: TradeAction::Buy,
                        price: bar.close,
                        index,
                        profit: None,
                        profit_percent: None,
                    });
                    out.buy_markers.push(Marker {
                        time: bar.time,
                        side: MarkerSide::BelowBar,
                        label: TradeAction::Buy.to_string(),
                    });
                    state = PositionState::Long {
                        entry_price: bar.close,
                    };
                }
            }
            PositionState::Long { entry_price } => {
                if log.check(&conditions.sell, TradeAction::Sell, &values, bars, index, &mut out) {
                    let profit = bar.close - entry_price;
                    out.trades.push(Trade {
                        time: bar.time,
                        action: TradeAction::Sell,
                        price: bar.close,
                        index,
                        profit: Some(profit),
                        profit_percent: Some(percent_of(profit, entry_price)),
                    });
                    out.sell_markers.push(Marker {
                        time: bar.time,
                        side: MarkerSide::AboveBar,
                        label: TradeAction::Sell.to_string(),
                    });
                    state = PositionState::Flat;
                }
            }
        }
    }

    out
}

/// Sides whose syntax error has already been recorded.
#[derive(Debug, Default)]
struct FailureLog {
    buy_syntax: bool,
    sell_syntax: bool,
}

impl FailureLog {
    fn check(
        &mut self,
        predicate: &Predicate,
        side: TradeAction,
        values: &IndicatorValues,
        bars: &[Bar],
        index: usize,
        out: &mut SimulationOutput,
    ) -> bool {
        let error = match predicate.evaluate(values, bars, index) {
            Ok(result) => return result,
            Err(error) => error,
        };
        if matches!(error, EvalError::Syntax(_)) {
            let reported = match side {
                TradeAction::Buy => &mut self.buy_syntax,
                TradeAction::Sell => &mut self.sell_syntax,
            };
            if *reported {
                return false;
            }
            *reported = true;
        }
        debug!("{} condition failed at bar {}: {}", side, index, error);
        out.failures.push(EvalFailure { index, side, error });
        false
    }
}

/// `profit` as a percentage of `base`; 0 when `base` is 0.
pub(crate) fn percent_of(profit: f64, base: f64) -> f64 {
    if base == 0.0 { 0.0 } else { profit / base * 100.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::make_bars;
    use crate::domain::indicator::{compute_indicators, IndicatorSpec};

    fn conditions(buy: &str, sell: &str) -> Conditions {
        Conditions {
            buy: Predicate::expression(buy),
            sell: Predicate::expression(sell),
        }
    }

    fn run(prices: &[f64], buy: &str, sell: &str) -> SimulationOutput {
        let bars = make_bars(prices);
        simulate(&bars, &IndicatorSeries::new(bars.len()), &conditions(buy, sell), 0)
    }

    #[test]
    fn buy_then_sell_records_profit() {
        let out = run(&[90.0, 110.0, 105.0, 95.0, 90.0], "close > 100", "close < 100");

        assert_eq!(out.trades.len(), 2);
        assert_eq!(out.trades[0].action, TradeAction::Buy);
        assert_eq!(out.trades[0].index, 1);
        assert!(out.trades[0].profit.is_none());
        assert!(out.trades[0].profit_percent.is_none());

        let sell = &out.trades[1];
        assert_eq!(sell.action, TradeAction::Sell);
        assert_eq!(sell.index, 3);
        assert!((sell.profit.unwrap() - (95.0 - 110.0)).abs() < 1e-12);
        assert!((sell.profit_percent.unwrap() - (-15.0 / 110.0 * 100.0)).abs() < 1e-12);
    }

    #[test]
    fn markers_follow_trades() {
        let out = run(&[90.0, 110.0, 95.0, 120.0], "close > 100", "close < 100");

        assert_eq!(out.buy_markers.len(), 2);
        assert_eq!(out.sell_markers.len(), 1);
        assert_eq!(out.buy_markers[0].side, MarkerSide::BelowBar);
        assert_eq!(out.buy_markers[0].label, "BUY");
        assert_eq!(out.sell_markers[0].side, MarkerSide::AboveBar);
        assert_eq!(out.sell_markers[0].label, "SELL");
        assert_eq!(out.sell_markers[0].time, out.trades[1].time);
    }

    #[test]
    fn at_most_one_trade_per_bar() {
        // both predicates always true: buy on 0, sell on 1, buy on 2, ...
        let out = run(&[1.0, 2.0, 3.0, 4.0, 5.0], "true", "true");
        let indices: Vec<usize> = out.trades.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        for pair in out.trades.windows(2) {
            assert_ne!(pair[0].action, pair[1].action);
        }
    }

    #[test]
    fn open_position_is_not_closed_at_end() {
        let out = run(&[90.0, 110.0, 120.0], "close > 100", "close < 100");
        assert_eq!(out.trades.len(), 1);
        assert_eq!(out.trades[0].action, TradeAction::Buy);
        assert!(out.sell_markers.is_empty());
    }

    #[test]
    fn start_index_skips_leading_bars() {
        let bars = make_bars(&[110.0, 110.0, 110.0, 110.0]);
        let out = simulate(
            &bars,
            &IndicatorSeries::new(bars.len()),
            &conditions("close > 100", "false"),
            2,
        );
        assert_eq!(out.trades[0].index, 2);
    }

    #[test]
    fn start_index_past_end_yields_nothing() {
        let bars = make_bars(&[110.0, 110.0]);
        let out = simulate(
            &bars,
            &IndicatorSeries::new(bars.len()),
            &conditions("true", "true"),
            5,
        );
        assert!(out.trades.is_empty());
    }

    #[test]
    fn eval_failures_are_recorded_and_treated_as_false() {
        let out = run(&[1.0, 2.0, 3.0], "close > missing", "true");
        assert!(out.trades.is_empty());
        assert_eq!(out.failures.len(), 3);
        assert_eq!(out.failures[0].side, TradeAction::Buy);
        assert_eq!(
            out.failures[0].error,
            EvalError::UnknownIdentifier("missing".into())
        );
    }

    #[test]
    fn syntax_error_recorded_once_per_side() {
        let out = run(&[1.0, 2.0, 3.0, 4.0], "close >", "true");
        assert!(out.trades.is_empty());
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].index, 0);
        assert!(matches!(out.failures[0].error, EvalError::Syntax(_)));
    }

    #[test]
    fn syntax_errors_on_both_sides_are_each_recorded() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0]);
        let conditions = Conditions {
            buy: Predicate::callable(|_, _, i| i == 1),
            sell: Predicate::expression("close <"),
        };
        let out = simulate(&bars, &IndicatorSeries::new(bars.len()), &conditions, 0);
        assert_eq!(out.trades.len(), 1);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].side, TradeAction::Sell);
        assert_eq!(out.failures[0].index, 2);
    }

    #[test]
    fn warmup_indicator_fails_closed() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        let series = compute_indicators(&bars, &IndicatorSpec::new().sma(3));
        let out = simulate(&bars, &series, &conditions("close > sma3", "false"), 0);

        assert_eq!(out.failures.len(), 2);
        assert_eq!(out.trades.len(), 1);
        assert_eq!(out.trades[0].index, 2);
    }

    #[test]
    fn callable_predicates_drive_the_machine() {
        let bars = make_bars(&[10.0, 12.0, 11.0, 13.0, 9.0]);
        let conditions = Conditions {
            buy: Predicate::callable(|_, bars, i| i > 0 && bars[i].close > bars[i - 1].close),
            sell: Predicate::callable(|_, bars, i| bars[i].close < bars[i - 1].close),
        };
        let out = simulate(&bars, &IndicatorSeries::new(bars.len()), &conditions, 0);
        let summary: Vec<(TradeAction, usize)> =
            out.trades.iter().map(|t| (t.action, t.index)).collect();
        assert_eq!(
            summary,
            vec![
                (TradeAction::Buy, 1),
                (TradeAction::Sell, 2),
                (TradeAction::Buy, 3),
                (TradeAction::Sell, 4),
            ]
        );
    }
}
