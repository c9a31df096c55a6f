//! Performance statistics over a trade log.
//!
//! Trades are paired by position: the k-th round trip is
//! `(trades[2k], trades[2k+1])`. An unmatched trailing BUY is ignored.
//! Drawdown is measured on the cumulative realized-profit curve, starting
//! from zero, not on a mark-to-market equity curve.

use crate::domain::simulator::{percent_of, Trade, TradeAction};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsReport {
    pub total_trades: usize,
    pub buy_trades: usize,
    pub sell_trades: usize,
    /// Completed round trips (`wins + losses`).
    pub completed_trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Percentage in [0, 100]; 0 with no completed round trips.
    pub win_rate: f64,
    pub avg_win: f64,
    /// Mean profit of losing round trips, so zero or negative.
    pub avg_loss: f64,
    pub total_profit: f64,
    pub total_profit_percent: f64,
    pub max_drawdown: f64,
}

impl StatsReport {
    pub fn compute(trades: &[Trade]) -> Self {
        let buy_trades = trades
            .iter()
            .filter(|t| t.action == TradeAction::Buy)
            .count();
        let sell_trades = trades.len() - buy_trades;

        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut win_sum = 0.0_f64;
        let mut loss_sum = 0.0_f64;
        let mut total_profit = 0.0_f64;
        let mut total_profit_percent = 0.0_f64;
        let mut peak = 0.0_f64;
        let mut max_drawdown = 0.0_f64;

        for pair in trades.chunks_exact(2) {
            let (entry, exit) = (&pair[0], &pair[1]);
            let profit = exit.price - entry.price;

            total_profit += profit;
            total_profit_percent += percent_of(profit, entry.price);

            if profit > 0.0 {
                wins += 1;
                win_sum += profit;
            } else {
                losses += 1;
                loss_sum += profit;
            }

            if total_profit > peak {
                peak = total_profit;
            }
            max_drawdown = max_drawdown.max(peak - total_profit);
        }

        let completed_trades = wins + losses;
        let win_rate = if completed_trades > 0 {
            wins as f64 / completed_trades as f64 * 100.0
        } else {
            0.0
        };
        let avg_win = if wins > 0 { win_sum / wins as f64 } else { 0.0 };
        let avg_loss = if losses > 0 {
            loss_sum / losses as f64
        } else {
            0.0
        };

        StatsReport {
            total_trades: trades.len(),
            buy_trades,
            sell_trades,
            completed_trades,
            wins,
            losses,
            win_rate,
            avg_win,
            avg_loss,
            total_profit,
            total_profit_percent,
            max_drawdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn trade(action: TradeAction, price: f64, index: usize) -> Trade {
        Trade {
            time: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                + chrono::Duration::days(index as i64),
            action,
            price,
            index,
            profit: None,
            profit_percent: None,
        }
    }

    fn log(prices: &[f64]) -> Vec<Trade> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let action = if i % 2 == 0 {
                    TradeAction::Buy
                } else {
                    TradeAction::Sell
                };
                trade(action, p, i)
            })
            .collect()
    }

    #[test]
    fn stats_empty_log() {
        let stats = StatsReport::compute(&[]);
        assert_eq!(stats, StatsReport::default());
        assert_relative_eq!(stats.win_rate, 0.0);
    }

    #[test]
    fn stats_single_winning_round_trip() {
        let stats = StatsReport::compute(&log(&[100.0, 110.0]));

        assert_eq!(stats.total_trades, 2);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.losses, 0);
        assert_relative_eq!(stats.total_profit, 10.0);
        assert_relative_eq!(stats.total_profit_percent, 10.0, epsilon = 1e-9);
        assert_relative_eq!(stats.win_rate, 100.0);
        assert_relative_eq!(stats.avg_win, 10.0);
        assert_relative_eq!(stats.avg_loss, 0.0);
        assert_relative_eq!(stats.max_drawdown, 0.0);
    }

    #[test]
    fn stats_ignore_unmatched_trailing_buy() {
        let stats = StatsReport::compute(&log(&[100.0, 90.0, 95.0]));

        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.buy_trades, 2);
        assert_eq!(stats.sell_trades, 1);
        assert_eq!(stats.completed_trades, 1);
        assert_eq!(stats.wins, 0);
        assert_eq!(stats.losses, 1);
        assert_relative_eq!(stats.total_profit, -10.0);
        assert_relative_eq!(stats.total_profit_percent, -10.0, epsilon = 1e-9);
        assert_relative_eq!(stats.avg_loss, -10.0);
        assert_relative_eq!(stats.max_drawdown, 10.0);
    }

    #[test]
    fn stats_breakeven_counts_as_loss() {
        let stats = StatsReport::compute(&log(&[100.0, 100.0]));
        assert_eq!(stats.wins, 0);
        assert_eq!(stats.losses, 1);
        assert_relative_eq!(stats.win_rate, 0.0);
    }

    #[test]
    fn stats_averages_and_win_rate() {
        // +20, -10, +10, -30
        let stats = StatsReport::compute(&log(&[100.0, 120.0, 100.0, 90.0, 50.0, 60.0, 80.0, 50.0]));

        assert_eq!(stats.wins, 2);
        assert_eq!(stats.losses, 2);
        assert_relative_eq!(stats.win_rate, 50.0);
        assert_relative_eq!(stats.avg_win, 15.0);
        assert_relative_eq!(stats.avg_loss, -20.0);
        assert_relative_eq!(stats.total_profit, -10.0);
        assert_relative_eq!(stats.total_profit_percent, 20.0 - 10.0 + 20.0 - 37.5, epsilon = 1e-9);
    }

    #[test]
    fn stats_drawdown_tracks_realized_peak() {
        // cumulative: +20, +10, +20, -10 -> peak 20, trough -10
        let stats = StatsReport::compute(&log(&[100.0, 120.0, 100.0, 90.0, 50.0, 60.0, 80.0, 50.0]));
        assert_relative_eq!(stats.max_drawdown, 30.0);
    }

    #[test]
    fn stats_drawdown_zero_when_monotonic() {
        let stats = StatsReport::compute(&log(&[10.0, 11.0, 11.0, 13.0, 12.0, 20.0]));
        assert_relative_eq!(stats.max_drawdown, 0.0);
    }
}
