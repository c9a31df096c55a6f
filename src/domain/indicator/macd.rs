//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line, treated as a price series
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! All three lines inherit the EMA's close[0] seed and are defined from bar 0.

use crate::domain::indicator::ema_values;
use crate::domain::ohlcv::Bar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdLines {
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

pub fn calculate_macd(bars: &[Bar], fast: usize, slow: usize, signal_period: usize) -> MacdLines {
    if fast == 0 || slow == 0 || signal_period == 0 {
        let empty = vec![None; bars.len()];
        return MacdLines {
            line: empty.clone(),
            signal: empty.clone(),
            histogram: empty,
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema_fast = ema_values(&closes, fast);
    let ema_slow = ema_values(&closes, slow);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_values(&macd_line, signal_period);

    MacdLines {
        histogram: macd_line
            .iter()
            .zip(&signal_line)
            .map(|(m, s)| Some(m - s))
            .collect(),
        line: macd_line.into_iter().map(Some).collect(),
        signal: signal_line.into_iter().map(Some).collect(),
    }
}
