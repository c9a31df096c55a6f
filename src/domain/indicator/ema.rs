//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seeded with the first value, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Defined from the first bar; there is no undefined warm-up region.

use crate::domain::ohlcv::Bar;

pub fn calculate_ema(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; bars.len()];
    }
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    ema_values(&closes, period).into_iter().map(Some).collect()
}

/// EMA over a raw value slice. Also used for the MACD signal line.
pub fn ema_values(values: &[f64], period: usize) -> Vec<f64> {
    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        let ema = if i == 0 {
            value
        } else {
            value * k + out[i - 1] * (1.0 - k)
        };
        out.push(ema);
    }

    out
}
