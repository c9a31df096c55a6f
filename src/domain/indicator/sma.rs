//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = mean of the n trailing values ending at i.
//! Warmup: first (n-1) bars are undefined.
//!
//! The same routine backs the volume average by averaging `volume` instead
//! of `close`.

use crate::domain::ohlcv::{Bar, PriceField};

pub fn calculate_sma(bars: &[Bar], period: usize, field: PriceField) -> Vec<Option<f64>> {
    let values: Vec<f64> = bars.iter().map(|b| b.field(field)).collect();
    sma_values(&values, period)
}

/// Trailing mean over a raw value slice.
pub fn sma_values(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                None
            } else {
                let window = &values[i + 1 - period..=i];
                Some(window.iter().sum::<f64>() / period as f64)
            }
        })
        .collect()
}
