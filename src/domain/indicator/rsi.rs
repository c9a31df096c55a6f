//! RSI (Relative Strength Index) indicator.
//!
//! Gains and losses are the positive and negative parts of C[i] - C[i-1].
//! avg_gain / avg_loss are plain means of the n changes ending at bar i.
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0 and avg_gain > 0: RSI = 100
//! If both are 0 (flat window): RS is taken as 1, so RSI = 50
//!
//! Warmup: first n bars are undefined (need n price changes).

use crate::domain::ohlcv::Bar;

pub fn calculate_rsi(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    if period == 0 || bars.len() < 2 {
        return vec![None; bars.len()];
    }

    let mut gains: Vec<f64> = Vec::with_capacity(bars.len() - 1);
    let mut losses: Vec<f64> = Vec::with_capacity(bars.len() - 1);

    for pair in bars.windows(2) {
        let change = pair[1].close - pair[0].close;
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    (0..bars.len())
        .map(|i| {
            if i < period {
                return None;
            }
            // gains[j] is the change into bar j+1
            let window = i - period..i;
            let avg_gain = gains[window.clone()].iter().sum::<f64>() / period as f64;
            let avg_loss = losses[window].iter().sum::<f64>() / period as f64;
            Some(rsi_from_averages(avg_gain, avg_loss))
        })
        .collect()
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
