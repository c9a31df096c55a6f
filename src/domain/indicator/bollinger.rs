//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are undefined.

use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

pub fn calculate_bollinger(bars: &[Bar], period: usize, mult: f64) -> BollingerBands {
    let mut bands = BollingerBands {
        upper: Vec::with_capacity(bars.len()),
        middle: Vec::with_capacity(bars.len()),
        lower: Vec::with_capacity(bars.len()),
    };

    for i in 0..bars.len() {
        if period == 0 || i + 1 < period {
            bands.upper.push(None);
            bands.middle.push(None);
            bands.lower.push(None);
            continue;
        }

        let window = &bars[i + 1 - period..=i];
        let middle: f64 = window.iter().map(|b| b.close).sum::<f64>() / period as f64;

        let variance: f64 = window
            .iter()
            .map(|b| {
                let diff = b.close - middle;
                diff * diff
            })
            .sum::<f64>()
            / period as f64;
        let stddev = variance.sqrt();

        bands.upper.push(Some(middle + mult * stddev));
        bands.middle.push(Some(middle));
        bands.lower.push(Some(middle - mult * stddev));
    }

    bands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::make_bars;
    use crate::domain::indicator::{calculate_sma, DEFAULT_BOLLINGER_MULT};
    use crate::domain::ohlcv::PriceField;

    #[test]
    fn bollinger_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let bands = calculate_bollinger(&bars, 3, 2.0);

        assert!(bands.middle[0].is_none());
        assert!(bands.upper[1].is_none());
        assert!(bands.lower[1].is_none());
        assert!(bands.middle[2].is_some());
        assert!(bands.lower[4].is_some());
    }

    #[test]
    fn bollinger_constant_values() {
        let bars = make_bars(&[100.0; 5]);
        let bands = calculate_bollinger(&bars, 3, DEFAULT_BOLLINGER_MULT);

        assert!((bands.middle[2].unwrap() - 100.0).abs() < f64::EPSILON);
        assert!((bands.upper[2].unwrap() - 100.0).abs() < f64::EPSILON);
        assert!((bands.lower[2].unwrap() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bollinger_basic_calculation() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let bands = calculate_bollinger(&bars, 3, 2.0);

        let expected_middle: f64 = 20.0;
        let variance: f64 = (100.0 + 0.0 + 100.0) / 3.0;
        let stddev = variance.sqrt();

        assert!((bands.middle[2].unwrap() - expected_middle).abs() < 1e-10);
        assert!((bands.upper[2].unwrap() - (expected_middle + 2.0 * stddev)).abs() < 1e-10);
        assert!((bands.lower[2].unwrap() - (expected_middle - 2.0 * stddev)).abs() < 1e-10);
    }

    #[test]
    fn bollinger_middle_matches_sma() {
        let bars = make_bars(&[3.0, 9.0, 4.0, 8.0, 6.0, 7.0]);
        let bands = calculate_bollinger(&bars, 4, 2.0);
        let sma = calculate_sma(&bars, 4, PriceField::Close);
        assert_eq!(bands.middle, sma);
    }

    #[test]
    fn bollinger_symmetry() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let bands = calculate_bollinger(&bars, 3, 1.5);

        let upper_dist = bands.upper[2].unwrap() - bands.middle[2].unwrap();
        let lower_dist = bands.middle[2].unwrap() - bands.lower[2].unwrap();
        assert!((upper_dist - lower_dist).abs() < 1e-10);
    }

    #[test]
    fn bollinger_period_0() {
        let bars = make_bars(&[10.0, 20.0]);
        let bands = calculate_bollinger(&bars, 0, 2.0);
        assert_eq!(bands.middle, vec![None, None]);
    }
}
