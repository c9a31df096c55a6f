//! Technical indicator implementations.
//!
//! This module provides types for requesting and holding indicator output:
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSpec`: The set of indicators a strategy asks for
//! - `IndicatorSeries`: Keyed lines aligned index-for-index with the bars,
//!   `None` marking the warm-up region
//!
//! Every line is a pure function of the bar series and its parameters.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use bollinger::calculate_bollinger;
pub use ema::{calculate_ema, ema_values};
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;

use crate::domain::ohlcv::{Bar, PriceField};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;

pub const DEFAULT_RSI_PERIOD: usize = 14;
pub const DEFAULT_BOLLINGER_PERIOD: usize = 20;
pub const DEFAULT_BOLLINGER_MULT: f64 = 2.0;

/// Bollinger band width in standard deviations.
///
/// Compared and hashed by bit pattern so `IndicatorType` stays `Eq + Hash`.
#[derive(Debug, Clone, Copy)]
pub struct StdDevMult(pub f64);

impl StdDevMult {
    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self.0.is_finite() && self.0 >= 0.0
    }
}

impl PartialEq for StdDevMult {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for StdDevMult {}

impl Hash for StdDevMult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl fmt::Display for StdDevMult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        mult: StdDevMult,
    },
    VolumeSma(usize),
}

impl IndicatorType {
    pub fn bollinger(period: usize, mult: f64) -> Self {
        IndicatorType::Bollinger {
            period,
            mult: StdDevMult(mult),
        }
    }

    /// Keys under which this indicator's lines appear in an `IndicatorSeries`.
    pub fn keys(&self) -> Vec<String> {
        match self {
            IndicatorType::Sma(period) => vec![format!("sma{period}")],
            IndicatorType::Ema(period) => vec![format!("ema{period}")],
            IndicatorType::Rsi(_) => vec!["rsi".into()],
            IndicatorType::Macd { .. } => {
                vec!["macd".into(), "macdSignal".into(), "macdHistogram".into()]
            }
            IndicatorType::Bollinger { .. } => {
                vec!["bbUpper".into(), "bbMiddle".into(), "bbLower".into()]
            }
            IndicatorType::VolumeSma(_) => vec!["volumeSMA".into()],
        }
    }

    /// Leading bars before a signal on this indicator is meaningful.
    ///
    /// EMA-based lines are defined from the first bar, but still count their
    /// nominal warm-up so trading never starts on an unconverged average.
    pub fn warmup(&self) -> usize {
        match self {
            IndicatorType::Sma(period)
            | IndicatorType::Ema(period)
            | IndicatorType::VolumeSma(period)
            | IndicatorType::Bollinger { period, .. } => period.saturating_sub(1),
            IndicatorType::Rsi(period) => *period,
            IndicatorType::Macd { slow, .. } => slow.saturating_sub(1),
        }
    }

    fn is_keyed_by_period(&self) -> bool {
        matches!(self, IndicatorType::Sma(_) | IndicatorType::Ema(_))
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger { period, mult } => {
                write!(f, "BOLLINGER({},{})", period, mult)
            }
            IndicatorType::VolumeSma(period) => write!(f, "VOLUME_SMA({})", period),
        }
    }
}

/// The indicators a strategy requests.
///
/// SMA and EMA may be requested at several periods (`sma5`, `sma20`). The
/// other families have unqualified keys, so a later request replaces an
/// earlier one of the same family.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSpec {
    requests: Vec<IndicatorType>,
}

impl IndicatorSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, indicator: IndicatorType) {
        if self.requests.contains(&indicator) {
            return;
        }
        if !indicator.is_keyed_by_period() {
            self.requests
                .retain(|r| mem::discriminant(r) != mem::discriminant(&indicator));
        }
        self.requests.push(indicator);
    }

    pub fn with(mut self, indicator: IndicatorType) -> Self {
        self.add(indicator);
        self
    }

    pub fn sma(self, period: usize) -> Self {
        self.with(IndicatorType::Sma(period))
    }

    pub fn ema(self, period: usize) -> Self {
        self.with(IndicatorType::Ema(period))
    }

    pub fn rsi(self, period: usize) -> Self {
        self.with(IndicatorType::Rsi(period))
    }

    pub fn macd(self, fast: usize, slow: usize, signal: usize) -> Self {
        self.with(IndicatorType::Macd { fast, slow, signal })
    }

    pub fn bollinger(self, period: usize, mult: f64) -> Self {
        self.with(IndicatorType::bollinger(period, mult))
    }

    pub fn volume_sma(self, period: usize) -> Self {
        self.with(IndicatorType::VolumeSma(period))
    }

    pub fn requests(&self) -> &[IndicatorType] {
        &self.requests
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// First bar index the simulator may trade on: the largest warm-up
    /// across all requests, or 0 when nothing is requested.
    pub fn start_index(&self) -> usize {
        self.requests.iter().map(|r| r.warmup()).max().unwrap_or(0)
    }
}

/// Indicator lines keyed by name, each the same length as the bar series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSeries {
    len: usize,
    lines: BTreeMap<String, Vec<Option<f64>>>,
}

impl IndicatorSeries {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            lines: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.len, "indicator line must align with bars");
        self.lines.insert(key.into(), values);
    }

    pub fn get(&self, key: &str) -> Option<&[Option<f64>]> {
        self.lines.get(key).map(Vec::as_slice)
    }

    pub fn value_at(&self, key: &str, index: usize) -> Option<f64> {
        self.lines.get(key)?.get(index).copied().flatten()
    }

    /// Every line's value at `index`, omitting lines still in warm-up.
    pub fn defined_at(&self, index: usize) -> HashMap<String, f64> {
        self.lines
            .iter()
            .filter_map(|(key, values)| {
                values
                    .get(index)
                    .copied()
                    .flatten()
                    .map(|v| (key.clone(), v))
            })
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.lines.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.lines.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of bars each line spans.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Compute every requested indicator over `bars`.
pub fn compute_indicators(bars: &[Bar], spec: &IndicatorSpec) -> IndicatorSeries {
    let mut series = IndicatorSeries::new(bars.len());

    for request in spec.requests() {
        match *request {
            IndicatorType::Sma(period) => {
                series.insert(format!("sma{period}"), calculate_sma(bars, period, PriceField::Close));
            }
            IndicatorType::Ema(period) => {
                series.insert(format!("ema{period}"), calculate_ema(bars, period));
            }
            IndicatorType::Rsi(period) => {
                series.insert("rsi", calculate_rsi(bars, period));
            }
            IndicatorType::Macd { fast, slow, signal } => {
                let macd = calculate_macd(bars, fast, slow, signal);
                series.insert("macd", macd.line);
                series.insert("macdSignal", macd.signal);
                series.insert("macdHistogram", macd.histogram);
            }
            IndicatorType::Bollinger { period, mult } => {
                let bands = calculate_bollinger(bars, period, mult.value());
                series.insert("bbUpper", bands.upper);
                series.insert("bbMiddle", bands.middle);
                series.insert("bbLower", bands.lower);
            }
            IndicatorType::VolumeSma(period) => {
                series.insert("volumeSMA", calculate_sma(bars, period, PriceField::Volume));
            }
        }
    }

    series
}
