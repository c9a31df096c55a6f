#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::io::Write;
pub use tradesim::domain::ohlcv::Bar;
use tradesim::domain::error::TradesimError;
use tradesim::ports::data_port::DataPort;

/// In-memory `DataPort` with an optional injected failure.
pub struct MockDataPort {
    pub bars: Vec<Bar>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars, error: None }
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, TradesimError> {
        if let Some(reason) = &self.error {
            return Err(TradesimError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .bars
            .iter()
            .filter(|b| start.is_none_or(|s| b.time >= s) && end.is_none_or(|e| b.time <= e))
            .cloned()
            .collect())
    }

    fn data_range(&self) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, TradesimError> {
        Ok(match (self.bars.first(), self.bars.last()) {
            (Some(first), Some(last)) => Some((first.time, last.time, self.bars.len())),
            _ => None,
        })
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Daily bars from 2024-01-01 with the given closes.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let start = date(2024, 1, 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            time: start + Duration::days(i as i64),
            open: close - 0.5,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0 + i as f64,
        })
        .collect()
}

/// `count` closes rising by 1.0 from `start_price`.
pub fn rising_closes(start_price: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start_price + i as f64).collect()
}

pub fn bars_to_csv(bars: &[Bar]) -> String {
    let mut out = String::from("time,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.time.format("%Y-%m-%d"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}

pub fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub const SMA_TREND_INI: &str = r#"
[strategy]
name = SMA Trend
description = Long while price is above its 10-bar average

[indicators]
sma = 10

[conditions]
buy = close > sma10
sell = close < sma10
"#;

pub const RSI_REVERSION_INI: &str = r#"
[strategy]
name = RSI Reversion

[indicators]
rsi = true

[conditions]
buy = rsi < 30
sell = rsi > 70
"#;
