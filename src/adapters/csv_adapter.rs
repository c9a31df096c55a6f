//! CSV file data adapter.
//!
//! Reads one instrument's bars from a file with a header row naming the
//! columns `time,open,high,low,close,volume` (any order, case-insensitive).
//! Bars are returned ascending by time.

use crate::domain::error::TradesimError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};

const COLUMNS: [&str; 6] = ["time", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<Bar>, TradesimError> {
        let content = fs::read_to_string(&self.path).map_err(|e| TradesimError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        let mut bars = parse_bars(&content)?;
        bars.sort_by_key(|b| b.time);
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, TradesimError> {
        let mut bars = self.load()?;
        bars.retain(|b| start.is_none_or(|s| b.time >= s) && end.is_none_or(|e| b.time <= e));
        Ok(bars)
    }

    fn data_range(&self) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, TradesimError> {
        let bars = self.load()?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.time, last.time, bars.len())),
            _ => None,
        })
    }
}

/// Parse CSV text into bars in file order.
pub fn parse_bars(content: &str) -> Result<Vec<Bar>, TradesimError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = rdr.headers().map_err(|e| TradesimError::Data {
        reason: format!("CSV header error: {}", e),
    })?;
    let mut positions = [0usize; 6];
    for (slot, name) in positions.iter_mut().zip(COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| TradesimError::Data {
                reason: format!("missing {} column", name),
            })?;
    }
    let [time_col, open_col, high_col, low_col, close_col, volume_col] = positions;

    let mut bars = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| TradesimError::Data {
            reason: format!("CSV parse error: {}", e),
        })?;
        // header is line 1
        let line = row + 2;

        let field = |col: usize, name: &str| {
            record.get(col).ok_or_else(|| TradesimError::Data {
                reason: format!("line {}: missing {} value", line, name),
            })
        };
        let number = |col: usize, name: &str| -> Result<f64, TradesimError> {
            let raw = field(col, name)?;
            match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(TradesimError::Data {
                    reason: format!("line {}: invalid {} value '{}'", line, name, raw),
                }),
            }
        };

        let raw_time = field(time_col, "time")?;
        let time = parse_time(raw_time).ok_or_else(|| TradesimError::Data {
            reason: format!("line {}: invalid time '{}'", line, raw_time),
        })?;

        bars.push(Bar {
            time,
            open: number(open_col, "open")?,
            high: number(high_col, "high")?,
            low: number(low_col, "low")?,
            close: number(close_col, "close")?,
            volume: number(volume_col, "volume")?,
        });
    }

    Ok(bars)
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`,
/// RFC 3339 (converted to UTC) or integer unix seconds.
pub fn parse_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.naive_utc())
}
