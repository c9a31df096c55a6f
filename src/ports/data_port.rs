//! Market data port trait.
//!
//! Implementations supply bars ascending by time. Gaps and ordering are the
//! implementation's responsibility; the engine does not validate them.

use crate::domain::error::TradesimError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDateTime;

pub trait DataPort {
    /// Bars with `start <= time <= end`; `None` leaves that side open.
    fn fetch_bars(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, TradesimError>;

    /// First and last bar time plus bar count, or `None` when empty.
    fn data_range(&self) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, TradesimError>;
}
