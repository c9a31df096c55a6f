//! OHLCV bar representation.

use chrono::NaiveDateTime;

/// One OHLCV sample. Series are addressed by index, ascending by `time`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Which bar field an average is taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    Close,
    Volume,
}

impl Bar {
    pub fn field(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Close => self.close,
            PriceField::Volume => self.volume,
        }
    }
}
