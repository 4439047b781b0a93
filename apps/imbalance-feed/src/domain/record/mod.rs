//! Raw Imbalance Records
//!
//! One record per log line: eight comma-separated fields in a fixed order,
//! no header.
//!
//! ```text
//! timestamp,price,volume_at_bid,volume_at_ask,total_volume,bid_imbalance,ask_imbalance,volume_distribution
//! 100,10.0,5,3,8,1.0,1.0,0.5
//! ```

use std::str::FromStr;

use serde::Serialize;

/// Number of comma-separated fields in a record line.
pub const FIELD_COUNT: usize = 8;

/// Field names in line order, used for error reporting.
const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "timestamp",
    "price",
    "volume_at_bid",
    "volume_at_ask",
    "total_volume",
    "bid_imbalance",
    "ask_imbalance",
    "volume_distribution",
];

/// A single price level observation from either log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RawRecord {
    /// Bar timestamp in seconds, before the time factor is applied.
    pub timestamp: i64,
    /// Price level.
    pub price: f32,
    /// Volume traded at the bid.
    pub volume_at_bid: u64,
    /// Volume traded at the ask.
    pub volume_at_ask: u64,
    /// Total volume at this level.
    pub total_volume: u64,
    /// Bid-side imbalance ratio.
    pub bid_imbalance: f32,
    /// Ask-side imbalance ratio.
    pub ask_imbalance: f32,
    /// Fraction of the bar's volume traded at this level (0.0 - 1.0).
    pub volume_distribution: f32,
}

impl RawRecord {
    /// Parse a record from one log line.
    ///
    /// Trailing whitespace (including the line terminator) is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not have exactly eight fields or
    /// any field fails to parse as its numeric type.
    pub fn parse_line(line: &str) -> Result<Self, RecordError> {
        let fields: Vec<&str> = line.trim_end().split(',').map(str::trim).collect();
        if fields.len() != FIELD_COUNT {
            return Err(RecordError::FieldCount {
                expected: FIELD_COUNT,
                found: fields.len(),
                line: line.trim_end().to_string(),
            });
        }

        Ok(Self {
            timestamp: parse_field(&fields, 0)?,
            price: parse_field(&fields, 1)?,
            volume_at_bid: parse_field(&fields, 2)?,
            volume_at_ask: parse_field(&fields, 3)?,
            total_volume: parse_field(&fields, 4)?,
            bid_imbalance: parse_field(&fields, 5)?,
            ask_imbalance: parse_field(&fields, 6)?,
            volume_distribution: parse_field(&fields, 7)?,
        })
    }
}

impl FromStr for RawRecord {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_line(s)
    }
}

fn parse_field<T: FromStr>(fields: &[&str], index: usize) -> Result<T, RecordError> {
    fields[index]
        .parse()
        .map_err(|_| RecordError::InvalidField {
            field: FIELD_NAMES[index],
            value: fields[index].to_string(),
        })
}

/// Record parsing error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The line has the wrong number of fields.
    #[error("expected {expected} fields, found {found}: {line:?}")]
    FieldCount {
        /// Required field count.
        expected: usize,
        /// Fields present on the line.
        found: usize,
        /// The offending line.
        line: String,
    },
    /// A field could not be parsed as its numeric type.
    #[error("invalid {field}: {value:?}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Raw field text.
        value: String,
    },
}
