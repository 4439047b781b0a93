//! Footprint Chart Rows
//!
//! Pure transform from raw records to chart-ready rows. Each record becomes
//! one cell: a price band one tick tall, centred on its bar timestamp and
//! `0.85 * period` wide, labelled `bid x ask` with imbalance highlighting and
//! a volume-profile bar whose length is the record's volume fraction.
//!
//! Vertical coordinates stay in the record's `f32` price precision.
//! Horizontal coordinates are widened to `f64` explicitly, matching the
//! precision of a datetime axis.

use serde::Serialize;

use crate::domain::record::RawRecord;

/// Glyph drawn between the bid and ask volume labels.
pub const SEPARATOR: &str = "x";

/// Fraction of the bar period covered by a cell.
pub const WINDOW_FRACTION: f64 = 0.85;

/// Default neutral label color.
pub const NEUTRAL_COLOR: &str = "#000000";

/// Default bid highlight color.
pub const BID_HIGHLIGHT_COLOR: &str = "#FF0000";

/// Default ask highlight color.
pub const ASK_HIGHLIGHT_COLOR: &str = "#00FF00";

/// Parameters of the chart transform.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartParams {
    /// Price tick; the height of one cell.
    pub tick: f32,
    /// Multiplier applied to record timestamps.
    pub time_factor: i64,
    /// Bar period in scaled time units.
    pub period: f64,
    /// Imbalance at or above which a label is highlighted.
    pub highlight_threshold: f32,
    /// Label color below the threshold.
    pub neutral_color: String,
    /// Bid label color at or above the threshold.
    pub bid_highlight_color: String,
    /// Ask label color at or above the threshold.
    pub ask_highlight_color: String,
}

impl Default for ChartParams {
    fn default() -> Self {
        Self {
            tick: 0.25,
            time_factor: 1,
            period: 300.0,
            highlight_threshold: 3.0,
            neutral_color: NEUTRAL_COLOR.to_string(),
            bid_highlight_color: BID_HIGHLIGHT_COLOR.to_string(),
            ask_highlight_color: ASK_HIGHLIGHT_COLOR.to_string(),
        }
    }
}

impl ChartParams {
    /// Width of a cell on the time axis.
    #[must_use]
    pub fn window_width(&self) -> f64 {
        WINDOW_FRACTION * self.period
    }

    /// Half the cell width.
    #[must_use]
    pub fn half_width(&self) -> f64 {
        self.window_width() / 2.0
    }
}

/// One drawable footprint cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRow {
    /// Upper price bound (price + tick).
    pub top: f32,
    /// Lower price bound (price).
    pub bottom: f32,
    /// Left time bound.
    pub left: f64,
    /// Right time bound.
    pub right: f64,
    /// Cell centre on the time axis.
    pub middle: f64,
    /// Bid volume label.
    pub bid_text: String,
    /// Separator glyph.
    pub separator: &'static str,
    /// Ask volume label.
    pub ask_text: String,
    /// Bid label color.
    pub bid_color: String,
    /// Ask label color.
    pub ask_color: String,
    /// Total volume, passed through.
    pub total_volume: u64,
    /// Right end of the volume-profile bar.
    pub volume_end: f64,
}

/// Derive the chart row for a single record.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn chart_row(record: &RawRecord, params: &ChartParams) -> ChartRow {
    let middle = record.timestamp.saturating_mul(params.time_factor) as f64;
    let left = middle - params.half_width();

    ChartRow {
        top: record.price + params.tick,
        bottom: record.price,
        left,
        right: middle + params.half_width(),
        middle,
        bid_text: record.volume_at_bid.to_string(),
        separator: SEPARATOR,
        ask_text: record.volume_at_ask.to_string(),
        bid_color: highlight(
            record.bid_imbalance,
            params,
            &params.bid_highlight_color,
        ),
        ask_color: highlight(
            record.ask_imbalance,
            params,
            &params.ask_highlight_color,
        ),
        total_volume: record.total_volume,
        volume_end: f64::from(record.volume_distribution).mul_add(params.window_width(), left),
    }
}

/// Derive chart rows for a batch of records, preserving input order.
///
/// Rows are independent of each other, so aggregating a sequence in pieces
/// and concatenating yields the same rows as one call over the whole.
#[must_use]
pub fn compute_chart_rows(records: &[RawRecord], params: &ChartParams) -> Vec<ChartRow> {
    records.iter().map(|r| chart_row(r, params)).collect()
}

fn highlight(imbalance: f32, params: &ChartParams, color: &str) -> String {
    if imbalance >= params.highlight_threshold {
        color.to_string()
    } else {
        params.neutral_color.clone()
    }
}
