//! Result Series
//!
//! Two independently-lifecycled row sets feed the chart:
//!
//! - `HistoricalSeries` only grows. New rows are appended after existing
//!   ones; nothing is ever removed or reordered.
//! - `LiveSeries` holds the rows of the most recently completed session and
//!   is replaced wholesale each time a session completes.
//!
//! `UpdateMessage` carries at most one change to each across the thread
//! boundary.

use crate::domain::chart::ChartRow;

/// Append-only chart rows from the historical log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalSeries {
    rows: Vec<ChartRow>,
}

impl HistoricalSeries {
    /// Create a series from its initial rows.
    #[must_use]
    pub const fn new(rows: Vec<ChartRow>) -> Self {
        Self { rows }
    }

    /// Append rows after the existing ones, preserving their order.
    pub fn extend(&mut self, rows: Vec<ChartRow>) {
        self.rows.extend(rows);
    }

    /// All rows in arrival order.
    #[must_use]
    pub fn rows(&self) -> &[ChartRow] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the series has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Chart rows of the latest completed live session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveSeries {
    rows: Vec<ChartRow>,
}

impl LiveSeries {
    /// Discard every current row and take `rows` instead.
    pub fn replace(&mut self, rows: Vec<ChartRow>) {
        self.rows = rows;
    }

    /// Rows of the latest session.
    #[must_use]
    pub fn rows(&self) -> &[ChartRow] {
        &self.rows
    }
}

/// One poll cycle's worth of changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateMessage {
    /// Rows to append to the historical series.
    pub historical: Option<Vec<ChartRow>>,
    /// Rows replacing the live series.
    pub live: Option<Vec<ChartRow>>,
}

impl UpdateMessage {
    /// Whether the message carries no change at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.historical.is_none() && self.live.is_none()
    }
}
