//! Update Dispatcher
//!
//! Applies update messages to the chart sinks. The dispatcher lives on the
//! single-threaded loop that owns the rendering state and is the only code
//! that ever mutates the sinks.

use crate::application::ports::{ChartSink, ChartSurface, SeriesKind, UpdateInbox};
use crate::domain::chart::ChartRow;
use crate::domain::series::{HistoricalSeries, LiveSeries, UpdateMessage};
use crate::infrastructure::metrics;

/// Single-writer owner of the historical and live sinks.
pub struct Dispatcher {
    surface: Box<dyn ChartSurface>,
    historical: HistoricalSeries,
    historical_sink: Box<dyn ChartSink>,
    live: LiveSeries,
    live_sink: Option<Box<dyn ChartSink>>,
    applied: u64,
}

impl Dispatcher {
    /// Attach the historical sink, seeded with the rows read at startup.
    ///
    /// The live sink is attached on the first live update.
    #[must_use]
    pub fn new(mut surface: Box<dyn ChartSurface>, initial_historical: Vec<ChartRow>) -> Self {
        let historical_sink = surface.attach(SeriesKind::Historical, &initial_historical);
        metrics::set_historical_rows(initial_historical.len());

        Self {
            surface,
            historical: HistoricalSeries::new(initial_historical),
            historical_sink,
            live: LiveSeries::default(),
            live_sink: None,
            applied: 0,
        }
    }

    /// Handle one work-ready signal: take at most one message and apply it.
    ///
    /// Returns whether a message was applied.
    pub fn dispatch_once(&mut self, inbox: &mut dyn UpdateInbox) -> bool {
        match inbox.try_take() {
            Some(message) => {
                self.apply(message);
                true
            }
            None => {
                tracing::debug!("Work signal without a pending update");
                false
            }
        }
    }

    /// Apply one message to the sinks.
    pub fn apply(&mut self, message: UpdateMessage) {
        if let Some(rows) = message.historical {
            let appended = rows.len();
            self.historical.extend(rows);
            self.historical_sink.replace(self.historical.rows());
            metrics::set_historical_rows(self.historical.len());
            tracing::debug!(
                appended,
                total = self.historical.len(),
                "Historical series extended"
            );
        }

        if let Some(rows) = message.live {
            self.live.replace(rows);
            match &mut self.live_sink {
                Some(sink) => sink.replace(self.live.rows()),
                None => {
                    self.live_sink = Some(self.surface.attach(SeriesKind::Live, self.live.rows()));
                    tracing::info!("Live series attached");
                }
            }
            tracing::debug!(rows = self.live.rows().len(), "Live series replaced");
        }

        self.applied += 1;
        metrics::record_update_applied();
    }

    /// Current historical series.
    #[must_use]
    pub const fn historical(&self) -> &HistoricalSeries {
        &self.historical
    }

    /// Current live series.
    #[must_use]
    pub const fn live(&self) -> &LiveSeries {
        &self.live
    }

    /// Whether the live sink has been attached.
    #[must_use]
    pub const fn has_live_sink(&self) -> bool {
        self.live_sink.is_some()
    }

    /// Messages applied so far.
    #[must_use]
    pub const fn applied(&self) -> u64 {
        self.applied
    }
}
