//! Update Pump
//!
//! Background polling loop that turns log growth into update messages.
//!
//! Each iteration:
//!
//! 1. Drains every complete line currently in the historical log and
//!    aggregates them into rows to append.
//! 2. Frames sessions out of the live log. Only the last session completed
//!    within the iteration survives; earlier ones are superseded. A session
//!    without rows supersedes nothing. A session still open when the live log runs dry keeps its buffered rows and is
//!    resumed next iteration.
//! 3. Aggregates the surviving session into replacement rows.
//! 4. If anything changed, publishes one `UpdateMessage`, blocking while the
//!    previous message is unconsumed.
//! 5. Sleeps for the poll interval. The interval does not subtract the time
//!    spent in the iteration.
//!
//! Closing the context is observed at the top of the next iteration. Any
//! other fault ends the pump for good and is reported through `PumpExit`
//! and the shared `PumpState`.

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::application::ports::{LineSource, PublishError, SourceError, UpdatePublisher};
use crate::application::services::status::PumpState;
use crate::domain::chart::{ChartParams, ChartRow, compute_chart_rows};
use crate::domain::record::{RawRecord, RecordError};
use crate::domain::series::UpdateMessage;
use crate::domain::session::{EndOfData, FrameStep, SessionFramer, SessionPhase};
use crate::infrastructure::metrics::{self, LogKind};

/// Default pump cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Pump timing settings.
#[derive(Debug, Clone, Copy)]
pub struct PumpSettings {
    /// Sleep between iterations.
    pub poll_interval: Duration,
}

impl Default for PumpSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// How a pump ended.
#[derive(Debug)]
pub enum PumpExit {
    /// The logs were closed by their owner; already-sent updates stand.
    Closed,
    /// An unrecoverable fault stopped the pump; no further updates follow.
    Failed(PumpError),
}

impl PumpExit {
    /// Whether the pump stopped because it was asked to.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Pump faults. All of them are terminal.
#[derive(Debug, thiserror::Error)]
pub enum PumpError {
    /// Reading a log failed.
    #[error("log read failed: {0}")]
    Source(#[from] SourceError),

    /// A log line was not a valid record.
    #[error("malformed record: {0}")]
    Record(#[from] RecordError),

    /// The dispatcher stopped receiving.
    #[error("handoff failed: {0}")]
    Publish(#[from] PublishError),

    /// The pump thread panicked.
    #[error("pump thread panicked")]
    Panicked,
}

/// Drives the two log sources and publishes chart updates.
pub struct UpdatePump<H, L, P> {
    historical: H,
    live: L,
    publisher: P,
    params: ChartParams,
    settings: PumpSettings,
    closed: CancellationToken,
    state: Arc<PumpState>,
    framer: SessionFramer,
}

impl<H, L, P> UpdatePump<H, L, P>
where
    H: LineSource,
    L: LineSource,
    P: UpdatePublisher,
{
    /// Create a pump over positioned sources.
    #[must_use]
    pub fn new(
        historical: H,
        live: L,
        publisher: P,
        params: ChartParams,
        settings: PumpSettings,
        closed: CancellationToken,
        state: Arc<PumpState>,
    ) -> Self {
        Self {
            historical,
            live,
            publisher,
            params,
            settings,
            closed,
            state,
            framer: SessionFramer::new(),
        }
    }

    /// Phase of the live session framer between iterations.
    #[must_use]
    pub const fn live_phase(&self) -> SessionPhase {
        self.framer.phase()
    }

    /// Run steps 1-3 of one iteration and build its message, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if a log cannot be read or holds a malformed record.
    pub fn poll_once(&mut self) -> Result<Option<UpdateMessage>, PumpError> {
        let historical = self.drain_historical()?;
        let live = self.drain_live()?;

        let message = UpdateMessage { historical, live };
        Ok((!message.is_empty()).then_some(message))
    }

    /// Run until the context is closed or a fault occurs.
    pub fn run(mut self) -> PumpExit {
        tracing::info!(
            poll_interval = ?self.settings.poll_interval,
            "Update pump started"
        );

        let exit = loop {
            if self.closed.is_cancelled() {
                break PumpExit::Closed;
            }

            let started = Instant::now();
            match self.iterate() {
                Ok(()) => {}
                Err(_) if self.closed.is_cancelled() => break PumpExit::Closed,
                Err(e) => break PumpExit::Failed(e),
            }
            metrics::record_iteration_duration(started.elapsed());
            self.state.record_iteration();

            std::thread::sleep(self.settings.poll_interval);
        };

        match &exit {
            PumpExit::Closed => {
                self.state.set_stopped();
                tracing::info!("Logs closed, update pump stopped");
            }
            PumpExit::Failed(e) => {
                self.state.set_failed(e.to_string());
                metrics::record_pump_failure();
                tracing::error!(error = %e, "Update pump terminated, display will no longer update");
            }
        }

        exit
    }

    fn iterate(&mut self) -> Result<(), PumpError> {
        let Some(message) = self.poll_once()? else {
            tracing::trace!("No new data");
            return Ok(());
        };

        tracing::debug!(
            historical_rows = message.historical.as_ref().map_or(0, Vec::len),
            live_rows = message.live.as_ref().map(Vec::len),
            "Publishing update"
        );
        self.publisher.publish(message)?;
        self.state.record_update_sent();
        metrics::record_update_sent();
        Ok(())
    }

    fn drain_historical(&mut self) -> Result<Option<Vec<ChartRow>>, PumpError> {
        let records = read_records(&mut self.historical, &self.closed)?;
        if records.is_empty() {
            return Ok(None);
        }

        metrics::record_records(LogKind::Historical, records.len());
        Ok(Some(compute_chart_rows(&records, &self.params)))
    }

    fn drain_live(&mut self) -> Result<Option<Vec<ChartRow>>, PumpError> {
        let mut latest: Option<Vec<String>> = None;
        let mut completed = 0u64;

        while let Some(line) = self.live.next_line(&self.closed)? {
            metrics::record_lines(LogKind::Live, 1);
            if let FrameStep::Ended(rows) = self.framer.push_line(&line) {
                completed += 1;
                self.framer = SessionFramer::new();
                if rows.iter().all(|row| row.trim().is_empty()) {
                    tracing::debug!("Empty session ignored");
                    continue;
                }
                if let Some(superseded) = latest.replace(rows) {
                    metrics::record_session_discarded();
                    tracing::warn!(
                        rows = superseded.len(),
                        "Completed session superseded by a later one in the same poll"
                    );
                }
            }
        }

        if self.framer.end_of_data() == EndOfData::AwaitingMore {
            tracing::debug!(
                buffered_rows = self.framer.pending_rows(),
                "Live session still open"
            );
        }

        if completed > 0 {
            self.state.record_sessions_completed(completed);
            metrics::record_sessions_completed(completed);
        }

        let Some(lines) = latest else {
            return Ok(None);
        };

        let records = parse_records(lines.iter().map(String::as_str))?;
        metrics::record_records(LogKind::Live, records.len());
        Ok(Some(compute_chart_rows(&records, &self.params)))
    }
}

impl<H, L, P> UpdatePump<H, L, P>
where
    H: LineSource + 'static,
    L: LineSource + 'static,
    P: UpdatePublisher + 'static,
{
    /// Move the pump onto its own background thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(self) -> io::Result<PumpHandle> {
        let handle = std::thread::Builder::new()
            .name("update-pump".to_string())
            .spawn(move || self.run())?;
        Ok(PumpHandle { handle })
    }
}

/// Owner's handle on a spawned pump.
#[derive(Debug)]
pub struct PumpHandle {
    handle: JoinHandle<PumpExit>,
}

impl PumpHandle {
    /// Whether the pump thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the pump to exit and collect its terminal state.
    #[must_use]
    pub fn join(self) -> PumpExit {
        self.handle
            .join()
            .unwrap_or(PumpExit::Failed(PumpError::Panicked))
    }
}

/// Read every complete line currently available and parse it.
///
/// Blank lines are skipped.
///
/// # Errors
///
/// Returns an error if reading fails or a line is not a valid record.
pub fn read_records<S>(
    source: &mut S,
    closed: &CancellationToken,
) -> Result<Vec<RawRecord>, PumpError>
where
    S: LineSource + ?Sized,
{
    let mut lines = Vec::new();
    while let Some(line) = source.next_line(closed)? {
        lines.push(line);
    }
    metrics::record_lines(LogKind::Historical, lines.len());
    parse_records(lines.iter().map(String::as_str))
}

fn parse_records<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Vec<RawRecord>, PumpError> {
    lines
        .filter(|line| !line.trim().is_empty())
        .map(|line| RawRecord::parse_line(line).map_err(PumpError::from))
        .collect()
}
