//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `LineSource`: A growing text file read one complete line at a time
//! - `UpdatePublisher`: Single-slot handoff from the pump to the dispatcher
//! - `ChartSurface` / `ChartSink`: The drawable data sinks owned by the
//!   rendering host
//!
//! ## Driver Ports (Inbound)
//!
//! - `UpdateInbox`: Non-blocking receive side used by the dispatcher

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::domain::chart::ChartRow;
use crate::domain::series::UpdateMessage;

// =============================================================================
// Line Sources
// =============================================================================

/// Result of one non-blocking read attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinePoll {
    /// A complete line, without its terminator.
    Line(String),
    /// Bytes arrived but the line is not terminated yet; they stay buffered.
    Partial,
    /// No data available right now and nothing buffered.
    EndOfStream,
}

/// A text file being appended to while it is read.
pub trait LineSource: Send {
    /// Attempt to read one line without waiting.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn poll_line(&mut self) -> Result<LinePoll, SourceError>;

    /// Delay between attempts to complete a partial line.
    fn retry_delay(&self) -> Duration;

    /// Read the next complete line, waiting out partial writes.
    ///
    /// Returns `Ok(None)` at the current end of data. A partial line is
    /// retried every `retry_delay` until its terminator arrives; there is no
    /// upper bound on that wait other than `closed` being cancelled.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Closed` if `closed` is cancelled while waiting,
    /// or any error from `poll_line`.
    fn next_line(&mut self, closed: &CancellationToken) -> Result<Option<String>, SourceError> {
        loop {
            match self.poll_line()? {
                LinePoll::Line(line) => return Ok(Some(line)),
                LinePoll::EndOfStream => return Ok(None),
                LinePoll::Partial => {
                    if closed.is_cancelled() {
                        return Err(SourceError::Closed);
                    }
                    std::thread::sleep(self.retry_delay());
                }
            }
        }
    }
}

/// Line source errors.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Reading the file failed.
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    /// A line was not valid UTF-8.
    #[error("line is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// The source was closed by its owner.
    #[error("source closed")]
    Closed,
}

// =============================================================================
// Update Handoff
// =============================================================================

/// Producer side of the pump-to-dispatcher handoff.
pub trait UpdatePublisher: Send {
    /// Hand over one message, blocking while the previous one is unconsumed,
    /// then signal the consumer's loop that work is ready.
    ///
    /// # Errors
    ///
    /// Returns `PublishError::ConsumerGone` if the receiving side was dropped.
    fn publish(&self, message: UpdateMessage) -> Result<(), PublishError>;
}

/// Consumer side of the handoff.
pub trait UpdateInbox {
    /// Take the pending message, if any, without waiting.
    fn try_take(&mut self) -> Option<UpdateMessage>;
}

/// Handoff errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// The dispatcher no longer receives updates.
    #[error("update consumer is gone")]
    ConsumerGone,
}

// =============================================================================
// Rendering Host
// =============================================================================

/// Which result series a sink draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    /// The append-only historical series.
    Historical,
    /// The latest-session live series.
    Live,
}

impl SeriesKind {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Historical => "historical",
            Self::Live => "live",
        }
    }
}

/// A drawable data sink.
#[cfg_attr(test, mockall::automock)]
pub trait ChartSink {
    /// Replace the sink's entire contents.
    fn replace(&mut self, rows: &[ChartRow]);
}

/// The drawable surface the sinks are attached to.
#[cfg_attr(test, mockall::automock)]
pub trait ChartSurface {
    /// Construct a sink from its initial rows and attach it to the surface.
    fn attach(&mut self, kind: SeriesKind, rows: &[ChartRow]) -> Box<dyn ChartSink>;
}
