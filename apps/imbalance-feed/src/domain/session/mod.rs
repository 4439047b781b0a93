//! Session Framing
//!
//! The live log carries zero or more session blocks:
//!
//! ```text
//! SESSION START
//! 100,10.0,5,3,8,1.0,1.0,0.5
//! 100,10.25,2,9,11,4.0,1.0,0.75
//! SESSION END
//! ```
//!
//! A `SessionFramer` frames exactly one block. It is fed lines one at a time
//! and told when the underlying source has no more data for now; it never
//! reads anything itself.
//!
//! # State Machine
//!
//! ```text
//! AwaitingStart ──"SESSION START"──► InSession ──"SESSION END"──► Ended
//!   │ other lines: discarded            │ other lines: buffered as rows
//!   │ end of data: finished, no rows    │ end of data: keep waiting
//! ```

/// Marker line opening a session block.
pub const SESSION_START: &str = "SESSION START";

/// Marker line closing a session block.
pub const SESSION_END: &str = "SESSION END";

/// Framer lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Discarding lines until a start marker.
    AwaitingStart,
    /// Buffering rows until an end marker.
    InSession,
    /// The block has been closed and handed out.
    Ended,
}

/// Outcome of feeding one line to the framer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameStep {
    /// Line seen before the start marker (or after the end marker); dropped.
    Discarded,
    /// The start marker was seen.
    Started,
    /// A row was buffered into the open session.
    Row,
    /// The end marker closed the session; carries its rows in arrival order.
    Ended(Vec<String>),
}

/// What the framer does when its source reports no more data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfData {
    /// No session has started; this invocation is finished with zero rows.
    NoSession,
    /// A session is open; more lines are expected, retry later.
    AwaitingMore,
    /// The session already ended.
    Finished,
}

/// Frames a single session block out of a raw line stream.
#[derive(Debug, Clone)]
pub struct SessionFramer {
    phase: SessionPhase,
    rows: Vec<String>,
}

impl Default for SessionFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionFramer {
    /// Create a framer awaiting a start marker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: SessionPhase::AwaitingStart,
            rows: Vec::new(),
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Rows buffered so far in the open session.
    #[must_use]
    pub fn pending_rows(&self) -> usize {
        self.rows.len()
    }

    /// Feed one line, without its terminator.
    pub fn push_line(&mut self, line: &str) -> FrameStep {
        match self.phase {
            SessionPhase::AwaitingStart => {
                if line == SESSION_START {
                    self.phase = SessionPhase::InSession;
                    FrameStep::Started
                } else {
                    FrameStep::Discarded
                }
            }
            SessionPhase::InSession => {
                if line == SESSION_END {
                    self.phase = SessionPhase::Ended;
                    FrameStep::Ended(std::mem::take(&mut self.rows))
                } else {
                    self.rows.push(line.to_string());
                    FrameStep::Row
                }
            }
            SessionPhase::Ended => FrameStep::Discarded,
        }
    }

    /// Report that the source has no more data right now.
    #[must_use]
    pub const fn end_of_data(&self) -> EndOfData {
        match self.phase {
            SessionPhase::AwaitingStart => EndOfData::NoSession,
            SessionPhase::InSession => EndOfData::AwaitingMore,
            SessionPhase::Ended => EndOfData::Finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(framer: &mut SessionFramer, lines: &[&str]) -> Vec<FrameStep> {
        lines.iter().map(|l| framer.push_line(l)).collect()
    }

    #[test]
    fn lines_before_start_are_discarded() {
        let mut framer = SessionFramer::new();
        let steps = feed(&mut framer, &["1,2,3,4,5,6,7,8", "noise", SESSION_START]);

        assert_eq!(
            steps,
            vec![FrameStep::Discarded, FrameStep::Discarded, FrameStep::Started]
        );
        assert_eq!(framer.phase(), SessionPhase::InSession);
        assert_eq!(framer.pending_rows(), 0);
    }

    #[test]
    fn session_rows_are_returned_in_order_on_end() {
        let mut framer = SessionFramer::new();
        feed(&mut framer, &[SESSION_START, "a", "b", "c"]);

        assert_eq!(framer.pending_rows(), 3);
        assert_eq!(
            framer.push_line(SESSION_END),
            FrameStep::Ended(vec!["a".into(), "b".into(), "c".into()])
        );
        assert_eq!(framer.phase(), SessionPhase::Ended);
    }

    #[test]
    fn lines_after_end_are_not_emitted() {
        let mut framer = SessionFramer::new();
        feed(&mut framer, &[SESSION_START, "a", SESSION_END]);

        assert_eq!(framer.push_line("b"), FrameStep::Discarded);
        assert_eq!(framer.push_line(SESSION_START), FrameStep::Discarded);
        assert_eq!(framer.end_of_data(), EndOfData::Finished);
    }

    #[test]
    fn end_of_data_before_start_finishes_with_no_rows() {
        let mut framer = SessionFramer::new();
        feed(&mut framer, &["stray"]);
        assert_eq!(framer.end_of_data(), EndOfData::NoSession);
    }

    #[test]
    fn end_of_data_inside_session_keeps_waiting() {
        let mut framer = SessionFramer::new();
        feed(&mut framer, &[SESSION_START, "a"]);

        assert_eq!(framer.end_of_data(), EndOfData::AwaitingMore);
        assert_eq!(framer.end_of_data(), EndOfData::AwaitingMore);
        assert_eq!(framer.phase(), SessionPhase::InSession);

        assert_eq!(framer.push_line("b"), FrameStep::Row);
        assert_eq!(
            framer.push_line(SESSION_END),
            FrameStep::Ended(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn empty_session_ends_with_no_rows() {
        let mut framer = SessionFramer::new();
        feed(&mut framer, &[SESSION_START]);
        assert_eq!(framer.push_line(SESSION_END), FrameStep::Ended(vec![]));
    }

    #[test]
    fn markers_must_match_exactly() {
        let mut framer = SessionFramer::new();
        assert_eq!(framer.push_line("SESSION START "), FrameStep::Discarded);
        assert_eq!(framer.push_line("session start"), FrameStep::Discarded);
        assert_eq!(framer.push_line(SESSION_START), FrameStep::Started);
        assert_eq!(framer.push_line("SESSION ENDED"), FrameStep::Row);
    }
}
