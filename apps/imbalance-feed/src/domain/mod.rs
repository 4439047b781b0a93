//! Domain Layer - Core imbalance and chart types.
//!
//! This layer contains the record parser, the chart row transform, the
//! session framing state machine and the result series. Nothing here
//! touches files, threads or channels.

/// Raw imbalance records parsed from log lines.
pub mod record;

/// Chart row derivation (the aggregator).
pub mod chart;

/// Session block framing for the live log.
pub mod session;

/// Historical and live result series plus update messages.
pub mod series;
