#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Imbalance Feed - Footprint Chart Ingestion
//!
//! Tails two growing order-flow logs and keeps a footprint chart's two
//! series current: a cumulative historical series and the latest completed
//! live session.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure record, chart and session logic
//!   - `record`: CSV record parsing
//!   - `chart`: Record to chart-row transform
//!   - `session`: Live-log session framing
//!   - `series`: Historical and live result series
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Interfaces for log sources, handoff and chart sinks
//!   - `services`: Update pump, dispatcher, pump liveness
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `tail`: Growing-file line source
//!   - `handoff`: Single-slot channel and dispatcher task
//!   - `surface`: In-memory chart surface
//!   - `pipeline`: Context object and pipeline assembly
//!   - `config`: Environment configuration
//!   - `health`: Health check HTTP endpoint
//!
//! # Data Flow
//!
//! ```text
//! historical log ──► LineSource ───────────────────┐
//!                                                  ├─► chart rows ─► UpdatePump
//! live log ───────► LineSource ─► SessionFramer ───┘                     │
//!                                                          single-slot channel
//!                                                                        │
//!                                     sinks ◄── Dispatcher (chart loop) ◄┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Pure chart logic with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::chart::{ChartParams, ChartRow, compute_chart_rows};
pub use domain::record::{RawRecord, RecordError};
pub use domain::series::{HistoricalSeries, LiveSeries, UpdateMessage};
pub use domain::session::{SESSION_END, SESSION_START, SessionFramer, SessionPhase};

// Application services
pub use application::services::{
    Dispatcher, PumpError, PumpExit, PumpHandle, PumpPhase, PumpSettings, PumpState, UpdatePump,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, FeedConfig};

// Pipeline
pub use infrastructure::pipeline::{
    ChartContext, Pipeline, PipelineError, PipelineOutcome, StartupLoad,
};

// Adapters
pub use infrastructure::surface::MemorySurface;
pub use infrastructure::tail::FileLineSource;

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
