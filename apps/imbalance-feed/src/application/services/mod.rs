//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `UpdatePump`: Polls both logs and publishes chart updates
//! - `Dispatcher`: Applies updates to the chart sinks
//! - `PumpState`: Liveness of the pump for health reporting

/// Dispatcher applying updates on the rendering loop.
pub mod dispatcher;

/// Background update pump.
pub mod pump;

/// Pump liveness state.
pub mod status;

pub use dispatcher::Dispatcher;
pub use pump::{
    DEFAULT_POLL_INTERVAL, PumpError, PumpExit, PumpHandle, PumpSettings, UpdatePump,
    read_records,
};
pub use status::{PumpPhase, PumpState};
