//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for external systems (log files, handoff, chart sinks).
pub mod ports;

/// Application services: update pump, dispatcher and pump liveness.
pub mod services;
