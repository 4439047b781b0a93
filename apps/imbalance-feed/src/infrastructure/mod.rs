//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Growing log file line source.
pub mod tail;

/// Single-slot pump-to-dispatcher handoff.
pub mod handoff;

/// In-memory chart surface.
pub mod surface;

/// Chart context and pipeline assembly.
pub mod pipeline;

/// Configuration loading.
pub mod config;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// OpenTelemetry tracing integration.
pub mod telemetry;
