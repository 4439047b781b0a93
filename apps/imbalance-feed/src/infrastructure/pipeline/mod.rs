//! Pipeline Assembly
//!
//! `ChartContext` is the explicit handle shared by everything that needs the
//! teardown notification, the work-ready signal or the pump's liveness.
//! `StartupLoad` opens the logs and reads the startup history, which may
//! block; `Pipeline::start` wires the pump thread, the handoff and the
//! dispatcher together against one drawable surface.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::application::ports::ChartSurface;
use crate::application::services::{
    Dispatcher, PumpError, PumpExit, PumpHandle, PumpState, UpdatePump, read_records,
};
use crate::domain::chart::{ChartRow, compute_chart_rows};
use crate::infrastructure::config::FeedConfig;
use crate::infrastructure::handoff::{self, UpdateReceiver};
use crate::infrastructure::tail::FileLineSource;

// =============================================================================
// Context
// =============================================================================

/// Shared handle for one chart document.
///
/// Clones refer to the same document.
#[derive(Debug, Clone, Default)]
pub struct ChartContext {
    closed: CancellationToken,
    ready: Arc<Notify>,
    state: Arc<PumpState>,
}

impl ChartContext {
    /// Create a context for a new document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Teardown notification: the pump stops at its next iteration and the
    /// dispatcher drains what was already handed over.
    pub fn close(&self) {
        if !self.closed.is_cancelled() {
            tracing::info!("Chart context closed");
        }
        self.closed.cancel();
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Token cancelled on teardown.
    #[must_use]
    pub fn closed_token(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Work-ready signal of the cooperative loop.
    #[must_use]
    pub fn ready(&self) -> Arc<Notify> {
        Arc::clone(&self.ready)
    }

    /// Liveness of the update pump.
    #[must_use]
    pub fn pump_state(&self) -> Arc<PumpState> {
        Arc::clone(&self.state)
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// A running pump plus the dispatcher waiting to be driven.
pub struct Pipeline {
    context: ChartContext,
    dispatcher: Dispatcher,
    inbox: UpdateReceiver,
    pump: PumpHandle,
}

/// Final state of a pipeline after its context was closed.
pub struct PipelineOutcome {
    /// Dispatcher holding the last applied series.
    pub dispatcher: Dispatcher,
    /// How the pump ended.
    pub pump: PumpExit,
}

/// Both logs opened and the historical log present at startup read.
///
/// Holds nothing tied to the cooperative loop, so it can be built on a
/// blocking thread while the loop keeps serving.
pub struct StartupLoad {
    historical: FileLineSource,
    live: FileLineSource,
    initial: Vec<ChartRow>,
}

impl StartupLoad {
    /// Open both logs and read the historical log from its start.
    ///
    /// The live log is opened at its current end, so only sessions written
    /// from now on are seen. Closing `context` ends a wait on a partial
    /// trailing line with `PumpError::Source(SourceError::Closed)`.
    ///
    /// # Errors
    ///
    /// Returns an error if a log cannot be opened or the startup read fails.
    pub fn read(config: &FeedConfig, context: &ChartContext) -> Result<Self, PipelineError> {
        let retry = config.timing.line_retry;
        let mut historical = FileLineSource::open_from_start(&config.logs.historical, retry)
            .map_err(|e| PipelineError::open(&config.logs.historical, e))?;
        let live = FileLineSource::open_at_end(&config.logs.live, retry)
            .map_err(|e| PipelineError::open(&config.logs.live, e))?;

        let records = read_records(&mut historical, &context.closed)?;
        let initial = compute_chart_rows(&records, &config.chart_params());
        tracing::info!(
            path = %config.logs.historical.display(),
            rows = initial.len(),
            "Historical log loaded"
        );

        Ok(Self {
            historical,
            live,
            initial,
        })
    }

    /// Rows derived from the historical log at startup.
    #[must_use]
    pub fn initial_rows(&self) -> &[ChartRow] {
        &self.initial
    }
}

impl Pipeline {
    /// Open both logs, load the historical log present at startup into the
    /// historical sink and start the pump.
    ///
    /// # Errors
    ///
    /// Returns an error if a log cannot be opened, the startup read fails,
    /// or the pump thread cannot be spawned.
    pub fn open(
        config: &FeedConfig,
        surface: Box<dyn ChartSurface>,
        context: &ChartContext,
    ) -> Result<Self, PipelineError> {
        let load = StartupLoad::read(config, context)?;
        Self::start(load, config, surface, context)
    }

    /// Attach the startup rows to `surface` and start the pump over the
    /// already positioned logs.
    ///
    /// # Errors
    ///
    /// Returns an error if the pump thread cannot be spawned.
    pub fn start(
        load: StartupLoad,
        config: &FeedConfig,
        surface: Box<dyn ChartSurface>,
        context: &ChartContext,
    ) -> Result<Self, PipelineError> {
        let StartupLoad {
            historical,
            live,
            initial,
        } = load;

        let dispatcher = Dispatcher::new(surface, initial);
        let (sender, inbox) = handoff::channel(context.ready());

        let pump = UpdatePump::new(
            historical,
            live,
            sender,
            config.chart_params(),
            config.pump_settings(),
            context.closed_token(),
            context.pump_state(),
        )
        .spawn()
        .map_err(PipelineError::Spawn)?;

        tracing::info!(
            live = %config.logs.live.display(),
            "Pipeline open"
        );

        Ok(Self {
            context: context.clone(),
            dispatcher,
            inbox,
            pump,
        })
    }

    /// Drive the dispatcher on the current cooperative loop until the
    /// context is closed, then collect the pump's terminal state.
    pub async fn run(self) -> PipelineOutcome {
        let Self {
            context,
            dispatcher,
            inbox,
            pump,
        } = self;

        let dispatcher =
            handoff::run_dispatcher(dispatcher, inbox, context.ready(), context.closed_token())
                .await;

        let pump = tokio::task::spawn_blocking(move || pump.join())
            .await
            .unwrap_or(PumpExit::Failed(PumpError::Panicked));

        PipelineOutcome { dispatcher, pump }
    }
}

/// Pipeline startup errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A log could not be opened.
    #[error("failed to open {}: {source}", path.display())]
    Open {
        /// Log path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The historical log present at startup could not be loaded.
    #[error("startup read failed: {0}")]
    Startup(#[from] PumpError),

    /// The pump thread could not be started.
    #[error("failed to spawn update pump: {0}")]
    Spawn(std::io::Error),
}

impl PipelineError {
    fn open(path: &Path, source: std::io::Error) -> Self {
        Self::Open {
            path: path.to_path_buf(),
            source,
        }
    }
}
