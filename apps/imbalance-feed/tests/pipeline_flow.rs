//! Pipeline Integration Tests
//!
//! Drives the whole pipeline against real, growing files: startup load,
//! historical appends, live session framing, fault isolation and teardown.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use imbalance_feed::application::ports::SeriesKind;
use imbalance_feed::infrastructure::config::{
    ChartSettings, LogPaths, ServerSettings, TimingSettings,
};
use imbalance_feed::{
    ChartContext, ChartParams, ChartRow, FeedConfig, MemorySurface, Pipeline, PipelineError,
    PumpError, PumpExit, PumpPhase, RawRecord, compute_chart_rows,
};
use tempfile::TempDir;

const ROW_A: &str = "100,10.0,5,3,8,1.0,1.0,0.5";
const ROW_B: &str = "101,10.25,2,9,11,4.0,1.0,0.75";
const ROW_C: &str = "102,10.5,1,1,2,1.0,1.0,0.1";
const ROW_D: &str = "400,12.0,7,7,14,1.0,5.0,0.9";

const DEADLINE: Duration = Duration::from_secs(5);

struct Logs {
    _dir: TempDir,
    historical: PathBuf,
    live: PathBuf,
}

impl Logs {
    fn new(historical: &str, live: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let historical_path = dir.path().join("historical.csv");
        let live_path = dir.path().join("live.csv");
        std::fs::write(&historical_path, historical).unwrap();
        std::fs::write(&live_path, live).unwrap();
        Self {
            _dir: dir,
            historical: historical_path,
            live: live_path,
        }
    }

    fn config(&self) -> FeedConfig {
        FeedConfig {
            logs: LogPaths {
                historical: self.historical.clone(),
                live: self.live.clone(),
            },
            chart: ChartSettings::default(),
            timing: TimingSettings {
                poll_interval: Duration::from_millis(10),
                line_retry: Duration::from_millis(5),
            },
            server: ServerSettings::default(),
        }
    }
}

fn append(path: &Path, text: &str) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
}

fn rows(lines: &[&str]) -> Vec<ChartRow> {
    let records: Vec<RawRecord> = lines
        .iter()
        .map(|l| RawRecord::parse_line(l).unwrap())
        .collect();
    compute_chart_rows(&records, &ChartParams::default())
}

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < DEADLINE {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[tokio::test]
async fn historical_log_is_loaded_then_tailed() {
    let logs = Logs::new(&format!("{ROW_A}\n{ROW_B}\n"), "");
    let context = ChartContext::new();
    let surface = MemorySurface::new();

    let pipeline = Pipeline::open(&logs.config(), Box::new(surface.clone()), &context).unwrap();

    let loaded = surface.snapshot(SeriesKind::Historical).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!((loaded[0].top, loaded[0].bottom), (10.25, 10.0));
    assert_eq!((loaded[1].top, loaded[1].bottom), (10.5, 10.25));
    assert_eq!(loaded[0].bid_color, "#000000");
    assert_eq!(loaded[0].ask_color, "#000000");
    assert_eq!(loaded[1].bid_color, "#FF0000");
    assert_eq!(loaded[1].ask_color, "#000000");

    let observer = surface.clone();
    let closer = context.clone();
    let historical = logs.historical.clone();
    let writer = std::thread::spawn(move || {
        append(&historical, &format!("{ROW_C}\n"));
        let grown = wait_until(|| {
            observer
                .snapshot(SeriesKind::Historical)
                .is_some_and(|r| r.len() == 3)
        });
        closer.close();
        grown
    });

    let outcome = pipeline.run().await;
    assert!(writer.join().unwrap(), "appended row never reached the sink");

    assert!(outcome.pump.is_clean());
    assert_eq!(
        surface.snapshot(SeriesKind::Historical).unwrap(),
        rows(&[ROW_A, ROW_B, ROW_C])
    );
    assert!(!surface.is_attached(SeriesKind::Live));
}

#[tokio::test]
async fn open_session_is_delivered_once_it_ends() {
    let stale = format!("SESSION START\n{ROW_C}\nSESSION END\n");
    let logs = Logs::new("", &stale);
    let context = ChartContext::new();
    let surface = MemorySurface::new();

    let pipeline = Pipeline::open(&logs.config(), Box::new(surface.clone()), &context).unwrap();

    let observer = surface.clone();
    let closer = context.clone();
    let live = logs.live.clone();
    let writer = std::thread::spawn(move || {
        append(
            &live,
            &format!("SESSION START\n{ROW_A}\n{ROW_B}\n{ROW_C}\nSESSION END\nSESSION START\n"),
        );
        let first = rows(&[ROW_A, ROW_B, ROW_C]);
        let first_seen = wait_until(|| observer.snapshot(SeriesKind::Live).as_ref() == Some(&first));

        // The open session's only row arrives in two writes.
        append(&live, &ROW_D[..6]);
        std::thread::sleep(Duration::from_millis(20));
        append(&live, &format!("{}\n", &ROW_D[6..]));
        std::thread::sleep(Duration::from_millis(50));
        let still_first = observer.snapshot(SeriesKind::Live).as_ref() == Some(&first);

        append(&live, "SESSION END\n");
        let second = rows(&[ROW_D]);
        let second_seen =
            wait_until(|| observer.snapshot(SeriesKind::Live).as_ref() == Some(&second));

        closer.close();
        (first_seen, still_first, second_seen)
    });

    let outcome = pipeline.run().await;
    let (first_seen, still_first, second_seen) = writer.join().unwrap();

    assert!(first_seen, "completed session was not delivered");
    assert!(still_first, "open session leaked into the live series");
    assert!(second_seen, "second session did not replace the first");
    assert!(outcome.pump.is_clean());
    assert_eq!(outcome.dispatcher.live().rows(), rows(&[ROW_D]).as_slice());
    assert_eq!(surface.snapshot(SeriesKind::Historical), Some(vec![]));
}

#[tokio::test]
async fn malformed_record_stops_the_pump_but_keeps_the_chart() {
    let logs = Logs::new(&format!("{ROW_A}\n"), "");
    let context = ChartContext::new();
    let surface = MemorySurface::new();

    let pipeline = Pipeline::open(&logs.config(), Box::new(surface.clone()), &context).unwrap();

    let closer = context.clone();
    let state = context.pump_state();
    let historical = logs.historical.clone();
    let writer = std::thread::spawn(move || {
        append(&historical, "101,not-a-price,2,9,11,4.0,1.0,0.75\n");
        let failed = wait_until(|| state.phase() == PumpPhase::Failed);
        closer.close();
        failed
    });

    let outcome = pipeline.run().await;
    assert!(writer.join().unwrap(), "pump did not report its failure");

    assert!(matches!(outcome.pump, PumpExit::Failed(PumpError::Record(_))));
    assert!(context.pump_state().failure().is_some());
    assert_eq!(
        surface.snapshot(SeriesKind::Historical).unwrap(),
        rows(&[ROW_A])
    );
}

#[tokio::test]
async fn close_before_any_growth_ends_cleanly() {
    let logs = Logs::new("", "");
    let context = ChartContext::new();
    let surface = MemorySurface::new();

    let pipeline = Pipeline::open(&logs.config(), Box::new(surface), &context).unwrap();
    context.close();

    let outcome = pipeline.run().await;
    assert!(outcome.pump.is_clean());
    assert_eq!(outcome.dispatcher.applied(), 0);
    assert_eq!(context.pump_state().phase(), PumpPhase::Stopped);
}

#[test]
fn missing_log_fails_to_open() {
    let logs = Logs::new("", "");
    let mut config = logs.config();
    config.logs.live = logs.live.with_file_name("absent.csv");

    let result = Pipeline::open(&config, Box::new(MemorySurface::new()), &ChartContext::new());
    assert!(matches!(result, Err(PipelineError::Open { .. })));
}

#[test]
fn malformed_startup_history_is_rejected() {
    let logs = Logs::new("100,10.0,5\n", "");
    let result = Pipeline::open(&logs.config(), Box::new(MemorySurface::new()), &ChartContext::new());
    assert!(matches!(result, Err(PipelineError::Startup(PumpError::Record(_)))));
}
