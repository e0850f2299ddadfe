//! Simulation stream controller
//!
//! Replays the rows of a window as a paced, real-time feed:
//!
//! ```text
//!  Idle ──► Fetching ──► Streaming ──► Completed   (summary emitted)
//!              │             ├───────► Cancelled   (nothing emitted)
//!              │             └───────► Failed      (one error event)
//!              ├── empty / backend unavailable ──► Completed (zero summary)
//!              └── malformed rows ──► Failed (one error event)
//! ```
//!
//! The controller knows nothing about the transport. Events go into a
//! bounded channel; a full channel suspends the stream, and a closed one
//! is treated like a disconnect.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::{
    DataRow, PredictionLogEntry, SimulationStats, SimulationSummary, TimeWindow,
};

use super::predictor::Predictor;
use super::rows::RowSource;

pub const MSG_STARTED: &str = "Simulation started. Receiving data...";
pub const MSG_NO_DATA: &str = "No records found for the simulation period.";
pub const MSG_FAULT: &str = "An unexpected error occurred during the simulation.";

/// Event emitted by a simulation run
#[derive(Debug, Clone)]
pub enum SimulationEvent {
    Status(String),
    Prediction(PredictionLogEntry),
    Error(String),
    Complete(SimulationSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Idle,
    Fetching,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl SimulationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SimulationState::Completed | SimulationState::Cancelled | SimulationState::Failed
        )
    }
}

/// Faults that end a run in [`SimulationState::Failed`].
#[derive(Debug, thiserror::Error)]
pub enum StreamFault {
    #[error("row {sample_id} ({timestamp}) arrived after a row at {previous}")]
    OutOfOrder {
        sample_id: String,
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationOutcome {
    pub state: SimulationState,
    /// Prediction events actually delivered to the channel
    pub processed: u64,
}

/// Drives one simulation run at a time per caller; cheap to clone.
#[derive(Clone)]
pub struct SimulationController {
    rows: Arc<dyn RowSource>,
    predictor: Arc<dyn Predictor>,
    pacing: Duration,
}

impl SimulationController {
    pub fn new(rows: Arc<dyn RowSource>, predictor: Arc<dyn Predictor>, pacing: Duration) -> Self {
        Self { rows, predictor, pacing }
    }

    /// Run the window to a terminal state.
    pub async fn run(
        &self,
        window: TimeWindow,
        events: mpsc::Sender<SimulationEvent>,
        cancel: CancellationToken,
    ) -> SimulationOutcome {
        let mut run = Run::new();
        let sink = Sink::new(&events, &cancel);
        tracing::info!("Simulation requested: {} .. {}", window.start, window.end);

        run.enter(SimulationState::Fetching);
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return run.finish(SimulationState::Cancelled),
            fetched = self.rows.fetch_rows(&window) => fetched,
        };

        let rows = match fetched {
            Ok(rows) => rows,
            Err(e) if e.is_unavailable() => {
                tracing::error!("Failed to fetch simulation data: {}", e);
                Vec::new()
            }
            Err(e) => {
                tracing::error!("Simulation data is unusable: {}", e);
                sink.send(SimulationEvent::Error(MSG_FAULT.to_string())).await;
                return run.finish(SimulationState::Failed);
            }
        };

        if rows.is_empty() {
            tracing::warn!("No data for the simulation period");
            if !sink.send(SimulationEvent::Status(MSG_NO_DATA.to_string())).await
                || !sink.send(SimulationEvent::Complete(SimulationStats::default().summary())).await
            {
                return run.finish(SimulationState::Cancelled);
            }
            return run.finish(SimulationState::Completed);
        }

        run.enter(SimulationState::Streaming);
        self.stream(rows, &sink, &cancel, run).await
    }

    async fn stream(
        &self,
        rows: Vec<DataRow>,
        sink: &Sink<'_>,
        cancel: &CancellationToken,
        mut run: Run,
    ) -> SimulationOutcome {
        let mut previous: Option<DateTime<Utc>> = None;

        tracing::debug!("Streaming {} rows at {:?} per row", rows.len(), self.pacing);
        if !sink.send(SimulationEvent::Status(MSG_STARTED.to_string())).await {
            return run.finish(SimulationState::Cancelled);
        }

        for row in rows {
            if let Err(fault) = check_order(&row, previous) {
                tracing::error!("Simulation fault: {}", fault);
                sink.send(SimulationEvent::Error(MSG_FAULT.to_string())).await;
                return run.finish(SimulationState::Failed);
            }
            previous = Some(row.timestamp);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return run.finish(SimulationState::Cancelled),
                _ = tokio::time::sleep(self.pacing) => {}
            }

            let prediction = tokio::select! {
                biased;
                _ = cancel.cancelled() => return run.finish(SimulationState::Cancelled),
                prediction = self.predictor.predict(&row.features) => prediction,
            };

            let entry = PredictionLogEntry::new(row, prediction);
            if !sink.send(SimulationEvent::Prediction(entry)).await {
                return run.finish(SimulationState::Cancelled);
            }
            run.stats.record(&prediction);
        }

        if !sink.send(SimulationEvent::Complete(run.stats.summary())).await {
            return run.finish(SimulationState::Cancelled);
        }
        run.finish(SimulationState::Completed)
    }
}

/// State and running totals of one run.
struct Run {
    state: SimulationState,
    stats: SimulationStats,
}

impl Run {
    fn new() -> Self {
        Self { state: SimulationState::Idle, stats: SimulationStats::default() }
    }

    fn enter(&mut self, next: SimulationState) {
        tracing::debug!("Simulation {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn finish(mut self, state: SimulationState) -> SimulationOutcome {
        debug_assert!(state.is_terminal());
        self.enter(state);

        let processed = self.stats.processed();
        match state {
            SimulationState::Completed => {
                tracing::info!("Simulation completed: {} records", processed)
            }
            SimulationState::Cancelled => {
                tracing::warn!("Simulation cancelled after {} records", processed)
            }
            _ => tracing::error!("Simulation ended in {:?} after {} records", state, processed),
        }
        SimulationOutcome { state, processed }
    }
}

fn check_order(row: &DataRow, previous: Option<DateTime<Utc>>) -> Result<(), StreamFault> {
    match previous {
        Some(prev) if row.timestamp < prev => Err(StreamFault::OutOfOrder {
            sample_id: row.id.clone(),
            timestamp: row.timestamp,
            previous: prev,
        }),
        _ => Ok(()),
    }
}

/// Cancellable sender; waits for channel capacity.
struct Sink<'a> {
    events: &'a mpsc::Sender<SimulationEvent>,
    cancel: &'a CancellationToken,
}

impl<'a> Sink<'a> {
    fn new(events: &'a mpsc::Sender<SimulationEvent>, cancel: &'a CancellationToken) -> Self {
        Self { events, cancel }
    }

    /// `false` when the run was cancelled or the receiver is gone.
    async fn send(&self, event: SimulationEvent) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.events.send(event) => sent.is_ok(),
        }
    }
}
