//! Per-connection simulation session
//!
//! Holds at most one active run. A new start cancels the current run and
//! waits for it to wind down before launching the next one, so events from
//! two runs never interleave.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::models::TimeWindow;

use super::simulation::{SimulationController, SimulationEvent, SimulationOutcome};

struct ActiveRun {
    cancel: CancellationToken,
    handle: JoinHandle<SimulationOutcome>,
}

pub struct SimulationSession {
    id: Uuid,
    controller: SimulationController,
    events: mpsc::Sender<SimulationEvent>,
    active: Option<ActiveRun>,
}

impl SimulationSession {
    pub fn new(id: Uuid, controller: SimulationController, events: mpsc::Sender<SimulationEvent>) -> Self {
        Self { id, controller, events, active: None }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Start a run for `window`, replacing any run in flight.
    ///
    /// Returns the outcome of the replaced run, if there was one.
    pub async fn start(&mut self, window: TimeWindow) -> Option<SimulationOutcome> {
        let replaced = self.stop().await;
        if let Some(prev) = &replaced {
            tracing::info!("Session {}: replaced run ended as {:?}", self.id, prev.state);
        }

        let cancel = CancellationToken::new();
        let controller = self.controller.clone();
        let events = self.events.clone();
        let span = tracing::info_span!("simulation", session = %self.id);

        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { controller.run(window, events, cancel).await }.instrument(span)
        });

        self.active = Some(ActiveRun { cancel, handle });
        replaced
    }

    /// Cancel the run in flight and wait for it to reach a terminal state.
    pub async fn stop(&mut self) -> Option<SimulationOutcome> {
        let run = self.active.take()?;
        run.cancel.cancel();

        match run.handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!("Session {}: simulation task aborted: {}", self.id, e);
                None
            }
        }
    }
}

impl Drop for SimulationSession {
    fn drop(&mut self) {
        if let Some(run) = &self.active {
            run.cancel.cancel();
        }
    }
}
