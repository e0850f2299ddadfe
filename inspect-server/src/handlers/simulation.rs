//! Simulation hub - WebSocket transport for simulation runs
//!
//! Inbound (client -> server):
//! - `{"type":"startSimulation","startDate":..,"endDate":..}`
//! - `{"type":"stopSimulation"}`
//!
//! Outbound (server -> client): `simulationStatus`, `receivePrediction`,
//! `simulationError`, `simulationComplete`.
//!
//! A start while a run is active cancels that run and starts over.
//! Closing the socket cancels the active run.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tokio::sync::mpsc;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::{flexible_datetime, PredictionLogEntry, SimulationSummary, TimeWindow};
use crate::services::{SimulationEvent, SimulationSession, SimulationState};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_window_order"))]
pub struct StartSimulationRequest {
    #[serde(deserialize_with = "flexible_datetime")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub end_date: DateTime<Utc>,
}

impl StartSimulationRequest {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_date, self.end_date)
    }
}

fn validate_window_order(req: &StartSimulationRequest) -> Result<(), ValidationError> {
    if req.start_date > req.end_date {
        let mut err = ValidationError::new("window_order");
        err.message = Some(Cow::Borrowed("Start date cannot be after end date."));
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    StartSimulation(StartSimulationRequest),
    StopSimulation,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    SimulationStatus { message: String },
    ReceivePrediction(PredictionLogEntry),
    SimulationError { message: String },
    SimulationComplete(SimulationSummary),
}

impl From<SimulationEvent> for ServerMessage {
    fn from(event: SimulationEvent) -> Self {
        match event {
            SimulationEvent::Status(message) => ServerMessage::SimulationStatus { message },
            SimulationEvent::Prediction(entry) => ServerMessage::ReceivePrediction(entry),
            SimulationEvent::Error(message) => ServerMessage::SimulationError { message },
            SimulationEvent::Complete(summary) => ServerMessage::SimulationComplete(summary),
        }
    }
}

/// Upgrade to the simulation hub
pub async fn hub(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    tracing::info!("Simulation client connected: {}", connection_id);

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (events_tx, mut events_rx) = mpsc::channel::<SimulationEvent>(state.config.event_buffer);

    let writer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let text = match serde_json::to_string(&ServerMessage::from(event)) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Failed to encode simulation event: {}", e);
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut session = SimulationSession::new(connection_id, state.simulation.clone(), events_tx.clone());

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_client_message(&text, &mut session, &events_tx).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("Simulation socket {} error: {}", connection_id, e);
                break;
            }
        }
    }

    if let Some(outcome) = session.stop().await {
        tracing::warn!(
            "Client {} disconnected. Simulation ended as {:?} after {} records.",
            connection_id, outcome.state, outcome.processed
        );
    }
    drop(session);
    drop(events_tx);
    writer.abort();

    tracing::info!("Simulation client disconnected: {}", connection_id);
}

/// Apply one inbound message to the session.
pub async fn handle_client_message(
    text: &str,
    session: &mut SimulationSession,
    events: &mpsc::Sender<SimulationEvent>,
) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            reply(events, SimulationEvent::Error(format!("Invalid request: {}", e)));
            return;
        }
    };

    match message {
        ClientMessage::StartSimulation(req) => {
            if let Err(errs) = req.validate() {
                let message = crate::AppError::from(errs).to_string();
                reply(events, SimulationEvent::Error(message));
                return;
            }
            tracing::info!(
                "Client {} requested a simulation: {} .. {}",
                session.id(), req.start_date, req.end_date
            );
            session.start(req.window()).await;
        }
        ClientMessage::StopSimulation => {
            if let Some(outcome) = session.stop().await.filter(|o| o.state == SimulationState::Cancelled) {
                tracing::info!(
                    "Client {} stopped the simulation after {} records",
                    session.id(), outcome.processed
                );
                reply(events, SimulationEvent::Status("Simulation stopped.".to_string()));
            }
        }
    }
}

/// Queue a control reply without waiting on a slow client.
fn reply(events: &mpsc::Sender<SimulationEvent>, event: SimulationEvent) {
    if let Err(e) = events.try_send(event) {
        tracing::warn!("Dropped simulation reply: {}", e);
    }
}
