//! Boundary submission and analysis state routes

use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream, StreamExt};
use lu_core::{AnalysisState, Orchestrator};
use serde::Serialize;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{info, warn};

#[derive(Serialize)]
pub struct SubmitResponse {
    pub generation: u64,
    pub message: String,
}

/// Accept a drawn boundary and start analysing it
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<Value>,
) -> (StatusCode, Json<SubmitResponse>) {
    let submission = state.orchestrator.submit(raw);
    info!("Accepted boundary as analysis {}", submission.generation);

    (
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            generation: submission.generation,
            message: "Analysis started".to_string(),
        }),
    )
}

/// Current analysis state
pub async fn current(State(state): State<Arc<AppState>>) -> Json<AnalysisState> {
    Json(state.orchestrator.state())
}

/// Server-sent stream of state transitions, starting with the current state
pub async fn events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let orchestrator = state.orchestrator.clone();
    let receiver = orchestrator.subscribe();
    let initial = orchestrator.state();

    let transitions = stream::unfold((receiver, orchestrator), next_transition);
    let stream = stream::once(async move { initial })
        .chain(transitions)
        .map(|state| Ok::<_, Infallible>(to_event(&state)));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn next_transition(
    (mut receiver, orchestrator): (Receiver<AnalysisState>, Orchestrator),
) -> Option<(AnalysisState, (Receiver<AnalysisState>, Orchestrator))> {
    match receiver.recv().await {
        Ok(state) => Some((state, (receiver, orchestrator))),
        Err(RecvError::Lagged(skipped)) => {
            // Skip what is still buffered, it is all older than the latest state.
            warn!("Event subscriber lagged by {} transitions", skipped);
            let receiver = receiver.resubscribe();
            let latest = orchestrator.state();
            Some((latest, (receiver, orchestrator)))
        }
        Err(RecvError::Closed) => None,
    }
}

fn to_event(state: &AnalysisState) -> Event {
    match Event::default().event("state").json_data(state) {
        Ok(event) => event,
        Err(e) => Event::default().event("error").data(e.to_string()),
    }
}
