use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{
    metrics::SSE_CONNECTIONS_ACTIVE,
    models::timer::TimerEvent,
    services::{attempt_service::AttemptEvents, AppState},
};

/// SSE endpoint for attempt timer events
/// GET /api/v1/attempts/{id}/stream
pub async fn attempt_stream(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let events = state
        .attempts
        .subscribe(&attempt_id)
        .await
        .map_err(|e| (e.status_code(), e.to_string()))?;

    tracing::info!("Client connected to SSE stream: attempt={}", attempt_id);

    let stream = match events {
        AttemptEvents::Finished(event) => stream::iter([Ok::<_, Infallible>(to_sse(&event))]).boxed(),
        AttemptEvents::Live(receiver) => live_stream(attempt_id, receiver).boxed(),
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse(event: &TimerEvent) -> Event {
    Event::default()
        .event(event.event_name())
        .data(event.to_sse_data())
}

/// Decrements the connection gauge when the stream is dropped.
struct ConnectionGuard;

impl ConnectionGuard {
    fn new() -> Self {
        SSE_CONNECTIONS_ACTIVE.inc();
        ConnectionGuard
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
    }
}

/// Forwards broadcast events until the attempt is submitted.
fn live_stream(
    attempt_id: String,
    receiver: broadcast::Receiver<TimerEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(
        (receiver, false, ConnectionGuard::new()),
        move |(mut receiver, done, guard)| {
            let attempt_id = attempt_id.clone();
            async move {
                if done {
                    return None;
                }
                loop {
                    match receiver.recv().await {
                        Ok(event) => {
                            let terminal = event.is_terminal();
                            return Some((Ok(to_sse(&event)), (receiver, terminal, guard)));
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!(
                                "SSE subscriber lagged: attempt={}, skipped={}",
                                attempt_id,
                                skipped
                            );
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        },
    )
}
