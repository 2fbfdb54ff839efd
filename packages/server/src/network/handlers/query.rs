//! The `GET /query` endpoint: synchronous fan-out, or a streaming session
//! when the client negotiates a WebSocket upgrade.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{debug, warn};

use beaconet_core::{QueryParams, RegistrySnapshot, StreamFrame};

use super::AppState;
use crate::engine::StreamSession;
use crate::error::ApiError;

/// `GET /query` -- forwards a variant query to every registered service.
///
/// Without an upgrade: waits for all sub-queries to settle (bounded by the
/// overall deadline) and returns one aggregated JSON response, cache
/// permitting. With a WebSocket upgrade: opens a streaming session that
/// delivers each outcome as it settles.
///
/// # Errors
///
/// `Validation` when normalization leaves no query parameters.
pub async fn query_handler(
    State(state): State<AppState>,
    Query(raw): Query<Vec<(String, String)>>,
    ws: Option<WebSocketUpgrade>,
) -> Result<Response, ApiError> {
    debug!(upgraded = ws.is_some(), "GET /query received");
    let params = QueryParams::new(raw);
    if params.is_empty() {
        return Err(ApiError::Validation(
            "query parameters are required".to_string(),
        ));
    }
    let snapshot = state.registry.snapshot();

    match ws {
        Some(upgrade) => Ok(upgrade
            .on_upgrade(move |socket| stream_query(socket, state, params, snapshot))
            .into_response()),
        None => {
            let _guard = state.shutdown.in_flight_guard();
            let deadline = tokio::time::Instant::now() + state.config.query_deadline;
            let result = state.engine.execute(&params, &snapshot, deadline).await;
            Ok(Json(result.as_ref().clone()).into_response())
        }
    }
}

/// Drives one WebSocket streaming session.
///
/// Forwards frames until the completion frame has been sent, then closes
/// the socket from the server side. A client disconnect at any point drops
/// the session, which aborts the fan-out task.
async fn stream_query(
    mut socket: WebSocket,
    state: AppState,
    params: QueryParams,
    snapshot: RegistrySnapshot,
) {
    let _guard = state.shutdown.in_flight_guard();
    let session_id = state.sessions.open();
    let mut session = StreamSession::open(
        Arc::clone(&state.engine),
        params,
        snapshot,
        state.config.stream_channel_capacity,
    );

    loop {
        tokio::select! {
            frame = session.next_frame() => {
                let Some(frame) = frame else {
                    // Fan-out task ended without a completion frame; only
                    // possible if it was aborted.
                    break;
                };
                let completed = matches!(frame, StreamFrame::Complete { .. });
                let text = match frame.to_json() {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(error = %err, "dropping unserializable stream frame");
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
                if completed {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    // Inbound data frames are ignored; the stream is one-way.
                    Some(Ok(msg)) if !matches!(msg, Message::Close(_)) => {}
                    // Close frame, error, or hangup: cancel the session.
                    _ => break,
                }
            }
        }
    }

    state.sessions.close(session_id);
    debug!(session_id, "stream session closed");
}
