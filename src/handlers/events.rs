//! WebSocket event stream.
//!
//! Each `GET /events` upgrade registers one subscriber with the change
//! notifier and forwards its queue to the socket as JSON text frames.
//! Delivery is best-effort: a send failure ends the connection and the
//! subscriber is deregistered, dropping any queued events.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use tracing::debug;

use crate::AppState;

/// `GET /events` -- upgrade to a WebSocket carrying object change events.
#[utoipa::path(
    get,
    path = "/events",
    tag = "Events",
    operation_id = "SubscribeEvents",
    responses(
        (status = 101, description = "Switching protocols; created/deleted events follow as JSON text frames")
    )
)]
pub async fn events(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one subscriber connection until either side goes away.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let (id, mut rx) = state.notifier.connect();
    debug!(subscriber = %id, "event stream opened");

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => {
                    let frame = match serde_json::to_string(&event) {
                        Ok(frame) => frame,
                        Err(err) => {
                            debug!(subscriber = %id, "failed to encode event: {err}");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                // Notifier dropped the sender; nothing more will come.
                None => break,
            },
            msg = socket.recv() => match msg {
                // The stream is broadcast-only; inbound frames other than
                // close are ignored.
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.notifier.disconnect(id);
    debug!(subscriber = %id, "event stream closed");
}
