use super::ApiState;
use crate::hub::{BroadcastHub, Connection};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// GET /ws/alerts - WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<ApiState>>) -> Response {
    debug!("WebSocket upgrade request received");
    let hub = Arc::clone(&state.hub);
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Create real-time alerts router
pub fn create_ws_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/ws/alerts", get(ws_handler))
        .with_state(state)
}

/// Pump hub frames to the client until either side goes away.
///
/// Inbound text and binary frames are read and discarded. The hub entry is
/// removed on every exit path.
async fn handle_socket(socket: WebSocket, hub: Arc<BroadcastHub>) {
    let (connection, mut frames) = Connection::open();
    let connection_id = connection.id();
    hub.register(connection);

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            frame = frames.recv() => {
                match frame {
                    Some(text) => {
                        if let Err(e) = ws_tx.send(Message::Text(text)).await {
                            warn!(
                                connection_id = %connection_id,
                                error = %e,
                                "Failed to send frame"
                            );
                            break;
                        }
                    }
                    // Hub dropped us
                    None => break,
                }
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if ws_tx.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(connection_id = %connection_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }
        }
    }

    hub.unregister(connection_id);
    info!(connection_id = %connection_id, "WebSocket connection closed");
}
