//! WebSocket server -- axum upgrade handler and message loop.

use crate::gateway::Gateway;
use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message as WsMessage, WebSocket},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use protocol::{ClientMessage, ServerMessage};

/// WebSocket upgrade handler.
pub async fn ws_handler(State(state): State<Gateway>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Gateway) {
    let (mut sender, mut receiver) = socket.split();
    let (connection, mut rx) = state.connect();

    // Sender task: forward ServerMessages to the WebSocket.
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(e) => {
                    tracing::error!("failed to serialize server message: {e}");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Receiver loop: events of one connection are applied in order.
    while let Some(Ok(ws_msg)) = receiver.next().await {
        let text = match ws_msg {
            WsMessage::Text(t) => t,
            WsMessage::Close(_) => break,
            _ => continue,
        };

        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(msg) => state.dispatch(&connection, msg),
            Err(e) => {
                tracing::debug!(connection = %connection, "malformed event: {e}");
                state.hub.emit_to_connection(
                    &connection,
                    ServerMessage::Error {
                        code: 400,
                        message: format!("invalid message: {e}"),
                    },
                );
            }
        }
    }

    // Unregistering drops the hub's outlet, which ends the sender task.
    state.disconnect(&connection);
    let _ = send_task.await;
}
