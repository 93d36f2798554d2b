use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::models::{ClientEvent, ConnectionId};
use crate::AppState;

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, app_state: AppState) {
    // Generate unique connection ID to identify this client
    let connection_id: ConnectionId = Uuid::new_v4();
    info!("WebSocket connection established with connection_id: {}", connection_id);

    // Split the socket into sender and receiver halves. The sender is owned
    // by a writer task fed from an mpsc channel, so the fanout broadcaster
    // can push events to this client without touching the socket directly.
    let (ws_sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();
    app_state.router.broadcaster().register(connection_id, tx);

    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Listen for incoming messages; non-text frames and transport errors end
    // the loop, which counts as a disconnect.
    while let Some(Ok(Message::Text(msg))) = receiver.next().await {
        // Parse the incoming message as a tagged JSON event
        let event: ClientEvent = match serde_json::from_str(&msg) {
            Ok(event) => event,
            Err(e) => {
                error!("Failed to parse message from {}: {}", connection_id, e);
                continue;
            }
        };
        app_state.router.handle_event(connection_id, event);
    }

    writer_handle.abort();
    app_state.router.disconnect(connection_id);
    info!("WebSocket connection terminated: {}", connection_id);
}

/// Writer task: forwards queued outbound messages to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            break;
        }
    }
}
