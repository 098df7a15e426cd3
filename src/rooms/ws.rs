//! WebSocket transport for the relay.
//!
//! Envelopes from one connection are handled in arrival order, one at a
//! time, so a slow action (a room or account cascade) holds back that
//! socket's later envelopes. Other connections run on their own tasks and
//! are not affected.

use axum::{
    debug_handler,
    extract::{ws::{Message, WebSocket}, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info};

use crate::Relay;

#[debug_handler(state = crate::AppState)]
pub async fn relay_ws(
    State(relay): State<Relay>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_socket(socket, relay))
}

async fn serve_socket(socket: WebSocket, relay: Relay) {
    let registry = relay.hub().registry().clone();
    let (conn, mut rx) = registry.open().await;
    let (mut sender, mut receiver) = socket.split();
    info!(conn_id = %conn.id, "client connected");

    let mut writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(String::clone(&msg).into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => relay.handle(&conn, text.as_str()).await,
            Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => relay.handle(&conn, text).await,
                Err(_) => debug!(conn_id = %conn.id, "dropping non-utf8 frame"),
            },
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
        if writer.is_finished() {
            break;
        }
    }

    registry.close(conn.id).await;
    writer.abort();
    let _ = (&mut writer).await;
    info!(conn_id = %conn.id, "client disconnected");
}
