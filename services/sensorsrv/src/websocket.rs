//! Real-time subscriber endpoint
//!
//! Each upgraded socket gets a session id and an mpsc queue registered with the
//! [`SubscriberHub`](crate::broadcast::SubscriberHub). A writer task drains the
//! queue into the socket; a reader task answers pings and notices the close.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::broadcast::{envelope, HubMessage, SubscriberHub, Topic};
use crate::AppState;

/// WebSocket connection handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = uuid::Uuid::new_v4().to_string();
    let (tx, mut rx) = mpsc::unbounded_channel();

    state.hub.register(session_id.clone(), tx);

    let (mut ws_sender, mut ws_receiver) = socket.split();

    let session_id_tx = session_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match msg {
                HubMessage::Text(text) => {
                    if ws_sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                },
                HubMessage::Close => {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                },
            }
        }
        debug!("WebSocket send task ended for session {}", session_id_tx);
    });

    let session_id_rx = session_id.clone();
    let hub = state.hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Text(text) => handle_client_message(&hub, &session_id_rx, text.as_str()),
                Message::Close(_) => break,
                _ => {},
            }
        }
        debug!("WebSocket receive task ended for session {}", session_id_rx);
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.unregister(&session_id);
    info!("WebSocket session {} closed", session_id);
}

/// Clients may only ping; anything else is ignored
fn handle_client_message(hub: &SubscriberHub, session_id: &str, message: &str) {
    let Ok(msg) = serde_json::from_str::<serde_json::Value>(message) else {
        debug!("Ignoring non-JSON frame from {}", session_id);
        return;
    };

    match msg.get("type").and_then(|t| t.as_str()) {
        Some("ping") => {
            let pong = envelope(
                Topic::Pong,
                &serde_json::json!({ "timestamp": chrono::Utc::now().timestamp_millis() }),
            );
            hub.send_to(session_id, HubMessage::Text(pong));
        },
        other => debug!("Ignoring client message type {:?} from {}", other, session_id),
    }
}
