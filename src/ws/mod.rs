pub mod groups;
pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::protocol::{ClientEvent, GroupMessage, ServerEvent};
use crate::state::AppState;
use handlers::{ConnectionCtx, EventOutcome};

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one WebSocket connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut ctx = ConnectionCtx::new(ulid::Ulid::new().to_string());

    tracing::info!("WebSocket connected: {}", ctx.session_token);

    // Tell the client its token first; HTTP calls need it
    let connected = ServerEvent::Connected {
        session_token: ctx.session_token.clone(),
    };
    if let Ok(msg) = serde_json::to_string(&connected) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            return;
        }
    }

    // Installed once the connection joins a lobby
    let mut group_rx: Option<broadcast::Receiver<GroupMessage>> = None;

    loop {
        tokio::select! {
            // Fan-out from the lobby's broadcast group
            group_msg = async {
                match &mut group_rx {
                    Some(rx) => Some(rx.recv().await),
                    None => std::future::pending().await,
                }
            } => {
                match group_msg {
                    Some(Ok(msg)) => {
                        // Relays are sender-excluded; skip our own
                        if msg.from.as_deref() == Some(ctx.session_token.as_str()) {
                            continue;
                        }
                        if let Ok(json) = serde_json::to_string(&msg.event) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                        tracing::warn!(
                            "connection {} lagged, skipped {} events",
                            ctx.session_token,
                            skipped
                        );
                    }
                    Some(Err(broadcast::error::RecvError::Closed)) => {
                        // Lobby group torn down (reaped); stop relaying
                        group_rx = None;
                    }
                    None => unreachable!("pending() never resolves"),
                }
            }

            // Client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => {
                                match handlers::handle_event(event, &mut ctx, &state).await {
                                    EventOutcome::None => {}
                                    EventOutcome::Reply(reply) => {
                                        if let Ok(json) = serde_json::to_string(&reply) {
                                            if sender.send(Message::Text(json.into())).await.is_err() {
                                                break;
                                            }
                                        }
                                    }
                                    EventOutcome::Joined(rx) => {
                                        group_rx = Some(rx);
                                    }
                                    EventOutcome::Left(lobby_id) => {
                                        group_rx = None;
                                        state.groups.remove_if_empty(&lobby_id).await;
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::error!("Failed to parse client event: {}", e);
                                let error = ServerEvent::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                };
                                if let Ok(json) = serde_json::to_string(&error) {
                                    let _ = sender.send(Message::Text(json.into())).await;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed: {}", ctx.session_token);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // The loop only exits when the transport is gone. Release our group
    // subscription before cleanup so an empty group can be dropped.
    drop(group_rx);
    handlers::handle_disconnect(&ctx, &state).await;

    tracing::info!("WebSocket disconnected: {}", ctx.session_token);
}
