//! WebSocket gateway for player and admin connections.
//!
//! Each connection follows this lifecycle:
//!
//! 1. The orchestrator registers it and hands back an id.
//! 2. A write task drains the connection's outbound queue into text frames.
//! 3. The read loop parses each frame and applies it under the orchestrator
//!    lock, one message at a time.
//! 4. When either side ends, the registration is removed.
//!
//! Malformed frames are logged and dropped; they never close the socket.

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use impostor_core::protocol::{AdminMessage, ClientMessage};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::orchestrator::SharedOrchestrator;
use crate::player::ConnectionId;
use crate::tasks;

/// Drive a player connection until the client leaves or the orchestrator
/// drops the player (on reset).
pub async fn handle_player_socket(socket: WebSocket, orchestrator: SharedOrchestrator) {
    let (ws_sink, mut ws_stream) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();
    let (player_id, connection) = orchestrator.lock().await.connect_player(tx);

    let mut write_task = spawn_writer(ws_sink, rx);

    loop {
        tokio::select! {
            frame = ws_stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    handle_player_frame(&text, &player_id, connection, &orchestrator).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    tracing::warn!(player = %player_id, error = %e, "Receive failed");
                    break;
                }
            },
            _ = &mut write_task => {
                tracing::info!(player = %player_id, "Outbound queue closed, dropping connection");
                break;
            }
        }
    }

    write_task.abort();
    orchestrator
        .lock()
        .await
        .disconnect_player(&player_id, connection);
}

async fn handle_player_frame(
    text: &str,
    player_id: &str,
    connection: ConnectionId,
    orchestrator: &SharedOrchestrator,
) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(player = player_id, error = %e, frame = text, "Discarding invalid message");
            return;
        }
    };
    tracing::debug!(player = player_id, ?msg, "Received");

    let opened = orchestrator
        .lock()
        .await
        .handle_client_message(player_id, connection, msg);

    if let Some(meeting) = opened {
        let delay = orchestrator.lock().await.config().emergency_meeting_length();
        tasks::schedule_meeting_resolution(orchestrator, meeting, delay);
    }
}

/// Drive an admin connection.
pub async fn handle_admin_socket(socket: WebSocket, orchestrator: SharedOrchestrator) {
    let (ws_sink, mut ws_stream) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();
    let admin = orchestrator.lock().await.connect_admin(tx);

    let write_task = spawn_writer(ws_sink, rx);

    while let Some(frame) = ws_stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<AdminMessage>(&text) {
                Ok(msg) => orchestrator.lock().await.handle_admin_message(msg),
                Err(e) => {
                    tracing::warn!(admin, error = %e, frame = text.as_str(), "Discarding invalid admin message");
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(admin, error = %e, "Admin receive failed");
                break;
            }
        }
    }

    write_task.abort();
    orchestrator.lock().await.disconnect_admin(admin);
}

/// Forward every queued message as a JSON text frame.  Ends (closing the
/// socket) once the queue's senders are gone or the socket fails.
fn spawn_writer<M>(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<M>,
) -> JoinHandle<()>
where
    M: Serialize + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(e) => {
                    tracing::warn!(error = %e, "Could not encode outbound message");
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(json.into())).await {
                tracing::debug!(error = %e, "Send failed, stopping writer");
                return;
            }
        }
        let _ = sink.close().await;
    })
}
