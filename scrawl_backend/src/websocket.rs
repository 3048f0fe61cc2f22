use crate::shared_types::{ClientEvent, ServerEvent};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use nanoid::nanoid;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info};

// Per-room channel capacity. A lagged receiver drops frames, which is
// the expected loss mode for a slow client.
const ROOM_CHANNEL_CAPACITY: usize = 100;

/// A frame published into a room's channel. `origin` is the connection
/// that caused it; a subscriber skips frames it originated unless the
/// frame is room-wide (the `clear` case).
#[derive(Debug, Clone)]
pub struct Outbound {
    origin: String,
    room_wide: bool,
    frame: String,
}

impl Outbound {
    pub fn delivers_to(&self, conn_id: &str) -> bool {
        self.room_wide || self.origin != conn_id
    }

    pub fn frame(&self) -> &str {
        &self.frame
    }
}

/// The shared state for the relay: one broadcast channel per room,
/// created on first join and dropped once the last member leaves.
/// We use a Mutex to safely access the HashMap of rooms from multiple
/// connection tasks.
#[derive(Debug, Default)]
pub struct RoomHub {
    rooms: Mutex<HashMap<String, broadcast::Sender<Outbound>>>,
}

impl RoomHub {
    /// Subscribe to a room's channel, creating the room on first join.
    pub async fn join(&self, room: &str) -> broadcast::Receiver<Outbound> {
        let mut rooms = self.rooms.lock().await;
        rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Forward `event` to every member of `room` except `origin`.
    pub async fn emit_to_room(&self, room: &str, origin: &str, event: &ServerEvent) {
        self.publish(room, origin, false, event).await;
    }

    /// Forward `event` to every member of `room`, `origin` included.
    pub async fn broadcast_room(&self, room: &str, origin: &str, event: &ServerEvent) {
        self.publish(room, origin, true, event).await;
    }

    async fn publish(&self, room: &str, origin: &str, room_wide: bool, event: &ServerEvent) {
        let tx = { self.rooms.lock().await.get(room).cloned() };
        let Some(tx) = tx else {
            // An unknown or missing room targets no one, silently.
            debug!(room, "dropping event for unknown room");
            return;
        };
        let frame = serde_json::to_string(event).unwrap();
        // Err means no active subscribers, but that's okay.
        let _ = tx.send(Outbound {
            origin: origin.to_string(),
            room_wide,
            frame,
        });
    }

    /// Drop a room's channel once its last subscriber is gone.
    pub async fn prune(&self, room: &str) {
        let mut rooms = self.rooms.lock().await;
        if let Some(tx) = rooms.get(room) {
            if tx.receiver_count() == 0 {
                rooms.remove(room);
                info!(room, "room empty, dropped");
            }
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }
}

/// The entry point for WebSocket connections.
/// This function handles the initial upgrade from HTTP to WebSocket.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(hub): State<Arc<RoomHub>>,
) -> impl IntoResponse {
    let conn_id = nanoid!(10);
    ws.on_upgrade(move |socket| handle_socket(socket, hub, conn_id))
}

/// The main logic for a single WebSocket connection.
///
/// A connection starts outside any room. The first `client-ready`
/// assigns it to one; from then on a forward task copies the room's
/// frames onto the socket, skipping sender-exclusive frames this
/// connection originated. The relay rules themselves key off the room
/// argument carried by each event, not off membership.
async fn handle_socket(socket: WebSocket, hub: Arc<RoomHub>, conn_id: String) {
    info!(conn = %conn_id, "new websocket connection");

    let (ws_tx, mut ws_rx) = socket.split();
    let mut ws_tx = Some(ws_tx);
    let mut send_task: Option<tokio::task::JoinHandle<()>> = None;
    let mut joined: Option<String> = None;

    while let Some(Ok(msg)) = ws_rx.next().await {
        let Message::Text(text) = msg else { continue };
        let event = match serde_json::from_str::<ClientEvent>(&text) {
            Ok(event) => event,
            Err(e) => {
                debug!(conn = %conn_id, error = %e, "ignoring malformed frame");
                continue;
            }
        };

        match event {
            ClientEvent::ClientReady { room, user_name } => {
                // At most one room per connection; repeats are ignored.
                let Some(mut sender) = ws_tx.take() else {
                    debug!(conn = %conn_id, "already joined, ignoring client-ready");
                    continue;
                };
                let mut room_rx = hub.join(&room).await;
                let my_id = conn_id.clone();
                send_task = Some(tokio::spawn(async move {
                    loop {
                        match room_rx.recv().await {
                            Ok(out) => {
                                if !out.delivers_to(&my_id) {
                                    continue;
                                }
                                if sender
                                    .send(Message::Text(out.frame.into()))
                                    .await
                                    .is_err()
                                {
                                    break;
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                debug!(conn = %my_id, skipped, "receiver lagged, frames dropped");
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                }));

                info!(conn = %conn_id, room, user = %user_name, "client ready");
                hub.emit_to_room(&room, &conn_id, &ServerEvent::UserJoined(user_name))
                    .await;
                hub.emit_to_room(&room, &conn_id, &ServerEvent::GetCanvasState)
                    .await;
                joined = Some(room);
            }
            ClientEvent::CanvasState { state, room } => {
                debug!(conn = %conn_id, room, "received canvas state");
                hub.emit_to_room(&room, &conn_id, &ServerEvent::CanvasStateFromServer { state })
                    .await;
            }
            ClientEvent::DrawLine { line, room } => {
                hub.emit_to_room(&room, &conn_id, &ServerEvent::DrawLine(line))
                    .await;
            }
            ClientEvent::Clear { room } => {
                hub.broadcast_room(&room, &conn_id, &ServerEvent::Clear).await;
            }
            ClientEvent::SendMessage { message, room } => {
                hub.emit_to_room(&room, &conn_id, &ServerEvent::ReceiveMessage(message))
                    .await;
            }
        }
    }

    // Make sure the subscription is dropped before pruning, so the
    // receiver count reflects this connection being gone.
    if let Some(task) = send_task {
        task.abort();
        let _ = task.await;
    }
    if let Some(room) = joined {
        hub.prune(&room).await;
    }
    info!(conn = %conn_id, "websocket connection closed");
}
