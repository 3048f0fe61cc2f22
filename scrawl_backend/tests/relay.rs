//! End-to-end relay tests: real WebSocket clients against a relay
//! served on an ephemeral port.

use futures_util::{SinkExt, StreamExt};
use scrawl_backend::{app, websocket::RoomHub};
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Spin up a relay on an ephemeral port, return its ws URL.
async fn start_relay() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(Arc::new(RoomHub::default())))
            .await
            .unwrap();
    });
    format!("ws://{addr}/ws")
}

async fn connect(url: &str) -> Ws {
    let (ws, _) = connect_async(url).await.expect("ws connect failed");
    ws
}

async fn send(ws: &mut Ws, frame: Value) {
    ws.send(Message::Text(frame.to_string().into()))
        .await
        .unwrap();
}

async fn join(ws: &mut Ws, room: &str, name: &str) {
    send(
        ws,
        json!({"event": "client-ready", "data": {"room": room, "userName": name}}),
    )
    .await;
}

async fn recv_json(ws: &mut Ws) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for a frame")
        .unwrap()
        .unwrap();
    serde_json::from_str(msg.to_text().unwrap()).unwrap()
}

async fn assert_silent(ws: &mut Ws) {
    let got = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(got.is_err(), "expected no frame, got {got:?}");
}

/// Join alice, then bob, and drain the two frames bob's arrival
/// produces on alice's socket. Leaves both sockets quiescent.
async fn room_with_alice_and_bob(url: &str, room: &str) -> (Ws, Ws) {
    let mut alice = connect(url).await;
    join(&mut alice, room, "alice").await;
    let mut bob = connect(url).await;
    join(&mut bob, room, "bob").await;

    let user_joined = recv_json(&mut alice).await;
    assert_eq!(user_joined["event"], "user-joined");
    assert_eq!(user_joined["data"], "bob");
    assert_eq!(recv_json(&mut alice).await["event"], "get-canvas-state");

    (alice, bob)
}

#[tokio::test]
async fn draw_line_reaches_peer_but_not_sender() {
    let url = start_relay().await;
    let (mut alice, mut bob) = room_with_alice_and_bob(&url, "42").await;

    let line = json!({"prevPoint": null, "currentPoint": {"x": 5.0, "y": 5.0}, "color": "#000"});
    // The inbound frame is the outbound payload plus the room key.
    let mut data = line.clone();
    data["room"] = json!("42");
    send(&mut alice, json!({"event": "draw-line", "data": data})).await;

    let got = recv_json(&mut bob).await;
    assert_eq!(got["event"], "draw-line");
    assert_eq!(got["data"], line);
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn clear_reaches_every_member_including_sender() {
    let url = start_relay().await;
    let (mut alice, mut bob) = room_with_alice_and_bob(&url, "42").await;

    send(&mut alice, json!({"event": "clear", "data": {"room": "42"}})).await;

    assert_eq!(recv_json(&mut alice).await["event"], "clear");
    assert_eq!(recv_json(&mut bob).await["event"], "clear");
}

#[tokio::test]
async fn chat_stays_in_its_room() {
    let url = start_relay().await;
    let (mut alice, mut bob) = room_with_alice_and_bob(&url, "42").await;
    let mut carol = connect(&url).await;
    join(&mut carol, "7", "carol").await;

    let message = json!({"sender": "alice", "message": "hi"});
    send(
        &mut alice,
        json!({"event": "send-message", "data": {"message": message, "room": "42"}}),
    )
    .await;

    let got = recv_json(&mut bob).await;
    assert_eq!(got["event"], "receive-message");
    assert_eq!(got["data"], message);

    assert_silent(&mut carol).await;
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn late_joiner_triggers_one_snapshot_request_and_gets_the_reply() {
    let url = start_relay().await;
    let (mut alice, mut bob) = room_with_alice_and_bob(&url, "42").await;

    // Exactly one get-canvas-state reached alice (drained by the
    // helper); nothing else is pending.
    assert_silent(&mut alice).await;

    // Alice answers with her snapshot; only bob gets it.
    send(
        &mut alice,
        json!({"event": "canvas-state", "data": {"state": "data:image/png;base64,iVBOR", "room": "42"}}),
    )
    .await;

    let got = recv_json(&mut bob).await;
    assert_eq!(got["event"], "canvas-state-from-server");
    assert_eq!(got["data"]["state"], "data:image/png;base64,iVBOR");
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn snapshot_request_goes_only_to_existing_members() {
    let url = start_relay().await;
    let mut alice = connect(&url).await;
    join(&mut alice, "42", "alice").await;

    // The new joiner itself never receives get-canvas-state.
    let mut bob = connect(&url).await;
    join(&mut bob, "42", "bob").await;
    assert_silent(&mut bob).await;
}

#[tokio::test]
async fn events_for_unknown_rooms_vanish_silently() {
    let url = start_relay().await;
    let (mut alice, mut bob) = room_with_alice_and_bob(&url, "42").await;

    // No one is in room "99"; the frame targets no one and the
    // connection stays usable.
    send(
        &mut alice,
        json!({"event": "clear", "data": {"room": "99"}}),
    )
    .await;
    assert_silent(&mut bob).await;

    send(&mut alice, json!({"event": "clear", "data": {"room": "42"}})).await;
    assert_eq!(recv_json(&mut bob).await["event"], "clear");
}

#[tokio::test]
async fn malformed_frames_are_ignored() {
    let url = start_relay().await;
    let (mut alice, mut bob) = room_with_alice_and_bob(&url, "42").await;

    alice
        .send(Message::Text("not json at all".into()))
        .await
        .unwrap();
    // Missing room argument: parse fails, frame dropped.
    send(&mut alice, json!({"event": "clear", "data": {}})).await;
    assert_silent(&mut bob).await;

    // The connection survives both.
    send(&mut alice, json!({"event": "clear", "data": {"room": "42"}})).await;
    assert_eq!(recv_json(&mut bob).await["event"], "clear");
}

#[tokio::test]
async fn repeated_client_ready_is_ignored() {
    let url = start_relay().await;
    let (mut alice, mut bob) = room_with_alice_and_bob(&url, "42").await;

    // A second client-ready from bob must not re-announce him.
    join(&mut bob, "42", "bob-again").await;
    assert_silent(&mut alice).await;

    // And bob still relays normally afterwards.
    send(
        &mut bob,
        json!({"event": "send-message", "data": {"message": {"sender": "bob", "message": "still here"}, "room": "42"}}),
    )
    .await;
    assert_eq!(recv_json(&mut alice).await["event"], "receive-message");
}
