//! The relay's wire contract, mirrored client-side: JSON text frames
//! with an `event` tag and camelCase payload keys.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DrawLine {
    pub prev_point: Option<Point>,
    pub current_point: Point,
    pub color: String,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ChatMessage {
    pub sender: String,
    pub message: String,
}

// Only serialized: the CLI emits these, never parses them.
#[derive(Serialize, Clone, PartialEq, Debug)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    ClientReady { room: String, user_name: String },
    CanvasState { state: String, room: String },
    DrawLine {
        #[serde(flatten)]
        line: DrawLine,
        room: String,
    },
    Clear { room: String },
    SendMessage { message: ChatMessage, room: String },
}

// Only deserialized: these always come from the relay.
#[derive(Deserialize, Clone, PartialEq, Debug)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    GetCanvasState,
    CanvasStateFromServer { state: String },
    DrawLine(DrawLine),
    Clear,
    ReceiveMessage(ChatMessage),
    UserJoined(String),
}
