use serde::{Deserialize, Serialize};

// One point on the canvas.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

// One incremental segment of a freehand stroke. A null `prevPoint`
// marks the first segment of a stroke.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DrawLine {
    pub prev_point: Option<Point>,
    pub current_point: Point,
    pub color: String,
}

// A chat message as sent by a client. No timestamp, no id.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ChatMessage {
    pub sender: String,
    pub message: String,
}

/// Events a client sends to the relay. The `event`/`data` envelope and
/// the camelCase payload keys match the wire contract the browser
/// clients speak; the relay never inspects `state` or `message`
/// contents.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
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

/// Events the relay sends to clients.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    GetCanvasState,
    CanvasStateFromServer { state: String },
    DrawLine(DrawLine),
    Clear,
    ReceiveMessage(ChatMessage),
    UserJoined(String),
}
