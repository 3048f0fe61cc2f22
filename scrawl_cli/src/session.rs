//! A live connection to the relay: joins a room, applies incoming
//! events to a local canvas model, and turns stdin lines into chat.

use crate::wire::{ChatMessage, ClientEvent, DrawLine, Point, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use std::error::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct Session {
    ws: Ws,
    room: String,
    name: String,
    // The local canvas model: every segment drawn so far, in arrival
    // order. Re-encoded as the snapshot we hand to late joiners.
    segments: Vec<DrawLine>,
}

impl Session {
    /// Connect to the relay and announce ourselves to the room.
    /// This is the unjoined → joined transition; there is no leave.
    pub async fn join(server: &str, room: &str, name: &str) -> Result<Self, Box<dyn Error>> {
        let (ws, _) = connect_async(server).await?;
        let mut session = Session {
            ws,
            room: room.to_string(),
            name: name.to_string(),
            segments: Vec::new(),
        };
        session
            .send(&ClientEvent::ClientReady {
                room: room.to_string(),
                user_name: name.to_string(),
            })
            .await?;
        Ok(session)
    }

    async fn send(&mut self, event: &ClientEvent) -> Result<(), Box<dyn Error>> {
        let frame = serde_json::to_string(event)?;
        self.ws.send(Message::Text(frame.into())).await?;
        Ok(())
    }

    /// Interactive loop: relay frames are applied as they arrive,
    /// stdin lines become chat messages, `/clear` clears the room's
    /// canvas, `/quit` (or EOF) ends the session.
    pub async fn run_interactive(mut self) -> Result<(), Box<dyn Error>> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                frame = self.ws.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => self.apply_frame(text.as_str()).await?,
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            eprintln!("Connection error: {e}");
                            break;
                        }
                    }
                }
                line = lines.next_line() => {
                    match line? {
                        Some(input) => {
                            if !self.handle_input(input.trim()).await? {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }
        println!("Disconnected.");
        Ok(())
    }

    /// Join, emit a single two-segment stroke, exit. Scriptable smoke
    /// test for a running relay.
    pub async fn send_stroke(
        &mut self,
        from: Point,
        to: Point,
        color: &str,
    ) -> Result<(), Box<dyn Error>> {
        let room = self.room.clone();
        // First segment of a stroke carries no previous point.
        self.send(&ClientEvent::DrawLine {
            line: DrawLine {
                prev_point: None,
                current_point: from,
                color: color.to_string(),
            },
            room: room.clone(),
        })
        .await?;
        self.send(&ClientEvent::DrawLine {
            line: DrawLine {
                prev_point: Some(from),
                current_point: to,
                color: color.to_string(),
            },
            room,
        })
        .await?;
        Ok(())
    }

    async fn apply_frame(&mut self, text: &str) -> Result<(), Box<dyn Error>> {
        let event = match serde_json::from_str::<ServerEvent>(text) {
            Ok(event) => event,
            // Unknown frames are not ours to complain about.
            Err(_) => return Ok(()),
        };

        match event {
            ServerEvent::GetCanvasState => {
                let state = encode_snapshot(&self.segments);
                let room = self.room.clone();
                self.send(&ClientEvent::CanvasState { state, room }).await?;
            }
            ServerEvent::CanvasStateFromServer { state } => {
                match decode_snapshot(&state) {
                    Some(segments) => {
                        println!("[canvas synced: {} segment(s)]", segments.len());
                        self.segments = segments;
                    }
                    // A snapshot from a non-CLI peer (e.g. a browser's
                    // image data URL) stays opaque; nothing to apply.
                    None => println!("[canvas snapshot received, format not ours]"),
                }
            }
            ServerEvent::DrawLine(line) => {
                print_segment(&line);
                self.segments.push(line);
            }
            ServerEvent::Clear => {
                self.segments.clear();
                println!("[canvas cleared]");
            }
            ServerEvent::ReceiveMessage(message) => {
                println!("{}: {}", message.sender, message.message);
            }
            ServerEvent::UserJoined(user_name) => {
                println!("* {user_name} joined the room");
            }
        }
        Ok(())
    }

    async fn handle_input(&mut self, input: &str) -> Result<bool, Box<dyn Error>> {
        // Empty input is silently dropped, never sent.
        if input.is_empty() {
            return Ok(true);
        }
        match input {
            "/quit" => return Ok(false),
            "/clear" => {
                let room = self.room.clone();
                self.send(&ClientEvent::Clear { room }).await?;
                // Clear is room-wide, so our own canvas resets when the
                // relay echoes it back.
            }
            _ => {
                let message = ChatMessage {
                    sender: self.name.clone(),
                    message: input.to_string(),
                };
                let room = self.room.clone();
                self.send(&ClientEvent::SendMessage { message, room }).await?;
            }
        }
        Ok(true)
    }
}

fn print_segment(line: &DrawLine) {
    let current = line.current_point;
    match line.prev_point {
        Some(prev) => println!(
            "[draw {} ({}, {}) -> ({}, {})]",
            line.color, prev.x, prev.y, current.x, current.y
        ),
        None => println!("[stroke starts at ({}, {}) in {}]", current.x, current.y, line.color),
    }
}

fn encode_snapshot(segments: &[DrawLine]) -> String {
    serde_json::to_string(segments).unwrap()
}

fn decode_snapshot(state: &str) -> Option<Vec<DrawLine>> {
    serde_json::from_str(state).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(x: f64, y: f64) -> DrawLine {
        DrawLine {
            prev_point: None,
            current_point: Point { x, y },
            color: "#000".into(),
        }
    }

    #[test]
    fn snapshot_survives_a_round_trip() {
        let segments = vec![segment(1.0, 2.0), segment(3.0, 4.0)];
        let decoded = decode_snapshot(&encode_snapshot(&segments)).unwrap();
        assert_eq!(decoded, segments);
    }

    #[test]
    fn empty_canvas_encodes_as_empty_list() {
        assert_eq!(encode_snapshot(&[]), "[]");
        assert_eq!(decode_snapshot("[]"), Some(vec![]));
    }

    #[test]
    fn browser_data_urls_are_left_opaque() {
        assert_eq!(decode_snapshot("data:image/png;base64,iVBOR"), None);
    }
}
