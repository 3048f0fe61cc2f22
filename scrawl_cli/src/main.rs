use clap::{Parser, Subcommand};
use spinners::{Spinner, Spinners};

use session::Session;
use wire::Point;

mod auth;
mod session;
mod wire;

// The relay's default listen address.
const DEFAULT_SERVER: &str = "ws://127.0.0.1:3001/ws";

/// A CLI client for Scrawl whiteboard rooms.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Join a room and chat interactively. Lines become chat
    /// messages, `/clear` wipes the room's canvas, `/quit` leaves.
    Join {
        /// The room to join.
        #[arg(long)]
        room: String,
        /// Display name, unless the identity provider supplies one.
        #[arg(long)]
        name: String,
        /// The relay's WebSocket URL.
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },
    /// Join a room, draw a single stroke, and exit.
    /// Example: scrawl stroke --room 42 --name bot --from 0,0 --to 5,5
    Stroke {
        #[arg(long)]
        room: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
        /// Stroke start, as X,Y.
        #[arg(long, value_parser = parse_point)]
        from: Point,
        /// Stroke end, as X,Y.
        #[arg(long, value_parser = parse_point)]
        to: Point,
        #[arg(long, default_value = "#000")]
        color: String,
    },
}

// Parses "X,Y" into a canvas point.
fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s.split_once(',').ok_or("expected X,Y")?;
    let x = x.trim().parse().map_err(|_| format!("bad X coordinate: {x}"))?;
    let y = y.trim().parse().map_err(|_| format!("bad Y coordinate: {y}"))?;
    Ok(Point { x, y })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Join { room, name, server } => {
            let display_name = auth::resolve_display_name(&name).await;

            let mut sp = Spinner::new(Spinners::Dots9, format!("Joining room {room}..."));
            let session = match Session::join(&server, &room, &display_name).await {
                Ok(session) => {
                    sp.stop_with_message(format!("✓ Joined room {room} as {display_name}"));
                    session
                }
                Err(e) => {
                    sp.stop_with_message("✗ Could not connect to the relay.".into());
                    eprintln!("Error: {e}");
                    return Ok(());
                }
            };

            session.run_interactive().await?;
        }
        Commands::Stroke {
            room,
            name,
            server,
            from,
            to,
            color,
        } => {
            let display_name = auth::resolve_display_name(&name).await;
            let mut session = Session::join(&server, &room, &display_name).await?;
            session.send_stroke(from, to, &color).await?;
            println!("✓ Stroke sent to room {room}.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_parse_with_and_without_spaces() {
        assert_eq!(parse_point("5,5").unwrap(), Point { x: 5.0, y: 5.0 });
        assert_eq!(parse_point("1.5, -2").unwrap(), Point { x: 1.5, y: -2.0 });
    }

    #[test]
    fn bad_points_are_rejected() {
        assert!(parse_point("5").is_err());
        assert!(parse_point("a,b").is_err());
    }
}
