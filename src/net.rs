use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::accept_async;
use tungstenite::Message;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::runner::RenderSink;
use crate::state::{Command, Snapshot};
use crate::trail::TrailSegment;

/// Outgoing queues of every connected viewer.
pub type Viewers = Arc<Mutex<HashMap<Uuid, mpsc::UnboundedSender<String>>>>;

fn registry(viewers: &Viewers) -> MutexGuard<'_, HashMap<Uuid, mpsc::UnboundedSender<String>>> {
    // the map stays consistent even if a holder panicked
    viewers.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------
// WIRE FORMAT
// ---------------------------------------------
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    /// Held control ids for one player vehicle, replacing the previous set.
    Input { vehicle: String, held: Vec<String> },
    Spawn,
    Ping,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage<'a> {
    Welcome {
        viewer: String,
    },
    Frame {
        #[serde(flatten)]
        snapshot: &'a Snapshot,
    },
    Trail {
        segments: &'a [TrailSegment],
    },
    Pong,
}

impl ServerMessage<'_> {
    fn to_json(&self) -> Option<String> {
        serde_json::to_string(self)
            .map_err(|e| warn!("⚠️ Could not encode outgoing message: {e}"))
            .ok()
    }
}

// ---------------------------------------------
// FRAME BROADCAST (presentation side)
// ---------------------------------------------
/// Presents frames by pushing JSON to every viewer. Viewers whose socket
/// has gone away are pruned on the next send.
#[derive(Clone)]
pub struct Broadcaster {
    viewers: Viewers,
}

impl Broadcaster {
    pub fn new(viewers: Viewers) -> Self {
        Self { viewers }
    }

    fn send_all(&self, json: &str) {
        registry(&self.viewers).retain(|_, tx| tx.send(json.to_string()).is_ok());
    }
}

impl RenderSink for Broadcaster {
    fn present(&mut self, frame: &Snapshot, trails: &[TrailSegment]) {
        if registry(&self.viewers).is_empty() {
            return;
        }
        if let Some(json) = (ServerMessage::Frame { snapshot: frame }).to_json() {
            self.send_all(&json);
        }
        if !trails.is_empty() {
            if let Some(json) = (ServerMessage::Trail { segments: trails }).to_json() {
                self.send_all(&json);
            }
        }
    }
}

// ---------------------------------------------
// SERVER
// ---------------------------------------------
pub async fn bind(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    info!("🌐 WebSocket listening on ws://{}", listener.local_addr()?);
    Ok(listener)
}

/// Accepts viewers until shutdown. Each viewer may send input/spawn/ping;
/// those become Commands for the simulation loop.
pub async fn serve(
    listener: TcpListener,
    viewers: Viewers,
    commands: mpsc::UnboundedSender<Command>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = shutdown.changed() => break,
        };
        let (raw, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                warn!("⚠️ Accept failed: {e}");
                continue;
            }
        };
        tokio::spawn(handle_viewer(raw, peer, Arc::clone(&viewers), commands.clone()));
    }
    info!("🌐 WebSocket server stopped");
}

async fn handle_viewer(
    raw: TcpStream,
    peer: SocketAddr,
    viewers: Viewers,
    commands: mpsc::UnboundedSender<Command>,
) {
    let ws = match accept_async(raw).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("⚠️ Handshake with {peer} failed: {e}");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    // -------------------------------
    // 1) Outgoing queue + send task
    // -------------------------------
    let id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    registry(&viewers).insert(id, tx.clone());

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    info!("🟢 Viewer connected: {id} ({peer})");
    if let Some(welcome) = (ServerMessage::Welcome { viewer: id.to_string() }).to_json() {
        let _ = tx.send(welcome);
    }

    // -------------------------------
    // 2) Receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let parsed = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(m) => m,
            Err(e) => {
                debug!("ignoring message from {id}: {e}");
                continue;
            }
        };

        let command = match parsed {
            ClientMessage::Ping => {
                if let Some(pong) = ServerMessage::Pong.to_json() {
                    let _ = tx.send(pong);
                }
                continue;
            }
            ClientMessage::Spawn => Command::Spawn,
            ClientMessage::Input { vehicle, held } => Command::SetHeld { vehicle, keys: held },
        };

        if commands.send(command).is_err() {
            // simulation is gone
            break;
        }
    }

    info!("🔴 Viewer disconnected: {id}");
    registry(&viewers).remove(&id);
}
