//! WebSocket server and connection handling.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::{GameRoom, RoomError};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    /// All active rooms
    pub rooms: DashMap<Uuid, Arc<GameRoom>>,
    /// Mapping from connection ID to its room ID
    pub conn_rooms: DashMap<Uuid, Uuid>,
    /// Mapping from connection ID to its outbox
    pub senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
    /// Per-connection state-forwarding tasks
    watchers: DashMap<Uuid, JoinHandle<()>>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            conn_rooms: DashMap::new(),
            senders: DashMap::new(),
            watchers: DashMap::new(),
        }
    }

    /// Send a message to a specific connection.
    pub fn send_to_conn(&self, conn: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(&conn) {
            let _ = sender.send(msg);
        }
    }

    fn send_error(&self, conn: Uuid, err: &RoomError) {
        self.send_to_conn(
            conn,
            ServerMessage::Error {
                message: err.to_string(),
            },
        );
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward every state the room's store commits to this connection,
/// until the connection leaves or the room is deleted.
fn watch_room(state: &Arc<ServerState>, conn: Uuid, room: &Arc<GameRoom>) {
    let mut updates = room.store.subscribe();
    let state_ref = Arc::clone(state);
    let handle = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(snapshot) => {
                    state_ref.send_to_conn(conn, ServerMessage::State { state: snapshot });
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%conn, skipped, "state updates lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    if let Some(stale) = state.watchers.insert(conn, handle) {
        stale.abort();
    }
}

fn stop_watching(state: &Arc<ServerState>, conn: Uuid) {
    if let Some((_, handle)) = state.watchers.remove(&conn) {
        handle.abort();
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Dealito server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Assign a connection ID; it doubles as the player id in game state
    let conn = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.senders.insert(conn, tx);

    // Send welcome message
    let welcome = ServerMessage::Welcome { player_id: conn };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text.into())).await?;

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) {
                    handle_message(conn, client_msg, &state).await;
                } else {
                    warn!("Invalid message from {}: {}", conn, text);
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", conn);
                break;
            }
            Ok(Message::Ping(data)) => {
                state.send_to_conn(conn, ServerMessage::Pong);
                let _ = data; // Just consume it
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", conn, e);
                break;
            }
            _ => {}
        }
    }

    // Clean up on disconnect
    leave_current_room(conn, &state).await;
    state.senders.remove(&conn);
    send_task.abort();

    info!("Connection closed for {}", conn);
    Ok(())
}

/// Handle a client message.
async fn handle_message(conn: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::CreateRoom { nickname } => {
            let room_id = Uuid::new_v4();
            let room = Arc::new(GameRoom::new(room_id));
            state.rooms.insert(room_id, Arc::clone(&room));

            match room.join(conn, &nickname).await {
                Ok(snapshot) => {
                    state.conn_rooms.insert(conn, room_id);
                    watch_room(state, conn, &room);
                    state.send_to_conn(conn, ServerMessage::RoomCreated { room_id });
                    state.send_to_conn(
                        conn,
                        ServerMessage::JoinedRoom {
                            room_id,
                            state: snapshot,
                        },
                    );
                }
                Err(e) => {
                    state.rooms.remove(&room_id);
                    state.send_error(conn, &e);
                }
            }
        }

        ClientMessage::JoinRoom { room_id, nickname } => {
            let room = match state.rooms.get(&room_id) {
                Some(room) => Arc::clone(&room),
                None => {
                    state.send_error(conn, &RoomError::UnknownRoom);
                    return;
                }
            };
            match room.join(conn, &nickname).await {
                Ok(snapshot) => {
                    state.conn_rooms.insert(conn, room_id);
                    watch_room(state, conn, &room);
                    state.send_to_conn(
                        conn,
                        ServerMessage::JoinedRoom {
                            room_id,
                            state: snapshot,
                        },
                    );
                }
                Err(e) => state.send_error(conn, &e),
            }
        }

        ClientMessage::LeaveRoom => {
            leave_current_room(conn, state).await;
            state.send_to_conn(conn, ServerMessage::LeftRoom);
        }

        ClientMessage::Event { event } => {
            let room = state
                .conn_rooms
                .get(&conn)
                .and_then(|room_id| state.rooms.get(&room_id).map(|r| Arc::clone(&r)));
            match room {
                Some(room) => {
                    // the resulting state reaches everyone through the
                    // store subscription, including this connection
                    if let Err(e) = room.dispatch(conn, &event).await {
                        state.send_error(conn, &e);
                    }
                }
                None => state.send_error(conn, &RoomError::NotInRoom),
            }
        }

        ClientMessage::Ping => {
            state.send_to_conn(conn, ServerMessage::Pong);
        }
    }
}

/// Remove the connection from whatever room it is in, deleting the room
/// once its last member leaves.
async fn leave_current_room(conn: Uuid, state: &Arc<ServerState>) {
    stop_watching(state, conn);
    if let Some((_, room_id)) = state.conn_rooms.remove(&conn) {
        let room = state.rooms.get(&room_id).map(|r| Arc::clone(&r));
        if let Some(room) = room {
            match room.leave(conn).await {
                Ok(true) => {
                    state.rooms.remove(&room_id);
                    info!(%room_id, "room deleted");
                }
                Ok(false) => {}
                Err(e) => warn!(%conn, error = %e, "leave failed"),
            }
        }
    }
}
