//! WebSocket protocol messages for Dealito multiplayer.

use deal_core::{GameEvent, GameState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Create a new game room and join it
    CreateRoom { nickname: String },

    /// Join an existing room
    JoinRoom { room_id: Uuid, nickname: String },

    /// Leave current room
    LeaveRoom,

    /// Submit a game event for the current room
    Event { event: GameEvent },

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned connection ID
    Welcome { player_id: Uuid },

    /// Room created successfully
    RoomCreated { room_id: Uuid },

    /// Joined room; snapshot of the room state
    JoinedRoom { room_id: Uuid, state: GameState },

    /// Left room successfully
    LeftRoom,

    /// New authoritative room state
    State { state: GameState },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}
