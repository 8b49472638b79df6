//! Game room management.
//!
//! A room owns one [`StateStore`] and a membership table mapping
//! connections to the player ids the reducer knows them by. Joining and
//! leaving flow through the reducer like any other event, so mid-game
//! leaves reshuffle the leaver's cards and late joins become spectators.

use dashmap::DashMap;
use deal_core::{GameEvent, GameState, PlayerId};
use thiserror::Error;
use uuid::Uuid;

use crate::store::{StateStore, StoreError};

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("room not found")]
    UnknownRoom,

    #[error("not in a room")]
    NotInRoom,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct GameRoom {
    pub id: Uuid,
    pub store: StateStore,
    /// Connection id to the player id used in game state.
    members: DashMap<Uuid, PlayerId>,
}

impl GameRoom {
    pub fn new(id: Uuid) -> Self {
        GameRoom {
            id,
            store: StateStore::new(GameState::new()),
            members: DashMap::new(),
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Seat (or, mid-game, spectate) the connection under its player id.
    pub async fn join(&self, conn: Uuid, nickname: &str) -> Result<GameState, RoomError> {
        let player_id = conn.to_string();
        let event = GameEvent::AddPlayer {
            id: player_id.clone(),
            nickname: nickname.to_string(),
        };
        let state = self.store.transact(|state| state.apply(&event)).await?;
        self.members.insert(conn, player_id);
        Ok(state)
    }

    /// Remove the connection's player from the game. Returns true when
    /// the room is now empty and should be deleted.
    pub async fn leave(&self, conn: Uuid) -> Result<bool, RoomError> {
        let (_, player_id) = self.members.remove(&conn).ok_or(RoomError::NotInRoom)?;
        let event = GameEvent::RemovePlayer { id: player_id };
        self.store.transact(|state| state.apply(&event)).await?;
        Ok(self.members.is_empty())
    }

    /// Apply a game event on behalf of a member connection.
    pub async fn dispatch(&self, conn: Uuid, event: &GameEvent) -> Result<GameState, RoomError> {
        if !self.members.contains_key(&conn) {
            return Err(RoomError::NotInRoom);
        }
        let state = self.store.transact(|state| state.apply(event)).await?;
        Ok(state)
    }
}
