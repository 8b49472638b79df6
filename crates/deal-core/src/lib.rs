//! deal-core - rules engine for Dealito, a property-trading card game
//!
//! The engine is a pure reducer: [`GameState::apply`] folds one
//! [`GameEvent`] into a state and returns the complete next state. It
//! never blocks and has no side effects beyond diagnostic logging, so a
//! transport layer can apply it speculatively against an
//! optimistic-concurrency store and retry on conflict.
//!
//! # Modules
//!
//! - [`card`]: colors, card kinds, rent stage tables
//! - [`catalog`]: the 40 unique card definitions and deck building
//! - [`player`]: per-player zones, pending obligations, palette
//! - [`properties`]: grouping tabled properties and full-set detection
//! - [`event`]: the event union the reducer accepts
//! - [`game`]: the reducer itself
//! - [`win`]: the two win conditions

pub mod card;
pub mod catalog;
pub mod event;
pub mod game;
pub mod player;
pub mod properties;
pub mod util;
pub mod win;

// Re-export commonly used types
pub use card::{ActionKind, Card, CardId, CardKind, PropertyColor, SolidColor};
pub use catalog::{build_deck, catalog, DEFAULT_CARD_COUNTS, DEFAULT_DECK_SIZE};
pub use event::GameEvent;
pub use game::{GameError, GamePhase, GameState, Message};
pub use player::{Pending, Player, PlayerId, PlayerStatus, StagedAction};
pub use win::Winner;
