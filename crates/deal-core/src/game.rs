//! The game reducer.
//!
//! `GameState` is the authoritative value for one room. Every client
//! intent arrives as a [`GameEvent`] and is folded in by [`GameState::apply`],
//! which always returns a complete next state: invalid events leave the
//! state unchanged. [`GameState::try_apply`] is the explicit-error form
//! the tests assert against.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::card::{ActionKind, Card, CardKind, PropertyColor, SolidColor};
use crate::catalog::{build_deck, CATALOG_SIZE, JUST_SAY_NO};
use crate::event::GameEvent;
use crate::player::{Pending, Player, PlayerId, StagedAction, SPECTATOR_HEX};
use crate::util::{partition_indexed, take_first_n};
use crate::win::{self, Winner};

/// Plays allowed per turn.
pub const MOVES_PER_TURN: u8 = 3;
/// Opening hand for the first seated player.
pub const OPENING_HAND_FIRST: usize = 7;
/// Opening hand for everyone else.
pub const OPENING_HAND: usize = 5;
/// Cards drawn at the start of a normal turn.
pub const TURN_DRAW: usize = 2;
/// Cards drawn instead when the incoming player's hand is empty.
pub const EMPTY_HAND_DRAW: usize = 5;
/// Maximum hand size at end of turn.
pub const HAND_LIMIT: usize = 7;
/// Flat Debt Collector charge.
pub const DEBT_COLLECTOR_CHARGE: u32 = 5;
/// Flat per-player Birthday charge.
pub const BIRTHDAY_CHARGE: u32 = 2;
/// Message-log id used for narration lines not authored by a player.
pub const GAME_LOG_ID: &str = "game";

/// Whether a game is underway, and whose turn it is if so.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum GamePhase {
    Lobby,
    InProgress { current_player_id: PlayerId },
}

/// One line of the append-only narration log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
}

/// Why an event was rejected.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("unknown player id: {0}")]
    UnknownPlayer(PlayerId),

    #[error("no card at that hand index")]
    MissingCard,

    #[error("no property at that index")]
    MissingProperty,

    #[error("player index out of range")]
    BadPlayerIndex,

    #[error("card is not a wildcard")]
    NotAWildcard,

    #[error("card config rejected")]
    BadCardConfig,

    #[error("game has not started")]
    GameNotStarted,

    #[error("game already started")]
    GameAlreadyStarted,

    #[error("need at least two players")]
    NotEnoughPlayers,

    #[error("no moves left this turn")]
    NoMovesLeft,

    #[error("that color is not a full set")]
    NotAFullSet,

    #[error("set is protected by an enhancement card")]
    ProtectedSet,

    #[error("no one has anything to pay with")]
    NothingToCharge,

    #[error("player has no rent due")]
    NoRentDue,

    #[error("player has no staged action")]
    NoStagedAction,

    #[error("player has no Just Say No card")]
    NoSayNoCard,

    #[error("play not allowed")]
    InvalidPlay,
}

impl GameError {
    /// Bad references and malformed data are worth a log line; plain
    /// rule violations are rejected silently since the client already
    /// gates them.
    pub fn is_reportable(&self) -> bool {
        matches!(
            self,
            GameError::UnknownPlayer(_)
                | GameError::MissingCard
                | GameError::MissingProperty
                | GameError::BadPlayerIndex
                | GameError::NotAWildcard
                | GameError::BadCardConfig
        )
    }
}

/// The complete state of one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Seated players, in turn order.
    pub players: Vec<Player>,
    pub spectators: Vec<Player>,
    /// Draw pile, drawn from the front.
    pub deck: Vec<Card>,
    /// Spent action and rent cards; reshuffled into the deck when it runs dry.
    pub discard: Vec<Card>,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
    /// Per-room override of the catalog duplication counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_config: Option<Vec<u8>>,
    pub phase: GamePhase,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        GameState {
            players: Vec::new(),
            spectators: Vec::new(),
            deck: Vec::new(),
            discard: Vec::new(),
            messages: vec![Message {
                id: GAME_LOG_ID.to_string(),
                content: "Game created".to_string(),
            }],
            winner: None,
            card_config: None,
            phase: GamePhase::Lobby,
        }
    }

    /// Fold one event into the state. Total: a rejected event returns the
    /// state unchanged, with a warning for reportable errors.
    pub fn apply(&self, event: &GameEvent) -> GameState {
        match self.try_apply(event) {
            Ok(next) => next,
            Err(err) => {
                if err.is_reportable() {
                    tracing::warn!(error = %err, ?event, "event rejected");
                }
                self.clone()
            }
        }
    }

    /// [`apply`](Self::apply) with the rejection reason. Errors never
    /// publish a partially updated state.
    pub fn try_apply(&self, event: &GameEvent) -> Result<GameState, GameError> {
        let mut next = self.clone();
        match event {
            GameEvent::AddPlayer { id, nickname } => next.add_player(id, nickname)?,
            GameEvent::RemovePlayer { id } => next.remove_player(id)?,
            GameEvent::ToggleSpectator { id } => next.toggle_spectator(id)?,
            GameEvent::SetCardConfig { config } => next.set_card_config(config)?,
            GameEvent::SendMessage { id, content } => next.send_message(id, content)?,
            GameEvent::StartGame => next.start_game()?,
            GameEvent::PlayCard {
                player_id,
                index,
                destination_color,
                as_money,
                targeted_player_id,
                targeted_index,
                own_index,
            } => next.play_card(
                player_id,
                *index,
                *destination_color,
                *as_money,
                targeted_player_id.as_deref(),
                *targeted_index,
                *own_index,
            )?,
            GameEvent::PayRent {
                player_id,
                selected_properties,
                selected_money,
            } => next.pay_rent(player_id, selected_properties, selected_money)?,
            GameEvent::GiveUpCards { staged } => next.give_up_cards(staged)?,
            GameEvent::SayNo {
                is_target,
                targeted_player_id,
                current_player_id,
            } => next.say_no(*is_target, targeted_player_id, current_player_id)?,
            GameEvent::AcceptNo {
                targeted_player_id,
                current_player_id,
            } => next.accept_no(targeted_player_id, current_player_id)?,
            GameEvent::FlipHandCard { player_id, index } => {
                next.flip_hand_card(player_id, *index)?
            }
            GameEvent::FlipPropertyCard {
                player_id,
                index,
                destination_color,
            } => next.flip_property_card(player_id, *index, *destination_color)?,
            GameEvent::EndTurn { player_index } => next.end_turn(*player_index)?,
            GameEvent::DiscardCards {
                player_id,
                selected,
            } => next.discard_cards(player_id, selected)?,
        }
        Ok(next)
    }

    pub fn current_player_id(&self) -> Option<&str> {
        match &self.phase {
            GamePhase::InProgress { current_player_id } => Some(current_player_id),
            GamePhase::Lobby => None,
        }
    }

    fn player_index(&self, id: &str) -> Result<usize, GameError> {
        self.players
            .iter()
            .position(|player| player.id == id)
            .ok_or_else(|| GameError::UnknownPlayer(id.to_string()))
    }

    fn log(&mut self, content: String) {
        self.messages.push(Message {
            id: GAME_LOG_ID.to_string(),
            content,
        });
    }

    /// Draw up to `count` cards from the deck front, reshuffling the
    /// discard pile in when the deck runs short.
    fn draw_cards(&mut self, count: usize) -> Vec<Card> {
        if self.deck.len() < count && !self.discard.is_empty() {
            let mut refill = std::mem::take(&mut self.discard);
            refill.shuffle(&mut rand::thread_rng());
            self.deck.extend(refill);
        }
        let deck = std::mem::take(&mut self.deck);
        let (drawn, rest) = take_first_n(deck, count);
        self.deck = rest;
        drawn
    }

    fn refresh_all_players(&mut self) {
        for player in &mut self.players {
            player.refresh_properties();
        }
    }

    /// Finishing pass after any event that moves property cards. On a
    /// win the room resets to the lobby.
    fn finish_if_won(&mut self) {
        if let Some(winner) = win::evaluate(&self.players) {
            self.log(format!("{} won the game!", winner.player.nickname));
            self.winner = Some(winner);
            self.players.clear();
            self.deck.clear();
            self.discard.clear();
            self.phase = GamePhase::Lobby;
        }
    }

    fn add_player(&mut self, id: &str, nickname: &str) -> Result<(), GameError> {
        let known = self
            .players
            .iter()
            .chain(&self.spectators)
            .any(|player| player.id == id);
        if known {
            return Err(GameError::InvalidPlay);
        }
        match self.phase {
            GamePhase::Lobby => {
                let seat = self.players.len();
                self.players
                    .push(Player::new(id.to_string(), nickname.to_string(), seat));
                self.log(format!("{nickname} has joined!"));
            }
            GamePhase::InProgress { .. } => {
                // Late joiners watch until the next game.
                let mut spectator = Player::new(id.to_string(), nickname.to_string(), 0);
                spectator.display_hex = SPECTATOR_HEX.to_string();
                self.spectators.push(spectator);
                self.log(format!("{nickname} is spectating"));
            }
        }
        Ok(())
    }

    fn remove_player(&mut self, id: &str) -> Result<(), GameError> {
        if let Some(index) = self.spectators.iter().position(|player| player.id == id) {
            let spectator = self.spectators.remove(index);
            self.log(format!("{} left", spectator.nickname));
            return Ok(());
        }
        let index = self.player_index(id)?;
        match self.phase.clone() {
            GamePhase::Lobby => {
                let player = self.players.remove(index);
                for (seat, remaining) in self.players.iter_mut().enumerate() {
                    remaining.display_hex = crate::player::display_palette(seat).to_string();
                }
                self.log(format!("{} left", player.nickname));
            }
            GamePhase::InProgress { current_player_id } => {
                let mut player = self.players.remove(index);
                let was_current = player.id == current_player_id;
                self.deck.extend(player.drain_all_cards());
                self.deck.shuffle(&mut rand::thread_rng());
                self.settle_departure(index, &player.id);
                self.log(format!("{} left the game", player.nickname));
                if self.players.len() < 2 {
                    for remaining in &mut self.players {
                        remaining.drain_all_cards();
                        remaining.moves_left = 0;
                        remaining.pending = None;
                        remaining.nos.clear();
                        remaining.rent_modifier = 1;
                    }
                    self.deck.clear();
                    self.discard.clear();
                    self.phase = GamePhase::Lobby;
                    self.log("Not enough players, back to the lobby".to_string());
                } else if was_current {
                    let next = index % self.players.len();
                    self.begin_turn(next);
                }
            }
        }
        Ok(())
    }

    /// Drop or reseat the obligations a departed player leaves behind.
    /// Rent owed to the leaver and staged actions involving them are
    /// cancelled; surviving staged actions have their seat indices
    /// shifted past the removed seat; the leaver's contests are purged
    /// from every `nos` list.
    fn settle_departure(&mut self, removed: usize, leaver_id: &str) {
        for player in &mut self.players {
            player.nos.retain(|id| id != leaver_id);
            let cancel = match &mut player.pending {
                Some(Pending::OwesRent { to, .. }) => to == leaver_id,
                Some(Pending::Staged(staged)) => {
                    if staged.current_player_index == removed
                        || staged.targeted_player_index == removed
                    {
                        true
                    } else {
                        if staged.current_player_index > removed {
                            staged.current_player_index -= 1;
                        }
                        if staged.targeted_player_index > removed {
                            staged.targeted_player_index -= 1;
                        }
                        false
                    }
                }
                None => false,
            };
            if cancel {
                player.pending = None;
            }
        }
    }

    fn toggle_spectator(&mut self, id: &str) -> Result<(), GameError> {
        if self.phase != GamePhase::Lobby {
            return Err(GameError::GameAlreadyStarted);
        }
        if let Some(index) = self.players.iter().position(|player| player.id == id) {
            let mut player = self.players.remove(index);
            player.display_hex = SPECTATOR_HEX.to_string();
            self.log(format!("{} is now spectating", player.nickname));
            self.spectators.push(player);
        } else if let Some(index) = self.spectators.iter().position(|player| player.id == id) {
            let mut player = self.spectators.remove(index);
            player.display_hex =
                crate::player::display_palette(self.players.len()).to_string();
            self.log(format!("{} is back in", player.nickname));
            self.players.push(player);
        } else {
            return Err(GameError::UnknownPlayer(id.to_string()));
        }
        for (seat, player) in self.players.iter_mut().enumerate() {
            player.display_hex = crate::player::display_palette(seat).to_string();
        }
        Ok(())
    }

    fn set_card_config(&mut self, config: &[u8]) -> Result<(), GameError> {
        if self.phase != GamePhase::Lobby {
            return Err(GameError::GameAlreadyStarted);
        }
        let total: usize = config.iter().map(|&n| n as usize).sum();
        if config.len() != CATALOG_SIZE || total == 0 {
            return Err(GameError::BadCardConfig);
        }
        self.card_config = Some(config.to_vec());
        self.log("Card configuration updated".to_string());
        Ok(())
    }

    fn send_message(&mut self, id: &str, content: &str) -> Result<(), GameError> {
        let known = self
            .players
            .iter()
            .chain(&self.spectators)
            .any(|player| player.id == id);
        if !known {
            return Err(GameError::UnknownPlayer(id.to_string()));
        }
        self.messages.push(Message {
            id: id.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }

    fn start_game(&mut self) -> Result<(), GameError> {
        if self.phase != GamePhase::Lobby {
            return Err(GameError::GameAlreadyStarted);
        }
        if self.players.len() < 2 {
            return Err(GameError::NotEnoughPlayers);
        }
        let mut rng = rand::thread_rng();
        let deck = build_deck(self.card_config.as_deref(), &mut rng);
        let needed = OPENING_HAND_FIRST + OPENING_HAND * (self.players.len() - 1);
        if deck.len() < needed {
            return Err(GameError::BadCardConfig);
        }
        self.players.shuffle(&mut rng);
        self.deck = deck;
        self.discard.clear();
        self.winner = None;
        for seat in 0..self.players.len() {
            let count = if seat == 0 { OPENING_HAND_FIRST } else { OPENING_HAND };
            let hand = self.draw_cards(count);
            let player = &mut self.players[seat];
            player.hand = hand;
            player.properties.clear();
            player.money.clear();
            player.pending = None;
            player.rent_modifier = 1;
            player.set_modifiers.clear();
            player.full_sets.clear();
            player.nos.clear();
            player.moves_left = if seat == 0 { MOVES_PER_TURN } else { 0 };
        }
        self.phase = GamePhase::InProgress {
            current_player_id: self.players[0].id.clone(),
        };
        self.log(format!("Game started, {} goes first", self.players[0].nickname));
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn play_card(
        &mut self,
        player_id: &str,
        index: usize,
        destination_color: Option<SolidColor>,
        as_money: bool,
        targeted_player_id: Option<&str>,
        targeted_index: Option<usize>,
        own_index: Option<usize>,
    ) -> Result<(), GameError> {
        match self.current_player_id() {
            None => return Err(GameError::GameNotStarted),
            Some(current) if current != player_id => return Err(GameError::InvalidPlay),
            Some(_) => {}
        }
        let pi = self.player_index(player_id)?;
        if self.players[pi].moves_left == 0 {
            return Err(GameError::NoMovesLeft);
        }
        if index >= self.players[pi].hand.len() {
            return Err(GameError::MissingCard);
        }
        let card = self.players[pi].hand.remove(index);
        let kind = card.kind.clone();
        let nickname = self.players[pi].nickname.clone();

        let message = match kind {
            CardKind::Money => {
                self.players[pi].money.push(card);
                format!("{nickname} played money")
            }
            CardKind::Property { color, .. } => {
                let mut tabled = card;
                if let Some(dest) = destination_color {
                    if !color.permits(dest) {
                        return Err(GameError::NotAWildcard);
                    }
                    if let CardKind::Property { acting_color, .. } = &mut tabled.kind {
                        *acting_color = Some(dest);
                    }
                }
                self.players[pi].properties.push(tabled);
                let word = if color.is_wildcard() { "wildcard" } else { "property" };
                format!("{nickname} played {word}")
            }
            CardKind::Action(_) | CardKind::Rent { .. } if as_money => {
                self.players[pi].money.push(card);
                format!("{nickname} banked a card")
            }
            CardKind::Action(action) => {
                self.play_action(
                    pi,
                    card,
                    action,
                    destination_color,
                    targeted_player_id,
                    targeted_index,
                    own_index,
                )?
            }
            CardKind::Rent { color } => {
                let chosen = match destination_color {
                    Some(dest) => {
                        if !color.permits(dest) {
                            return Err(GameError::InvalidPlay);
                        }
                        dest
                    }
                    None => color.default_color().ok_or(GameError::InvalidPlay)?,
                };
                let base = self.players[pi].rent_for(chosen);
                if base == 0 {
                    return Err(GameError::NothingToCharge);
                }
                self.set_rent_due(pi, base, targeted_player_id, true)?;
                self.discard.push(card);
                let target = match targeted_player_id {
                    Some(id) => self.players[self.player_index(id)?].nickname.clone(),
                    None => "everyone".to_string(),
                };
                format!("{nickname} charged rent to {target}")
            }
        };

        self.players[pi].moves_left -= 1;
        self.refresh_all_players();
        self.log(message);
        self.finish_if_won();
        Ok(())
    }

    /// One arm per action effect. The played card either moves to the
    /// discard pile or, for House/Hotel, onto the enhanced set.
    #[allow(clippy::too_many_arguments)]
    fn play_action(
        &mut self,
        pi: usize,
        card: Card,
        action: ActionKind,
        destination_color: Option<SolidColor>,
        targeted_player_id: Option<&str>,
        targeted_index: Option<usize>,
        own_index: Option<usize>,
    ) -> Result<String, GameError> {
        let nickname = self.players[pi].nickname.clone();
        let message = match action {
            // Reactive only; never playable on your own turn.
            ActionKind::JustSayNo => return Err(GameError::InvalidPlay),

            ActionKind::DealBreaker => {
                let ti = self.target_index(pi, targeted_player_id)?;
                let color = destination_color.ok_or(GameError::InvalidPlay)?;
                if !self.players[ti].has_full_set(color) {
                    return Err(GameError::NotAFullSet);
                }
                let taking: Vec<usize> = self.players[ti]
                    .properties
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.effective_color() == Some(color))
                    .map(|(i, _)| i)
                    .collect();
                let target_nick = self.players[ti].nickname.clone();
                self.players[ti].pending = Some(Pending::Staged(StagedAction {
                    card_id: card.id,
                    current_player_index: pi,
                    targeted_player_index: ti,
                    taking_indices: taking,
                    giving_index: None,
                    taking_modifiers: Some(color),
                    message: format!("{nickname} took a full set from {target_nick}"),
                }));
                self.discard.push(card);
                format!("{nickname} targeted {target_nick}")
            }

            ActionKind::SlyDeal => {
                let ti = self.target_index(pi, targeted_player_id)?;
                let taking = targeted_index.ok_or(GameError::MissingProperty)?;
                if taking >= self.players[ti].properties.len() {
                    return Err(GameError::MissingProperty);
                }
                let target_nick = self.players[ti].nickname.clone();
                self.players[ti].pending = Some(Pending::Staged(StagedAction {
                    card_id: card.id,
                    current_player_index: pi,
                    targeted_player_index: ti,
                    taking_indices: vec![taking],
                    giving_index: None,
                    taking_modifiers: None,
                    message: format!("{nickname} took a card from {target_nick}"),
                }));
                self.discard.push(card);
                format!("{nickname} targeted {target_nick}")
            }

            ActionKind::ForcedDeal => {
                let ti = self.target_index(pi, targeted_player_id)?;
                let taking = targeted_index.ok_or(GameError::MissingProperty)?;
                if taking >= self.players[ti].properties.len() {
                    return Err(GameError::MissingProperty);
                }
                let giving = own_index.ok_or(GameError::MissingProperty)?;
                if giving >= self.players[pi].properties.len() {
                    return Err(GameError::MissingProperty);
                }
                let target_nick = self.players[ti].nickname.clone();
                self.players[ti].pending = Some(Pending::Staged(StagedAction {
                    card_id: card.id,
                    current_player_index: pi,
                    targeted_player_index: ti,
                    taking_indices: vec![taking],
                    giving_index: Some(giving),
                    taking_modifiers: None,
                    message: format!("{nickname} swapped cards with {target_nick}"),
                }));
                self.discard.push(card);
                format!("{nickname} targeted {target_nick}")
            }

            ActionKind::DebtCollector => {
                let target = targeted_player_id.ok_or(GameError::InvalidPlay)?;
                self.set_rent_due(pi, DEBT_COLLECTOR_CHARGE, Some(target), false)?;
                let target_nick = self.players[self.player_index(target)?].nickname.clone();
                self.discard.push(card);
                format!("{nickname} is collecting a debt from {target_nick}")
            }

            ActionKind::House | ActionKind::Hotel => {
                let color = destination_color.ok_or(GameError::InvalidPlay)?;
                if !self.players[pi].has_full_set(color) {
                    return Err(GameError::NotAFullSet);
                }
                self.players[pi]
                    .set_modifiers
                    .entry(color)
                    .or_default()
                    .push(card);
                format!("{nickname} played a set enhancement card")
            }

            ActionKind::Birthday => {
                self.set_rent_due(pi, BIRTHDAY_CHARGE, None, false)?;
                self.discard.push(card);
                format!("It's {nickname}'s birthday")
            }

            ActionKind::DoubleRent => {
                self.players[pi].rent_modifier *= 2;
                self.discard.push(card);
                format!("{nickname} is doubling the rent")
            }

            ActionKind::PassGo => {
                let drawn = self.draw_cards(2);
                self.players[pi].hand.extend(drawn);
                self.discard.push(card);
                format!("{nickname} passed go and drew 2 cards")
            }
        };
        Ok(message)
    }

    fn target_index(&self, actor: usize, target: Option<&str>) -> Result<usize, GameError> {
        let id = target.ok_or(GameError::InvalidPlay)?;
        let index = self.player_index(id)?;
        if index == actor {
            return Err(GameError::InvalidPlay);
        }
        Ok(index)
    }

    /// Put an `OwesRent` obligation on the target, or on every other
    /// player when no target is named. Refused when nobody addressed can
    /// pay anything. Flat action charges skip the rent modifier.
    fn set_rent_due(
        &mut self,
        actor: usize,
        base: u32,
        target: Option<&str>,
        apply_modifier: bool,
    ) -> Result<(), GameError> {
        let actor_id = self.players[actor].id.clone();
        let amount = if apply_modifier {
            base * self.players[actor].rent_modifier
        } else {
            base
        };
        let targets: Vec<usize> = match target {
            Some(id) => {
                let index = self.player_index(id)?;
                if index == actor {
                    return Err(GameError::InvalidPlay);
                }
                vec![index]
            }
            None => (0..self.players.len()).filter(|&i| i != actor).collect(),
        };
        let collectible: Vec<usize> = targets
            .into_iter()
            .filter(|&i| !self.players[i].is_broke())
            .collect();
        if collectible.is_empty() {
            return Err(GameError::NothingToCharge);
        }
        for index in collectible {
            self.players[index].pending = Some(Pending::OwesRent {
                to: actor_id.clone(),
                amount,
            });
        }
        if apply_modifier {
            self.players[actor].rent_modifier = 1;
        }
        Ok(())
    }

    fn pay_rent(
        &mut self,
        player_id: &str,
        selected_properties: &[usize],
        selected_money: &[usize],
    ) -> Result<(), GameError> {
        let payer = self.player_index(player_id)?;
        let creditor_id = match &self.players[payer].pending {
            Some(Pending::OwesRent { to, .. }) => to.clone(),
            _ => return Err(GameError::NoRentDue),
        };
        let creditor = self.player_index(&creditor_id)?;

        let properties = std::mem::take(&mut self.players[payer].properties);
        let (sent_properties, kept_properties) =
            partition_indexed(properties, |_, i| selected_properties.contains(&i));
        let money = std::mem::take(&mut self.players[payer].money);
        let (sent_money, kept_money) =
            partition_indexed(money, |_, i| selected_money.contains(&i));

        self.players[payer].properties = kept_properties;
        self.players[payer].money = kept_money;
        self.players[payer].pending = None;
        self.players[creditor].properties.extend(sent_properties);
        self.players[creditor].money.extend(sent_money);

        let nickname = self.players[payer].nickname.clone();
        self.refresh_all_players();
        self.log(format!("{nickname} paid rent"));
        self.finish_if_won();
        Ok(())
    }

    /// Resolve a staged action the target chose not to (or could not)
    /// contest. The transfer uses the obligation stored on the target,
    /// not the caller's copy.
    fn give_up_cards(&mut self, staged: &StagedAction) -> Result<(), GameError> {
        if staged.targeted_player_index >= self.players.len() {
            return Err(GameError::BadPlayerIndex);
        }
        let ti = staged.targeted_player_index;
        let stored = match &self.players[ti].pending {
            Some(Pending::Staged(stored)) => stored.clone(),
            _ => return Err(GameError::NoStagedAction),
        };
        if stored.card_id != staged.card_id {
            return Err(GameError::NoStagedAction);
        }
        let ci = stored.current_player_index;
        if ci >= self.players.len() {
            return Err(GameError::BadPlayerIndex);
        }

        let target_properties = std::mem::take(&mut self.players[ti].properties);
        let (target_sending, target_staying) =
            partition_indexed(target_properties, |_, i| stored.taking_indices.contains(&i));
        let current_properties = std::mem::take(&mut self.players[ci].properties);
        let (current_sending, current_staying) =
            partition_indexed(current_properties, |_, i| stored.giving_index == Some(i));

        self.players[ci].properties = current_staying;
        self.players[ci].properties.extend(target_sending);
        self.players[ti].properties = target_staying;
        self.players[ti].properties.extend(current_sending);

        if let Some(color) = stored.taking_modifiers {
            let moved = self.players[ti]
                .set_modifiers
                .remove(&color)
                .unwrap_or_default();
            self.players[ci]
                .set_modifiers
                .entry(color)
                .or_default()
                .extend(moved);
        }
        self.players[ti].pending = None;

        self.refresh_all_players();
        self.log(stored.message);
        self.finish_if_won();
        Ok(())
    }

    fn say_no(
        &mut self,
        is_target: bool,
        targeted_player_id: &str,
        current_player_id: &str,
    ) -> Result<(), GameError> {
        let ci = self.player_index(current_player_id)?;
        let ti = self.player_index(targeted_player_id)?;
        let side = if is_target { ti } else { ci };
        let no_index = self.players[side]
            .hand
            .iter()
            .position(|card| card.id == JUST_SAY_NO)
            .ok_or(GameError::NoSayNoCard)?;
        let card = self.players[side].hand.remove(no_index);
        self.discard.push(card);

        if is_target {
            let target_id = self.players[ti].id.clone();
            self.players[ci].nos.push(target_id);
        } else {
            // The actor's counter-No cancels out the target's No.
            let target_id = self.players[ti].id.clone();
            self.players[ci].nos.retain(|id| id != &target_id);
        }
        let nickname = self.players[side].nickname.clone();
        self.log(format!("{nickname} said no!"));
        Ok(())
    }

    fn accept_no(
        &mut self,
        targeted_player_id: &str,
        current_player_id: &str,
    ) -> Result<(), GameError> {
        let ci = self.player_index(current_player_id)?;
        let ti = self.player_index(targeted_player_id)?;
        let target_id = self.players[ti].id.clone();
        if !self.players[ci].nos.contains(&target_id) {
            return Err(GameError::InvalidPlay);
        }
        self.players[ci].nos.retain(|id| id != &target_id);
        self.players[ti].pending = None;
        Ok(())
    }

    fn flip_hand_card(&mut self, player_id: &str, index: usize) -> Result<(), GameError> {
        let pi = self.player_index(player_id)?;
        let card = self.players[pi]
            .hand
            .get_mut(index)
            .ok_or(GameError::MissingCard)?;
        match &mut card.kind {
            CardKind::Property { color, .. } if matches!(color, PropertyColor::Dual(..)) => {
                *color = color.flipped();
                Ok(())
            }
            _ => Err(GameError::NotAWildcard),
        }
    }

    fn flip_property_card(
        &mut self,
        player_id: &str,
        index: usize,
        destination_color: SolidColor,
    ) -> Result<(), GameError> {
        let pi = self.player_index(player_id)?;
        let player = &self.players[pi];
        let card = player
            .properties
            .get(index)
            .ok_or(GameError::MissingProperty)?;
        let color = match &card.kind {
            CardKind::Property { color, .. } => *color,
            _ => return Err(GameError::NotAWildcard),
        };
        if !color.is_wildcard() {
            return Err(GameError::NotAWildcard);
        }
        if !color.permits(destination_color) {
            return Err(GameError::InvalidPlay);
        }
        if let Some(source) = card.effective_color() {
            if source != destination_color && player.has_full_set(source) {
                let enhanced = player
                    .set_modifiers
                    .get(&source)
                    .is_some_and(|m| !m.is_empty());
                let count = player
                    .properties
                    .iter()
                    .filter(|c| c.effective_color() == Some(source))
                    .count();
                if enhanced && count - 1 < source.set_size() {
                    return Err(GameError::ProtectedSet);
                }
            }
        }
        if let CardKind::Property { acting_color, .. } =
            &mut self.players[pi].properties[index].kind
        {
            *acting_color = Some(destination_color);
        }
        let nickname = self.players[pi].nickname.clone();
        self.players[pi].refresh_properties();
        self.log(format!("{nickname} flipped wildcard"));
        self.finish_if_won();
        Ok(())
    }

    fn end_turn(&mut self, player_index: usize) -> Result<(), GameError> {
        let current_id = self
            .current_player_id()
            .ok_or(GameError::GameNotStarted)?
            .to_string();
        if player_index >= self.players.len() {
            return Err(GameError::BadPlayerIndex);
        }
        if self.players[player_index].id != current_id {
            return Err(GameError::InvalidPlay);
        }
        if self.players[player_index].hand.len() > HAND_LIMIT {
            return Err(GameError::InvalidPlay);
        }
        self.players[player_index].moves_left = 0;
        let nickname = self.players[player_index].nickname.clone();
        let next = (player_index + 1) % self.players.len();
        self.begin_turn(next);
        self.log(format!("{nickname} ended turn"));
        Ok(())
    }

    /// Hand the turn to the player at `next`: draw-up, reset the move
    /// budget, update the phase.
    fn begin_turn(&mut self, next: usize) {
        let count = if self.players[next].hand.is_empty() {
            EMPTY_HAND_DRAW
        } else {
            TURN_DRAW
        };
        let drawn = self.draw_cards(count);
        self.players[next].hand.extend(drawn);
        self.players[next].moves_left = MOVES_PER_TURN;
        self.phase = GamePhase::InProgress {
            current_player_id: self.players[next].id.clone(),
        };
    }

    fn discard_cards(&mut self, player_id: &str, selected: &[usize]) -> Result<(), GameError> {
        let pi = self.player_index(player_id)?;
        let hand = std::mem::take(&mut self.players[pi].hand);
        let (discarded, kept) = partition_indexed(hand, |_, i| selected.contains(&i));
        let count = discarded.len();
        self.players[pi].hand = kept;
        self.discard.extend(discarded);
        let nickname = self.players[pi].nickname.clone();
        self.log(format!(
            "{nickname} discarded {count} card{}",
            if count == 1 { "" } else { "s" }
        ));
        self.end_turn(pi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lobby_with(names: &[&str]) -> GameState {
        let mut state = GameState::new();
        for (i, name) in names.iter().enumerate() {
            state = state.apply(&GameEvent::AddPlayer {
                id: format!("p{i}"),
                nickname: name.to_string(),
            });
        }
        state
    }

    #[test]
    fn start_game_needs_two_players() {
        let state = lobby_with(&["Ada"]);
        assert_eq!(
            state.try_apply(&GameEvent::StartGame),
            Err(GameError::NotEnoughPlayers)
        );
    }

    #[test]
    fn start_game_deals_opening_hands() {
        let state = lobby_with(&["Ada", "Grace", "Edsger"]).apply(&GameEvent::StartGame);
        assert!(matches!(state.phase, GamePhase::InProgress { .. }));
        assert_eq!(state.players[0].hand.len(), OPENING_HAND_FIRST);
        assert_eq!(state.players[1].hand.len(), OPENING_HAND);
        assert_eq!(state.players[2].hand.len(), OPENING_HAND);
        assert_eq!(state.players[0].moves_left, MOVES_PER_TURN);
        assert_eq!(state.players[1].moves_left, 0);
    }

    #[test]
    fn apply_is_total_on_unknown_player() {
        let state = lobby_with(&["Ada", "Grace"]).apply(&GameEvent::StartGame);
        let next = state.apply(&GameEvent::PlayCard {
            player_id: "nobody".into(),
            index: 0,
            destination_color: None,
            as_money: false,
            targeted_player_id: None,
            targeted_index: None,
            own_index: None,
        });
        assert_eq!(next, state);
    }

    #[test]
    fn add_player_mid_game_spectates() {
        let state = lobby_with(&["Ada", "Grace"]).apply(&GameEvent::StartGame);
        let state = state.apply(&GameEvent::AddPlayer {
            id: "p9".into(),
            nickname: "Late".into(),
        });
        assert_eq!(state.players.len(), 2);
        assert_eq!(state.spectators.len(), 1);
        assert_eq!(state.spectators[0].display_hex, SPECTATOR_HEX);
    }

    #[test]
    fn card_config_validated_in_lobby_only() {
        let state = lobby_with(&["Ada", "Grace"]);
        assert_eq!(
            state.try_apply(&GameEvent::SetCardConfig { config: vec![1; 3] }),
            Err(GameError::BadCardConfig)
        );
        let configured = state.apply(&GameEvent::SetCardConfig {
            config: vec![2; CATALOG_SIZE],
        });
        assert_eq!(configured.card_config, Some(vec![2; CATALOG_SIZE]));

        let started = configured.apply(&GameEvent::StartGame);
        assert_eq!(
            started.try_apply(&GameEvent::SetCardConfig {
                config: vec![1; CATALOG_SIZE]
            }),
            Err(GameError::GameAlreadyStarted)
        );
    }

    #[test]
    fn end_turn_rotates_and_draws() {
        let state = lobby_with(&["Ada", "Grace"]).apply(&GameEvent::StartGame);
        let before = state.players[1].hand.len();
        let next = state.apply(&GameEvent::EndTurn { player_index: 0 });
        assert_eq!(
            next.current_player_id(),
            Some(next.players[1].id.as_str())
        );
        assert_eq!(next.players[1].hand.len(), before + TURN_DRAW);
        assert_eq!(next.players[1].moves_left, MOVES_PER_TURN);
        assert_eq!(next.players[0].moves_left, 0);
    }

    #[test]
    fn end_turn_rejected_over_hand_limit() {
        let mut state = lobby_with(&["Ada", "Grace"]).apply(&GameEvent::StartGame);
        let extra = state.draw_cards(3);
        state.players[0].hand.extend(extra);
        assert!(state.players[0].hand.len() > HAND_LIMIT);
        assert_eq!(
            state.try_apply(&GameEvent::EndTurn { player_index: 0 }),
            Err(GameError::InvalidPlay)
        );
    }
}
