//! Player state: zones, turn budget, pending obligations, and the
//! display palette assigned at seating time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::card::{sort_cards, Card, CardId, SolidColor};
use crate::properties::compute_full_sets;

pub type PlayerId = String;

/// Palette color given to spectators and to seats past the palette.
pub const SPECTATOR_HEX: &str = "rgb(51, 51, 51)";

/// Seat colors, drawn from the property palette minus the two colors
/// that read poorly as player tints.
const SEAT_COLORS: [SolidColor; 8] = [
    SolidColor::Blue,
    SolidColor::Green,
    SolidColor::Yellow,
    SolidColor::Red,
    SolidColor::Orange,
    SolidColor::Pink,
    SolidColor::LightBlue,
    SolidColor::LightGreen,
];

/// Display color for the player sitting at `seat`.
pub fn display_palette(seat: usize) -> &'static str {
    SEAT_COLORS[seat % SEAT_COLORS.len()].display_hex()
}

/// A targeted action that was played but is still contestable with a
/// Just Say No. Stored on the target until resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedAction {
    pub card_id: CardId,
    pub current_player_index: usize,
    pub targeted_player_index: usize,
    /// Indices into the target's properties that change hands.
    pub taking_indices: Vec<usize>,
    /// Index into the actor's properties offered in a trade, if any.
    pub giving_index: Option<usize>,
    /// Color whose set modifiers ride along with a broken set.
    pub taking_modifiers: Option<SolidColor>,
    pub message: String,
}

/// An unresolved obligation on a player. At most one at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Pending {
    OwesRent { to: PlayerId, amount: u32 },
    Staged(StagedAction),
}

/// What a player is currently blocked on, derived from [`Pending`] and
/// the contest list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Idle,
    OwesRent,
    HasStagedAction,
    AwaitingNoDecision,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub nickname: String,
    pub display_hex: String,
    pub hand: Vec<Card>,
    pub properties: Vec<Card>,
    pub money: Vec<Card>,
    pub moves_left: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<Pending>,
    /// Multiplier applied to the next rent this player charges.
    pub rent_modifier: u32,
    /// House and Hotel cards attached to completed sets, keyed by color.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub set_modifiers: HashMap<SolidColor, Vec<Card>>,
    /// Cached per-color full-set flags, refreshed whenever properties move.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub full_sets: HashMap<SolidColor, bool>,
    /// Ids of players who answered a contest with their own Just Say No.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nos: Vec<PlayerId>,
}

impl Player {
    pub fn new(id: PlayerId, nickname: String, seat: usize) -> Self {
        Player {
            id,
            nickname,
            display_hex: display_palette(seat).to_string(),
            hand: Vec::new(),
            properties: Vec::new(),
            money: Vec::new(),
            moves_left: 0,
            pending: None,
            rent_modifier: 1,
            set_modifiers: HashMap::new(),
            full_sets: HashMap::new(),
            nos: Vec::new(),
        }
    }

    pub fn status(&self) -> PlayerStatus {
        if !self.nos.is_empty() {
            return PlayerStatus::AwaitingNoDecision;
        }
        match self.pending {
            None => PlayerStatus::Idle,
            Some(Pending::OwesRent { .. }) => PlayerStatus::OwesRent,
            Some(Pending::Staged(_)) => PlayerStatus::HasStagedAction,
        }
    }

    /// Re-sort the table and recompute which sets are complete. Called
    /// after any event that moves property cards.
    pub fn refresh_properties(&mut self) {
        sort_cards(&mut self.properties);
        self.full_sets = compute_full_sets(&self.properties);
    }

    pub fn has_full_set(&self, color: SolidColor) -> bool {
        self.full_sets.get(&color).copied().unwrap_or(false)
    }

    /// Rent this player can charge for `color`: the stage-table value for
    /// the cards held, plus attached House/Hotel values once the set is
    /// complete.
    pub fn rent_for(&self, color: SolidColor) -> u32 {
        let count = self
            .properties
            .iter()
            .filter(|card| card.effective_color() == Some(color))
            .count();
        if count == 0 {
            return 0;
        }
        let stages = color.stages();
        let stage = count.min(stages.len()) - 1;
        let mut rent = stages[stage];
        if self.has_full_set(color) {
            if let Some(modifiers) = self.set_modifiers.get(&color) {
                rent += modifiers.iter().map(|card| card.value).sum::<u32>();
            }
        }
        rent
    }

    /// A player with nothing tabled pays nothing when charged.
    pub fn is_broke(&self) -> bool {
        self.properties.is_empty() && self.money.is_empty()
    }

    /// Every card this player holds, across all zones. Used when a
    /// player leaves mid-game and their cards return to the deck.
    pub fn drain_all_cards(&mut self) -> Vec<Card> {
        let mut cards: Vec<Card> = self.hand.drain(..).collect();
        cards.extend(self.properties.drain(..));
        cards.extend(self.money.drain(..));
        for (_, modifiers) in self.set_modifiers.drain() {
            cards.extend(modifiers);
        }
        self.full_sets.clear();
        cards
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardKind, PropertyColor};
    use pretty_assertions::assert_eq;

    fn solid(color: SolidColor) -> Card {
        Card {
            id: 0,
            value: 1,
            kind: CardKind::Property {
                color: PropertyColor::Solid(color),
                acting_color: None,
            },
        }
    }

    #[test]
    fn palette_wraps_and_skips_dark_colors() {
        assert_eq!(display_palette(0), SolidColor::Blue.display_hex());
        assert_eq!(display_palette(8), SolidColor::Blue.display_hex());
        for seat in 0..8 {
            let hex = display_palette(seat);
            assert_ne!(hex, SolidColor::Black.display_hex());
            assert_ne!(hex, SolidColor::Brown.display_hex());
        }
    }

    #[test]
    fn status_tracks_pending_and_contests() {
        let mut player = Player::new("p1".into(), "Ada".into(), 0);
        assert_eq!(player.status(), PlayerStatus::Idle);

        player.pending = Some(Pending::OwesRent {
            to: "p2".into(),
            amount: 3,
        });
        assert_eq!(player.status(), PlayerStatus::OwesRent);

        player.nos.push("p2".into());
        assert_eq!(player.status(), PlayerStatus::AwaitingNoDecision);
    }

    #[test]
    fn rent_uses_stage_table_and_modifiers() {
        let mut player = Player::new("p1".into(), "Ada".into(), 0);
        player.properties = vec![solid(SolidColor::Brown)];
        player.refresh_properties();
        assert_eq!(player.rent_for(SolidColor::Brown), 1);

        player.properties.push(solid(SolidColor::Brown));
        player.refresh_properties();
        assert_eq!(player.rent_for(SolidColor::Brown), 3);

        player.set_modifiers.insert(
            SolidColor::Brown,
            vec![Card {
                id: 30,
                value: 3,
                kind: CardKind::Action(crate::card::ActionKind::House),
            }],
        );
        assert_eq!(player.rent_for(SolidColor::Brown), 6);
    }

    #[test]
    fn modifiers_ignored_below_full_set() {
        let mut player = Player::new("p1".into(), "Ada".into(), 0);
        player.properties = vec![solid(SolidColor::Blue)];
        player.refresh_properties();
        player.set_modifiers.insert(
            SolidColor::Blue,
            vec![Card {
                id: 29,
                value: 4,
                kind: CardKind::Action(crate::card::ActionKind::Hotel),
            }],
        );
        assert_eq!(player.rent_for(SolidColor::Blue), 3);
    }

    #[test]
    fn drain_all_cards_empties_every_zone() {
        let mut player = Player::new("p1".into(), "Ada".into(), 0);
        player.hand = vec![solid(SolidColor::Blue)];
        player.properties = vec![solid(SolidColor::Brown), solid(SolidColor::Brown)];
        player.money = vec![Card {
            id: 39,
            value: 1,
            kind: CardKind::Money,
        }];
        player.refresh_properties();
        player
            .set_modifiers
            .insert(SolidColor::Brown, vec![solid(SolidColor::Brown)]);

        let cards = player.drain_all_cards();
        assert_eq!(cards.len(), 5);
        assert!(player.hand.is_empty());
        assert!(player.properties.is_empty());
        assert!(player.money.is_empty());
        assert!(player.set_modifiers.is_empty());
    }
}
