//! Win detection, run as a finishing pass after property-moving events.

use serde::{Deserialize, Serialize};

use crate::card::{Card, SolidColor};
use crate::player::Player;
use crate::properties::group_by_color;

/// How many full sets win the game.
pub const FULL_SETS_TO_WIN: usize = 3;

/// The winning player and the cards that prove the win: one property per
/// color for a rainbow collection, or a full set's worth of cards for
/// each of three completed sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Winner {
    pub player: Player,
    pub cards: Vec<Card>,
}

/// First player in seating order holding either one property of every
/// color or at least three full sets.
pub fn evaluate(players: &[Player]) -> Option<Winner> {
    players.iter().find_map(|player| {
        let groups = group_by_color(&player.properties);

        if groups.len() == SolidColor::ALL.len() {
            let cards = SolidColor::ALL
                .iter()
                .filter_map(|color| groups.get(color).and_then(|g| g.first()))
                .map(|&card| card.clone())
                .collect();
            return Some(Winner {
                player: player.clone(),
                cards,
            });
        }

        let full_colors: Vec<SolidColor> = SolidColor::ALL
            .into_iter()
            .filter(|color| {
                groups
                    .get(color)
                    .is_some_and(|g| g.len() >= color.set_size())
            })
            .collect();
        if full_colors.len() >= FULL_SETS_TO_WIN {
            let cards = full_colors
                .iter()
                .take(FULL_SETS_TO_WIN)
                .flat_map(|color| {
                    groups[color]
                        .iter()
                        .take(color.set_size())
                        .map(|&card| card.clone())
                })
                .collect();
            return Some(Winner {
                player: player.clone(),
                cards,
            });
        }

        None
    })
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

    fn player_with(properties: Vec<Card>) -> Player {
        let mut player = Player::new("p1".into(), "Ada".into(), 0);
        player.properties = properties;
        player.refresh_properties();
        player
    }

    #[test]
    fn rainbow_collection_wins() {
        let properties = SolidColor::ALL.iter().map(|&c| solid(c)).collect();
        let winner = evaluate(&[player_with(properties)]).unwrap();
        assert_eq!(winner.cards.len(), 10);
    }

    #[test]
    fn three_full_sets_win() {
        let mut properties = Vec::new();
        for color in [SolidColor::Brown, SolidColor::LightGreen, SolidColor::Blue] {
            for _ in 0..color.set_size() {
                properties.push(solid(color));
            }
        }
        let winner = evaluate(&[player_with(properties)]).unwrap();
        // 2 + 2 + 2 proof cards
        assert_eq!(winner.cards.len(), 6);
    }

    #[test]
    fn two_full_sets_do_not_win() {
        let mut properties = Vec::new();
        for color in [SolidColor::Brown, SolidColor::LightGreen] {
            for _ in 0..color.set_size() {
                properties.push(solid(color));
            }
        }
        assert_eq!(evaluate(&[player_with(properties)]), None);
    }

    #[test]
    fn earlier_seat_wins_ties() {
        let properties: Vec<Card> = SolidColor::ALL.iter().map(|&c| solid(c)).collect();
        let mut first = player_with(properties.clone());
        first.id = "p0".into();
        let second = player_with(properties);
        let winner = evaluate(&[first, second]).unwrap();
        assert_eq!(winner.player.id, "p0");
    }
}
