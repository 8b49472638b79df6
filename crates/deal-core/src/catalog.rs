//! The static card catalog.
//!
//! The catalog is an ordered list of unique card definitions; a card's
//! `id` is its index into this list. A physical deck is built by
//! repeating each entry according to the duplication-count table
//! (overridable per room via `SetCardConfig`).

use crate::card::{ActionKind, Card, CardId, CardKind, PropertyColor, SolidColor};
use rand::seq::SliceRandom;
use rand::Rng;

/// Number of unique card definitions.
pub const CATALOG_SIZE: usize = 40;

/// Catalog id of the Just Say No card, matched reactively by `SayNo`.
pub const JUST_SAY_NO: CardId = 25;

/// How many copies of each catalog entry a default deck contains.
/// Totals [`DEFAULT_DECK_SIZE`] cards.
pub const DEFAULT_CARD_COUNTS: [u8; CATALOG_SIZE] = [
    // solid properties: one copy per stage slot
    2, 3, 3, 3, 3, 3, 4, 3, 2, 2, //
    // wildcards
    1, 2, 2, 2, 1, 1, 2, //
    // rent
    2, 2, 2, 2, 2, 2, 1, //
    // actions
    2, 3, 3, 3, 3, 2, 3, 3, 2, 10, //
    // money
    1, 2, 3, 3, 5, 6,
];

/// Total physical cards in a default deck.
pub const DEFAULT_DECK_SIZE: usize = 106;

/// The ordered list of unique card definitions.
pub fn catalog() -> Vec<Card> {
    let mut cards = Vec::with_capacity(CATALOG_SIZE);

    // ids 0-9: solid-color properties
    let properties: [(SolidColor, u32); 10] = [
        (SolidColor::Blue, 4),
        (SolidColor::Green, 4),
        (SolidColor::Yellow, 3),
        (SolidColor::Red, 3),
        (SolidColor::Orange, 2),
        (SolidColor::Pink, 2),
        (SolidColor::Black, 1),
        (SolidColor::LightBlue, 1),
        (SolidColor::Brown, 1),
        (SolidColor::LightGreen, 1),
    ];
    for (color, value) in properties {
        cards.push(property(PropertyColor::Solid(color), value));
    }

    // ids 10-16: property wildcards
    let duals: [(SolidColor, SolidColor, u32); 6] = [
        (SolidColor::Blue, SolidColor::Green, 4),
        (SolidColor::Yellow, SolidColor::Red, 3),
        (SolidColor::Orange, SolidColor::Pink, 2),
        (SolidColor::Green, SolidColor::Black, 4),
        (SolidColor::Black, SolidColor::LightBlue, 4),
        (SolidColor::Black, SolidColor::LightGreen, 2),
    ];
    for (a, b, value) in duals {
        cards.push(property(PropertyColor::Dual(a, b), value));
    }
    cards.push(property(PropertyColor::Rainbow, 0));

    // ids 17-23: rent cards
    cards.push(rent(PropertyColor::Rainbow, 3));
    let rent_duals: [(SolidColor, SolidColor); 5] = [
        (SolidColor::Blue, SolidColor::Green),
        (SolidColor::Yellow, SolidColor::Red),
        (SolidColor::Orange, SolidColor::Pink),
        (SolidColor::Black, SolidColor::LightGreen),
        (SolidColor::LightBlue, SolidColor::Brown),
    ];
    for (a, b) in rent_duals {
        cards.push(rent(PropertyColor::Dual(a, b), 1));
    }
    cards.push(rent(PropertyColor::Rainbow, 1));

    // ids 24-33: actions
    let actions: [(ActionKind, u32); 10] = [
        (ActionKind::DealBreaker, 5),
        (ActionKind::JustSayNo, 3),
        (ActionKind::SlyDeal, 3),
        (ActionKind::ForcedDeal, 3),
        (ActionKind::DebtCollector, 3),
        (ActionKind::Hotel, 4),
        (ActionKind::House, 3),
        (ActionKind::Birthday, 2),
        (ActionKind::DoubleRent, 1),
        (ActionKind::PassGo, 1),
    ];
    for (kind, value) in actions {
        cards.push(Card {
            id: 0,
            value,
            kind: CardKind::Action(kind),
        });
    }

    // ids 34-39: money
    for value in [10, 5, 4, 3, 2, 1] {
        cards.push(Card {
            id: 0,
            value,
            kind: CardKind::Money,
        });
    }

    for (id, card) in cards.iter_mut().enumerate() {
        card.id = id as CardId;
    }
    cards
}

fn property(color: PropertyColor, value: u32) -> Card {
    Card {
        id: 0,
        value,
        kind: CardKind::Property {
            color,
            acting_color: None,
        },
    }
}

fn rent(color: PropertyColor, value: u32) -> Card {
    Card {
        id: 0,
        value,
        kind: CardKind::Rent { color },
    }
}

/// Build and shuffle a physical draw pile from the catalog, using the
/// default duplication counts or a per-room override.
pub fn build_deck<R: Rng>(config: Option<&[u8]>, rng: &mut R) -> Vec<Card> {
    let counts = config.unwrap_or(&DEFAULT_CARD_COUNTS);
    let mut deck: Vec<Card> = catalog()
        .into_iter()
        .flat_map(|card| {
            let copies = counts.get(card.id as usize).copied().unwrap_or(0);
            std::iter::repeat(card).take(copies as usize)
        })
        .collect();
    deck.shuffle(rng);
    deck
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn catalog_has_expected_layout() {
        let cards = catalog();
        assert_eq!(cards.len(), CATALOG_SIZE);

        for (id, card) in cards.iter().enumerate() {
            assert_eq!(card.id as usize, id);
        }

        // Properties at 0-16, rent at 17-23, actions at 24-33, money at 34-39.
        assert!(cards[..17].iter().all(|c| c.is_property()));
        assert!(cards[17..24]
            .iter()
            .all(|c| matches!(c.kind, CardKind::Rent { .. })));
        assert!(cards[24..34]
            .iter()
            .all(|c| matches!(c.kind, CardKind::Action(_))));
        assert!(cards[34..]
            .iter()
            .all(|c| matches!(c.kind, CardKind::Money)));

        // Reactive-only card sits at its well-known id.
        assert_eq!(
            cards[JUST_SAY_NO as usize].action_kind(),
            Some(ActionKind::JustSayNo)
        );
        assert_eq!(
            cards[24].action_kind(),
            Some(ActionKind::DealBreaker)
        );
        assert_eq!(cards[33].action_kind(), Some(ActionKind::PassGo));
    }

    #[test]
    fn default_deck_totals_106() {
        let total: usize = DEFAULT_CARD_COUNTS.iter().map(|&n| n as usize).sum();
        assert_eq!(total, DEFAULT_DECK_SIZE);

        let deck = build_deck(None, &mut rand::thread_rng());
        assert_eq!(deck.len(), DEFAULT_DECK_SIZE);
    }

    #[test]
    fn solid_property_copies_match_set_sizes() {
        for (id, color) in SolidColor::ALL.iter().enumerate() {
            assert_eq!(
                DEFAULT_CARD_COUNTS[id] as usize,
                color.set_size(),
                "copies of {color:?} should equal its set size"
            );
        }
    }

    #[test]
    fn config_override_changes_deck() {
        let mut config = [0u8; CATALOG_SIZE];
        config[33] = 4; // four Pass Go cards, nothing else
        let deck = build_deck(Some(&config), &mut rand::thread_rng());
        assert_eq!(deck.len(), 4);
        assert!(deck.iter().all(|c| c.id == 33));
    }
}
