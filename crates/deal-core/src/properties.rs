//! Grouping a player's tabled properties by color and detecting
//! completed sets.

use std::collections::HashMap;

use crate::card::{Card, SolidColor};

/// Group property cards by the color they currently count as. Rainbow
/// wildcards that were never assigned a color are skipped.
pub fn group_by_color(cards: &[Card]) -> HashMap<SolidColor, Vec<&Card>> {
    let mut groups: HashMap<SolidColor, Vec<&Card>> = HashMap::new();
    for card in cards {
        if let Some(color) = card.effective_color() {
            groups.entry(color).or_default().push(card);
        }
    }
    groups
}

/// For each color present on the table, whether the player has at least
/// a full set's worth of cards of that color.
pub fn compute_full_sets(cards: &[Card]) -> HashMap<SolidColor, bool> {
    group_by_color(cards)
        .into_iter()
        .map(|(color, group)| (color, group.len() >= color.set_size()))
        .collect()
}
