//! Events accepted by the reducer. One variant per client intent, in
//! lobby order then turn order.

use serde::{Deserialize, Serialize};

use crate::card::SolidColor;
use crate::player::{PlayerId, StagedAction};

/// Everything that can happen to a game, from either a seated player or
/// the lobby. The reducer is the only consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum GameEvent {
    AddPlayer {
        id: PlayerId,
        nickname: String,
    },
    RemovePlayer {
        id: PlayerId,
    },
    ToggleSpectator {
        id: PlayerId,
    },
    SetCardConfig {
        config: Vec<u8>,
    },
    SendMessage {
        id: PlayerId,
        content: String,
    },
    StartGame,
    PlayCard {
        player_id: PlayerId,
        /// Index into the player's hand.
        index: usize,
        /// Color chosen when tabling a wildcard.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination_color: Option<SolidColor>,
        /// Bank an action or rent card for its value instead of playing it.
        #[serde(default)]
        as_money: bool,
        /// Target of a single-victim action (Sly Deal, Forced Deal,
        /// Debt Collector, Deal Breaker, dual rent).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        targeted_player_id: Option<PlayerId>,
        /// Index into the target's properties, where the action needs one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        targeted_index: Option<usize>,
        /// Index into the actor's own properties (the Forced Deal offer).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        own_index: Option<usize>,
    },
    PayRent {
        player_id: PlayerId,
        /// Indices into the payer's tabled properties.
        selected_properties: Vec<usize>,
        /// Indices into the payer's bank.
        selected_money: Vec<usize>,
    },
    GiveUpCards {
        staged: StagedAction,
    },
    SayNo {
        /// Whether the card is played by the action's target (true) or by
        /// the original actor answering a counter (false).
        is_target: bool,
        targeted_player_id: PlayerId,
        current_player_id: PlayerId,
    },
    AcceptNo {
        targeted_player_id: PlayerId,
        current_player_id: PlayerId,
    },
    FlipHandCard {
        player_id: PlayerId,
        index: usize,
    },
    FlipPropertyCard {
        player_id: PlayerId,
        index: usize,
        destination_color: SolidColor,
    },
    EndTurn {
        player_index: usize,
    },
    DiscardCards {
        player_id: PlayerId,
        /// Indices into the player's hand to discard before ending the turn.
        selected: Vec<usize>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn events_round_trip_with_tagged_payload() {
        let event = GameEvent::PlayCard {
            player_id: "p1".into(),
            index: 2,
            destination_color: Some(SolidColor::Blue),
            as_money: false,
            targeted_player_id: None,
            targeted_index: None,
            own_index: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "play_card");
        assert_eq!(json["payload"]["index"], 2);
        assert_eq!(json["payload"]["destination_color"], "blue");

        let back: GameEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn play_card_defaults_optional_fields() {
        let json = serde_json::json!({
            "type": "play_card",
            "payload": { "player_id": "p1", "index": 0 }
        });
        let event: GameEvent = serde_json::from_value(json).unwrap();
        assert_eq!(
            event,
            GameEvent::PlayCard {
                player_id: "p1".into(),
                index: 0,
                destination_color: None,
                as_money: false,
                targeted_player_id: None,
                targeted_index: None,
                own_index: None,
            }
        );
    }

    #[test]
    fn start_game_has_no_payload() {
        let json = serde_json::to_value(GameEvent::StartGame).unwrap();
        assert_eq!(json["type"], "start_game");
    }
}
