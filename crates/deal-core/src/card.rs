//! Card types: colors, card kinds, and per-color rent tables.

use serde::{Deserialize, Serialize};

/// Index into the static card catalog. Physical copies of the same
/// catalog entry share an id.
pub type CardId = u8;

/// The ten property colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolidColor {
    Blue,
    Green,
    Yellow,
    Red,
    Orange,
    Pink,
    Black,
    LightBlue,
    Brown,
    LightGreen,
}

impl SolidColor {
    pub const ALL: [SolidColor; 10] = [
        SolidColor::Blue,
        SolidColor::Green,
        SolidColor::Yellow,
        SolidColor::Red,
        SolidColor::Orange,
        SolidColor::Pink,
        SolidColor::Black,
        SolidColor::LightBlue,
        SolidColor::Brown,
        SolidColor::LightGreen,
    ];

    /// Rent charged at each achieved set size. The table length is the
    /// number of cards needed for a full set.
    pub fn stages(&self) -> &'static [u32] {
        match self {
            SolidColor::Blue => &[3, 8],
            SolidColor::Green => &[2, 4, 7],
            SolidColor::Yellow => &[2, 4, 6],
            SolidColor::Red => &[2, 3, 6],
            SolidColor::Orange => &[1, 3, 5],
            SolidColor::Pink => &[1, 2, 4],
            SolidColor::Black => &[1, 2, 3, 4],
            SolidColor::LightBlue => &[1, 2, 3],
            SolidColor::Brown => &[1, 3],
            SolidColor::LightGreen => &[1, 2],
        }
    }

    /// Cards needed to complete this color's set.
    pub fn set_size(&self) -> usize {
        self.stages().len()
    }

    /// CSS color used by clients to render this color.
    pub fn display_hex(&self) -> &'static str {
        match self {
            SolidColor::Blue => "rgb(56, 56, 163)",
            SolidColor::Green => "rgb(21, 107, 99)",
            SolidColor::Yellow => "rgb(234, 169, 52)",
            SolidColor::Red => "rgb(193, 64, 64)",
            SolidColor::Orange => "rgb(232, 130, 61)",
            SolidColor::Pink => "rgb(192, 103, 214)",
            SolidColor::Black => "black",
            SolidColor::LightBlue => "rgb(33, 175, 219)",
            SolidColor::Brown => "rgb(81, 57, 45)",
            SolidColor::LightGreen => "rgb(70, 175, 130)",
        }
    }
}

/// The color of a property or rent card. Duals choose between exactly two
/// fixed colors; rainbow wildcards choose among all ten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyColor {
    Solid(SolidColor),
    Dual(SolidColor, SolidColor),
    Rainbow,
}

impl PropertyColor {
    /// The color this card counts as when no acting color was chosen.
    /// Duals default to their first listed color; rainbows have no default.
    pub fn default_color(&self) -> Option<SolidColor> {
        match self {
            PropertyColor::Solid(color) => Some(*color),
            PropertyColor::Dual(first, _) => Some(*first),
            PropertyColor::Rainbow => None,
        }
    }

    /// Whether this card may be assigned to `color`.
    pub fn permits(&self, color: SolidColor) -> bool {
        match self {
            PropertyColor::Solid(solid) => *solid == color,
            PropertyColor::Dual(a, b) => *a == color || *b == color,
            PropertyColor::Rainbow => true,
        }
    }

    /// Swap the listed order of a dual pair. Identity for other colors.
    pub fn flipped(&self) -> PropertyColor {
        match self {
            PropertyColor::Dual(a, b) => PropertyColor::Dual(*b, *a),
            other => *other,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, PropertyColor::Dual(..) | PropertyColor::Rainbow)
    }
}

/// The ten action-card effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    DealBreaker,
    JustSayNo,
    SlyDeal,
    ForcedDeal,
    DebtCollector,
    Hotel,
    House,
    Birthday,
    DoubleRent,
    PassGo,
}

impl ActionKind {
    pub fn title(&self) -> &'static str {
        match self {
            ActionKind::DealBreaker => "Deal Breaker",
            ActionKind::JustSayNo => "Just Say No",
            ActionKind::SlyDeal => "Sly Deal",
            ActionKind::ForcedDeal => "Forced Deal",
            ActionKind::DebtCollector => "Debt Collector",
            ActionKind::Hotel => "Hotel",
            ActionKind::House => "House",
            ActionKind::Birthday => "It's My Birthday!",
            ActionKind::DoubleRent => "Double The Rent",
            ActionKind::PassGo => "Pass Go",
        }
    }
}

/// Per-kind payload of a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardKind {
    Money,
    Property {
        color: PropertyColor,
        /// The color this card currently counts as. Set when a wildcard
        /// is placed under (or flipped to) a specific color.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        acting_color: Option<SolidColor>,
    },
    Action(ActionKind),
    Rent { color: PropertyColor },
}

/// A single physical card. `id` indexes the catalog; `value` is the card's
/// money-equivalence when banked or handed over as rent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub value: u32,
    #[serde(flatten)]
    pub kind: CardKind,
}

impl Card {
    pub fn is_property(&self) -> bool {
        matches!(self.kind, CardKind::Property { .. })
    }

    /// The color a property card currently contributes to: the acting
    /// color if chosen, else the card's default. `None` for non-property
    /// cards and for rainbows that were never assigned.
    pub fn effective_color(&self) -> Option<SolidColor> {
        match &self.kind {
            CardKind::Property { color, acting_color } => {
                acting_color.or_else(|| color.default_color())
            }
            _ => None,
        }
    }

    pub fn action_kind(&self) -> Option<ActionKind> {
        match self.kind {
            CardKind::Action(kind) => Some(kind),
            _ => None,
        }
    }
}

/// Stable sort by catalog id, used to keep property groupings
/// deterministic for display.
pub fn sort_cards(cards: &mut [Card]) {
    cards.sort_by_key(|card| card.id);
}
