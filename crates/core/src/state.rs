use crate::{Card, Edition, HandCategory, ModifierSlots, Suit, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Phase {
    BlindSelect,
    HandPlay,
    Shop,
    PackOpen,
    BossPrep,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::BlindSelect => "blind_select",
            Phase::HandPlay => "hand_play",
            Phase::Shop => "shop",
            Phase::PackOpen => "pack_open",
            Phase::BossPrep => "boss_prep",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BlindKind {
    Small,
    Big,
    Boss,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BossEffect {
    /// Cards of this suit score nothing and satisfy no card predicate.
    DebuffSuit(Suit),
    DebuffFace,
    /// Base chips and mult are halved.
    HalveBase,
    /// Every play must use five cards.
    MustPlayFive,
}

impl BossEffect {
    pub fn debuffs(&self, card: &Card) -> bool {
        match self {
            BossEffect::DebuffSuit(suit) => {
                !card.is_stone() && !card.is_wild() && card.suit == *suit
            }
            BossEffect::DebuffFace => card.is_face(),
            BossEffect::HalveBase | BossEffect::MustPlayFive => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum OfferKind {
    Modifier {
        id: String,
        #[serde(default)]
        edition: Option<Edition>,
    },
    Planet(HandCategory),
    Card(Card),
    Tarot(String),
    Voucher(String),
}

impl OfferKind {
    pub fn label(&self) -> String {
        match self {
            OfferKind::Modifier { id, .. } => format!("modifier {id}"),
            OfferKind::Planet(kind) => format!("planet {}", kind.id()),
            OfferKind::Card(card) => format!("card {:?} {:?}", card.rank, card.suit),
            OfferKind::Tarot(id) => format!("tarot {id}"),
            OfferKind::Voucher(id) => format!("voucher {id}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Offer {
    pub kind: OfferKind,
    #[serde(default)]
    pub cost: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShopState {
    pub offers: Vec<Offer>,
    pub reroll_cost: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackState {
    pub options: Vec<Offer>,
    #[serde(default = "default_picks")]
    pub picks_left: u8,
}

fn default_picks() -> u8 {
    1
}

fn default_consumable_slots() -> usize {
    2
}

/// One canonical snapshot of the game at a decision point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameContext {
    pub phase: Phase,
    pub ante: u8,
    #[serde(default)]
    pub round: u32,
    pub blind: BlindKind,
    #[serde(default)]
    pub blind_target: i64,
    #[serde(default)]
    pub blind_score: i64,
    pub money: i64,
    pub hands_left: u8,
    pub discards_left: u8,
    /// The boss effect of the current ante, active only during the boss blind.
    #[serde(default)]
    pub boss: Option<BossEffect>,
    #[serde(default)]
    pub hand: Vec<Card>,
    #[serde(default)]
    pub modifiers: ModifierSlots,
    /// Cards remaining in the draw pile.
    #[serde(default)]
    pub deck: Vec<Card>,
    #[serde(default)]
    pub hand_levels: BTreeMap<HandCategory, u32>,
    #[serde(default)]
    pub shop: Option<ShopState>,
    #[serde(default)]
    pub pack: Option<PackState>,
    #[serde(default)]
    pub consumables: Vec<String>,
    #[serde(default = "default_consumable_slots")]
    pub consumable_slots: usize,
}

impl GameContext {
    pub fn new(phase: Phase, ante: u8, blind: BlindKind) -> Self {
        Self {
            phase,
            ante,
            round: 0,
            blind,
            blind_target: 0,
            blind_score: 0,
            money: 0,
            hands_left: 4,
            discards_left: 3,
            boss: None,
            hand: Vec::new(),
            modifiers: ModifierSlots::default(),
            deck: Vec::new(),
            hand_levels: BTreeMap::new(),
            shop: None,
            pack: None,
            consumables: Vec::new(),
            consumable_slots: default_consumable_slots(),
        }
    }

    pub fn level(&self, kind: HandCategory) -> u32 {
        self.hand_levels.get(&kind).copied().unwrap_or(1).max(1)
    }

    /// Boss effect that applies to scoring right now.
    pub fn active_boss(&self) -> Option<BossEffect> {
        match self.blind {
            BlindKind::Boss => self.boss,
            _ => None,
        }
    }

    pub fn remaining_target(&self) -> i64 {
        (self.blind_target - self.blind_score).max(0)
    }

    pub fn consumable_space(&self) -> usize {
        self.consumable_slots.saturating_sub(self.consumables.len())
    }

    /// Whether there is somewhere to put an acquired offer.
    pub fn has_room(&self, kind: &OfferKind) -> bool {
        match kind {
            OfferKind::Modifier { .. } => !self.modifiers.is_full(),
            OfferKind::Planet(_) | OfferKind::Tarot(_) => self.consumable_space() > 0,
            OfferKind::Card(_) | OfferKind::Voucher(_) => true,
        }
    }

    /// Splits the hand into (played, held) for the given indices, keeping play order.
    pub fn split_hand(&self, indices: &[usize]) -> Result<(Vec<Card>, Vec<Card>), ValidationError> {
        let mut seen = vec![false; self.hand.len()];
        let mut played = Vec::with_capacity(indices.len());
        for &index in indices {
            if index >= self.hand.len() {
                return Err(ValidationError::IndexOutOfRange {
                    index,
                    len: self.hand.len(),
                });
            }
            if seen[index] {
                return Err(ValidationError::DuplicateIndex(index));
            }
            seen[index] = true;
            played.push(self.hand[index]);
        }
        let held = self
            .hand
            .iter()
            .zip(seen)
            .filter(|(_, used)| !used)
            .map(|(card, _)| *card)
            .collect();
        Ok((played, held))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hand_levels_serialize_in_category_order() {
        let mut a = GameContext::new(Phase::Shop, 2, BlindKind::Small);
        for (category, level) in [
            (HandCategory::Flush, 3),
            (HandCategory::Pair, 2),
            (HandCategory::HighCard, 4),
        ] {
            a.hand_levels.insert(category, level);
        }
        let mut b = GameContext::new(Phase::Shop, 2, BlindKind::Small);
        for (category, level) in [
            (HandCategory::HighCard, 4),
            (HandCategory::Flush, 3),
            (HandCategory::Pair, 2),
        ] {
            b.hand_levels.insert(category, level);
        }
        let json_a = serde_json::to_string(&a).unwrap();
        let json_b = serde_json::to_string(&b).unwrap();
        assert_eq!(json_a, json_b);
        assert!(json_a.contains(r#""hand_levels":{"HighCard":4,"Pair":2,"Flush":3}"#));
    }
}
