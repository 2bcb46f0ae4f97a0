use crate::{Archetype, Card, Enhancement, HandCategory, HandRules, Rank, Suit};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Once per firing of each qualifying scored card.
    OnScored,
    /// Once per firing of each qualifying card held in hand.
    OnHeld,
    /// Once per hand played.
    OnHand,
    /// Once per qualifying discarded card.
    OnDiscard,
    /// Once per discard action.
    OnDiscardBatch,
}

/// What an amount scales with. Values are read from the evaluation context.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Scale {
    #[default]
    None,
    /// The modifier's own accumulator.
    Accumulated,
    /// Number of modifiers currently slotted.
    Modifiers,
    /// Free modifier slots, counting the modifier itself as empty.
    EmptySlots,
    /// Cards remaining in the draw pile.
    DeckRemaining,
    DiscardsLeft,
    /// Chip value of the lowest ranked card held in hand.
    LowestHeldRank,
}

/// `base + per * scale`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Amount {
    #[serde(default)]
    pub base: f64,
    #[serde(default)]
    pub per: f64,
    #[serde(default)]
    pub scale: Scale,
}

impl Amount {
    pub fn flat(base: f64) -> Self {
        Self {
            base,
            per: 0.0,
            scale: Scale::None,
        }
    }

    pub fn scaled(base: f64, per: f64, scale: Scale) -> Self {
        Self { base, per, scale }
    }

    pub fn resolve(&self, scale_value: f64) -> f64 {
        match self.scale {
            Scale::None => self.base,
            _ => self.base + self.per * scale_value,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Operator {
    AddChips(Amount),
    AddMult(Amount),
    MultXMult(Amount),
    AddMoney(Amount),
    /// Destroys the card the rule fired on.
    DestroyCard,
    StateIncrement(Amount),
}

impl Operator {
    pub fn is_scaling(&self) -> bool {
        matches!(self, Operator::StateIncrement(_))
    }
}

/// Predicate deciding whether a rule fires. Card predicates are false for
/// rules that fire once per hand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Condition {
    Always,
    HandContains(HandCategory),
    HandIs(HandCategory),
    Suit(Suit),
    Ranks(Vec<Rank>),
    Face,
    Even,
    Odd,
    Enhancement(Enhancement),
    /// The first face card among the scoring cards.
    FirstFace,
    PlayedAtMost(usize),
    DiscardsLeftAtMost(u8),
    FinalHand,
    /// Every held card belongs to one of the listed suits. False with an empty hand.
    HeldAllSuits(Vec<Suit>),
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

/// Everything a condition may look at for one firing.
#[derive(Debug, Clone, Copy)]
pub struct ConditionScope<'a> {
    pub category: HandCategory,
    pub contains: &'a [HandCategory],
    pub played: &'a [Card],
    pub scoring: &'a [usize],
    pub held: &'a [Card],
    pub discards_left: u8,
    pub hands_left: u8,
    pub smeared: bool,
    pub card: Option<ScopedCard<'a>>,
}

#[derive(Debug, Clone, Copy)]
pub struct ScopedCard<'a> {
    /// Index into `played`, or into `held` when `held` is set.
    pub index: usize,
    pub card: &'a Card,
    pub held: bool,
}

impl<'a> ConditionScope<'a> {
    pub fn with_card(self, index: usize, card: &'a Card, held: bool) -> Self {
        Self {
            card: Some(ScopedCard { index, card, held }),
            ..self
        }
    }

    fn card(&self) -> Option<&'a Card> {
        self.card.map(|scoped| scoped.card)
    }
}

impl Condition {
    pub fn holds(&self, scope: &ConditionScope<'_>) -> bool {
        match self {
            Condition::Always => true,
            Condition::HandContains(kind) => scope.contains.contains(kind),
            Condition::HandIs(kind) => scope.category == *kind,
            Condition::Suit(suit) => scope
                .card()
                .map(|card| card.matches_suit(*suit, scope.smeared))
                .unwrap_or(false),
            Condition::Ranks(ranks) => scope
                .card()
                .map(|card| !card.is_stone() && ranks.contains(&card.rank))
                .unwrap_or(false),
            Condition::Face => scope.card().map(|c| c.is_face()).unwrap_or(false),
            Condition::Even => scope
                .card()
                .map(|c| !c.is_stone() && c.rank.is_even())
                .unwrap_or(false),
            Condition::Odd => scope
                .card()
                .map(|c| !c.is_stone() && c.rank.is_odd())
                .unwrap_or(false),
            Condition::Enhancement(enhancement) => scope
                .card()
                .map(|c| c.enhancement == Some(*enhancement))
                .unwrap_or(false),
            Condition::FirstFace => match scope.card {
                Some(scoped) if !scoped.held && scoped.card.is_face() => scope
                    .scoring
                    .iter()
                    .find(|&&i| scope.played[i].is_face())
                    .map(|&first| first == scoped.index)
                    .unwrap_or(false),
                _ => false,
            },
            Condition::PlayedAtMost(count) => scope.played.len() <= *count,
            Condition::DiscardsLeftAtMost(count) => scope.discards_left <= *count,
            Condition::FinalHand => scope.hands_left <= 1,
            Condition::HeldAllSuits(suits) => {
                !scope.held.is_empty()
                    && scope.held.iter().all(|card| {
                        suits
                            .iter()
                            .any(|suit| card.matches_suit(*suit, scope.smeared))
                    })
            }
            Condition::All(items) => items.iter().all(|item| item.holds(scope)),
            Condition::Any(items) => items.iter().any(|item| item.holds(scope)),
        }
    }
}

fn default_condition() -> Condition {
    Condition::Always
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EffectRule {
    pub trigger: Trigger,
    #[serde(default = "default_condition")]
    pub condition: Condition,
    pub op: Operator,
    /// Probability the rule takes effect when it fires. `None` means always.
    #[serde(default)]
    pub chance: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RetriggerScope {
    Scored,
    Held,
}

/// Extra firings granted to cards matching `condition`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetriggerRule {
    pub scope: RetriggerScope,
    #[serde(default = "default_condition")]
    pub condition: Condition,
    #[serde(default = "default_retrigger_count")]
    pub count: u32,
}

fn default_retrigger_count() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModifierSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rules: HandRules,
    #[serde(default)]
    pub effects: Vec<EffectRule>,
    #[serde(default)]
    pub retriggers: Vec<RetriggerRule>,
    /// Archetypes this modifier signals when acquired.
    #[serde(default)]
    pub archetypes: Vec<Archetype>,
    #[serde(default)]
    pub cost: i64,
}

impl ModifierSpec {
    pub fn is_self_scaling(&self) -> bool {
        self.effects.iter().any(|rule| rule.op.is_scaling())
    }

    pub fn is_economy(&self) -> bool {
        self.effects
            .iter()
            .any(|rule| matches!(rule.op, Operator::AddMoney(_)))
    }
}

/// Static lookup from modifier id to its resolved spec.
#[derive(Debug, Clone, Default)]
pub struct EffectTable {
    specs: HashMap<String, ModifierSpec>,
}

impl EffectTable {
    pub fn new(specs: impl IntoIterator<Item = ModifierSpec>) -> Self {
        Self {
            specs: specs
                .into_iter()
                .map(|spec| (spec.id.clone(), spec))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ModifierSpec> {
        self.specs.get(id)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
