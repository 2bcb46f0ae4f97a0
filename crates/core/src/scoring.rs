use crate::{Card, HandCategory, HandRule};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Score {
    pub chips: i64,
    pub mult: f64,
}

impl Score {
    pub fn total_raw(&self) -> f64 {
        self.chips as f64 * self.mult
    }

    /// Floored, never negative.
    pub fn total(&self) -> i64 {
        self.total_raw().floor().max(0.0) as i64
    }
}

/// One applied step as it appears in a trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ScoreEffect {
    AddChips(i64),
    AddMult(f64),
    MultiplyMult(f64),
    AddMoney(i64),
    Destroy(usize),
    State { slot: usize, delta: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreTraceStep {
    pub source: String,
    pub effect: ScoreEffect,
    pub before: Score,
    pub after: Score,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct XMultStep {
    pub source: String,
    pub factor: f64,
    pub mult_after: f64,
}

/// A chance-gated step and its trigger probability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChanceStep {
    pub source: String,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateDelta {
    pub slot: usize,
    pub id: String,
    pub delta: f64,
}

/// Result of scoring one candidate play. Built once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandEvaluation {
    pub category: HandCategory,
    pub level: u32,
    pub played: Vec<Card>,
    pub matched: Vec<usize>,
    pub scoring: Vec<usize>,
    pub chips: i64,
    pub mult: f64,
    /// Guaranteed score: every chance-gated step left out.
    pub score: i64,
    pub expected_score: f64,
    pub min_score: i64,
    pub max_score: i64,
    /// Expected values came from a probability-scaled pass instead of full enumeration.
    #[serde(default)]
    pub approximate: bool,
    pub xmult_trace: Vec<XMultStep>,
    pub trace: Vec<ScoreTraceStep>,
    pub chance_steps: Vec<ChanceStep>,
    pub money: i64,
    pub expected_money: f64,
    /// Played-card indices destroyed without any chance involved.
    pub destroyed: Vec<usize>,
    pub state_deltas: Vec<StateDelta>,
    pub warnings: Vec<String>,
    pub degraded: bool,
}

impl HandEvaluation {
    pub fn clears(&self, remaining: i64) -> bool {
        self.score >= remaining
    }

    pub fn summary(&self) -> String {
        format!(
            "{} L{}: {} x {:.2} = {} (expected {:.1}, range {}..{})",
            self.category.display_name(),
            self.level,
            self.chips,
            self.mult,
            self.score,
            self.expected_score,
            self.min_score,
            self.max_score
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScoreTables {
    hand_rules: HashMap<String, (i64, f64)>,
    hand_level_rules: HashMap<String, (i64, f64)>,
}

impl ScoreTables {
    pub fn from_rules(rules: &[HandRule]) -> Self {
        let mut hand_rules = HashMap::new();
        let mut hand_level_rules = HashMap::new();
        for hand in rules {
            hand_rules.insert(hand.id.clone(), (hand.base_chips, hand.base_mult));
            hand_level_rules.insert(hand.id.clone(), (hand.level_chips, hand.level_mult));
        }
        Self {
            hand_rules,
            hand_level_rules,
        }
    }

    pub fn hand_base(&self, kind: HandCategory) -> (i64, f64) {
        self.hand_rules
            .get(kind.id())
            .copied()
            .unwrap_or_else(|| default_hand_base(kind))
    }

    pub fn hand_base_for_level(&self, kind: HandCategory, level: u32) -> (i64, f64) {
        let (base_chips, base_mult) = self.hand_base(kind);
        let (level_chips, level_mult) = self
            .hand_level_rules
            .get(kind.id())
            .copied()
            .unwrap_or((10, 1.0));
        if level <= 1 {
            return (base_chips, base_mult);
        }
        let extra = (level - 1) as i64;
        let chips = base_chips.saturating_add(level_chips.saturating_mul(extra));
        let mult = base_mult + level_mult * extra as f64;
        (chips, mult)
    }
}

pub fn default_hand_base(kind: HandCategory) -> (i64, f64) {
    match kind {
        HandCategory::HighCard => (5, 1.0),
        HandCategory::Pair => (10, 2.0),
        HandCategory::TwoPair => (20, 2.0),
        HandCategory::ThreeKind => (30, 3.0),
        HandCategory::Straight => (30, 4.0),
        HandCategory::Flush => (35, 4.0),
        HandCategory::FullHouse => (40, 4.0),
        HandCategory::FourKind => (60, 7.0),
        HandCategory::StraightFlush => (100, 8.0),
        HandCategory::FiveKind => (120, 12.0),
        HandCategory::FlushHouse => (140, 14.0),
        HandCategory::FlushFive => (160, 16.0),
    }
}
