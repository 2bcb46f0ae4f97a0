use crate::{Card, Rank, Suit, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAX_PLAYED: usize = 5;

/// Hand categories ordered by classification priority, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HandCategory {
    HighCard,
    Pair,
    TwoPair,
    ThreeKind,
    Straight,
    Flush,
    FullHouse,
    FourKind,
    StraightFlush,
    FiveKind,
    FlushHouse,
    FlushFive,
}

impl HandCategory {
    pub const ALL: [HandCategory; 12] = [
        HandCategory::HighCard,
        HandCategory::Pair,
        HandCategory::TwoPair,
        HandCategory::ThreeKind,
        HandCategory::Straight,
        HandCategory::Flush,
        HandCategory::FullHouse,
        HandCategory::FourKind,
        HandCategory::StraightFlush,
        HandCategory::FiveKind,
        HandCategory::FlushHouse,
        HandCategory::FlushFive,
    ];

    pub fn id(self) -> &'static str {
        match self {
            HandCategory::HighCard => "high_card",
            HandCategory::Pair => "pair",
            HandCategory::TwoPair => "two_pair",
            HandCategory::ThreeKind => "three_kind",
            HandCategory::Straight => "straight",
            HandCategory::Flush => "flush",
            HandCategory::FullHouse => "full_house",
            HandCategory::FourKind => "four_kind",
            HandCategory::StraightFlush => "straight_flush",
            HandCategory::FiveKind => "five_kind",
            HandCategory::FlushHouse => "flush_house",
            HandCategory::FlushFive => "flush_five",
        }
    }

    pub fn from_id(id: &str) -> Result<Self, ValidationError> {
        HandCategory::ALL
            .iter()
            .copied()
            .find(|kind| kind.id() == id)
            .ok_or_else(|| ValidationError::UnknownCategory(id.to_string()))
    }

    pub fn display_name(self) -> &'static str {
        match self {
            HandCategory::HighCard => "High Card",
            HandCategory::Pair => "Pair",
            HandCategory::TwoPair => "Two Pair",
            HandCategory::ThreeKind => "Three of a Kind",
            HandCategory::Straight => "Straight",
            HandCategory::Flush => "Flush",
            HandCategory::FullHouse => "Full House",
            HandCategory::FourKind => "Four of a Kind",
            HandCategory::StraightFlush => "Straight Flush",
            HandCategory::FiveKind => "Five of a Kind",
            HandCategory::FlushHouse => "Flush House",
            HandCategory::FlushFive => "Flush Five",
        }
    }
}

/// Passive classification rules granted by active modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandRules {
    #[serde(default)]
    pub smeared_suits: bool,
    #[serde(default)]
    pub four_fingers: bool,
    #[serde(default)]
    pub shortcut: bool,
    #[serde(default)]
    pub matched_only: bool,
}

impl HandRules {
    pub fn merge(self, other: HandRules) -> HandRules {
        HandRules {
            smeared_suits: self.smeared_suits || other.smeared_suits,
            four_fingers: self.four_fingers || other.four_fingers,
            shortcut: self.shortcut || other.shortcut,
            matched_only: self.matched_only || other.matched_only,
        }
    }

    pub fn run_length(self) -> usize {
        if self.four_fingers {
            4
        } else {
            5
        }
    }

    pub fn max_gap(self) -> u8 {
        if self.shortcut {
            2
        } else {
            1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: HandCategory,
    /// Every category the played cards satisfy, highest first.
    pub contains: Vec<HandCategory>,
    /// Indices into the played cards that form the category.
    pub matched: Vec<usize>,
    /// Indices into the played cards that score, in play order.
    pub scoring: Vec<usize>,
}

impl Classification {
    pub fn contains(&self, category: HandCategory) -> bool {
        self.contains.contains(&category)
    }
}

pub fn classify(cards: &[Card], rules: HandRules) -> Result<Classification, ValidationError> {
    if cards.is_empty() || cards.len() > MAX_PLAYED {
        return Err(ValidationError::InvalidCardCount(cards.len()));
    }

    let ranked: Vec<usize> = (0..cards.len()).filter(|&i| !cards[i].is_stone()).collect();
    let mut groups: BTreeMap<Rank, Vec<usize>> = BTreeMap::new();
    for &idx in &ranked {
        groups.entry(cards[idx].rank).or_default().push(idx);
    }
    // Largest group first, higher rank breaking ties.
    let mut by_size: Vec<(Rank, Vec<usize>)> = groups.into_iter().collect();
    by_size.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(b.0.cmp(&a.0)));
    let top = by_size.first().map(|(_, g)| g.len()).unwrap_or(0);
    let second = by_size.get(1).map(|(_, g)| g.len()).unwrap_or(0);

    let need = rules.run_length();
    let flush = find_flush(cards, &ranked, need, rules.smeared_suits);
    let straight = find_straight(cards, &ranked, need, rules.max_gap());
    let straight_flush = Suit::ALL.iter().find_map(|suit| {
        let suited: Vec<usize> = ranked
            .iter()
            .copied()
            .filter(|&i| cards[i].matches_suit(*suit, rules.smeared_suits))
            .collect();
        find_straight(cards, &suited, need, rules.max_gap())
    });
    let full_house = top >= 3 && second >= 2;

    let mut contains = vec![HandCategory::HighCard];
    if top >= 2 {
        contains.push(HandCategory::Pair);
    }
    if top >= 2 && second >= 2 {
        contains.push(HandCategory::TwoPair);
    }
    if top >= 3 {
        contains.push(HandCategory::ThreeKind);
    }
    if straight.is_some() {
        contains.push(HandCategory::Straight);
    }
    if flush.is_some() {
        contains.push(HandCategory::Flush);
    }
    if full_house {
        contains.push(HandCategory::FullHouse);
    }
    if top >= 4 {
        contains.push(HandCategory::FourKind);
    }
    if straight_flush.is_some() {
        contains.push(HandCategory::StraightFlush);
    }
    if top >= 5 {
        contains.push(HandCategory::FiveKind);
    }
    if full_house && flush.is_some() {
        contains.push(HandCategory::FlushHouse);
    }
    if top >= 5 && flush.is_some() {
        contains.push(HandCategory::FlushFive);
    }
    contains.sort_by(|a, b| b.cmp(a));
    let category = contains[0];

    let groups_of = |min: usize, take: usize| -> Vec<usize> {
        by_size
            .iter()
            .filter(|(_, g)| g.len() >= min)
            .take(take)
            .flat_map(|(_, g)| g.iter().copied())
            .collect()
    };
    let mut matched: Vec<usize> = match category {
        HandCategory::HighCard => highest_card(cards, &ranked).into_iter().collect(),
        HandCategory::Pair
        | HandCategory::ThreeKind
        | HandCategory::FourKind
        | HandCategory::FiveKind => groups_of(2, 1),
        HandCategory::TwoPair | HandCategory::FullHouse => groups_of(2, 2),
        HandCategory::Flush | HandCategory::FlushHouse | HandCategory::FlushFive => {
            flush.clone().unwrap_or_default()
        }
        HandCategory::Straight => straight.clone().unwrap_or_default(),
        HandCategory::StraightFlush => straight_flush.clone().unwrap_or_default(),
    };
    matched.sort_unstable();
    matched.dedup();

    let scoring = if rules.matched_only {
        let mut scoring: Vec<usize> = matched.clone();
        scoring.extend((0..cards.len()).filter(|&i| cards[i].is_stone()));
        scoring.sort_unstable();
        scoring.dedup();
        scoring
    } else {
        (0..cards.len()).collect()
    };

    Ok(Classification {
        category,
        contains,
        matched,
        scoring,
    })
}

fn find_flush(cards: &[Card], ranked: &[usize], need: usize, smeared: bool) -> Option<Vec<usize>> {
    Suit::ALL.iter().find_map(|suit| {
        let members: Vec<usize> = ranked
            .iter()
            .copied()
            .filter(|&i| cards[i].matches_suit(*suit, smeared))
            .collect();
        (members.len() >= need).then_some(members)
    })
}

/// Longest chain of distinct rank values whose steps never exceed `max_gap`,
/// trying the ace both high and low. Returns the indices holding chain ranks.
fn find_straight(cards: &[Card], pool: &[usize], need: usize, max_gap: u8) -> Option<Vec<usize>> {
    let mut values: Vec<u8> = pool.iter().map(|&i| cards[i].rank.value()).collect();
    if values.contains(&14) {
        values.push(1);
    }
    values.sort_unstable();
    values.dedup();
    if values.len() < need {
        return None;
    }

    let mut best: Option<(usize, usize)> = None;
    let mut start = 0;
    for end in 0..values.len() {
        if end > start && values[end] - values[end - 1] > max_gap {
            start = end;
        }
        let len = end - start + 1;
        if len >= need && best.map(|(s, e)| len >= e - s + 1).unwrap_or(true) {
            best = Some((start, end));
        }
    }

    let (s, e) = best?;
    let chain = &values[s..=e];
    let members = pool
        .iter()
        .copied()
        .filter(|&i| {
            let v = cards[i].rank.value();
            chain.contains(&v) || (v == 14 && chain.contains(&1))
        })
        .collect();
    Some(members)
}

fn highest_card(cards: &[Card], ranked: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, u8)> = None;
    for &idx in ranked {
        let value = cards[idx].rank.value();
        if best.map(|(_, v)| value > v).unwrap_or(true) {
            best = Some((idx, value));
        }
    }
    best.map(|(idx, _)| idx)
}
