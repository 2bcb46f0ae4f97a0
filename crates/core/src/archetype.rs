use crate::{ArchetypeRules, Card, HandCategory, ModifierSpec};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Flush,
    Pairs,
    Straight,
    FourKind,
    HighCard,
    FaceCards,
    Lucky,
    Scaling,
    Economy,
    Undetermined,
}

impl Archetype {
    /// Every archetype a build can commit to.
    pub const BUILDS: [Archetype; 9] = [
        Archetype::Flush,
        Archetype::Pairs,
        Archetype::Straight,
        Archetype::FourKind,
        Archetype::HighCard,
        Archetype::FaceCards,
        Archetype::Lucky,
        Archetype::Scaling,
        Archetype::Economy,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Archetype::Flush => "flush",
            Archetype::Pairs => "pairs",
            Archetype::Straight => "straight",
            Archetype::FourKind => "four_kind",
            Archetype::HighCard => "high_card",
            Archetype::FaceCards => "face_cards",
            Archetype::Lucky => "lucky",
            Archetype::Scaling => "scaling",
            Archetype::Economy => "economy",
            Archetype::Undetermined => "undetermined",
        }
    }

    fn index(self) -> usize {
        Archetype::BUILDS
            .iter()
            .position(|a| *a == self)
            .unwrap_or(Archetype::BUILDS.len())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchetypeSnapshot {
    pub current: Archetype,
    pub leader: Archetype,
    pub locked_at: Option<u8>,
    pub confidence: Vec<(Archetype, f64)>,
}

/// Confidence-weighted belief over the build being pursued this run.
#[derive(Debug, Clone)]
pub struct ArchetypeTracker {
    rules: ArchetypeRules,
    confidence: [f64; 9],
    locked: Option<(Archetype, u8)>,
}

impl ArchetypeTracker {
    pub fn new(rules: ArchetypeRules) -> Self {
        Self {
            rules,
            confidence: [0.0; 9],
            locked: None,
        }
    }

    pub fn reset(&mut self) {
        self.confidence = [0.0; 9];
        self.locked = None;
    }

    /// Archetypes a modifier signals: its own tags plus any signature listing it.
    pub fn modifier_archetypes(&self, spec: &ModifierSpec) -> Vec<Archetype> {
        let mut found: Vec<Archetype> = spec.archetypes.clone();
        for signature in &self.rules.signatures {
            if signature.modifiers.iter().any(|id| *id == spec.id) {
                found.push(signature.archetype);
            }
        }
        found.retain(|a| *a != Archetype::Undetermined);
        found.sort();
        found.dedup();
        found
    }

    pub fn hand_archetypes(&self, category: HandCategory) -> Vec<Archetype> {
        self.rules
            .signatures
            .iter()
            .filter(|s| s.hands.contains(&category))
            .map(|s| s.archetype)
            .collect()
    }

    pub fn card_archetypes(&self, card: &Card) -> Vec<Archetype> {
        self.rules
            .signatures
            .iter()
            .filter(|s| {
                card.enhancement
                    .map(|e| s.enhancements.contains(&e))
                    .unwrap_or(false)
                    || (s.face_cards && card.is_face())
            })
            .map(|s| s.archetype)
            .collect()
    }

    pub fn observe_modifier(&mut self, spec: &ModifierSpec) {
        let weight = self.rules.modifier_weight;
        for archetype in self.modifier_archetypes(spec) {
            self.bump(archetype, weight);
        }
    }

    pub fn observe_card(&mut self, card: &Card) {
        let weight = self.rules.card_weight;
        for archetype in self.card_archetypes(card) {
            self.bump(archetype, weight);
        }
    }

    pub fn observe_hand(&mut self, category: HandCategory) {
        let weight = self.rules.hand_weight;
        for archetype in self.hand_archetypes(category) {
            self.bump(archetype, weight);
        }
    }

    pub fn observe_planet(&mut self, category: HandCategory) {
        let weight = self.rules.planet_weight;
        for archetype in self.hand_archetypes(category) {
            self.bump(archetype, weight);
        }
    }

    fn bump(&mut self, archetype: Archetype, weight: f64) {
        if let Some(slot) = self.confidence.get_mut(archetype.index()) {
            *slot += weight;
        }
    }

    pub fn confidence(&self, archetype: Archetype) -> f64 {
        self.confidence.get(archetype.index()).copied().unwrap_or(0.0)
    }

    /// Best and runner-up confidence. Ties go to the earlier archetype.
    fn ranked(&self) -> (Archetype, f64, f64) {
        let mut best = (Archetype::Undetermined, 0.0);
        let mut second = 0.0;
        for archetype in Archetype::BUILDS {
            let value = self.confidence(archetype);
            if value > best.1 {
                second = best.1;
                best = (archetype, value);
            } else if value > second {
                second = value;
            }
        }
        (best.0, best.1, second)
    }

    /// Best guess so far, locked or not.
    pub fn leader(&self) -> Archetype {
        match self.locked {
            Some((archetype, _)) => archetype,
            None => self.ranked().0,
        }
    }

    pub fn current(&self) -> Archetype {
        self.locked
            .map(|(archetype, _)| archetype)
            .unwrap_or(Archetype::Undetermined)
    }

    /// Past the commit ante with no clear leader yet.
    pub fn contested(&self, ante: u8) -> bool {
        self.locked.is_none() && ante > self.rules.commit_ante
    }

    /// Locks onto the leader once it is far enough ahead and the ante allows it.
    pub fn update_lock(&mut self, ante: u8) -> Option<Archetype> {
        if let Some((archetype, _)) = self.locked {
            return Some(archetype);
        }
        let (leader, best, second) = self.ranked();
        if leader == Archetype::Undetermined || ante <= self.rules.commit_ante {
            return None;
        }
        if best - second > self.rules.commit_margin {
            info!(archetype = leader.id(), ante, best, second, "archetype locked");
            self.locked = Some((leader, ante));
            return Some(leader);
        }
        None
    }

    pub fn snapshot(&self) -> ArchetypeSnapshot {
        ArchetypeSnapshot {
            current: self.current(),
            leader: self.leader(),
            locked_at: self.locked.map(|(_, ante)| ante),
            confidence: Archetype::BUILDS
                .iter()
                .map(|a| (*a, self.confidence(*a)))
                .filter(|(_, v)| *v > 0.0)
                .collect(),
        }
    }
}
