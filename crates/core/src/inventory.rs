use crate::{Edition, InvariantViolation, StateDelta};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODIFIER_SLOTS: usize = 5;

/// A modifier occupying a slot. Its accumulator only changes through
/// `ModifierSlots::commit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Modifier {
    pub id: String,
    #[serde(default)]
    pub edition: Option<Edition>,
    #[serde(default)]
    pub state: f64,
}

impl Modifier {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            edition: None,
            state: 0.0,
        }
    }

    pub fn with_edition(mut self, edition: Edition) -> Self {
        self.edition = Some(edition);
        self
    }

    pub fn with_state(mut self, state: f64) -> Self {
        self.state = state;
        self
    }
}

/// Fixed-capacity, ordered modifier slots. Order is scoring-significant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModifierSlots {
    pub capacity: usize,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
}

impl Default for ModifierSlots {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MODIFIER_SLOTS)
    }
}

impl ModifierSlots {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            modifiers: Vec::new(),
        }
    }

    pub fn from_modifiers(
        capacity: usize,
        modifiers: Vec<Modifier>,
    ) -> Result<Self, InvariantViolation> {
        let slots = Self {
            capacity,
            modifiers,
        };
        slots.check()?;
        Ok(slots)
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    pub fn free(&self) -> usize {
        self.capacity.saturating_sub(self.modifiers.len())
    }

    pub fn is_full(&self) -> bool {
        self.free() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Modifier> {
        self.modifiers.iter()
    }

    /// Snapshots arrive from outside, so capacity is re-checked before use.
    pub fn check(&self) -> Result<(), InvariantViolation> {
        if self.modifiers.len() > self.capacity {
            return Err(InvariantViolation::SlotOverflow {
                len: self.modifiers.len(),
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    pub fn push(&mut self, modifier: Modifier) -> Result<(), InvariantViolation> {
        if self.is_full() {
            return Err(InvariantViolation::SlotOverflow {
                len: self.modifiers.len() + 1,
                capacity: self.capacity,
            });
        }
        self.modifiers.push(modifier);
        Ok(())
    }

    pub fn remove(&mut self, slot: usize) -> Result<Modifier, InvariantViolation> {
        if slot >= self.modifiers.len() {
            return Err(InvariantViolation::SlotOutOfRange {
                slot,
                len: self.modifiers.len(),
            });
        }
        Ok(self.modifiers.remove(slot))
    }

    /// Moves the modifier at `from` so it ends up at position `to`.
    pub fn move_to(&mut self, from: usize, to: usize) -> Result<(), InvariantViolation> {
        let len = self.modifiers.len();
        if from >= len || to >= len {
            return Err(InvariantViolation::SlotOutOfRange {
                slot: from.max(to),
                len,
            });
        }
        let modifier = self.modifiers.remove(from);
        self.modifiers.insert(to, modifier);
        Ok(())
    }

    /// Applies accumulator deltas reported by an evaluation.
    pub fn commit(&mut self, deltas: &[StateDelta]) {
        for delta in deltas {
            if let Some(modifier) = self.modifiers.get_mut(delta.slot) {
                if modifier.id == delta.id {
                    modifier.state += delta.delta;
                }
            }
        }
    }
}
