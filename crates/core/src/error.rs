use thiserror::Error;

/// Malformed input, rejected before any scoring happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid card count: {0} (expected 1..=5)")]
    InvalidCardCount(usize),
    #[error("unknown hand category: {0}")]
    UnknownCategory(String),
    #[error("card index {index} out of range for hand of {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("duplicate card index {0}")]
    DuplicateIndex(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("modifier slots overflow: {len} modifiers for capacity {capacity}")]
    SlotOverflow { len: usize, capacity: usize },
    #[error("modifier slot {slot} out of range for {len} modifiers")]
    SlotOutOfRange { slot: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}
