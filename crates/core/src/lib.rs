//! Deterministic scoring, archetype tracking and shop evaluation. Keep this
//! crate free of IO and platform concerns.

pub mod archetype;
pub mod cards;
pub mod config;
pub mod effects;
pub mod error;
pub mod hand;
pub mod inventory;
pub mod pipeline;
pub mod rng;
pub mod scoring;
pub mod shop;
pub mod state;

pub use archetype::*;
pub use cards::*;
pub use config::*;
pub use effects::*;
pub use error::*;
pub use hand::*;
pub use inventory::*;
pub use pipeline::*;
pub use rng::*;
pub use scoring::*;
pub use shop::*;
pub use state::*;
