use serde::{Deserialize, Serialize};

pub use jester_core::{
    ArchetypeRules, ArchetypeSignature, BrainConfig, EconomyRule, GameContext, HandRule,
    ModifierSpec, RoutingThresholds, ShopWeights,
};

/// Names of the files making up a configuration directory.
pub const HANDS_FILE: &str = "hands.json";
pub const MODIFIERS_FILE: &str = "modifiers.json";
pub const ARCHETYPES_FILE: &str = "archetypes.json";
pub const SHOP_FILE: &str = "shop.json";
pub const ROUTING_FILE: &str = "routing.json";
pub const ECONOMY_FILE: &str = "economy.json";

/// A game snapshot as handed to the brain, optionally carrying a seed for
/// sampled scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub context: GameContext,
    #[serde(default)]
    pub seed: Option<u64>,
}
