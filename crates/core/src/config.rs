use crate::{Archetype, Enhancement, HandCategory, ModifierSpec};
use serde::{Deserialize, Serialize};

fn default_level_chips() -> i64 {
    10
}

fn default_level_mult() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandRule {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    pub base_chips: i64,
    pub base_mult: f64,
    #[serde(default = "default_level_chips")]
    pub level_chips: i64,
    #[serde(default = "default_level_mult")]
    pub level_mult: f64,
}

/// Signals that push confidence toward one archetype.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchetypeSignature {
    pub archetype: Archetype,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub hands: Vec<HandCategory>,
    #[serde(default)]
    pub enhancements: Vec<Enhancement>,
    /// Face cards acquired count toward this archetype.
    #[serde(default)]
    pub face_cards: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchetypeRules {
    #[serde(default)]
    pub signatures: Vec<ArchetypeSignature>,
    pub modifier_weight: f64,
    pub card_weight: f64,
    pub hand_weight: f64,
    pub planet_weight: f64,
    /// Lead over the runner-up required to lock.
    pub commit_margin: f64,
    /// Earliest ante at which the tracker may lock.
    pub commit_ante: u8,
}

impl Default for ArchetypeRules {
    fn default() -> Self {
        Self {
            signatures: Vec::new(),
            modifier_weight: 2.0,
            card_weight: 0.5,
            hand_weight: 1.0,
            planet_weight: 3.0,
            commit_margin: 4.0,
            commit_ante: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopWeights {
    pub power: f64,
    pub fit_bonus: f64,
    pub off_archetype_penalty: f64,
    /// Bonus for flexible and economy picks while no archetype is locked.
    pub flexible_bonus: f64,
    /// Bonus for archetype-specific picks while no archetype is locked.
    pub specific_bonus: f64,
    pub economy: f64,
    pub interest_penalty: f64,
    pub scaling_bonus: f64,
    pub scaling_knee_ante: u8,
    pub scaling_decay_per_ante: f64,
    /// Offers scoring below this are not worth buying.
    pub reroll_threshold: f64,
    pub planet_value: f64,
    pub tarot_value: f64,
    pub voucher_value: f64,
    pub card_value: f64,
}

impl Default for ShopWeights {
    fn default() -> Self {
        Self {
            power: 4.0,
            fit_bonus: 3.0,
            off_archetype_penalty: 1.0,
            flexible_bonus: 1.0,
            specific_bonus: 0.5,
            economy: 2.0,
            interest_penalty: 0.3,
            scaling_bonus: 1.5,
            scaling_knee_ante: 4,
            scaling_decay_per_ante: 0.4,
            reroll_threshold: 1.5,
            planet_value: 0.6,
            tarot_value: 0.5,
            voucher_value: 0.5,
            card_value: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingThresholds {
    /// Strategic decisions below this confidence go to the advisory channel.
    pub escalation_confidence: f64,
    /// Shop margin that maps to full confidence.
    pub margin_scale: f64,
    /// Confidence multiplier while archetype commitment is still contested.
    pub contested_factor: f64,
    /// Readiness above which a small blind is skipped.
    pub skip_readiness: f64,
    pub advisory_timeout_ms: u64,
    pub advisory_retries: u32,
}

impl Default for RoutingThresholds {
    fn default() -> Self {
        Self {
            escalation_confidence: 0.45,
            margin_scale: 2.0,
            contested_factor: 0.6,
            skip_readiness: 3.0,
            advisory_timeout_ms: 4000,
            advisory_retries: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyRule {
    pub interest_step: i64,
    pub interest_per_step: i64,
    /// Money at which interest stops growing.
    pub interest_cap: i64,
    /// First ante where lost interest counts against a purchase.
    pub interest_from_ante: u8,
}

impl Default for EconomyRule {
    fn default() -> Self {
        Self {
            interest_step: 5,
            interest_per_step: 1,
            interest_cap: 25,
            interest_from_ante: 2,
        }
    }
}

impl EconomyRule {
    pub fn interest(&self, money: i64) -> i64 {
        if self.interest_step <= 0 {
            return 0;
        }
        let capped = money.clamp(0, self.interest_cap);
        (capped / self.interest_step) * self.interest_per_step
    }
}

/// Immutable per-run configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrainConfig {
    #[serde(default)]
    pub hands: Vec<HandRule>,
    #[serde(default)]
    pub modifiers: Vec<ModifierSpec>,
    #[serde(default)]
    pub archetypes: ArchetypeRules,
    #[serde(default)]
    pub shop: ShopWeights,
    #[serde(default)]
    pub routing: RoutingThresholds,
    #[serde(default)]
    pub economy: EconomyRule,
}
