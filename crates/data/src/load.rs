use crate::schema::{
    Snapshot, ARCHETYPES_FILE, ECONOMY_FILE, HANDS_FILE, MODIFIERS_FILE, ROUTING_FILE, SHOP_FILE,
};
use anyhow::{bail, Context};
use jester_core::{
    ArchetypeRules, BrainConfig, Condition, EconomyRule, HandCategory, HandRule, ModifierSpec,
    Operator, RoutingThresholds, ShopWeights,
};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const BUILTIN_HANDS: &[u8] = include_bytes!("../../../assets/hands.json");
const BUILTIN_MODIFIERS: &[u8] = include_bytes!("../../../assets/modifiers.json");
const BUILTIN_ARCHETYPES: &[u8] = include_bytes!("../../../assets/archetypes.json");
const BUILTIN_SHOP: &[u8] = include_bytes!("../../../assets/shop.json");
const BUILTIN_ROUTING: &[u8] = include_bytes!("../../../assets/routing.json");
const BUILTIN_ECONOMY: &[u8] = include_bytes!("../../../assets/economy.json");

/// Loads a configuration directory. Hands and modifiers are required, the
/// rest fall back to defaults when absent.
pub fn load_brain_config(dir: &Path) -> anyhow::Result<BrainConfig> {
    let hands: Vec<HandRule> = load_json(dir.join(HANDS_FILE))?;
    let modifiers: Vec<ModifierSpec> = load_json(dir.join(MODIFIERS_FILE))?;
    let archetypes: ArchetypeRules = load_optional(&dir.join(ARCHETYPES_FILE))?;
    let shop: ShopWeights = load_optional(&dir.join(SHOP_FILE))?;
    let routing: RoutingThresholds = load_optional(&dir.join(ROUTING_FILE))?;
    let economy: EconomyRule = load_optional(&dir.join(ECONOMY_FILE))?;

    let config = BrainConfig {
        hands,
        modifiers,
        archetypes,
        shop,
        routing,
        economy,
    };
    validate_config(&config).with_context(|| format!("validate {}", dir.display()))?;
    info!(
        dir = %dir.display(),
        hands = config.hands.len(),
        modifiers = config.modifiers.len(),
        "config loaded"
    );
    Ok(config)
}

/// The configuration shipped with the crate.
pub fn builtin_config() -> anyhow::Result<BrainConfig> {
    let config = BrainConfig {
        hands: parse_slice(BUILTIN_HANDS, HANDS_FILE)?,
        modifiers: parse_slice(BUILTIN_MODIFIERS, MODIFIERS_FILE)?,
        archetypes: parse_slice(BUILTIN_ARCHETYPES, ARCHETYPES_FILE)?,
        shop: parse_slice(BUILTIN_SHOP, SHOP_FILE)?,
        routing: parse_slice(BUILTIN_ROUTING, ROUTING_FILE)?,
        economy: parse_slice(BUILTIN_ECONOMY, ECONOMY_FILE)?,
    };
    validate_config(&config).context("validate builtin config")?;
    Ok(config)
}

/// Reads a snapshot file. A bare game context is accepted as well as the
/// wrapped form with a seed.
pub fn load_snapshot(path: &Path) -> anyhow::Result<Snapshot> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    let snapshot: Snapshot = if value.get("context").is_some() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|context| Snapshot {
            context,
            seed: None,
        })
    }
    .with_context(|| format!("decode snapshot {}", path.display()))?;
    debug!(path = %path.display(), phase = snapshot.context.phase.label(), "snapshot loaded");
    Ok(snapshot)
}

pub fn validate_config(config: &BrainConfig) -> anyhow::Result<()> {
    let mut seen_hands = HashSet::new();
    for rule in &config.hands {
        let category = HandCategory::from_id(&rule.id)
            .with_context(|| format!("hand rule {}", rule.id))?;
        if !seen_hands.insert(category) {
            bail!("duplicate hand rule {}", rule.id);
        }
        if rule.base_chips < 0 || rule.base_mult < 0.0 {
            bail!("hand rule {} has negative base values", rule.id);
        }
    }

    let mut seen_modifiers = HashSet::new();
    for spec in &config.modifiers {
        if spec.id.trim().is_empty() {
            bail!("modifier id cannot be empty");
        }
        if !seen_modifiers.insert(spec.id.as_str()) {
            bail!("duplicate modifier {}", spec.id);
        }
        for (index, rule) in spec.effects.iter().enumerate() {
            if let Some(chance) = rule.chance {
                if !(0.0..=1.0).contains(&chance) {
                    bail!(
                        "modifier {} effects[{}] chance {} outside [0, 1]",
                        spec.id,
                        index,
                        chance
                    );
                }
            }
            if let Operator::MultXMult(amount) = rule.op {
                if amount.base < 0.0 || amount.per < 0.0 {
                    bail!(
                        "modifier {} effects[{}] has a negative multiplier",
                        spec.id,
                        index
                    );
                }
            }
            validate_condition(&rule.condition)
                .with_context(|| format!("modifier {} effects[{}]", spec.id, index))?;
        }
    }

    for signature in &config.archetypes.signatures {
        for id in &signature.modifiers {
            if !seen_modifiers.contains(id.as_str()) {
                bail!(
                    "archetype {} references unknown modifier {}",
                    signature.archetype.id(),
                    id
                );
            }
        }
    }

    let routing = &config.routing;
    if !(0.0..=1.0).contains(&routing.escalation_confidence) {
        bail!(
            "escalation_confidence {} outside [0, 1]",
            routing.escalation_confidence
        );
    }
    if routing.margin_scale <= 0.0 {
        bail!("margin_scale must be positive");
    }
    if routing.advisory_timeout_ms == 0 {
        bail!("advisory_timeout_ms must be positive");
    }
    if config.economy.interest_step <= 0 {
        bail!("interest_step must be positive");
    }
    Ok(())
}

fn validate_condition(condition: &Condition) -> anyhow::Result<()> {
    match condition {
        Condition::Ranks(ranks) if ranks.is_empty() => bail!("empty rank list"),
        Condition::HeldAllSuits(suits) if suits.is_empty() => bail!("empty suit list"),
        Condition::All(inner) | Condition::Any(inner) => {
            if inner.is_empty() {
                bail!("empty condition group");
            }
            inner.iter().try_for_each(validate_condition)
        }
        _ => Ok(()),
    }
}

fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value = serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(value)
}

fn load_optional<T: DeserializeOwned + Default>(path: &Path) -> anyhow::Result<T> {
    if path.exists() {
        load_json(path)
    } else {
        debug!(path = %path.display(), "optional config missing, using defaults");
        Ok(T::default())
    }
}

fn parse_slice<T: DeserializeOwned>(bytes: &[u8], name: &str) -> anyhow::Result<T> {
    serde_json::from_slice(bytes).with_context(|| format!("parse builtin {name}"))
}
