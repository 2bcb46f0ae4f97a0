//! Ordered chips/mult composition for one candidate play.
//!
//! An evaluation first builds a deterministic plan of steps (base, cards in
//! play order, held cards, then modifiers left to right) and then executes it
//! under a chance mask. Chance-gated steps are never sampled here: the
//! guaranteed pass leaves them all out, and the expected score enumerates
//! every outcome when there are few enough of them.

use crate::{
    classify, BossEffect, BrainConfig, Card, ChanceStep, ConditionScope, Edition, EffectTable,
    Enhancement, EvalError, GameContext, HandCategory, HandEvaluation, HandRules, ModifierSlots,
    ModifierSpec, Operator, RetriggerScope, RngState, Scale, Score, ScoreEffect, ScoreTables,
    ScoreTraceStep, Seal, StateDelta, Trigger, ValidationError, XMultStep, MAX_PLAYED,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Above this many chance steps the expected score is estimated from a
/// single probability-scaled pass.
pub const EXACT_CHANCE_LIMIT: usize = 10;

const MULT_CARD_MULT: f64 = 4.0;
const GLASS_XMULT: f64 = 2.0;
const GLASS_BREAK_CHANCE: f64 = 0.25;
const LUCKY_MULT: f64 = 20.0;
const LUCKY_MULT_CHANCE: f64 = 0.2;
const LUCKY_MONEY: f64 = 20.0;
const LUCKY_MONEY_CHANCE: f64 = 1.0 / 15.0;
const STEEL_XMULT: f64 = 1.5;
const GOLD_SEAL_MONEY: f64 = 3.0;
const FOIL_CHIPS: f64 = 50.0;
const HOLO_MULT: f64 = 10.0;
const POLY_XMULT: f64 = 1.5;

#[derive(Debug, Clone, Copy)]
pub struct ScoreRequest<'a> {
    pub played: &'a [Card],
    pub held: &'a [Card],
    pub modifiers: &'a ModifierSlots,
    pub context: &'a GameContext,
}

impl<'a> ScoreRequest<'a> {
    pub fn new(played: &'a [Card], held: &'a [Card], context: &'a GameContext) -> Self {
        Self {
            played,
            held,
            modifiers: &context.modifiers,
            context,
        }
    }

    pub fn with_modifiers(self, modifiers: &'a ModifierSlots) -> Self {
        Self { modifiers, ..self }
    }
}

/// Money and accumulator changes caused by a discard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiscardOutcome {
    pub money: i64,
    pub expected_money: f64,
    pub state_deltas: Vec<StateDelta>,
    pub warnings: Vec<String>,
    pub degraded: bool,
}

/// One seeded draw of every chance step, for display only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrawOutcome {
    pub seed: u64,
    pub chips: i64,
    pub mult: f64,
    pub score: i64,
    pub money: i64,
    pub fired: Vec<String>,
    pub destroyed: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct EffectPipeline {
    tables: ScoreTables,
    effects: EffectTable,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Chips(f64),
    Mult(f64),
    XMult(f64),
    Money(f64),
    Destroy(usize),
    Rule {
        slot: usize,
        op: Operator,
        /// Scale value fixed at plan time; accumulated scales read live state.
        scale: f64,
        card: Option<usize>,
    },
}

#[derive(Debug, Clone)]
struct Step {
    source: String,
    action: Action,
    chance: Option<usize>,
}

#[derive(Debug)]
struct Plan {
    category: HandCategory,
    level: u32,
    matched: Vec<usize>,
    scoring: Vec<usize>,
    base: (f64, f64),
    steps: Vec<Step>,
    chances: Vec<ChanceStep>,
    ids: Vec<String>,
    states: Vec<f64>,
    warnings: Vec<String>,
    degraded: bool,
}

impl Plan {
    fn push(&mut self, source: &str, action: Action) {
        self.steps.push(Step {
            source: source.to_string(),
            action,
            chance: None,
        });
    }

    fn push_chance(&mut self, source: &str, action: Action, probability: Option<f64>) {
        let probability = match probability {
            None => return self.push(source, action),
            Some(p) if p >= 1.0 => return self.push(source, action),
            Some(p) if p <= 0.0 => return,
            Some(p) => p,
        };
        let index = self.chances.len();
        self.chances.push(ChanceStep {
            source: source.to_string(),
            probability,
        });
        self.steps.push(Step {
            source: source.to_string(),
            action,
            chance: Some(index),
        });
    }
}

#[derive(Debug, Default)]
struct Pass {
    chips: f64,
    mult: f64,
    money: f64,
    destroyed: Vec<usize>,
    states: Vec<f64>,
    trace: Vec<ScoreTraceStep>,
    xmult: Vec<XMultStep>,
    fired: Vec<String>,
}

impl Pass {
    fn raw(&self) -> f64 {
        self.chips * self.mult
    }

    fn total(&self) -> i64 {
        self.raw().floor().max(0.0) as i64
    }

    fn score(&self) -> Score {
        Score {
            chips: self.chips.round() as i64,
            mult: self.mult,
        }
    }
}

impl EffectPipeline {
    pub fn new(tables: ScoreTables, effects: EffectTable) -> Self {
        Self { tables, effects }
    }

    pub fn from_config(config: &BrainConfig) -> Self {
        Self::new(
            ScoreTables::from_rules(&config.hands),
            EffectTable::new(config.modifiers.iter().cloned()),
        )
    }

    pub fn effects(&self) -> &EffectTable {
        &self.effects
    }

    /// Classification rules granted by every known modifier in the slots.
    pub fn hand_rules(&self, modifiers: &ModifierSlots) -> HandRules {
        modifiers
            .iter()
            .filter_map(|m| self.effects.get(&m.id))
            .fold(HandRules::default(), |acc, spec| acc.merge(spec.rules))
    }

    /// Scores the cards at `indices` of the context hand, the rest staying held.
    pub fn evaluate_play(
        &self,
        context: &GameContext,
        indices: &[usize],
    ) -> Result<HandEvaluation, EvalError> {
        let (played, held) = context.split_hand(indices)?;
        self.evaluate(&ScoreRequest::new(&played, &held, context))
    }

    pub fn evaluate(&self, request: &ScoreRequest<'_>) -> Result<HandEvaluation, EvalError> {
        let plan = self.plan(request)?;
        let guaranteed = execute(&plan, |_| 0.0, true);
        let score = guaranteed.total();
        let mut warnings = plan.warnings.clone();
        let mut degraded = plan.degraded;
        if guaranteed.raw() < 0.0 {
            warn!(raw = guaranteed.raw(), "negative score clamped to zero");
            warnings.push(format!("negative product {:.2} clamped to 0", guaranteed.raw()));
            degraded = true;
        }

        let count = plan.chances.len();
        let mut approximate = false;
        let (expected_score, expected_money, min_score, max_score) = if count == 0 {
            (score as f64, guaranteed.money, score, score)
        } else if count <= EXACT_CHANCE_LIMIT {
            let mut expected = 0.0;
            let mut money = 0.0;
            let mut lo = i64::MAX;
            let mut hi = i64::MIN;
            for mask in 0u32..(1u32 << count) {
                let fired = |i: usize| mask & (1 << i) != 0;
                let probability: f64 = plan
                    .chances
                    .iter()
                    .enumerate()
                    .map(|(i, c)| if fired(i) { c.probability } else { 1.0 - c.probability })
                    .product();
                let pass = execute(&plan, |i| if fired(i) { 1.0 } else { 0.0 }, false);
                let total = pass.total();
                expected += probability * total as f64;
                money += probability * pass.money;
                lo = lo.min(total);
                hi = hi.max(total);
            }
            (expected, money, lo, hi)
        } else {
            approximate = true;
            let scaled = execute(&plan, |i| plan.chances[i].probability, false);
            let all = execute(&plan, |_| 1.0, false);
            let all_total = all.total();
            (
                scaled.raw().max(0.0),
                scaled.money,
                score.min(all_total),
                score.max(all_total),
            )
        };

        let state_deltas = plan
            .states
            .iter()
            .zip(&guaranteed.states)
            .enumerate()
            .filter(|(_, (before, after))| (*after - *before).abs() > f64::EPSILON)
            .map(|(slot, (before, after))| StateDelta {
                slot,
                id: plan.ids[slot].clone(),
                delta: after - before,
            })
            .collect();

        debug!(
            category = plan.category.id(),
            level = plan.level,
            score,
            expected_score,
            chance_steps = count,
            "hand evaluated"
        );

        Ok(HandEvaluation {
            category: plan.category,
            level: plan.level,
            played: request.played.to_vec(),
            matched: plan.matched.clone(),
            scoring: plan.scoring.clone(),
            chips: guaranteed.chips.round() as i64,
            mult: guaranteed.mult,
            score,
            expected_score,
            min_score,
            max_score,
            approximate,
            xmult_trace: guaranteed.xmult,
            trace: guaranteed.trace,
            chance_steps: plan.chances,
            money: guaranteed.money.round() as i64,
            expected_money,
            destroyed: guaranteed.destroyed,
            state_deltas,
            warnings,
            degraded,
        })
    }

    /// Resolves every chance step with one seeded draw.
    pub fn sample(&self, request: &ScoreRequest<'_>, seed: u64) -> Result<DrawOutcome, EvalError> {
        let plan = self.plan(request)?;
        let mut rng = RngState::from_seed(seed);
        let rolls: Vec<bool> = plan.chances.iter().map(|c| rng.roll(c.probability)).collect();
        let pass = execute(&plan, |i| if rolls[i] { 1.0 } else { 0.0 }, true);
        Ok(DrawOutcome {
            seed,
            chips: pass.chips.round() as i64,
            mult: pass.mult,
            score: pass.total(),
            money: pass.money.round() as i64,
            fired: pass.fired,
            destroyed: pass.destroyed,
        })
    }

    /// Fires the discard triggers of every slotted modifier for the cards at `indices`.
    pub fn evaluate_discard(
        &self,
        context: &GameContext,
        indices: &[usize],
    ) -> Result<DiscardOutcome, EvalError> {
        if indices.is_empty() || indices.len() > MAX_PLAYED {
            return Err(ValidationError::InvalidCardCount(indices.len()).into());
        }
        context.modifiers.check()?;
        let (discarded, held) = context.split_hand(indices)?;
        let rules = self.hand_rules(&context.modifiers);
        let all: Vec<usize> = (0..discarded.len()).collect();
        let scope = ConditionScope {
            category: HandCategory::HighCard,
            contains: &[],
            played: &discarded,
            scoring: &all,
            held: &held,
            discards_left: context.discards_left,
            hands_left: context.hands_left,
            smeared: rules.smeared_suits,
            card: None,
        };

        let mut outcome = DiscardOutcome::default();
        let mut money = 0.0;
        for (slot, modifier) in context.modifiers.iter().enumerate() {
            let Some(spec) = self.effects.get(&modifier.id) else {
                warn!(id = %modifier.id, slot, "unknown modifier skipped");
                outcome
                    .warnings
                    .push(format!("unknown modifier '{}' in slot {slot} skipped", modifier.id));
                outcome.degraded = true;
                continue;
            };
            let mut state = modifier.state;
            for rule in &spec.effects {
                let firings = match rule.trigger {
                    Trigger::OnDiscard => all
                        .iter()
                        .filter(|&&i| {
                            rule.condition
                                .holds(&scope.with_card(i, &discarded[i], false))
                        })
                        .count(),
                    Trigger::OnDiscardBatch => usize::from(rule.condition.holds(&scope)),
                    _ => 0,
                };
                let probability = rule.chance.unwrap_or(1.0).clamp(0.0, 1.0);
                for _ in 0..firings {
                    match rule.op {
                        Operator::AddMoney(amount) => {
                            let value = amount.resolve(scale_for(
                                amount.scale,
                                state,
                                &context.modifiers,
                                context,
                                &held,
                            ));
                            outcome.expected_money += value * probability;
                            if probability >= 1.0 {
                                money += value;
                            }
                        }
                        Operator::StateIncrement(amount) if probability >= 1.0 => {
                            state += amount.resolve(scale_for(
                                amount.scale,
                                state,
                                &context.modifiers,
                                context,
                                &held,
                            ));
                        }
                        _ => {}
                    }
                }
            }
            if (state - modifier.state).abs() > f64::EPSILON {
                outcome.state_deltas.push(StateDelta {
                    slot,
                    id: modifier.id.clone(),
                    delta: state - modifier.state,
                });
            }
        }
        outcome.money = money.round() as i64;
        Ok(outcome)
    }

    fn plan(&self, request: &ScoreRequest<'_>) -> Result<Plan, EvalError> {
        request.modifiers.check()?;
        let context = request.context;

        let mut warnings = Vec::new();
        let mut degraded = false;
        let specs: Vec<Option<&ModifierSpec>> = request
            .modifiers
            .iter()
            .enumerate()
            .map(|(slot, modifier)| {
                let spec = self.effects.get(&modifier.id);
                if spec.is_none() {
                    warn!(id = %modifier.id, slot, "unknown modifier skipped");
                    warnings.push(format!(
                        "unknown modifier '{}' in slot {slot} skipped",
                        modifier.id
                    ));
                    degraded = true;
                }
                spec
            })
            .collect();
        let known: Vec<&ModifierSpec> = specs.iter().flatten().copied().collect();
        let rules = known
            .iter()
            .fold(HandRules::default(), |acc, spec| acc.merge(spec.rules));

        let classification = classify(request.played, rules)?;
        let category = classification.category;
        let level = context.level(category);
        let (mut base_chips, mut base_mult) = self.tables.hand_base_for_level(category, level);
        let boss = context.active_boss();
        if boss == Some(BossEffect::HalveBase) {
            base_chips /= 2;
            base_mult = (base_mult / 2.0).max(1.0);
        }
        let debuffed = |card: &Card| boss.map(|b| b.debuffs(card)).unwrap_or(false);

        let mut plan = Plan {
            category,
            level,
            matched: classification.matched.clone(),
            scoring: classification.scoring.clone(),
            base: (base_chips as f64, base_mult),
            steps: Vec::new(),
            chances: Vec::new(),
            ids: request.modifiers.iter().map(|m| m.id.clone()).collect(),
            states: request.modifiers.iter().map(|m| m.state).collect(),
            warnings,
            degraded,
        };

        let played = request.played;
        let held = request.held;
        let scope = ConditionScope {
            category,
            contains: &classification.contains,
            played,
            scoring: &classification.scoring,
            held,
            discards_left: context.discards_left,
            hands_left: context.hands_left,
            smeared: rules.smeared_suits,
            card: None,
        };

        for &i in &classification.scoring {
            let card = &played[i];
            if debuffed(card) {
                continue;
            }
            let label = card_label(card);
            let firings =
                firing_count(&scope.with_card(i, card, false), RetriggerScope::Scored, &known);
            for firing in 0..firings {
                plan.push(&label, Action::Chips(card.chip_value() as f64));
                match card.enhancement {
                    Some(Enhancement::Mult) => plan.push(&label, Action::Mult(MULT_CARD_MULT)),
                    Some(Enhancement::Glass) => {
                        plan.push(&label, Action::XMult(GLASS_XMULT));
                        if firing == 0 {
                            plan.push_chance(&label, Action::Destroy(i), Some(GLASS_BREAK_CHANCE));
                        }
                    }
                    Some(Enhancement::Lucky) => {
                        plan.push_chance(&label, Action::Mult(LUCKY_MULT), Some(LUCKY_MULT_CHANCE));
                        plan.push_chance(
                            &label,
                            Action::Money(LUCKY_MONEY),
                            Some(LUCKY_MONEY_CHANCE),
                        );
                    }
                    _ => {}
                }
                if let Some(edition) = card.edition {
                    plan.push(&label, edition_action(edition));
                }
                if card.seal == Some(Seal::Gold) {
                    plan.push(&label, Action::Money(GOLD_SEAL_MONEY));
                }
            }
        }

        for (i, card) in held.iter().enumerate() {
            if debuffed(card) || card.enhancement != Some(Enhancement::Steel) {
                continue;
            }
            let label = format!("held {}", card_label(card));
            let firings =
                firing_count(&scope.with_card(i, card, true), RetriggerScope::Held, &known);
            for _ in 0..firings {
                plan.push(&label, Action::XMult(STEEL_XMULT));
            }
        }

        for (slot, (modifier, spec)) in request.modifiers.iter().zip(&specs).enumerate() {
            let Some(spec) = spec else {
                continue;
            };
            let state = modifier.state;
            for rule in &spec.effects {
                let scale = op_scale(&rule.op)
                    .map(|s| scale_for(s, state, request.modifiers, context, held))
                    .unwrap_or(0.0);
                let action = |card: Option<usize>| Action::Rule {
                    slot,
                    op: rule.op,
                    scale,
                    card,
                };
                match rule.trigger {
                    Trigger::OnScored => {
                        for &i in &classification.scoring {
                            let card = &played[i];
                            if debuffed(card) {
                                continue;
                            }
                            let card_scope = scope.with_card(i, card, false);
                            if !rule.condition.holds(&card_scope) {
                                continue;
                            }
                            for _ in 0..firing_count(&card_scope, RetriggerScope::Scored, &known) {
                                plan.push_chance(&spec.name, action(Some(i)), rule.chance);
                            }
                        }
                    }
                    Trigger::OnHeld => {
                        for (i, card) in held.iter().enumerate() {
                            if debuffed(card) {
                                continue;
                            }
                            let card_scope = scope.with_card(i, card, true);
                            if !rule.condition.holds(&card_scope) {
                                continue;
                            }
                            for _ in 0..firing_count(&card_scope, RetriggerScope::Held, &known) {
                                plan.push_chance(&spec.name, action(None), rule.chance);
                            }
                        }
                    }
                    Trigger::OnHand => {
                        if rule.condition.holds(&scope) {
                            plan.push_chance(&spec.name, action(None), rule.chance);
                        }
                    }
                    Trigger::OnDiscard | Trigger::OnDiscardBatch => {}
                }
            }
            if let Some(edition) = modifier.edition {
                plan.push(&spec.name, edition_action(edition));
            }
        }

        Ok(plan)
    }
}

/// How many times a card fires: once, plus a red seal, plus every matching
/// retrigger rule of the slotted modifiers.
pub fn firing_count(
    scope: &ConditionScope<'_>,
    retrigger_scope: RetriggerScope,
    specs: &[&ModifierSpec],
) -> u32 {
    let Some(scoped) = scope.card else {
        return 1;
    };
    let seal = u32::from(scoped.card.seal == Some(Seal::Red));
    let retriggers: u32 = specs
        .iter()
        .flat_map(|spec| spec.retriggers.iter())
        .filter(|rule| rule.scope == retrigger_scope && rule.condition.holds(scope))
        .map(|rule| rule.count)
        .sum();
    1 + seal + retriggers
}

fn execute(plan: &Plan, weight: impl Fn(usize) -> f64, record: bool) -> Pass {
    let mut pass = Pass {
        chips: plan.base.0,
        mult: plan.base.1,
        states: plan.states.clone(),
        ..Pass::default()
    };

    for step in &plan.steps {
        let w = step.chance.map(&weight).unwrap_or(1.0);
        if w <= 0.0 {
            continue;
        }
        let before = pass.score();
        let effect = match step.action {
            Action::Chips(value) => add_chips(&mut pass, value * w),
            Action::Mult(value) => add_mult(&mut pass, value * w),
            Action::XMult(factor) => {
                times_mult(&mut pass, &step.source, 1.0 + w * (factor - 1.0), record)
            }
            Action::Money(value) => add_money(&mut pass, value * w),
            Action::Destroy(index) => destroy(&mut pass, index, w),
            Action::Rule {
                slot,
                op,
                scale,
                card,
            } => {
                let state = pass.states.get(slot).copied().unwrap_or(0.0);
                let value = |amount: crate::Amount| match amount.scale {
                    Scale::Accumulated => amount.resolve(state),
                    _ => amount.resolve(scale),
                };
                match op {
                    Operator::AddChips(amount) => add_chips(&mut pass, value(amount) * w),
                    Operator::AddMult(amount) => add_mult(&mut pass, value(amount) * w),
                    Operator::MultXMult(amount) => {
                        let factor = 1.0 + w * (value(amount) - 1.0);
                        times_mult(&mut pass, &step.source, factor, record)
                    }
                    Operator::AddMoney(amount) => add_money(&mut pass, value(amount) * w),
                    Operator::DestroyCard => match card {
                        Some(index) => destroy(&mut pass, index, w),
                        None => None,
                    },
                    Operator::StateIncrement(amount) => {
                        let delta = value(amount) * w;
                        if let Some(slot_state) = pass.states.get_mut(slot) {
                            *slot_state += delta;
                        }
                        Some(ScoreEffect::State { slot, delta })
                    }
                }
            }
        };
        if record {
            if step.chance.is_some() {
                pass.fired.push(step.source.clone());
            }
            if let Some(effect) = effect {
                pass.trace.push(ScoreTraceStep {
                    source: step.source.clone(),
                    effect,
                    before,
                    after: pass.score(),
                });
            }
        }
    }
    pass
}

fn add_chips(pass: &mut Pass, value: f64) -> Option<ScoreEffect> {
    pass.chips += value;
    Some(ScoreEffect::AddChips(value.round() as i64))
}

fn add_mult(pass: &mut Pass, value: f64) -> Option<ScoreEffect> {
    pass.mult += value;
    Some(ScoreEffect::AddMult(value))
}

fn times_mult(pass: &mut Pass, source: &str, factor: f64, record: bool) -> Option<ScoreEffect> {
    pass.mult *= factor;
    if record {
        pass.xmult.push(XMultStep {
            source: source.to_string(),
            factor,
            mult_after: pass.mult,
        });
    }
    Some(ScoreEffect::MultiplyMult(factor))
}

fn add_money(pass: &mut Pass, value: f64) -> Option<ScoreEffect> {
    pass.money += value;
    Some(ScoreEffect::AddMoney(value.round() as i64))
}

/// Only certain destruction is recorded; a probability-scaled pass skips it.
fn destroy(pass: &mut Pass, index: usize, weight: f64) -> Option<ScoreEffect> {
    if weight < 1.0 || pass.destroyed.contains(&index) {
        return None;
    }
    pass.destroyed.push(index);
    Some(ScoreEffect::Destroy(index))
}

fn edition_action(edition: Edition) -> Action {
    match edition {
        Edition::Foil => Action::Chips(FOIL_CHIPS),
        Edition::Holographic => Action::Mult(HOLO_MULT),
        Edition::Polychrome => Action::XMult(POLY_XMULT),
    }
}

fn op_scale(op: &Operator) -> Option<Scale> {
    match op {
        Operator::AddChips(a)
        | Operator::AddMult(a)
        | Operator::MultXMult(a)
        | Operator::AddMoney(a)
        | Operator::StateIncrement(a) => Some(a.scale),
        Operator::DestroyCard => None,
    }
}

fn scale_for(
    scale: Scale,
    state: f64,
    modifiers: &ModifierSlots,
    context: &GameContext,
    held: &[Card],
) -> f64 {
    match scale {
        Scale::None => 0.0,
        Scale::Accumulated => state,
        Scale::Modifiers => modifiers.len() as f64,
        Scale::EmptySlots => (modifiers.free() + 1) as f64,
        Scale::DeckRemaining => context.deck.len() as f64,
        Scale::DiscardsLeft => context.discards_left as f64,
        Scale::LowestHeldRank => held
            .iter()
            .filter(|card| !card.is_stone())
            .min_by_key(|card| card.rank.value())
            .map(|card| card.rank.chips() as f64)
            .unwrap_or(0.0),
    }
}

fn card_label(card: &Card) -> String {
    if card.is_stone() {
        return "stone card".to_string();
    }
    format!("{:?} of {:?}", card.rank, card.suit)
}
