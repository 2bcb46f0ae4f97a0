use crate::{
    consult, legal_actions, Action, AdvisoryChannel, AdvisoryError, AdvisoryRequest, Decision,
    DecisionKind, DecisionOutcome, RouterConfig, RunSession, WorkerLimit,
};
use jester_core::{
    Archetype, BlindKind, BrainConfig, Card, EconomyRule, EffectPipeline, Enhancement, EvalError,
    GameContext, HandEvaluation, Phase, Rank, Seal, ShopEvaluator, ShopRecommendation,
    ShopReport, ShopWeights, Suit,
};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A rule-path proposal for a strategic decision.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub action: Action,
    pub confidence: f64,
    pub rationale: String,
}

/// Routes each decision point to the exact enumerator or to the rule path,
/// escalating low-confidence strategic calls to the advisory channel.
pub struct DecisionRouter {
    pipeline: EffectPipeline,
    shop: ShopWeights,
    economy: EconomyRule,
    config: RouterConfig,
    channel: Arc<dyn AdvisoryChannel>,
    workers: WorkerLimit,
    session: RunSession,
}

impl DecisionRouter {
    pub fn new(brain: &BrainConfig, channel: Arc<dyn AdvisoryChannel>) -> Self {
        let config = RouterConfig::from_brain(brain);
        let session = RunSession::new(brain.archetypes.clone(), config.log_capacity);
        Self {
            pipeline: EffectPipeline::from_config(brain),
            shop: brain.shop.clone(),
            economy: brain.economy.clone(),
            workers: WorkerLimit::new(config.max_advisory_workers),
            config,
            channel,
            session,
        }
    }

    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.workers = WorkerLimit::new(config.max_advisory_workers);
        self.config = config;
        self
    }

    pub fn pipeline(&self) -> &EffectPipeline {
        &self.pipeline
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn session(&self) -> &RunSession {
        &self.session
    }

    pub fn start_run(&mut self) {
        self.session.start_run();
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }

    /// Decides one action for `context`. Session state changes only after the
    /// decision is final.
    pub fn decide(&mut self, context: &GameContext) -> Decision {
        let legal = legal_actions(context);
        let (decision, failure) = if legal.is_empty() {
            (
                safe_default(context.phase, Action::Pass, "no legal action".to_string()),
                None,
            )
        } else if let Err(err) = context.modifiers.check() {
            (
                safe_default(context.phase, safest(&legal), err.to_string()),
                None,
            )
        } else if context.phase == Phase::HandPlay {
            match self.mechanical(context, &legal) {
                Ok(decision) => (decision, None),
                Err(err) => (
                    safe_default(context.phase, safest(&legal), err.to_string()),
                    None,
                ),
            }
        } else {
            match self.rule_candidate(context, &legal) {
                Ok(candidate) => self.route(context, &legal, candidate),
                Err(err) => (
                    safe_default(context.phase, safest(&legal), err.to_string()),
                    None,
                ),
            }
        };

        self.session
            .commit(context, &decision, self.pipeline.effects(), failure.as_ref());
        info!(
            phase = context.phase.label(),
            action = %decision.action.stable_key(),
            outcome = decision.outcome.label(),
            confidence = decision.confidence,
            "decision made"
        );
        decision
    }

    /// Best play among the legal plays by the mechanical order.
    pub fn best_play(
        &self,
        context: &GameContext,
        legal: &[Action],
    ) -> Result<Option<(Action, HandEvaluation)>, EvalError> {
        let plays: Vec<&Vec<usize>> = legal
            .iter()
            .filter_map(|action| match action {
                Action::Play { indices } => Some(indices),
                _ => None,
            })
            .collect();
        let pipeline = &self.pipeline;
        let scored = plays
            .par_iter()
            .map(|indices| {
                pipeline.evaluate_play(context, indices).map(|evaluation| {
                    (
                        Action::Play {
                            indices: (*indices).clone(),
                        },
                        evaluation,
                    )
                })
            })
            .collect::<Result<Vec<_>, EvalError>>()?;

        let final_hand = context.hands_left == 1;
        let remaining = context.remaining_target();
        Ok(scored
            .into_iter()
            .max_by(|a, b| compare_plays(a, b, final_hand, remaining)))
    }

    fn mechanical(&self, context: &GameContext, legal: &[Action]) -> Result<Decision, EvalError> {
        let Some((play, evaluation)) = self.best_play(context, legal)? else {
            return Ok(safe_default(
                context.phase,
                safest(legal),
                "no playable hand".to_string(),
            ));
        };
        let remaining = context.remaining_target();

        if !evaluation.clears(remaining) && context.hands_left > 1 && context.discards_left > 0 {
            if let Some(indices) = self.discard_choice(context, &play, &evaluation) {
                let outcome = self.pipeline.evaluate_discard(context, &indices)?;
                let action = Action::Discard { indices };
                if legal.contains(&action) {
                    let mut decision =
                        Decision::new(context.phase, DecisionKind::Mechanical, action);
                    decision.rationale = format!(
                        "best play {} falls short of {}; discard for ${}",
                        evaluation.summary(),
                        remaining,
                        outcome.money
                    );
                    decision.state_deltas = outcome.state_deltas;
                    decision.degraded = outcome.degraded || evaluation.degraded;
                    decision.warnings = outcome.warnings;
                    decision.evaluation = Some(evaluation);
                    return Ok(decision);
                }
            }
        }

        let mut decision = Decision::new(context.phase, DecisionKind::Mechanical, play);
        decision.rationale = evaluation.summary();
        decision.state_deltas = evaluation.state_deltas.clone();
        decision.degraded = evaluation.degraded;
        decision.warnings = evaluation.warnings.clone();
        decision.evaluation = Some(evaluation);
        Ok(decision)
    }

    /// Cards outside the best play's matched set that the current build does
    /// not want, lowest chips first.
    fn discard_choice(
        &self,
        context: &GameContext,
        play: &Action,
        evaluation: &HandEvaluation,
    ) -> Option<Vec<usize>> {
        let Action::Play { indices } = play else {
            return None;
        };
        let mut keep = keepers(&context.hand, self.session.tracker().leader());
        for &position in &evaluation.matched {
            if let Some(&index) = indices.get(position) {
                keep[index] = true;
            }
        }
        let mut candidates: Vec<usize> = (0..context.hand.len()).filter(|i| !keep[*i]).collect();
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_by_key(|&i| (context.hand[i].chip_value(), i));
        candidates.truncate(self.config.max_discard.min(jester_core::MAX_PLAYED));
        candidates.sort_unstable();
        Some(candidates)
    }

    fn rule_candidate(
        &self,
        context: &GameContext,
        legal: &[Action],
    ) -> Result<Candidate, EvalError> {
        let evaluator = ShopEvaluator::new(&self.pipeline, &self.shop, &self.economy);
        let tracker = self.session.tracker();
        let routing = &self.config.routing;
        let candidate = match context.phase {
            Phase::Shop => {
                let report = evaluator.evaluate_shop(context, tracker);
                let action = match report.recommendation {
                    ShopRecommendation::Buy { index } => Action::Buy { index },
                    ShopRecommendation::Reroll => Action::Reroll,
                    ShopRecommendation::Skip => Action::LeaveShop,
                };
                Candidate {
                    confidence: self.margin_confidence(&report, context),
                    rationale: report_rationale(&report),
                    action: legal_or(action, legal, Action::LeaveShop),
                }
            }
            Phase::PackOpen => {
                let report = evaluator.evaluate_pack(context, tracker);
                let action = match report.recommendation {
                    ShopRecommendation::Buy { index } => Action::Pick { index },
                    ShopRecommendation::Reroll | ShopRecommendation::Skip => Action::SkipPack,
                };
                Candidate {
                    confidence: self.margin_confidence(&report, context),
                    rationale: report_rationale(&report),
                    action: legal_or(action, legal, Action::SkipPack),
                }
            }
            Phase::BlindSelect => {
                if context.blind == BlindKind::Boss {
                    return Ok(Candidate {
                        action: Action::SelectBlind,
                        confidence: 1.0,
                        rationale: "boss blind cannot be skipped".to_string(),
                    });
                }
                // Without a target readiness is unknown; take the blind and leave
                // the call to the advisor.
                if context.blind_target <= 0 {
                    return Ok(Candidate {
                        action: Action::SelectBlind,
                        confidence: 0.0,
                        rationale: "blind target unknown".to_string(),
                    });
                }
                let strength = evaluator.probe_strength(context, &context.modifiers);
                let threshold = routing.skip_readiness.max(f64::EPSILON);
                let readiness =
                    strength * f64::from(context.hands_left) / context.blind_target as f64;
                let action = if readiness >= threshold {
                    Action::SkipBlind
                } else {
                    Action::SelectBlind
                };
                Candidate {
                    action: legal_or(action, legal, Action::SelectBlind),
                    confidence: ((readiness - threshold).abs() / threshold).min(1.0),
                    rationale: format!(
                        "readiness {readiness:.2} against skip threshold {threshold:.2}"
                    ),
                }
            }
            Phase::BossPrep => {
                let mut boss_context = context.clone();
                boss_context.blind = BlindKind::Boss;
                let current = evaluator.probe_strength(&boss_context, &context.modifiers);
                let mut best: Option<(Action, f64)> = None;
                for action in legal {
                    let Action::MoveModifier { from, to } = action else {
                        continue;
                    };
                    let mut slots = context.modifiers.clone();
                    slots.move_to(*from, *to)?;
                    let strength = evaluator.probe_strength(&boss_context, &slots);
                    if best.as_ref().map_or(true, |(_, value)| strength > *value) {
                        best = Some((action.clone(), strength));
                    }
                }
                let gain = best
                    .as_ref()
                    .map(|(_, strength)| (strength - current) / current.max(1.0))
                    .unwrap_or(0.0);
                let hands = f64::from(context.hands_left.max(1));
                let danger = match boss_context.boss {
                    Some(_) if context.blind_target > 0 => {
                        (context.blind_target as f64 / (current * hands).max(1.0)).clamp(0.0, 1.0)
                    }
                    _ => 0.0,
                };
                let (action, base) = match best {
                    Some((action, _)) if gain > 0.0 => (action, (0.5 + gain).min(1.0)),
                    _ => (Action::Pass, 0.8),
                };
                Candidate {
                    action,
                    confidence: base * (1.0 - 0.5 * danger),
                    rationale: format!(
                        "boss strength {current:.1}, best reorder gain {:.1}%, danger {danger:.2}",
                        gain * 100.0
                    ),
                }
            }
            Phase::HandPlay => Candidate {
                action: safest(legal),
                confidence: 1.0,
                rationale: "hand play is resolved mechanically".to_string(),
            },
        };
        Ok(Candidate {
            confidence: candidate.confidence.clamp(0.0, 1.0),
            ..candidate
        })
    }

    /// Normalized top-two margin, damped while the build is still contested.
    fn margin_confidence(&self, report: &ShopReport, context: &GameContext) -> f64 {
        if report.ranked.is_empty() {
            return 1.0;
        }
        let routing = &self.config.routing;
        let mut confidence = (report.margin / routing.margin_scale).clamp(0.0, 1.0);
        if self.session.tracker().contested(context.ante) {
            confidence *= routing.contested_factor;
        }
        confidence
    }

    fn route(
        &self,
        context: &GameContext,
        legal: &[Action],
        candidate: Candidate,
    ) -> (Decision, Option<AdvisoryError>) {
        let mut decision =
            Decision::new(context.phase, DecisionKind::Strategic, candidate.action.clone());
        decision.confidence = candidate.confidence;
        decision.rationale = candidate.rationale;

        let routing = &self.config.routing;
        if !self.config.advisory_enabled || candidate.confidence >= routing.escalation_confidence {
            return (decision, None);
        }

        let request = AdvisoryRequest {
            phase: context.phase,
            context: context.clone(),
            legal_actions: legal.to_vec(),
            rule_candidate: candidate.action,
            archetype: self.session.tracker().snapshot(),
        };
        let consultation = consult(
            &self.channel,
            &request,
            Duration::from_millis(routing.advisory_timeout_ms),
            routing.advisory_retries.min(1),
            &self.workers,
        );
        decision.escalated = true;
        decision.advisory_attempts = consultation.attempts;
        match consultation.result {
            Ok(response) => {
                decision.action = response.action;
                decision.outcome = DecisionOutcome::Advisory {
                    rationale: response.rationale,
                };
                (decision, None)
            }
            Err(err) => {
                warn!(
                    phase = context.phase.label(),
                    error = %err,
                    attempts = consultation.attempts,
                    "advisory failed, adopting rule candidate"
                );
                decision.outcome = DecisionOutcome::Fallback {
                    error: err.to_string(),
                };
                decision.degraded = true;
                decision.warnings.push(format!("advisory {}", err.label()));
                (decision, Some(err))
            }
        }
    }
}

/// Greater means `a` is the better play: a guaranteed clear on the final hand,
/// then expected score, then guaranteed score, then the smaller stable key.
fn compare_plays(
    a: &(Action, HandEvaluation),
    b: &(Action, HandEvaluation),
    final_hand: bool,
    remaining: i64,
) -> Ordering {
    let clears = |e: &HandEvaluation| final_hand && e.min_score >= remaining;
    clears(&a.1)
        .cmp(&clears(&b.1))
        .then(a.1.expected_score.total_cmp(&b.1.expected_score))
        .then(a.1.score.cmp(&b.1.score))
        .then_with(|| b.0.stable_key().cmp(&a.0.stable_key()))
}

fn safe_default(phase: Phase, action: Action, reason: String) -> Decision {
    warn!(phase = phase.label(), reason = %reason, "safe default");
    let mut decision = Decision::new(
        phase,
        if phase == Phase::HandPlay {
            DecisionKind::Mechanical
        } else {
            DecisionKind::Strategic
        },
        action,
    );
    decision.confidence = 0.0;
    decision.rationale = reason.clone();
    decision.outcome = DecisionOutcome::SafeDefault { reason };
    decision.degraded = true;
    decision
}

/// The first passive action, else the first legal one.
fn safest(legal: &[Action]) -> Action {
    legal
        .iter()
        .find(|action| action.is_passive())
        .or_else(|| legal.first())
        .cloned()
        .unwrap_or(Action::Pass)
}

fn legal_or(action: Action, legal: &[Action], fallback: Action) -> Action {
    if legal.contains(&action) {
        action
    } else {
        fallback
    }
}

fn report_rationale(report: &ShopReport) -> String {
    match report.best() {
        Some(best) => format!(
            "best {} total {:.2} (power {:.2} fit {:.2} economy {:.2} scaling {:.2}), margin {:.2}",
            best.label, best.total, best.power, best.fit, best.economy, best.scaling, report.margin
        ),
        None => "nothing on offer".to_string(),
    }
}

/// Hand positions the build wants to hold on to.
fn keepers(hand: &[Card], archetype: Archetype) -> Vec<bool> {
    let suit = dominant_suit(hand);
    let run = longest_run(hand);
    let mut counts = [0usize; 15];
    for card in hand.iter().filter(|c| !c.is_stone()) {
        counts[usize::from(card.rank.value())] += 1;
    }
    hand.iter()
        .map(|card| {
            let wanted = match archetype {
                Archetype::Flush => card.matches_suit(suit, false),
                Archetype::Pairs | Archetype::FourKind => {
                    !card.is_stone() && counts[usize::from(card.rank.value())] >= 2
                }
                Archetype::Straight => {
                    run.len() >= 3 && !card.is_stone() && run.contains(&card.rank)
                }
                Archetype::FaceCards => card.is_face(),
                Archetype::HighCard => card.rank == Rank::Ace,
                Archetype::Lucky => matches!(
                    card.enhancement,
                    Some(Enhancement::Lucky) | Some(Enhancement::Glass)
                ),
                Archetype::Economy => {
                    card.enhancement == Some(Enhancement::Gold) || card.seal == Some(Seal::Gold)
                }
                Archetype::Scaling | Archetype::Undetermined => false,
            };
            wanted || card.enhancement == Some(Enhancement::Steel)
        })
        .collect()
}

fn dominant_suit(hand: &[Card]) -> Suit {
    let mut best = (Suit::Spades, 0);
    for suit in Suit::ALL {
        let count = hand
            .iter()
            .filter(|card| !card.is_stone() && card.suit == suit)
            .count();
        if count > best.1 {
            best = (suit, count);
        }
    }
    best.0
}

/// Longest run of consecutive distinct ranks in hand.
fn longest_run(hand: &[Card]) -> Vec<Rank> {
    let mut ranks: Vec<Rank> = hand
        .iter()
        .filter(|card| !card.is_stone())
        .map(|card| card.rank)
        .collect();
    ranks.sort();
    ranks.dedup();
    let mut best: Vec<Rank> = Vec::new();
    let mut current: Vec<Rank> = Vec::new();
    for rank in ranks {
        match current.last() {
            Some(last) if rank.value() == last.value() + 1 => current.push(rank),
            _ => current = vec![rank],
        }
        if current.len() > best.len() {
            best = current.clone();
        }
    }
    best
}
