use crate::{Action, AdvisoryError, Decision, DecisionKind, DecisionOutcome};
use jester_core::{ArchetypeRules, ArchetypeTracker, EffectTable, GameContext, OfferKind};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouterStats {
    pub decisions: u32,
    pub mechanical: u32,
    pub strategic: u32,
    pub rule: u32,
    pub advisory: u32,
    pub fallback: u32,
    pub safe_default: u32,
    pub escalations: u32,
    pub advisory_attempts: u32,
    pub timeouts: u32,
    pub transport_errors: u32,
    pub schema_errors: u32,
    pub illegal_actions: u32,
}

impl RouterStats {
    /// Share of escalations that ended in a fallback.
    pub fn fallback_rate(&self) -> f64 {
        if self.escalations == 0 {
            return 0.0;
        }
        f64::from(self.fallback) / f64::from(self.escalations)
    }

    fn record(&mut self, decision: &Decision, failure: Option<&AdvisoryError>) {
        self.decisions += 1;
        match decision.kind {
            DecisionKind::Mechanical => self.mechanical += 1,
            DecisionKind::Strategic => self.strategic += 1,
        }
        match decision.outcome {
            DecisionOutcome::Rule => self.rule += 1,
            DecisionOutcome::Advisory { .. } => self.advisory += 1,
            DecisionOutcome::Fallback { .. } => self.fallback += 1,
            DecisionOutcome::SafeDefault { .. } => self.safe_default += 1,
        }
        if decision.escalated {
            self.escalations += 1;
        }
        self.advisory_attempts += decision.advisory_attempts;
        match failure {
            Some(AdvisoryError::Timeout) => self.timeouts += 1,
            Some(AdvisoryError::Transport(_)) => self.transport_errors += 1,
            Some(AdvisoryError::Schema(_)) => self.schema_errors += 1,
            Some(AdvisoryError::IllegalAction(_)) => self.illegal_actions += 1,
            None => {}
        }
    }
}

/// Per-run state owned by the router: archetype belief, counters and the
/// decision log.
#[derive(Debug, Clone)]
pub struct RunSession {
    tracker: ArchetypeTracker,
    stats: RouterStats,
    log: VecDeque<Decision>,
    capacity: usize,
    runs: u32,
}

impl RunSession {
    pub fn new(rules: ArchetypeRules, capacity: usize) -> Self {
        Self {
            tracker: ArchetypeTracker::new(rules),
            stats: RouterStats::default(),
            log: VecDeque::new(),
            capacity,
            runs: 0,
        }
    }

    /// Clears per-run state for a fresh run.
    pub fn start_run(&mut self) {
        self.tracker.reset();
        self.stats = RouterStats::default();
        self.log.clear();
        self.runs += 1;
    }

    pub fn reset(&mut self) {
        self.start_run();
        self.runs = 0;
    }

    pub fn tracker(&self) -> &ArchetypeTracker {
        &self.tracker
    }

    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }

    pub fn runs(&self) -> u32 {
        self.runs
    }

    pub fn decisions(&self) -> impl Iterator<Item = &Decision> {
        self.log.iter()
    }

    /// Applies everything a finalized decision implies for the run.
    pub(crate) fn commit(
        &mut self,
        context: &GameContext,
        decision: &Decision,
        effects: &EffectTable,
        failure: Option<&AdvisoryError>,
    ) {
        let acquired = match &decision.action {
            Action::Buy { index } => context
                .shop
                .as_ref()
                .and_then(|shop| shop.offers.get(*index))
                .map(|offer| &offer.kind),
            Action::Pick { index } => context
                .pack
                .as_ref()
                .and_then(|pack| pack.options.get(*index))
                .map(|offer| &offer.kind),
            _ => None,
        };
        match acquired {
            Some(OfferKind::Modifier { id, .. }) => {
                if let Some(spec) = effects.get(id) {
                    self.tracker.observe_modifier(spec);
                }
            }
            Some(OfferKind::Planet(category)) => self.tracker.observe_planet(*category),
            Some(OfferKind::Card(card)) => self.tracker.observe_card(card),
            Some(OfferKind::Tarot(_)) | Some(OfferKind::Voucher(_)) | None => {}
        }
        if let (Action::Play { .. }, Some(evaluation)) = (&decision.action, &decision.evaluation) {
            self.tracker.observe_hand(evaluation.category);
        }
        self.tracker.update_lock(context.ante);

        self.stats.record(decision, failure);
        if self.capacity > 0 {
            while self.log.len() >= self.capacity {
                self.log.pop_front();
            }
            self.log.push_back(decision.clone());
        }
        debug!(
            decisions = self.stats.decisions,
            archetype = self.tracker.current().id(),
            "session committed"
        );
    }
}
