use crate::{
    Archetype, ArchetypeTracker, Card, EconomyRule, EffectPipeline, GameContext, HandCategory,
    Modifier, ModifierSlots, Offer, OfferKind, Rank, ScoreRequest, ShopWeights, Suit,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfferScore {
    pub index: usize,
    pub label: String,
    pub cost: i64,
    pub power: f64,
    pub fit: f64,
    pub economy: f64,
    pub scaling: f64,
    pub total: f64,
    pub affordable: bool,
    /// Affordable and there is room for it.
    pub purchasable: bool,
    pub archetypes: Vec<Archetype>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ShopRecommendation {
    Buy { index: usize },
    Reroll,
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShopReport {
    pub ranked: Vec<OfferScore>,
    pub recommendation: ShopRecommendation,
    /// Gap between the two best totals.
    pub margin: f64,
}

impl ShopReport {
    pub fn best(&self) -> Option<&OfferScore> {
        self.ranked.first()
    }
}

pub struct ShopEvaluator<'a> {
    pipeline: &'a EffectPipeline,
    weights: &'a ShopWeights,
    economy: &'a EconomyRule,
}

impl<'a> ShopEvaluator<'a> {
    pub fn new(
        pipeline: &'a EffectPipeline,
        weights: &'a ShopWeights,
        economy: &'a EconomyRule,
    ) -> Self {
        Self {
            pipeline,
            weights,
            economy,
        }
    }

    pub fn evaluate_shop(&self, context: &GameContext, tracker: &ArchetypeTracker) -> ShopReport {
        match &context.shop {
            Some(shop) => self.evaluate(context, &shop.offers, tracker, Some(shop.reroll_cost)),
            None => self.evaluate(context, &[], tracker, None),
        }
    }

    /// Pack options are free and cannot be rerolled.
    pub fn evaluate_pack(&self, context: &GameContext, tracker: &ArchetypeTracker) -> ShopReport {
        let options: Vec<Offer> = context
            .pack
            .as_ref()
            .map(|pack| {
                pack.options
                    .iter()
                    .map(|o| Offer {
                        kind: o.kind.clone(),
                        cost: 0,
                    })
                    .collect()
            })
            .unwrap_or_default();
        self.evaluate(context, &options, tracker, None)
    }

    pub fn evaluate(
        &self,
        context: &GameContext,
        offers: &[Offer],
        tracker: &ArchetypeTracker,
        reroll_cost: Option<i64>,
    ) -> ShopReport {
        let mut ranked: Vec<OfferScore> = offers
            .iter()
            .enumerate()
            .map(|(index, offer)| self.score_offer(context, index, offer, tracker))
            .collect();
        ranked.sort_by(|a, b| b.total.total_cmp(&a.total).then(a.index.cmp(&b.index)));

        let margin = match ranked.as_slice() {
            [] => 0.0,
            [only] => only.total,
            [first, second, ..] => first.total - second.total,
        };
        let recommendation = match ranked.iter().find(|o| o.purchasable) {
            Some(best) if best.total >= self.weights.reroll_threshold => {
                ShopRecommendation::Buy { index: best.index }
            }
            _ => match reroll_cost {
                Some(cost) if context.money >= cost => ShopRecommendation::Reroll,
                _ => ShopRecommendation::Skip,
            },
        };
        debug!(
            offers = ranked.len(),
            margin,
            recommendation = ?recommendation,
            "offers ranked"
        );
        ShopReport {
            ranked,
            recommendation,
            margin,
        }
    }

    pub fn score_offer(
        &self,
        context: &GameContext,
        index: usize,
        offer: &Offer,
        tracker: &ArchetypeTracker,
    ) -> OfferScore {
        let w = self.weights;
        let spec = match &offer.kind {
            OfferKind::Modifier { id, .. } => self.pipeline.effects().get(id),
            _ => None,
        };
        let archetypes = match &offer.kind {
            OfferKind::Modifier { .. } => spec
                .map(|s| tracker.modifier_archetypes(s))
                .unwrap_or_default(),
            OfferKind::Planet(category) => tracker.hand_archetypes(*category),
            OfferKind::Card(card) => tracker.card_archetypes(card),
            OfferKind::Tarot(_) | OfferKind::Voucher(_) => Vec::new(),
        };
        let is_economy = spec.map(|s| s.is_economy()).unwrap_or(false)
            || archetypes.contains(&Archetype::Economy);

        let power = w.power * self.power_gain(context, &offer.kind);

        let fit = match tracker.current() {
            Archetype::Undetermined => {
                if archetypes.is_empty() || is_economy {
                    w.flexible_bonus
                } else {
                    w.specific_bonus
                }
            }
            locked if archetypes.contains(&locked) => w.fit_bonus,
            _ if archetypes.is_empty() => 0.0,
            _ => -w.off_archetype_penalty,
        };

        let need = if self.economy.interest_cap > 0 {
            ((self.economy.interest_cap - context.money).max(0) as f64)
                / self.economy.interest_cap as f64
        } else {
            0.0
        };
        let mut economy = if is_economy { w.economy * need } else { 0.0 };
        if context.ante >= self.economy.interest_from_ante && offer.cost > 0 {
            let lost = self.economy.interest(context.money)
                - self.economy.interest(context.money - offer.cost);
            economy -= w.interest_penalty * lost.max(0) as f64;
        }

        let scaling = if spec.map(|s| s.is_self_scaling()).unwrap_or(false) {
            let past_knee = context.ante.saturating_sub(w.scaling_knee_ante) as f64;
            w.scaling_bonus * (1.0 - w.scaling_decay_per_ante * past_knee).max(0.0)
        } else {
            0.0
        };

        let affordable = offer.cost <= context.money;
        let room = context.has_room(&offer.kind);

        OfferScore {
            index,
            label: offer.kind.label(),
            cost: offer.cost,
            power,
            fit,
            economy,
            scaling,
            total: power + fit + economy + scaling,
            affordable,
            purchasable: affordable && room,
            archetypes,
        }
    }

    /// Mean relative gain in expected score over the probe hands once the offer is merged in.
    fn power_gain(&self, context: &GameContext, kind: &OfferKind) -> f64 {
        let w = self.weights;
        match kind {
            OfferKind::Modifier { id, edition } => {
                let mut slots = ModifierSlots::with_capacity(context.modifiers.capacity + 1);
                slots.modifiers = context.modifiers.modifiers.clone();
                let mut modifier = Modifier::new(id.clone());
                modifier.edition = *edition;
                slots.modifiers.push(modifier);
                let gains: Vec<f64> = probe_hands()
                    .iter()
                    .map(|(_, played)| {
                        let before = self.expected(context, played, &[], &context.modifiers);
                        let after = self.expected(context, played, &[], &slots);
                        relative(before, after)
                    })
                    .collect();
                mean(&gains)
            }
            OfferKind::Planet(category) => {
                let mut upgraded = context.clone();
                *upgraded.hand_levels.entry(*category).or_insert(1) = context.level(*category) + 1;
                let gain = probe_hands()
                    .iter()
                    .find(|(kind, _)| kind == category)
                    .map(|(_, played)| {
                        let before = self.expected(context, played, &[], &context.modifiers);
                        let after = self.expected(&upgraded, played, &[], &context.modifiers);
                        relative(before, after)
                    })
                    .unwrap_or(0.0);
                gain + w.planet_value
            }
            OfferKind::Card(card) => {
                let held = [*card];
                let gains: Vec<f64> = probe_hands()
                    .iter()
                    .map(|(_, played)| {
                        let before = self.expected(context, played, &[], &context.modifiers);
                        let after = self.expected(context, played, &held, &context.modifiers);
                        relative(before, after)
                    })
                    .collect();
                mean(&gains) + w.card_value
            }
            OfferKind::Tarot(_) => w.tarot_value,
            OfferKind::Voucher(_) => w.voucher_value,
        }
    }

    fn expected(
        &self,
        context: &GameContext,
        played: &[Card],
        held: &[Card],
        slots: &ModifierSlots,
    ) -> f64 {
        let request = ScoreRequest::new(played, held, context).with_modifiers(slots);
        self.pipeline
            .evaluate(&request)
            .map(|e| e.expected_score)
            .unwrap_or(0.0)
    }

    /// Best expected score over the probe hands, used as a readiness gauge.
    pub fn probe_strength(&self, context: &GameContext, slots: &ModifierSlots) -> f64 {
        probe_hands()
            .iter()
            .map(|(_, played)| self.expected(context, played, &[], slots))
            .fold(0.0, f64::max)
    }
}

fn relative(before: f64, after: f64) -> f64 {
    (after - before) / before.max(1.0)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Fixed probe plays, one per common category.
pub fn probe_hands() -> Vec<(HandCategory, Vec<Card>)> {
    use Rank::*;
    use Suit::*;
    let hand = |cards: &[(Rank, Suit)]| -> Vec<Card> {
        cards.iter().map(|(r, s)| Card::standard(*r, *s)).collect()
    };
    vec![
        (HandCategory::HighCard, hand(&[(Ace, Spades)])),
        (HandCategory::Pair, hand(&[(King, Spades), (King, Hearts)])),
        (
            HandCategory::TwoPair,
            hand(&[(King, Spades), (King, Hearts), (Nine, Clubs), (Nine, Diamonds)]),
        ),
        (
            HandCategory::ThreeKind,
            hand(&[(Queen, Spades), (Queen, Hearts), (Queen, Clubs)]),
        ),
        (
            HandCategory::Straight,
            hand(&[
                (Five, Spades),
                (Six, Hearts),
                (Seven, Clubs),
                (Eight, Diamonds),
                (Nine, Spades),
            ]),
        ),
        (
            HandCategory::Flush,
            hand(&[(Two, Hearts), (Five, Hearts), (Eight, Hearts), (Jack, Hearts), (King, Hearts)]),
        ),
        (
            HandCategory::FullHouse,
            hand(&[
                (Jack, Spades),
                (Jack, Hearts),
                (Jack, Clubs),
                (Four, Diamonds),
                (Four, Spades),
            ]),
        ),
        (
            HandCategory::FourKind,
            hand(&[(Eight, Spades), (Eight, Hearts), (Eight, Clubs), (Eight, Diamonds)]),
        ),
    ]
}
