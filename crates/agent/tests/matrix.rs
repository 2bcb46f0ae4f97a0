use jester_agent::{
    legal_actions, Action, AdvisoryChannel, AdvisoryError, AdvisoryRequest, DecisionKind,
    DecisionOutcome, DecisionRouter, DisabledChannel, RouterConfig, SessionReport,
};
use jester_core::{
    Archetype, BlindKind, BossEffect, BrainConfig, Card, GameContext, HandCategory, Modifier,
    Offer, OfferKind, PackState, Phase, Rank, ShopState, Suit,
};
use jester_data::builtin_config;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn brain() -> BrainConfig {
    builtin_config().expect("builtin config")
}

struct FailingChannel {
    calls: AtomicU32,
}

impl FailingChannel {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
        })
    }
}

impl AdvisoryChannel for FailingChannel {
    fn advise(&self, _request: &AdvisoryRequest) -> Result<String, AdvisoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AdvisoryError::Transport("connection refused".to_string()))
    }
}

struct ScriptedChannel {
    payload: String,
    calls: AtomicU32,
}

impl ScriptedChannel {
    fn new(payload: &str) -> Arc<Self> {
        Arc::new(Self {
            payload: payload.to_string(),
            calls: AtomicU32::new(0),
        })
    }
}

impl AdvisoryChannel for ScriptedChannel {
    fn advise(&self, _request: &AdvisoryRequest) -> Result<String, AdvisoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

struct SlowChannel;

/// Never answers within any test deadline.
struct StuckChannel {
    calls: AtomicU32,
}

impl AdvisoryChannel for StuckChannel {
    fn advise(&self, _request: &AdvisoryRequest) -> Result<String, AdvisoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_secs(2));
        Err(AdvisoryError::Transport("gave up".to_string()))
    }
}

impl AdvisoryChannel for SlowChannel {
    fn advise(&self, _request: &AdvisoryRequest) -> Result<String, AdvisoryError> {
        thread::sleep(Duration::from_millis(300));
        Ok(r#"{"action":"LeaveShop","rationale":"late"}"#.to_string())
    }
}

fn modifier_offer(id: &str, cost: i64) -> Offer {
    Offer {
        kind: OfferKind::Modifier {
            id: id.to_string(),
            edition: None,
        },
        cost,
    }
}

/// Two identical offers: zero margin, so the rule path is never confident.
fn tied_shop() -> GameContext {
    let mut ctx = GameContext::new(Phase::Shop, 1, BlindKind::Small);
    ctx.money = 10;
    ctx.shop = Some(ShopState {
        offers: vec![modifier_offer("joker", 2), modifier_offer("joker", 2)],
        reroll_cost: 5,
    });
    ctx
}

fn tied_pack() -> GameContext {
    let mut ctx = GameContext::new(Phase::PackOpen, 1, BlindKind::Small);
    ctx.pack = Some(PackState {
        options: vec![modifier_offer("joker", 0), modifier_offer("joker", 0)],
        picks_left: 1,
    });
    ctx
}

/// Readiness lands just under the skip threshold.
fn borderline_blind() -> GameContext {
    let mut ctx = GameContext::new(Phase::BlindSelect, 1, BlindKind::Small);
    ctx.blind_target = 860;
    ctx
}

fn dangerous_boss() -> GameContext {
    let mut ctx = GameContext::new(Phase::BossPrep, 3, BlindKind::Boss);
    ctx.boss = Some(BossEffect::HalveBase);
    ctx.blind_target = 100_000;
    ctx
}

fn hand(cards: &[(Rank, Suit)]) -> Vec<Card> {
    cards.iter().map(|(r, s)| Card::standard(*r, *s)).collect()
}

fn play_context() -> GameContext {
    let mut ctx = GameContext::new(Phase::HandPlay, 1, BlindKind::Small);
    ctx.hand = hand(&[
        (Rank::Ace, Suit::Spades),
        (Rank::Ace, Suit::Hearts),
        (Rank::King, Suit::Diamonds),
        (Rank::Seven, Suit::Clubs),
        (Rank::Two, Suit::Spades),
    ]);
    ctx
}

macro_rules! fallback_case {
    ($name:ident, $ctx:expr) => {
        #[test]
        fn $name() {
            let channel = FailingChannel::new();
            let mut router = DecisionRouter::new(&brain(), channel.clone());
            let ctx = $ctx;
            let decision = router.decide(&ctx);
            assert_eq!(decision.kind, DecisionKind::Strategic);
            assert!(decision.escalated);
            assert!(matches!(decision.outcome, DecisionOutcome::Fallback { .. }));
            assert!(legal_actions(&ctx).contains(&decision.action));
            assert_eq!(channel.calls.load(Ordering::SeqCst), 2);
        }
    };
}

fallback_case!(fallback_in_shop, tied_shop());
fallback_case!(fallback_in_pack, tied_pack());
fallback_case!(fallback_at_blind_select, borderline_blind());
fallback_case!(fallback_at_boss_prep, dangerous_boss());

#[test]
fn failing_channel_resolves_every_strategic_decision() {
    let channel = FailingChannel::new();
    let mut router = DecisionRouter::new(&brain(), channel);
    for ctx in [tied_shop(), tied_pack(), borderline_blind(), dangerous_boss()] {
        router.decide(&ctx);
    }
    let stats = router.session().stats();
    assert_eq!(stats.strategic, 4);
    assert_eq!(stats.escalations, 4);
    assert_eq!(stats.fallback, 4);
    assert_eq!(stats.transport_errors, 4);
    assert_eq!(stats.fallback_rate(), 1.0);
}

#[test]
fn fallback_adopts_rule_candidate() {
    let mut router = DecisionRouter::new(&brain(), FailingChannel::new());
    let decision = router.decide(&tied_shop());
    assert_eq!(decision.action, Action::Buy { index: 0 });
}

#[test]
fn retry_happens_at_most_once() {
    let mut brain = brain();
    brain.routing.advisory_retries = 3;
    let channel = FailingChannel::new();
    let mut router = DecisionRouter::new(&brain, channel.clone());
    let decision = router.decide(&tied_shop());
    assert_eq!(decision.advisory_attempts, 2);
    assert_eq!(channel.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn timeout_falls_back_without_waiting_for_channel() {
    let mut brain = brain();
    brain.routing.advisory_timeout_ms = 20;
    let mut router = DecisionRouter::new(&brain, Arc::new(SlowChannel));
    let decision = router.decide(&tied_shop());
    assert_eq!(
        decision.outcome,
        DecisionOutcome::Fallback {
            error: AdvisoryError::Timeout.to_string()
        }
    );
    assert_eq!(router.session().stats().timeouts, 1);
    assert_eq!(decision.advisory_attempts, 2);
}

#[test]
fn illegal_response_falls_back_without_retry() {
    let channel = ScriptedChannel::new(r#"{"action":{"Buy":{"index":7}},"rationale":"buy it"}"#);
    let mut router = DecisionRouter::new(&brain(), channel.clone());
    let decision = router.decide(&tied_shop());
    assert!(matches!(decision.outcome, DecisionOutcome::Fallback { .. }));
    assert_eq!(decision.action, Action::Buy { index: 0 });
    assert_eq!(channel.calls.load(Ordering::SeqCst), 1);
    assert_eq!(router.session().stats().illegal_actions, 1);
}

#[test]
fn schema_invalid_response_falls_back() {
    let channel = ScriptedChannel::new(r#"{"choice":"LeaveShop"}"#);
    let mut router = DecisionRouter::new(&brain(), channel);
    let decision = router.decide(&tied_shop());
    assert!(matches!(decision.outcome, DecisionOutcome::Fallback { .. }));
    assert_eq!(router.session().stats().schema_errors, 1);
}

#[test]
fn legal_advisory_response_is_adopted() {
    let channel = ScriptedChannel::new(r#"{"action":"LeaveShop","rationale":"save for interest"}"#);
    let mut router = DecisionRouter::new(&brain(), channel);
    let decision = router.decide(&tied_shop());
    assert_eq!(decision.action, Action::LeaveShop);
    assert_eq!(
        decision.outcome,
        DecisionOutcome::Advisory {
            rationale: "save for interest".to_string()
        }
    );
}

#[test]
fn disabled_advisory_keeps_rule_path() {
    let channel = ScriptedChannel::new(r#"{"action":"LeaveShop","rationale":"x"}"#);
    let config = RouterConfig {
        advisory_enabled: false,
        ..RouterConfig::from_brain(&brain())
    };
    let mut router = DecisionRouter::new(&brain(), channel.clone()).with_config(config);
    let decision = router.decide(&tied_shop());
    assert_eq!(decision.outcome, DecisionOutcome::Rule);
    assert!(!decision.escalated);
    assert_eq!(channel.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn confident_shop_decision_is_not_escalated() {
    let channel = ScriptedChannel::new(r#"{"action":"LeaveShop","rationale":"x"}"#);
    let mut router = DecisionRouter::new(&brain(), channel.clone());
    let mut ctx = tied_shop();
    ctx.shop = Some(ShopState {
        offers: vec![modifier_offer("the_duo", 8)],
        reroll_cost: 5,
    });
    let decision = router.decide(&ctx);
    assert_eq!(decision.action, Action::Buy { index: 0 });
    assert_eq!(decision.outcome, DecisionOutcome::Rule);
    assert_eq!(channel.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn hand_play_never_consults_advisory() {
    let channel = ScriptedChannel::new(r#"{"action":"Pass","rationale":"x"}"#);
    let mut router = DecisionRouter::new(&brain(), channel.clone());
    let decision = router.decide(&play_context());
    assert_eq!(decision.kind, DecisionKind::Mechanical);
    assert_eq!(decision.outcome, DecisionOutcome::Rule);
    assert_eq!(
        decision.action,
        Action::Play {
            indices: vec![0, 1, 2, 3, 4]
        }
    );
    let evaluation = decision.evaluation.expect("evaluation");
    assert_eq!(evaluation.category, HandCategory::Pair);
    assert_eq!(evaluation.score, 102);
    assert_eq!(channel.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn hand_play_is_deterministic() {
    let mut first = DecisionRouter::new(&brain(), Arc::new(DisabledChannel));
    let mut second = DecisionRouter::new(&brain(), Arc::new(DisabledChannel));
    let mut ctx = play_context();
    ctx.hand.extend(hand(&[
        (Rank::Ace, Suit::Clubs),
        (Rank::King, Suit::Spades),
        (Rank::Nine, Suit::Hearts),
    ]));
    assert_eq!(first.decide(&ctx), second.decide(&ctx));
}

#[test]
fn discards_when_best_play_falls_short() {
    let mut router = DecisionRouter::new(&brain(), Arc::new(DisabledChannel));
    let mut ctx = GameContext::new(Phase::HandPlay, 1, BlindKind::Small);
    ctx.blind_target = 10_000;
    ctx.hands_left = 3;
    ctx.discards_left = 2;
    ctx.hand = hand(&[
        (Rank::Two, Suit::Spades),
        (Rank::Two, Suit::Hearts),
        (Rank::Three, Suit::Clubs),
        (Rank::Five, Suit::Diamonds),
        (Rank::Seven, Suit::Spades),
        (Rank::Nine, Suit::Hearts),
        (Rank::Jack, Suit::Clubs),
        (Rank::King, Suit::Diamonds),
    ]);
    let decision = router.decide(&ctx);
    assert_eq!(
        decision.action,
        Action::Discard {
            indices: vec![2, 3, 4, 5, 6]
        }
    );
    assert_eq!(decision.kind, DecisionKind::Mechanical);
}

#[test]
fn last_hand_plays_even_when_short() {
    let mut router = DecisionRouter::new(&brain(), Arc::new(DisabledChannel));
    let mut ctx = play_context();
    ctx.blind_target = 10_000;
    ctx.hands_left = 1;
    let decision = router.decide(&ctx);
    assert!(matches!(decision.action, Action::Play { .. }));
}

#[test]
fn empty_legal_set_passes_with_safe_default() {
    let mut router = DecisionRouter::new(&brain(), Arc::new(DisabledChannel));
    let mut ctx = play_context();
    ctx.hands_left = 0;
    ctx.discards_left = 0;
    let decision = router.decide(&ctx);
    assert_eq!(decision.action, Action::Pass);
    assert!(matches!(decision.outcome, DecisionOutcome::SafeDefault { .. }));
}

#[test]
fn slot_overflow_yields_safe_default() {
    let mut router = DecisionRouter::new(&brain(), Arc::new(DisabledChannel));
    let mut ctx = tied_shop();
    ctx.modifiers.capacity = 1;
    ctx.modifiers.modifiers = vec![Modifier::new("joker"), Modifier::new("joker")];
    let decision = router.decide(&ctx);
    assert_eq!(decision.action, Action::LeaveShop);
    assert!(matches!(decision.outcome, DecisionOutcome::SafeDefault { .. }));
    assert_eq!(router.session().stats().safe_default, 1);
}

#[test]
fn must_play_five_restricts_plays() {
    let mut ctx = play_context();
    ctx.hand.push(Card::standard(Rank::Four, Suit::Clubs));
    ctx.blind = BlindKind::Boss;
    ctx.boss = Some(BossEffect::MustPlayFive);
    let actions = legal_actions(&ctx);
    assert!(actions.iter().all(|action| match action {
        Action::Play { indices } => indices.len() == 5,
        _ => true,
    }));
    assert_eq!(
        actions
            .iter()
            .filter(|a| matches!(a, Action::Play { .. }))
            .count(),
        6
    );
}

#[test]
fn blind_without_target_is_selected_and_escalated() {
    let ctx = GameContext::new(Phase::BlindSelect, 1, BlindKind::Big);
    let mut rule_router = DecisionRouter::new(&brain(), Arc::new(DisabledChannel));
    let decision = rule_router.decide(&ctx);
    assert_eq!(decision.action, Action::SelectBlind);
    assert_eq!(decision.confidence, 0.0);
    assert!(decision.escalated);

    let channel = FailingChannel::new();
    let mut router = DecisionRouter::new(&brain(), channel.clone());
    let decision = router.decide(&ctx);
    assert_eq!(decision.action, Action::SelectBlind);
    assert!(matches!(decision.outcome, DecisionOutcome::Fallback { .. }));
    assert_eq!(channel.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn stuck_workers_cap_new_consults() {
    let mut brain = brain();
    brain.routing.advisory_timeout_ms = 10;
    let channel = Arc::new(StuckChannel {
        calls: AtomicU32::new(0),
    });
    let mut router = DecisionRouter::new(&brain, channel.clone());

    let first = router.decide(&tied_shop());
    assert_eq!(first.advisory_attempts, 2);
    assert_eq!(
        first.outcome,
        DecisionOutcome::Fallback {
            error: AdvisoryError::Timeout.to_string()
        }
    );

    let second = router.decide(&tied_shop());
    assert_eq!(second.advisory_attempts, 0);
    assert_eq!(second.action, Action::Buy { index: 0 });
    assert!(matches!(second.outcome, DecisionOutcome::Fallback { .. }));
    assert_eq!(channel.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn boss_blind_cannot_be_skipped() {
    let ctx = GameContext::new(Phase::BlindSelect, 2, BlindKind::Boss);
    assert_eq!(legal_actions(&ctx), vec![Action::SelectBlind]);
}

#[test]
fn legal_actions_survive_serde_round_trip() {
    for ctx in [tied_shop(), tied_pack(), play_context(), dangerous_boss()] {
        let body = serde_json::to_string(&ctx).expect("encode");
        let decoded: GameContext = serde_json::from_str(&body).expect("decode");
        assert_eq!(legal_actions(&ctx), legal_actions(&decoded));

        let actions = legal_actions(&ctx);
        let body = serde_json::to_string(&actions).expect("encode actions");
        let decoded: Vec<Action> = serde_json::from_str(&body).expect("decode actions");
        assert_eq!(actions, decoded);
    }
}

#[test]
fn planet_purchases_lock_the_archetype() {
    let mut router = DecisionRouter::new(&brain(), Arc::new(DisabledChannel));
    let mut ctx = GameContext::new(Phase::Shop, 3, BlindKind::Small);
    ctx.money = 20;
    ctx.shop = Some(ShopState {
        offers: vec![Offer {
            kind: OfferKind::Planet(HandCategory::Flush),
            cost: 3,
        }],
        reroll_cost: 5,
    });

    let first = router.decide(&ctx);
    assert_eq!(first.action, Action::Buy { index: 0 });
    assert_eq!(router.session().tracker().current(), Archetype::Undetermined);

    router.decide(&ctx);
    assert_eq!(router.session().tracker().current(), Archetype::Flush);

    router.start_run();
    assert_eq!(router.session().tracker().current(), Archetype::Undetermined);
    assert_eq!(router.session().stats().decisions, 0);
    assert_eq!(router.session().runs(), 1);
}

#[test]
fn report_lists_every_decision() {
    let mut router = DecisionRouter::new(&brain(), FailingChannel::new());
    router.decide(&play_context());
    router.decide(&tied_shop());
    let report = SessionReport::from_session(router.session());
    assert_eq!(report.decisions.len(), 2);
    let text = report.to_text_report();
    assert!(text.contains("fallback: advisory transport error"));
    assert!(text.contains("hand_play"));
}
