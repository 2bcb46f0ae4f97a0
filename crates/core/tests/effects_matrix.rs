use jester_core::{
    Amount, BlindKind, BossEffect, Card, Condition, EffectPipeline, EffectRule, EffectTable,
    Enhancement, EvalError, GameContext, HandCategory, HandRules, InvariantViolation, Modifier,
    ModifierSlots, ModifierSpec, Operator, Phase, Rank, RetriggerRule, RetriggerScope, Scale,
    ScoreRequest, ScoreTables, Seal, Suit, Trigger, ValidationError,
};

fn spec(id: &str, effects: Vec<EffectRule>) -> ModifierSpec {
    ModifierSpec {
        id: id.to_string(),
        name: id.to_string(),
        rules: HandRules::default(),
        effects,
        retriggers: Vec::new(),
        archetypes: Vec::new(),
        cost: 5,
    }
}

fn rule(trigger: Trigger, condition: Condition, op: Operator) -> EffectRule {
    EffectRule {
        trigger,
        condition,
        op,
        chance: None,
    }
}

fn pipeline(specs: Vec<ModifierSpec>) -> EffectPipeline {
    EffectPipeline::new(ScoreTables::default(), EffectTable::new(specs))
}

fn test_specs() -> Vec<ModifierSpec> {
    let mut hack = spec("hack", Vec::new());
    hack.retriggers.push(RetriggerRule {
        scope: RetriggerScope::Scored,
        condition: Condition::Ranks(vec![Rank::Two, Rank::Three, Rank::Four, Rank::Five]),
        count: 1,
    });
    let mut bloodstone = spec(
        "bloodstone",
        vec![rule(
            Trigger::OnScored,
            Condition::Suit(Suit::Hearts),
            Operator::MultXMult(Amount::flat(1.5)),
        )],
    );
    bloodstone.effects[0].chance = Some(0.5);
    vec![
        spec(
            "plus_mult",
            vec![rule(Trigger::OnHand, Condition::Always, Operator::AddMult(Amount::flat(4.0)))],
        ),
        spec(
            "times_two",
            vec![rule(Trigger::OnHand, Condition::Always, Operator::MultXMult(Amount::flat(2.0)))],
        ),
        spec(
            "jolly",
            vec![rule(
                Trigger::OnHand,
                Condition::HandContains(HandCategory::Pair),
                Operator::AddMult(Amount::flat(8.0)),
            )],
        ),
        spec(
            "green",
            vec![
                rule(
                    Trigger::OnHand,
                    Condition::Always,
                    Operator::StateIncrement(Amount::flat(1.0)),
                ),
                rule(
                    Trigger::OnHand,
                    Condition::Always,
                    Operator::AddMult(Amount::scaled(0.0, 1.0, Scale::Accumulated)),
                ),
                rule(
                    Trigger::OnDiscardBatch,
                    Condition::Always,
                    Operator::StateIncrement(Amount::flat(-1.0)),
                ),
            ],
        ),
        spec(
            "rebate",
            vec![rule(
                Trigger::OnDiscard,
                Condition::Ranks(vec![Rank::King]),
                Operator::AddMoney(Amount::flat(5.0)),
            )],
        ),
        hack,
        bloodstone,
    ]
}

fn context(hand: Vec<Card>, modifiers: &[&str]) -> GameContext {
    let mut ctx = GameContext::new(Phase::HandPlay, 1, BlindKind::Small);
    ctx.hand = hand;
    for id in modifiers {
        ctx.modifiers.push(Modifier::new(*id)).unwrap();
    }
    ctx
}

fn c(rank: Rank, suit: Suit) -> Card {
    Card::standard(rank, suit)
}

fn all(ctx: &GameContext) -> Vec<usize> {
    (0..ctx.hand.len()).collect()
}

#[test]
fn high_card_ace_scores_sixteen() {
    let ctx = context(vec![c(Rank::Ace, Suit::Spades)], &[]);
    let eval = pipeline(Vec::new()).evaluate_play(&ctx, &[0]).unwrap();
    assert_eq!(eval.category, HandCategory::HighCard);
    assert_eq!(eval.chips, 16);
    assert_eq!(eval.mult, 1.0);
    assert_eq!(eval.score, 16);
    assert_eq!(eval.expected_score, 16.0);
    assert!(!eval.degraded);
}

#[test]
fn two_pair_with_kicker_scores_one_thirty() {
    let ctx = context(
        vec![
            c(Rank::King, Suit::Spades),
            c(Rank::King, Suit::Hearts),
            c(Rank::Queen, Suit::Clubs),
            c(Rank::Queen, Suit::Diamonds),
            c(Rank::Five, Suit::Spades),
        ],
        &[],
    );
    let eval = pipeline(Vec::new()).evaluate_play(&ctx, &all(&ctx)).unwrap();
    assert_eq!(eval.category, HandCategory::TwoPair);
    assert_eq!(eval.chips, 65);
    assert_eq!(eval.mult, 2.0);
    assert_eq!(eval.score, 130);
}

#[test]
fn evaluation_is_deterministic() {
    let ctx = context(
        vec![c(Rank::King, Suit::Hearts), c(Rank::King, Suit::Spades), c(Rank::Two, Suit::Hearts)],
        &["jolly", "bloodstone", "green", "times_two"],
    );
    let pipeline = pipeline(test_specs());
    let first = pipeline.evaluate_play(&ctx, &[0, 1, 2]).unwrap();
    let second = pipeline.evaluate_play(&ctx, &[0, 1, 2]).unwrap();
    assert_eq!(first, second);
}

#[test]
fn raising_level_never_lowers_score() {
    let mut ctx = context(
        vec![c(Rank::King, Suit::Hearts), c(Rank::King, Suit::Spades)],
        &["plus_mult", "times_two"],
    );
    let pipeline = pipeline(test_specs());
    let mut last = 0;
    for level in 1..=8 {
        ctx.hand_levels.insert(HandCategory::Pair, level);
        let eval = pipeline.evaluate_play(&ctx, &[0, 1]).unwrap();
        assert_eq!(eval.level, level);
        assert!(eval.score >= last, "level {level} dropped to {}", eval.score);
        last = eval.score;
    }
}

#[test]
fn additive_mult_before_xmult_scores_higher() {
    let hand = vec![c(Rank::King, Suit::Hearts), c(Rank::King, Suit::Spades)];
    let pipeline = pipeline(test_specs());
    let left = context(hand.clone(), &["plus_mult", "times_two"]);
    let right = context(hand, &["times_two", "plus_mult"]);
    let left_eval = pipeline.evaluate_play(&left, &[0, 1]).unwrap();
    let right_eval = pipeline.evaluate_play(&right, &[0, 1]).unwrap();
    // 30 chips: (2 + 4) * 2 versus 2 * 2 + 4.
    assert_eq!(left_eval.score, 360);
    assert_eq!(right_eval.score, 240);
    assert_eq!(left_eval.xmult_trace.len(), 1);
}

#[test]
fn unknown_modifier_is_skipped_with_warning() {
    let ctx = context(vec![c(Rank::Ace, Suit::Spades)], &["missing_joker", "plus_mult"]);
    let eval = pipeline(test_specs()).evaluate_play(&ctx, &[0]).unwrap();
    assert!(eval.degraded);
    assert_eq!(eval.warnings.len(), 1);
    assert!(eval.warnings[0].contains("missing_joker"));
    assert_eq!(eval.score, 16 * 5);
}

#[test]
fn chance_effects_report_bounds_and_expectation() {
    let ctx = context(vec![c(Rank::King, Suit::Hearts)], &["bloodstone"]);
    let eval = pipeline(test_specs()).evaluate_play(&ctx, &[0]).unwrap();
    assert_eq!(eval.score, 15);
    assert_eq!(eval.min_score, 15);
    assert_eq!(eval.max_score, 22);
    assert!((eval.expected_score - 18.5).abs() < 1e-9);
    assert_eq!(eval.chance_steps.len(), 1);
    assert!(!eval.approximate);
}

#[test]
fn many_chance_steps_fall_back_to_scaled_expectation() {
    // Five lucky aces with red seals: two firings each, two chance steps per firing.
    let hand: Vec<Card> = [Suit::Spades, Suit::Hearts, Suit::Clubs, Suit::Diamonds, Suit::Spades]
        .into_iter()
        .map(|suit| Card {
            enhancement: Some(Enhancement::Lucky),
            seal: Some(Seal::Red),
            ..c(Rank::Ace, suit)
        })
        .collect();
    let ctx = context(hand, &[]);
    let eval = pipeline(Vec::new()).evaluate_play(&ctx, &all(&ctx)).unwrap();
    assert_eq!(eval.category, HandCategory::FiveKind);
    assert_eq!(eval.chance_steps.len(), 20);
    assert!(eval.approximate);
    assert_eq!(eval.score, 2760);
    assert_eq!(eval.min_score, 2760);
    assert_eq!(eval.max_score, 48760);
    assert!((eval.expected_score - 11960.0).abs() < 1e-6);
}

#[test]
fn seeded_sample_is_repeatable() {
    let ctx = context(
        vec![c(Rank::King, Suit::Hearts), c(Rank::Two, Suit::Hearts)],
        &["bloodstone"],
    );
    let pipeline = pipeline(test_specs());
    let (played, held) = ctx.split_hand(&[0, 1]).unwrap();
    let request = ScoreRequest::new(&played, &held, &ctx);
    let first = pipeline.sample(&request, 7).unwrap();
    let second = pipeline.sample(&request, 7).unwrap();
    assert_eq!(first, second);
    let eval = pipeline.evaluate(&request).unwrap();
    assert!(first.score >= eval.min_score && first.score <= eval.max_score);
}

#[test]
fn accumulator_changes_are_returned_not_applied() {
    let mut ctx = context(vec![c(Rank::Ace, Suit::Spades)], &[]);
    ctx.modifiers.push(Modifier::new("green").with_state(2.0)).unwrap();
    let eval = pipeline(test_specs()).evaluate_play(&ctx, &[0]).unwrap();
    assert_eq!(eval.mult, 4.0);
    assert_eq!(eval.score, 64);
    assert_eq!(eval.state_deltas.len(), 1);
    assert_eq!(eval.state_deltas[0].delta, 1.0);
    assert_eq!(ctx.modifiers.modifiers[0].state, 2.0);

    ctx.modifiers.commit(&eval.state_deltas);
    assert_eq!(ctx.modifiers.modifiers[0].state, 3.0);
}

#[test]
fn red_seal_and_retrigger_add_firings() {
    let sealed = Card::standard(Rank::Ace, Suit::Spades).with_seal(Seal::Red);
    let ctx = context(vec![sealed], &[]);
    let eval = pipeline(Vec::new()).evaluate_play(&ctx, &[0]).unwrap();
    assert_eq!(eval.chips, 5 + 11 + 11);

    let ctx = context(vec![c(Rank::Five, Suit::Clubs)], &["hack"]);
    let eval = pipeline(test_specs()).evaluate_play(&ctx, &[0]).unwrap();
    assert_eq!(eval.chips, 5 + 5 + 5);
}

#[test]
fn enhancements_and_editions_apply_per_card() {
    let bonus = Card::standard(Rank::Two, Suit::Spades).with_enhancement(Enhancement::Bonus);
    let ctx = context(vec![bonus], &[]);
    assert_eq!(pipeline(Vec::new()).evaluate_play(&ctx, &[0]).unwrap().chips, 5 + 2 + 30);

    let stone = Card::standard(Rank::Ace, Suit::Spades).with_enhancement(Enhancement::Stone);
    let ctx = context(vec![stone], &[]);
    assert_eq!(pipeline(Vec::new()).evaluate_play(&ctx, &[0]).unwrap().chips, 55);

    let steel = Card::standard(Rank::Two, Suit::Clubs).with_enhancement(Enhancement::Steel);
    let ctx = context(vec![c(Rank::Ace, Suit::Spades), steel], &[]);
    let eval = pipeline(Vec::new()).evaluate_play(&ctx, &[0]).unwrap();
    assert_eq!(eval.mult, 1.5);
    assert_eq!(eval.score, 24);
}

#[test]
fn boss_debuff_and_halved_base() {
    let mut ctx = context(vec![c(Rank::King, Suit::Hearts)], &[]);
    ctx.blind = BlindKind::Boss;
    ctx.boss = Some(BossEffect::DebuffSuit(Suit::Hearts));
    assert_eq!(pipeline(Vec::new()).evaluate_play(&ctx, &[0]).unwrap().score, 5);

    let mut ctx = context(vec![c(Rank::King, Suit::Hearts), c(Rank::King, Suit::Spades)], &[]);
    ctx.blind = BlindKind::Boss;
    ctx.boss = Some(BossEffect::HalveBase);
    let eval = pipeline(Vec::new()).evaluate_play(&ctx, &[0, 1]).unwrap();
    assert_eq!(eval.chips, 25);
    assert_eq!(eval.mult, 1.0);
}

#[test]
fn discard_triggers_money_and_state() {
    let mut ctx = context(
        vec![c(Rank::King, Suit::Spades), c(Rank::Two, Suit::Clubs), c(Rank::King, Suit::Hearts)],
        &["rebate"],
    );
    ctx.modifiers.push(Modifier::new("green").with_state(3.0)).unwrap();
    let outcome = pipeline(test_specs()).evaluate_discard(&ctx, &[0, 1, 2]).unwrap();
    assert_eq!(outcome.money, 10);
    assert_eq!(outcome.state_deltas.len(), 1);
    assert_eq!(outcome.state_deltas[0].slot, 1);
    assert_eq!(outcome.state_deltas[0].delta, -1.0);
}

#[test]
fn malformed_input_is_rejected_before_scoring() {
    let ctx = context(vec![c(Rank::Ace, Suit::Spades)], &[]);
    let err = pipeline(Vec::new()).evaluate_play(&ctx, &[3]).unwrap_err();
    assert_eq!(
        err,
        EvalError::Validation(ValidationError::IndexOutOfRange { index: 3, len: 1 })
    );

    let mut ctx = context(vec![c(Rank::Ace, Suit::Spades)], &[]);
    ctx.modifiers = ModifierSlots {
        capacity: 1,
        modifiers: vec![Modifier::new("plus_mult"), Modifier::new("times_two")],
    };
    let err = pipeline(test_specs()).evaluate_play(&ctx, &[0]).unwrap_err();
    assert_eq!(
        err,
        EvalError::Invariant(InvariantViolation::SlotOverflow { len: 2, capacity: 1 })
    );
}

#[test]
fn modifier_definitions_decode_from_json() {
    let raw = r#"{
        "id": "bloodstone",
        "name": "Bloodstone",
        "effects": [{
            "trigger": "OnScored",
            "condition": {"Suit": "Hearts"},
            "op": {"MultXMult": {"base": 1.5}},
            "chance": 0.5
        }],
        "cost": 7
    }"#;
    let decoded: ModifierSpec = serde_json::from_str(raw).unwrap();
    let mut expected = spec(
        "bloodstone",
        vec![rule(
            Trigger::OnScored,
            Condition::Suit(Suit::Hearts),
            Operator::MultXMult(Amount::flat(1.5)),
        )],
    );
    expected.name = "Bloodstone".to_string();
    expected.effects[0].chance = Some(0.5);
    expected.cost = 7;
    assert_eq!(decoded, expected);

    let missing_condition = r#"{"trigger": "OnHand", "op": {"AddChips": {"base": 30}}}"#;
    let decoded: EffectRule = serde_json::from_str(missing_condition).unwrap();
    assert_eq!(decoded.condition, Condition::Always);
}
