use jester_core::{classify, Card, HandCategory, HandRules, Rank, Suit, ValidationError};

fn card(token: &str) -> Card {
    let (rank, suit) = token.split_at(token.len() - 1);
    let rank = match rank {
        "A" => Rank::Ace,
        "K" => Rank::King,
        "Q" => Rank::Queen,
        "J" => Rank::Jack,
        n => Rank::from_value(n.parse().unwrap()).unwrap(),
    };
    let suit = match suit {
        "s" => Suit::Spades,
        "h" => Suit::Hearts,
        "c" => Suit::Clubs,
        "d" => Suit::Diamonds,
        other => panic!("bad suit {other}"),
    };
    Card::standard(rank, suit)
}

fn cards(spec: &str) -> Vec<Card> {
    spec.split_whitespace().map(card).collect()
}

macro_rules! hand_case {
    ($name:ident, $cards:expr, $expected:expr) => {
        #[test]
        fn $name() {
            let result = classify(&cards($cards), HandRules::default()).unwrap();
            assert_eq!(result.category, $expected);
        }
    };
}

macro_rules! rules_case {
    ($name:ident, $cards:expr, $rules:expr, $expected:expr) => {
        #[test]
        fn $name() {
            let result = classify(&cards($cards), $rules).unwrap();
            assert_eq!(result.category, $expected);
        }
    };
}

macro_rules! id_case {
    ($name:ident, $id:expr, $expected:expr) => {
        #[test]
        fn $name() {
            assert_eq!(HandCategory::from_id($id), Ok($expected));
            assert_eq!($expected.id(), $id);
        }
    };
}

hand_case!(flush_five_beats_five_kind, "As As As As As", HandCategory::FlushFive);
hand_case!(five_kind_mixed_suits, "As Ah Ac Ad As", HandCategory::FiveKind);
hand_case!(flush_house, "Kh Kh Kh 2h 2h", HandCategory::FlushHouse);
hand_case!(straight_flush, "5d 6d 7d 8d 9d", HandCategory::StraightFlush);
hand_case!(four_kind, "8s 8h 8c 8d 2s", HandCategory::FourKind);
hand_case!(four_kind_four_cards, "8s 8h 8c 8d", HandCategory::FourKind);
hand_case!(full_house, "Js Jh Jc 4d 4s", HandCategory::FullHouse);
hand_case!(flush, "2h 5h 8h Jh Kh", HandCategory::Flush);
hand_case!(straight, "5s 6h 7c 8d 9s", HandCategory::Straight);
hand_case!(ace_low_straight, "As 2h 3c 4d 5s", HandCategory::Straight);
hand_case!(ace_high_straight, "10s Jh Qc Kd As", HandCategory::Straight);
hand_case!(no_wraparound_straight, "Qs Kh As 2c 3d", HandCategory::HighCard);
hand_case!(three_kind, "Qs Qh Qc 2d 7s", HandCategory::ThreeKind);
hand_case!(two_pair, "Ks Kh 9c 9d 5s", HandCategory::TwoPair);
hand_case!(pair_two_cards, "Ks Kh", HandCategory::Pair);
hand_case!(high_card_two_cards, "As 7h", HandCategory::HighCard);
hand_case!(four_suited_is_not_flush, "2h 5h 8h Jh", HandCategory::HighCard);
hand_case!(single_card, "2c", HandCategory::HighCard);

rules_case!(
    four_fingers_flush,
    "2h 5h 8h Jh 3s",
    HandRules {
        four_fingers: true,
        ..HandRules::default()
    },
    HandCategory::Flush
);
rules_case!(
    four_fingers_straight,
    "5s 6h 7c 8d Ks",
    HandRules {
        four_fingers: true,
        ..HandRules::default()
    },
    HandCategory::Straight
);
rules_case!(
    shortcut_straight,
    "2s 4h 6c 8d 10s",
    HandRules {
        shortcut: true,
        ..HandRules::default()
    },
    HandCategory::Straight
);
rules_case!(
    gaps_need_shortcut,
    "2s 4h 6c 8d 10s",
    HandRules::default(),
    HandCategory::HighCard
);
rules_case!(
    smeared_flush,
    "2h 5d 8h Jd Kh",
    HandRules {
        smeared_suits: true,
        ..HandRules::default()
    },
    HandCategory::Flush
);
rules_case!(
    smeared_straight_flush,
    "5h 6d 7h 8d 9h",
    HandRules {
        smeared_suits: true,
        ..HandRules::default()
    },
    HandCategory::StraightFlush
);

id_case!(id_high_card, "high_card", HandCategory::HighCard);
id_case!(id_pair, "pair", HandCategory::Pair);
id_case!(id_two_pair, "two_pair", HandCategory::TwoPair);
id_case!(id_three_kind, "three_kind", HandCategory::ThreeKind);
id_case!(id_straight, "straight", HandCategory::Straight);
id_case!(id_flush, "flush", HandCategory::Flush);
id_case!(id_full_house, "full_house", HandCategory::FullHouse);
id_case!(id_four_kind, "four_kind", HandCategory::FourKind);
id_case!(id_straight_flush, "straight_flush", HandCategory::StraightFlush);
id_case!(id_five_kind, "five_kind", HandCategory::FiveKind);
id_case!(id_flush_house, "flush_house", HandCategory::FlushHouse);
id_case!(id_flush_five, "flush_five", HandCategory::FlushFive);

#[test]
fn unknown_category_is_rejected() {
    assert_eq!(
        HandCategory::from_id("royal_straight"),
        Err(ValidationError::UnknownCategory("royal_straight".to_string()))
    );
}

#[test]
fn full_house_contains_pair_and_three_kind() {
    let result = classify(&cards("Js Jh Jc 4d 4s"), HandRules::default()).unwrap();
    assert!(result.contains(HandCategory::Pair));
    assert!(result.contains(HandCategory::TwoPair));
    assert!(result.contains(HandCategory::ThreeKind));
    assert!(!result.contains(HandCategory::Flush));
}

#[test]
fn all_played_cards_score_unless_restricted() {
    let played = cards("Ks Kh 9c 2d 5s");
    let open = classify(&played, HandRules::default()).unwrap();
    assert_eq!(open.matched, vec![0, 1]);
    assert_eq!(open.scoring, vec![0, 1, 2, 3, 4]);

    let restricted = HandRules {
        matched_only: true,
        ..HandRules::default()
    };
    let result = classify(&played, restricted).unwrap();
    assert_eq!(result.scoring, vec![0, 1]);
}
