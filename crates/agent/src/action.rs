use jester_core::{BlindKind, BossEffect, GameContext, Phase, MAX_PLAYED};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Action {
    SelectBlind,
    SkipBlind,
    Play { indices: Vec<usize> },
    Discard { indices: Vec<usize> },
    Buy { index: usize },
    Reroll,
    LeaveShop,
    Pick { index: usize },
    SkipPack,
    SellModifier { slot: usize },
    MoveModifier { from: usize, to: usize },
    Pass,
}

impl Action {
    pub fn stable_key(&self) -> String {
        match self {
            Self::SelectBlind => "select_blind".to_string(),
            Self::SkipBlind => "skip_blind".to_string(),
            Self::Play { indices } => format!("play:{indices:?}"),
            Self::Discard { indices } => format!("discard:{indices:?}"),
            Self::Buy { index } => format!("buy:{index}"),
            Self::Reroll => "reroll".to_string(),
            Self::LeaveShop => "leave_shop".to_string(),
            Self::Pick { index } => format!("pick:{index}"),
            Self::SkipPack => "skip_pack".to_string(),
            Self::SellModifier { slot } => format!("sell_modifier:{slot}"),
            Self::MoveModifier { from, to } => format!("move_modifier:{from}:{to}"),
            Self::Pass => "pass".to_string(),
        }
    }

    pub fn short_label(&self) -> String {
        match self {
            Self::SelectBlind => "select_blind".to_string(),
            Self::SkipBlind => "skip_blind".to_string(),
            Self::Play { indices } => format!("play {indices:?}"),
            Self::Discard { indices } => format!("discard {indices:?}"),
            Self::Buy { index } => format!("buy {index}"),
            Self::Reroll => "reroll".to_string(),
            Self::LeaveShop => "leave_shop".to_string(),
            Self::Pick { index } => format!("pick {index}"),
            Self::SkipPack => "skip_pack".to_string(),
            Self::SellModifier { slot } => format!("sell_modifier {slot}"),
            Self::MoveModifier { from, to } => format!("move_modifier {from}->{to}"),
            Self::Pass => "pass".to_string(),
        }
    }

    /// Actions that leave the current phase without spending anything.
    pub fn is_passive(&self) -> bool {
        matches!(
            self,
            Self::SelectBlind | Self::LeaveShop | Self::SkipPack | Self::Pass
        )
    }
}

/// Every action the game accepts in this context, in a fixed order.
pub fn legal_actions(context: &GameContext) -> Vec<Action> {
    let mut actions = Vec::new();
    match context.phase {
        Phase::BlindSelect => {
            actions.push(Action::SelectBlind);
            if context.blind != BlindKind::Boss {
                actions.push(Action::SkipBlind);
            }
        }
        Phase::HandPlay => {
            let len = context.hand.len();
            let max = len.min(MAX_PLAYED);
            if context.hands_left > 0 {
                let must_play_five =
                    context.active_boss() == Some(BossEffect::MustPlayFive) && len >= MAX_PLAYED;
                let min = if must_play_five { MAX_PLAYED } else { 1 };
                for size in min..=max {
                    actions.extend(
                        subsets(len, size)
                            .into_iter()
                            .map(|indices| Action::Play { indices }),
                    );
                }
            }
            if context.discards_left > 0 {
                for size in 1..=max {
                    actions.extend(
                        subsets(len, size)
                            .into_iter()
                            .map(|indices| Action::Discard { indices }),
                    );
                }
            }
        }
        Phase::Shop => {
            if let Some(shop) = &context.shop {
                for (index, offer) in shop.offers.iter().enumerate() {
                    if offer.cost <= context.money && context.has_room(&offer.kind) {
                        actions.push(Action::Buy { index });
                    }
                }
                if context.money >= shop.reroll_cost {
                    actions.push(Action::Reroll);
                }
            }
            actions.extend((0..context.modifiers.len()).map(|slot| Action::SellModifier { slot }));
            actions.push(Action::LeaveShop);
        }
        Phase::PackOpen => {
            if let Some(pack) = &context.pack {
                if pack.picks_left > 0 {
                    for (index, option) in pack.options.iter().enumerate() {
                        if context.has_room(&option.kind) {
                            actions.push(Action::Pick { index });
                        }
                    }
                }
            }
            actions.push(Action::SkipPack);
        }
        Phase::BossPrep => {
            let len = context.modifiers.len();
            for from in 0..len {
                for to in 0..len {
                    if from != to {
                        actions.push(Action::MoveModifier { from, to });
                    }
                }
            }
            actions.extend((0..len).map(|slot| Action::SellModifier { slot }));
            actions.push(Action::Pass);
        }
    }
    actions
}

/// Ascending index combinations of `size` out of `len`, in lexicographic order.
fn subsets(len: usize, size: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if size == 0 || size > len {
        return out;
    }
    let mut current: Vec<usize> = (0..size).collect();
    loop {
        out.push(current.clone());
        let mut pos = size;
        while pos > 0 && current[pos - 1] == len - size + pos - 1 {
            pos -= 1;
        }
        if pos == 0 {
            return out;
        }
        current[pos - 1] += 1;
        for next in pos..size {
            current[next] = current[next - 1] + 1;
        }
    }
}
