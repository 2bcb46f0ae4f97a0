use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    Spades,
    Hearts,
    Clubs,
    Diamonds,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Clubs, Suit::Diamonds];

    /// Bucket used for flush detection. Smeared suits fold into two colours.
    pub fn bucket(self, smeared: bool) -> u8 {
        if smeared {
            match self {
                Suit::Spades | Suit::Clubs => 0,
                Suit::Hearts | Suit::Diamonds => 1,
            }
        } else {
            match self {
                Suit::Spades => 0,
                Suit::Hearts => 1,
                Suit::Clubs => 2,
                Suit::Diamonds => 3,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Ordinal value, 2..=14 with the ace high.
    pub fn value(self) -> u8 {
        match self {
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten => 10,
            Rank::Jack => 11,
            Rank::Queen => 12,
            Rank::King => 13,
            Rank::Ace => 14,
        }
    }

    pub fn from_value(value: u8) -> Option<Rank> {
        Rank::ALL.iter().copied().find(|rank| rank.value() == value)
    }

    pub fn chips(self) -> i64 {
        match self {
            Rank::Jack | Rank::Queen | Rank::King => 10,
            Rank::Ace => 11,
            other => other.value() as i64,
        }
    }

    pub fn is_face(self) -> bool {
        matches!(self, Rank::Jack | Rank::Queen | Rank::King)
    }

    pub fn is_even(self) -> bool {
        !self.is_face() && self != Rank::Ace && self.value() % 2 == 0
    }

    pub fn is_odd(self) -> bool {
        self == Rank::Ace || (!self.is_face() && self.value() % 2 == 1)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Enhancement {
    Bonus,
    Mult,
    Wild,
    Glass,
    Steel,
    Stone,
    Gold,
    Lucky,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Edition {
    Foil,
    Holographic,
    Polychrome,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Seal {
    Gold,
    Red,
    Blue,
    Purple,
}

/// A playing card. Each attribute slot holds at most one value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
    #[serde(default)]
    pub enhancement: Option<Enhancement>,
    #[serde(default)]
    pub edition: Option<Edition>,
    #[serde(default)]
    pub seal: Option<Seal>,
}

impl Card {
    pub fn standard(rank: Rank, suit: Suit) -> Self {
        Self {
            rank,
            suit,
            enhancement: None,
            edition: None,
            seal: None,
        }
    }

    pub fn with_enhancement(mut self, enhancement: Enhancement) -> Self {
        self.enhancement = Some(enhancement);
        self
    }

    pub fn with_edition(mut self, edition: Edition) -> Self {
        self.edition = Some(edition);
        self
    }

    pub fn with_seal(mut self, seal: Seal) -> Self {
        self.seal = Some(seal);
        self
    }

    pub fn is_wild(&self) -> bool {
        self.enhancement == Some(Enhancement::Wild)
    }

    pub fn is_stone(&self) -> bool {
        self.enhancement == Some(Enhancement::Stone)
    }

    pub fn is_face(&self) -> bool {
        !self.is_stone() && self.rank.is_face()
    }

    /// Whether the card counts as `suit`, honouring wild cards and smeared suits.
    pub fn matches_suit(&self, suit: Suit, smeared: bool) -> bool {
        if self.is_stone() {
            return false;
        }
        self.is_wild() || self.suit.bucket(smeared) == suit.bucket(smeared)
    }

    /// Chips the card adds when scored: rank value plus its enhancement bonus.
    /// Stone cards replace the rank value entirely.
    pub fn chip_value(&self) -> i64 {
        match self.enhancement {
            Some(Enhancement::Stone) => 50,
            Some(Enhancement::Bonus) => self.rank.chips() + 30,
            _ => self.rank.chips(),
        }
    }
}
