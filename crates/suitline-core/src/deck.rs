//! Cards, rank value tables and the deterministic deck shuffle.
//!
//! This module contains:
//! - `Card`, `Suit` and `Rank` value types
//! - `RankScale`, the two canonical rank → value tables
//! - `Mulberry32`, the documented 32-bit PRNG used for shuffling
//! - `create_deck` / `shuffle_deck` / `player_seed`

use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of cards in a standard deck
pub const DECK_SIZE: usize = 52;

/// Mask XORed into the match seed to derive the second player's deck seed
pub const PLAYER_SEED_MASK: u32 = 0x9E37_79B9;

/// Card suit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    /// All suits in canonical deck order
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    /// Unicode symbol used in card labels
    pub fn symbol(&self) -> char {
        match self {
            Suit::Spades => '♠',
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
        }
    }
}

/// Card rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "A")]
    Ace,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "T")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
}

impl Rank {
    /// All ranks in canonical deck order
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
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
    ];

    /// Position on the 1-13 ladder
    pub fn ordinal(&self) -> i32 {
        match self {
            Rank::Ace => 1,
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
        }
    }

    /// Single-character code (`A`, `2`..`9`, `T`, `J`, `Q`, `K`)
    pub fn code(&self) -> char {
        match self {
            Rank::Ace => 'A',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            other => char::from(b'0' + other.ordinal() as u8),
        }
    }
}

/// Rank → numeric value table.
///
/// The engine always plays on `Full`. `Simplified` is the table of the
/// standalone reference calculator, where every card from ten up counts 11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankScale {
    /// A=1, 2-9 face value, T/J/Q/K = 11
    Simplified,
    /// A=1 through K=13
    #[default]
    Full,
}

impl RankScale {
    /// Value of a rank on this scale
    pub fn value(&self, rank: Rank) -> i32 {
        match self {
            RankScale::Full => rank.ordinal(),
            RankScale::Simplified => match rank {
                Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 11,
                other => other.ordinal(),
            },
        }
    }
}

/// A playing card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { suit, rank }
    }

    /// Value of this card on the given scale
    pub fn value(&self, scale: RankScale) -> i32 {
        scale.value(self.rank)
    }

    /// Human readable label such as `9♠` or `T♣`
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.code(), self.suit.symbol())
    }
}

/// Parses short codes: rank (`A`, `2`..`9`, `T` or `10`, `J`, `Q`, `K`)
/// followed by a suit letter (`S`, `H`, `D`, `C`) or symbol.
impl FromStr for Card {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let suit_char = s
            .chars()
            .last()
            .ok_or_else(|| "empty card code".to_string())?;
        let rank_part = &s[..s.len() - suit_char.len_utf8()];

        let suit = match suit_char {
            'S' | 's' | '♠' => Suit::Spades,
            'H' | 'h' | '♥' => Suit::Hearts,
            'D' | 'd' | '♦' => Suit::Diamonds,
            'C' | 'c' | '♣' => Suit::Clubs,
            other => return Err(format!("unknown suit '{other}' in '{s}'")),
        };

        let rank = match rank_part.to_ascii_uppercase().as_str() {
            "A" | "1" => Rank::Ace,
            "2" => Rank::Two,
            "3" => Rank::Three,
            "4" => Rank::Four,
            "5" => Rank::Five,
            "6" => Rank::Six,
            "7" => Rank::Seven,
            "8" => Rank::Eight,
            "9" => Rank::Nine,
            "T" | "10" => Rank::Ten,
            "J" => Rank::Jack,
            "Q" => Rank::Queen,
            "K" => Rank::King,
            other => return Err(format!("unknown rank '{other}' in '{s}'")),
        };

        Ok(Card::new(rank, suit))
    }
}

// ==================== Seeded RNG ====================

/// Mulberry32: 32-bit state, advanced by a fixed increment and mixed on every
/// draw. The output sequence is fully determined by the seed on every platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    const INCREMENT: u32 = 0x6D2B_79F5;

    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }
}

impl RngCore for Mulberry32 {
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(Self::INCREMENT);
        let a = self.state;
        let mut t = (a ^ (a >> 15)).wrapping_mul(a | 1);
        t = t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61)) ^ t;
        t ^ (t >> 14)
    }

    fn next_u64(&mut self) -> u64 {
        let lo = u64::from(self.next_u32());
        let hi = u64::from(self.next_u32());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Mulberry32 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}

// ==================== Deck ====================

/// The 52-card deck in canonical order: suits spades, hearts, diamonds,
/// clubs; ranks ace through king within each suit.
pub fn create_deck() -> Vec<Card> {
    let mut cards = Vec::with_capacity(DECK_SIZE);
    for suit in Suit::ALL {
        for rank in Rank::ALL {
            cards.push(Card::new(rank, suit));
        }
    }
    cards
}

/// Fisher-Yates shuffle driven by `Mulberry32`.
///
/// Walks from the last index down; the swap partner for index `i` is
/// `(next_u32 * (i + 1)) >> 32`. Returns a new vector and leaves `deck` untouched.
pub fn shuffle_deck(deck: &[Card], seed: u32) -> Vec<Card> {
    let mut rng = Mulberry32::new(seed);
    let mut cards = deck.to_vec();
    for i in (1..cards.len()).rev() {
        let j = ((u64::from(rng.next_u32()) * (i as u64 + 1)) >> 32) as usize;
        cards.swap(i, j);
    }
    cards
}

/// Deck seed for a player, derived from the match seed.
///
/// Player 0 uses the match seed as-is, player 1 XORs it with `PLAYER_SEED_MASK`.
pub fn player_seed(match_seed: u32, player_index: usize) -> u32 {
    if player_index == 0 {
        match_seed
    } else {
        match_seed ^ PLAYER_SEED_MASK
    }
}
