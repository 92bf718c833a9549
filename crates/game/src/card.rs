//! Card identity, face ordering, and piles.
//!
//! A [`Card`] is a face plus a suit. Faces are totally ordered from
//! [`Face::Ace`] (low) to [`Face::King`] (high). A [`Pile`] is an ordered
//! stack whose top is the last element.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CardError;

/// The four suits. No colour rule applies in Forty Thieves, only suit equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Club,
    Diamond,
    Heart,
    Spade,
}

impl Suit {
    /// All suits in a fixed, reproducible order.
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Diamond, Suit::Heart, Suit::Spade];

    /// Single-character suit symbol used in compact card strings.
    pub fn short_char(self) -> char {
        match self {
            Suit::Club => 'C',
            Suit::Diamond => 'D',
            Suit::Heart => 'H',
            Suit::Spade => 'S',
        }
    }
}

/// Card faces, Ace low through King high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Face {
    Ace = 0,
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
}

impl Face {
    /// All faces in ascending order.
    pub const ALL: [Face; 13] = [
        Face::Ace,
        Face::Two,
        Face::Three,
        Face::Four,
        Face::Five,
        Face::Six,
        Face::Seven,
        Face::Eight,
        Face::Nine,
        Face::Ten,
        Face::Jack,
        Face::Queen,
        Face::King,
    ];

    /// The next higher face. Fails on King.
    pub fn increment(self) -> Result<Face, CardError> {
        Face::ALL
            .get(self as usize + 1)
            .copied()
            .ok_or(CardError::CannotIncrementHighest)
    }

    /// The next lower face. Fails on Ace.
    pub fn decrement(self) -> Result<Face, CardError> {
        match self {
            Face::Ace => Err(CardError::CannotDecrementLowest),
            other => Ok(Face::ALL[other as usize - 1]),
        }
    }

    /// Single-character face symbol ("A", "2", …, "T", "J", "Q", "K").
    pub fn short_char(self) -> char {
        match self {
            Face::Ace => 'A',
            Face::Two => '2',
            Face::Three => '3',
            Face::Four => '4',
            Face::Five => '5',
            Face::Six => '6',
            Face::Seven => '7',
            Face::Eight => '8',
            Face::Nine => '9',
            Face::Ten => 'T',
            Face::Jack => 'J',
            Face::Queen => 'Q',
            Face::King => 'K',
        }
    }
}

/// A single playing card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub face: Face,
    pub suit: Suit,
}

impl Card {
    pub fn new(face: Face, suit: Suit) -> Self {
        Self { face, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.face.short_char(), self.suit.short_char())
    }
}

/// One unshuffled 52-card deck, suit-major.
pub fn standard_deck() -> Vec<Card> {
    Suit::ALL
        .iter()
        .flat_map(|&suit| Face::ALL.iter().map(move |&face| Card::new(face, suit)))
        .collect()
}

/// An ordered stack of cards. The top card is the last element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pile {
    cards: Vec<Card>,
}

impl Pile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// The top card, if any.
    pub fn top(&self) -> Option<&Card> {
        self.cards.last()
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Remove and return the top card.
    pub fn pop(&mut self) -> Result<Card, CardError> {
        self.cards.pop().ok_or(CardError::EmptyPile)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Cards bottom-to-top.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl fmt::Display for Pile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.cards.iter().map(Card::to_string).collect();
        write!(f, "[{}]", parts.join(" "))
    }
}
