//! Immutable-per-version board snapshots and their identities.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::card::{standard_deck, Pile};
use crate::error::GameError;

/// Number of tableau piles.
pub const NUM_TABLEAUS: usize = 10;
/// Number of foundation piles (one per suit per deck).
pub const NUM_FOUNDATIONS: usize = 8;
/// Cards dealt face-up to each tableau at the start.
pub const CARDS_PER_TABLEAU: usize = 4;
/// Two full decks.
pub const TOTAL_CARDS: usize = 104;

/// Which family of pile a move addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PileKind {
    Stock,
    Waste,
    Foundation,
    Tableau,
}

impl fmt::Display for PileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stock => write!(f, "stock"),
            Self::Waste => write!(f, "waste"),
            Self::Foundation => write!(f, "foundation"),
            Self::Tableau => write!(f, "tableau"),
        }
    }
}

/// A single-card move between two concrete piles.
///
/// The index is ignored for the stock and the waste, which are unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveRequest {
    pub from_kind: PileKind,
    pub from_index: usize,
    pub to_kind: PileKind,
    pub to_index: usize,
}

impl MoveRequest {
    pub fn new(from_kind: PileKind, from_index: usize, to_kind: PileKind, to_index: usize) -> Self {
        Self {
            from_kind,
            from_index,
            to_kind,
            to_index,
        }
    }
}

impl fmt::Display for MoveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} -> {}-{}",
            self.from_kind, self.from_index, self.to_kind, self.to_index
        )
    }
}

/// The transition that produced a state from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Move {
    FlipStock,
    Card(MoveRequest),
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FlipStock => write!(f, "flip stock"),
            Self::Card(request) => write!(f, "{request}"),
        }
    }
}

/// Processing status of a state in the frontier.
///
/// Transitions only forward: Unprocessed → Claimed → Processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateStatus {
    Unprocessed,
    Claimed,
    Processed,
}

impl fmt::Display for StateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unprocessed => write!(f, "unprocessed"),
            Self::Claimed => write!(f, "claimed"),
            Self::Processed => write!(f, "processed"),
        }
    }
}

/// Identifier of one logical game (one deal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Globally unique, randomly assigned state identifier.
///
/// Rendered as 32 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StateId(u128);

impl StateId {
    /// A fresh random identifier.
    pub fn random() -> Self {
        Self(rand::thread_rng().gen())
    }

    pub fn from_u128(raw: u128) -> Self {
        Self(raw)
    }

    pub fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Error parsing a [`StateId`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid state id '{0}': expected 32 hex digits")]
pub struct ParseStateIdError(String);

impl FromStr for StateId {
    type Err = ParseStateIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 {
            return Err(ParseStateIdError(s.to_string()));
        }
        u128::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| ParseStateIdError(s.to_string()))
    }
}

impl TryFrom<String> for StateId {
    type Error = ParseStateIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StateId> for String {
    fn from(id: StateId) -> Self {
        id.to_string()
    }
}

/// One version of a board.
///
/// Card layout is never mutated once a state exists; transitions derive a
/// new state with a fresh id. Only `status` changes, and only inside the
/// frontier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub game_id: GameId,
    pub state_id: StateId,
    /// `None` for the root of a game.
    pub parent_state_id: Option<StateId>,
    /// 0 for the root, parent + 1 otherwise.
    pub move_number: u32,
    pub stock: Pile,
    pub waste: Pile,
    pub foundations: [Pile; NUM_FOUNDATIONS],
    pub tableaus: [Pile; NUM_TABLEAUS],
    /// Cards not in any foundation. 0 means solved.
    pub score: u32,
    pub status: StateStatus,
    /// Transition that produced this state from its parent.
    #[serde(default)]
    pub last_move: Option<Move>,
}

impl GameState {
    /// Deal a new game from two decks shuffled by the thread-local RNG.
    pub fn deal(game_id: GameId) -> Self {
        Self::deal_with_rng(game_id, &mut rand::thread_rng())
    }

    /// Deal a reproducible game from a seed.
    pub fn deal_seeded(game_id: GameId, seed: u64) -> Self {
        Self::deal_with_rng(game_id, &mut StdRng::seed_from_u64(seed))
    }

    /// Deal a new root state: shuffle two decks into the stock, then move
    /// [`CARDS_PER_TABLEAU`] cards from the top of the stock onto each tableau.
    pub fn deal_with_rng<R: Rng + ?Sized>(game_id: GameId, rng: &mut R) -> Self {
        let mut cards = standard_deck();
        cards.extend(standard_deck());
        cards.shuffle(rng);

        let mut state = Self {
            game_id,
            state_id: StateId::random(),
            parent_state_id: None,
            move_number: 0,
            stock: Pile::from_cards(cards),
            waste: Pile::new(),
            foundations: Default::default(),
            tableaus: Default::default(),
            score: 0,
            status: StateStatus::Unprocessed,
            last_move: None,
        };

        for tableau in 0..NUM_TABLEAUS {
            for _ in 0..CARDS_PER_TABLEAU {
                // The stock holds 104 cards and we take 40.
                if let Ok(card) = state.stock.pop() {
                    state.tableaus[tableau].push(card);
                }
            }
        }
        state.score = state.compute_score();

        tracing::debug!(
            game_id = %game_id,
            state_id = %state.state_id,
            stock = state.stock.len(),
            "Dealt new game"
        );
        state
    }

    /// Cards outside the foundations.
    pub fn compute_score(&self) -> u32 {
        let outside = self.stock.len()
            + self.waste.len()
            + self.tableaus.iter().map(Pile::len).sum::<usize>();
        outside as u32
    }

    /// Total number of cards across every pile. Always [`TOTAL_CARDS`].
    pub fn card_count(&self) -> usize {
        self.stock.len()
            + self.waste.len()
            + self.foundations.iter().map(Pile::len).sum::<usize>()
            + self.tableaus.iter().map(Pile::len).sum::<usize>()
    }

    pub fn is_solved(&self) -> bool {
        self.score == 0
    }

    /// Look up a concrete pile.
    pub fn pile(&self, kind: PileKind, index: usize) -> Result<&Pile, GameError> {
        match kind {
            PileKind::Stock => Ok(&self.stock),
            PileKind::Waste => Ok(&self.waste),
            PileKind::Foundation => self
                .foundations
                .get(index)
                .ok_or(GameError::NoSuchPile { kind, index }),
            PileKind::Tableau => self
                .tableaus
                .get(index)
                .ok_or(GameError::NoSuchPile { kind, index }),
        }
    }

    pub(crate) fn pile_mut(&mut self, kind: PileKind, index: usize) -> Result<&mut Pile, GameError> {
        match kind {
            PileKind::Stock => Ok(&mut self.stock),
            PileKind::Waste => Ok(&mut self.waste),
            PileKind::Foundation => self
                .foundations
                .get_mut(index)
                .ok_or(GameError::NoSuchPile { kind, index }),
            PileKind::Tableau => self
                .tableaus
                .get_mut(index)
                .ok_or(GameError::NoSuchPile { kind, index }),
        }
    }

    /// Copy this state as the starting point of a child: fresh id, linked
    /// parent, next move number, unprocessed.
    pub(crate) fn derive_child(&self, last_move: Move) -> Self {
        let mut child = self.clone();
        child.state_id = StateId::random();
        child.parent_state_id = Some(self.state_id);
        child.move_number = self.move_number + 1;
        child.status = StateStatus::Unprocessed;
        child.last_move = Some(last_move);
        child
    }

    /// Relocate the top card of one pile onto another without checking legality.
    pub(crate) fn relocate_top(
        &mut self,
        from: (PileKind, usize),
        to: (PileKind, usize),
    ) -> Result<(), GameError> {
        let card = self.pile_mut(from.0, from.1)?.pop()?;
        self.pile_mut(to.0, to.1)?.push(card);
        self.score = self.compute_score();
        Ok(())
    }

    /// Hash of the card layout only (ignores ids, lineage, score and status).
    ///
    /// Two states with the same fingerprint almost certainly hold the same
    /// cards in the same piles.
    pub fn layout_fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.stock.hash(&mut hasher);
        self.waste.hash(&mut hasher);
        self.foundations.hash(&mut hasher);
        self.tableaus.hash(&mut hasher);
        hasher.finish()
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "game {} state {} (move {}, score {})",
            self.game_id, self.state_id, self.move_number, self.score
        )?;
        writeln!(f, "Stock: {}", self.stock.len())?;
        writeln!(f, "Waste: {}", self.waste)?;
        writeln!(f, "Foundations")?;
        for foundation in &self.foundations {
            writeln!(f, " :{foundation}")?;
        }
        writeln!(f, "Tableaus")?;
        for tableau in &self.tableaus {
            writeln!(f, " :{tableau}")?;
        }
        Ok(())
    }
}
