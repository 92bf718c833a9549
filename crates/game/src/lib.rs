//! Forty Thieves card model, legality rules, and transitions.
//!
//! Two shuffled decks: 40 cards dealt face-up across ten tableaus, the rest
//! in the stock. Cards build up in suit on eight foundations and down in
//! suit on tableaus. A state is solved when every card is on a foundation.
//!
//! # Key types
//!
//! - [`GameState`] — one immutable board version with lineage and status
//! - [`MoveRequest`] / [`Move`] — a single-card move and the transition record
//! - [`is_move_legal`] — the pure legality predicate over two piles
//! - [`apply_move`] / [`flip_stock`] — executors that derive child states
//! - [`possible_moves`] — deterministic generator of every legal move

pub mod card;
pub mod error;
pub mod moves;
pub mod rules;
pub mod state;

pub use card::{standard_deck, Card, Face, Pile, Suit};
pub use error::{CardError, ErrorClass, GameError, IllegalMove};
pub use moves::{all_piles, apply_move, flip_stock, foundation_available_card, possible_moves};
pub use rules::{can_flip_stock, is_move_legal};
pub use state::{
    GameId, GameState, Move, MoveRequest, ParseStateIdError, PileKind, StateId, StateStatus,
    CARDS_PER_TABLEAU, NUM_FOUNDATIONS, NUM_TABLEAUS, TOTAL_CARDS,
};
