use crate::card::Card;
use crate::state::PileKind;

/// How a failure should surface at an outer boundary (e.g. an HTTP layer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself was bad (4xx-equivalent).
    Client,
    /// Something failed on our side (5xx-equivalent).
    Server,
}

/// Errors from face arithmetic and pile manipulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CardError {
    #[error("cannot decrement lowest face")]
    CannotDecrementLowest,
    #[error("cannot increment highest face")]
    CannotIncrementHighest,
    #[error("empty pile")]
    EmptyPile,
}

/// Why a candidate move was rejected by the legality checker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IllegalMove {
    #[error("cards leave the stock only by flipping")]
    FromStock,
    #[error("cannot move a card onto the {0}")]
    ToReservedPile(PileKind),
    #[error("nothing to move")]
    NothingToMove,
    #[error("only an ace may start a foundation, got {0}")]
    FoundationNeedsAce(Card),
    #[error("{moving} does not match the suit of {dest}")]
    SuitMismatch { moving: Card, dest: Card },
    #[error("{moving} is not one below {dest}")]
    NotDescending { moving: Card, dest: Card },
    #[error("{moving} is not one above {dest}")]
    NotAscending { moving: Card, dest: Card },
}

/// Errors from applying transitions to a [`GameState`](crate::GameState).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("illegal move: {0}")]
    IllegalMove(#[from] IllegalMove),
    #[error("cannot flip an empty stock")]
    EmptyStock,
    #[error("no {kind} pile at index {index}")]
    NoSuchPile { kind: PileKind, index: usize },
    #[error("no card can be moved to a foundation")]
    NoFoundationableCard,
    #[error(transparent)]
    Card(#[from] CardError),
}

impl GameError {
    /// Every game error is caused by the request, never by the server.
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Client
    }
}
