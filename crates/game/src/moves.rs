//! Transition executor and move generator.
//!
//! Executors never mutate their input: they validate against the parent,
//! then derive a child state with a fresh id and apply the change there.

use crate::error::GameError;
use crate::rules::{can_flip_stock, is_move_legal};
use crate::state::{GameState, Move, MoveRequest, PileKind, NUM_FOUNDATIONS, NUM_TABLEAUS};

/// Apply a single-card move, returning the derived child state.
///
/// On an illegal move the error is returned and nothing is created.
pub fn apply_move(state: &GameState, request: &MoveRequest) -> Result<GameState, GameError> {
    let from = state.pile(request.from_kind, request.from_index)?;
    let to = state.pile(request.to_kind, request.to_index)?;
    is_move_legal(request.from_kind, from, request.to_kind, to)?;

    let mut child = state.derive_child(Move::Card(*request));
    child.relocate_top(
        (request.from_kind, request.from_index),
        (request.to_kind, request.to_index),
    )?;
    Ok(child)
}

/// Move the top stock card onto the waste.
pub fn flip_stock(state: &GameState) -> Result<GameState, GameError> {
    if !can_flip_stock(&state.stock) {
        return Err(GameError::EmptyStock);
    }
    let mut child = state.derive_child(Move::FlipStock);
    child.relocate_top((PileKind::Stock, 0), (PileKind::Waste, 0))?;
    Ok(child)
}

/// The 20 concrete piles in generator order: tableaus 0..9, waste, stock,
/// foundations 0..7.
pub fn all_piles() -> Vec<(PileKind, usize)> {
    let mut piles = Vec::with_capacity(NUM_TABLEAUS + 2 + NUM_FOUNDATIONS);
    piles.extend((0..NUM_TABLEAUS).map(|i| (PileKind::Tableau, i)));
    piles.push((PileKind::Waste, 0));
    piles.push((PileKind::Stock, 0));
    piles.extend((0..NUM_FOUNDATIONS).map(|i| (PileKind::Foundation, i)));
    piles
}

/// Every legal single-card move from `state`.
///
/// Checks all ordered (from, to) pairs of [`all_piles`]; the outer loop is
/// the source pile. No other ordering is implied.
pub fn possible_moves(state: &GameState) -> Vec<MoveRequest> {
    let piles = all_piles();
    let mut moves = Vec::new();
    for &(from_kind, from_index) in &piles {
        let Ok(from) = state.pile(from_kind, from_index) else {
            continue;
        };
        for &(to_kind, to_index) in &piles {
            let Ok(to) = state.pile(to_kind, to_index) else {
                continue;
            };
            if is_move_legal(from_kind, from, to_kind, to).is_ok() {
                moves.push(MoveRequest::new(from_kind, from_index, to_kind, to_index));
            }
        }
    }
    moves
}

/// Apply the first legal move that puts a non-foundation card onto a foundation.
pub fn foundation_available_card(state: &GameState) -> Result<GameState, GameError> {
    possible_moves(state)
        .iter()
        .find(|m| m.from_kind != PileKind::Foundation && m.to_kind == PileKind::Foundation)
        .ok_or(GameError::NoFoundationableCard)
        .and_then(|m| apply_move(state, m))
}
