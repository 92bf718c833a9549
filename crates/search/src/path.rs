use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use frontier::{Frontier, FrontierError};
use game::{GameId, GameState, Move, StateId};

/// A state together with the ids of the states derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateView {
    pub state: GameState,
    pub children: Vec<StateId>,
}

/// Fetch a state and its children.
pub async fn state_view(
    frontier: &dyn Frontier,
    state_id: StateId,
) -> Result<StateView, FrontierError> {
    let state = frontier.get(state_id).await?;
    let children = frontier.children(state_id).await?;
    Ok(StateView { state, children })
}

/// Follow parent links from `state_id` back to the root, returning the
/// states in root-to-`state_id` order.
pub async fn solution_path(
    frontier: &dyn Frontier,
    state_id: StateId,
) -> Result<Vec<GameState>, FrontierError> {
    let mut path = Vec::new();
    let mut current = Some(state_id);
    while let Some(id) = current {
        let state = frontier.get(id).await?;
        current = state.parent_state_id;
        path.push(state);
    }
    path.reverse();
    Ok(path)
}

/// Breadth-first walk from the game's root to a stored solved state.
///
/// Visits every stored state of the game in the worst case.
pub async fn find_solved(
    frontier: &dyn Frontier,
    game_id: GameId,
) -> Result<Option<GameState>, FrontierError> {
    let root = frontier.root(game_id).await?;
    let mut queue = VecDeque::from([root.state_id]);
    while let Some(id) = queue.pop_front() {
        let state = frontier.get(id).await?;
        if state.is_solved() {
            return Ok(Some(state));
        }
        queue.extend(frontier.children(id).await?);
    }
    Ok(None)
}

/// The moves applied along a root-first path. Skips the root, which has none.
pub fn move_sequence(path: &[GameState]) -> Vec<Move> {
    path.iter().filter_map(|s| s.last_move).collect()
}
