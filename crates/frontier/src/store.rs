use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use game::{GameId, GameState, StateId};

use crate::error::FrontierError;

/// Status breakdown of one game's states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierCounts {
    pub unprocessed: usize,
    pub claimed: usize,
    pub processed: usize,
    /// Lowest score among every state seen for the game.
    pub best_score: Option<u32>,
}

impl FrontierCounts {
    pub fn total(&self) -> usize {
        self.unprocessed + self.claimed + self.processed
    }

    /// Nothing left to claim and nobody still expanding.
    pub fn is_drained(&self) -> bool {
        self.unprocessed == 0 && self.claimed == 0
    }
}

/// Shared priority queue of game states, the only coordination point
/// between search workers.
///
/// `claim_next` is atomic: no two concurrent callers receive the same state.
#[async_trait]
pub trait Frontier: Send + Sync {
    /// Allocate a new game id (one above the latest).
    async fn create_game(&self) -> Result<GameId, FrontierError>;

    /// Highest game id seen, if any.
    async fn latest_game(&self) -> Result<Option<GameId>, FrontierError>;

    /// Persist a new state as unprocessed.
    ///
    /// Fails with [`FrontierError::DuplicateState`] if the id already exists.
    async fn insert(&self, state: GameState) -> Result<(), FrontierError>;

    /// Claim the best unprocessed state of a game: lowest score, then lowest
    /// move number, then oldest. `None` when nothing is claimable.
    async fn claim_next(&self, game_id: GameId) -> Result<Option<GameState>, FrontierError>;

    async fn mark_processed(&self, state_id: StateId) -> Result<(), FrontierError>;

    /// Ids of the states derived directly from `state_id`, in insertion order.
    async fn children(&self, state_id: StateId) -> Result<Vec<StateId>, FrontierError>;

    async fn root(&self, game_id: GameId) -> Result<GameState, FrontierError>;

    async fn get(&self, state_id: StateId) -> Result<GameState, FrontierError>;

    async fn counts(&self, game_id: GameId) -> Result<FrontierCounts, FrontierError>;
}
