//! Single-process frontier backed by the shared state table.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use game::{GameId, GameState, StateId};

use crate::config::StoreConfig;
use crate::error::FrontierError;
use crate::store::{Frontier, FrontierCounts};
use crate::table::{now_ms, StateTable};

/// Frontier that lives entirely in memory. Nothing survives the process.
pub struct MemoryFrontier {
    table: Mutex<StateTable>,
    lease_ms: Option<u64>,
}

impl MemoryFrontier {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            table: Mutex::new(StateTable::new(config.dedup_layouts)),
            lease_ms: config.lease_timeout().map(|d| d.as_millis() as u64),
        }
    }

    /// Override the claim lease (`None` = never expire).
    pub fn with_lease_timeout(mut self, lease: Option<Duration>) -> Self {
        self.lease_ms = lease.map(|d| d.as_millis() as u64);
        self
    }

    fn table(&self) -> MutexGuard<'_, StateTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryFrontier {
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}

#[async_trait]
impl Frontier for MemoryFrontier {
    async fn create_game(&self) -> Result<GameId, FrontierError> {
        Ok(self.table().create_game())
    }

    async fn latest_game(&self) -> Result<Option<GameId>, FrontierError> {
        Ok(self.table().latest_game())
    }

    async fn insert(&self, state: GameState) -> Result<(), FrontierError> {
        self.table().insert(state)
    }

    async fn claim_next(&self, game_id: GameId) -> Result<Option<GameState>, FrontierError> {
        let claim = self.table().claim_next(game_id, now_ms(), self.lease_ms);
        if !claim.reclaimed.is_empty() {
            tracing::warn!(
                game_id = %game_id,
                count = claim.reclaimed.len(),
                "Reclaimed states with expired leases"
            );
        }
        Ok(claim.state)
    }

    async fn mark_processed(&self, state_id: StateId) -> Result<(), FrontierError> {
        self.table().mark_processed(state_id)
    }

    async fn children(&self, state_id: StateId) -> Result<Vec<StateId>, FrontierError> {
        Ok(self.table().children(state_id))
    }

    async fn root(&self, game_id: GameId) -> Result<GameState, FrontierError> {
        self.table().root(game_id)
    }

    async fn get(&self, state_id: StateId) -> Result<GameState, FrontierError> {
        self.table().get(state_id)
    }

    async fn counts(&self, game_id: GameId) -> Result<FrontierCounts, FrontierError> {
        Ok(self.table().counts(game_id))
    }
}
