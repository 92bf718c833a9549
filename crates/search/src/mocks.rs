//! Mock frontiers for testing the driver without a durable store.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use frontier::{Frontier, FrontierCounts, FrontierError, MemoryFrontier};
use game::{GameId, GameState, StateId};

// ---------------------------------------------------------------------------
// FaultyFrontier
// ---------------------------------------------------------------------------

/// What a faulty insert returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// An I/O failure, which the driver must treat as fatal.
    Store,
    /// A duplicate, which the driver must skip.
    Duplicate,
}

/// Mock frontier over a [`MemoryFrontier`] that injects failures.
///
/// - inserts past a threshold fail with a chosen [`Fault`]
/// - the first few claims report an empty frontier even when it is not
#[derive(Default)]
pub struct FaultyFrontier {
    inner: MemoryFrontier,
    insert_fault: Option<(usize, Fault)>,
    empty_claims: usize,
    inserts: AtomicUsize,
    claims: AtomicUsize,
}

impl FaultyFrontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts number `after` and later fail with `fault`.
    pub fn fail_inserts_after(mut self, after: usize, fault: Fault) -> Self {
        self.insert_fault = Some((after, fault));
        self
    }

    /// The first `n` claims return `None` regardless of content.
    pub fn with_empty_claims(mut self, n: usize) -> Self {
        self.empty_claims = n;
        self
    }

    /// Insert directly into the wrapped store, bypassing faults.
    pub async fn seed(&self, state: GameState) -> Result<(), FrontierError> {
        self.inner.insert(state).await
    }
}

#[async_trait]
impl Frontier for FaultyFrontier {
    async fn create_game(&self) -> Result<GameId, FrontierError> {
        self.inner.create_game().await
    }

    async fn latest_game(&self) -> Result<Option<GameId>, FrontierError> {
        self.inner.latest_game().await
    }

    async fn insert(&self, state: GameState) -> Result<(), FrontierError> {
        let n = self.inserts.fetch_add(1, Ordering::SeqCst);
        match self.insert_fault {
            Some((after, Fault::Store)) if n >= after => Err(FrontierError::Store(
                io::Error::new(io::ErrorKind::Other, "injected store failure"),
            )),
            Some((after, Fault::Duplicate)) if n >= after => {
                Err(FrontierError::DuplicateState(state.state_id))
            }
            _ => self.inner.insert(state).await,
        }
    }

    async fn claim_next(&self, game_id: GameId) -> Result<Option<GameState>, FrontierError> {
        if self.claims.fetch_add(1, Ordering::SeqCst) < self.empty_claims {
            return Ok(None);
        }
        self.inner.claim_next(game_id).await
    }

    async fn mark_processed(&self, state_id: StateId) -> Result<(), FrontierError> {
        self.inner.mark_processed(state_id).await
    }

    async fn children(&self, state_id: StateId) -> Result<Vec<StateId>, FrontierError> {
        self.inner.children(state_id).await
    }

    async fn root(&self, game_id: GameId) -> Result<GameState, FrontierError> {
        self.inner.root(game_id).await
    }

    async fn get(&self, state_id: StateId) -> Result<GameState, FrontierError> {
        self.inner.get(state_id).await
    }

    async fn counts(&self, game_id: GameId) -> Result<FrontierCounts, FrontierError> {
        self.inner.counts(game_id).await
    }
}

// ---------------------------------------------------------------------------
// CountingFrontier
// ---------------------------------------------------------------------------

/// Call counts recorded by [`CountingFrontier`].
#[derive(Debug, Default)]
pub struct CallCounts {
    inserts: AtomicUsize,
    claims: AtomicUsize,
    empty_claims: AtomicUsize,
    processed: AtomicUsize,
}

impl CallCounts {
    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn claims(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }

    /// Claims that found nothing to hand out.
    pub fn empty_claims(&self) -> usize {
        self.empty_claims.load(Ordering::SeqCst)
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }
}

/// Mock frontier that forwards to another frontier and counts calls.
pub struct CountingFrontier {
    inner: Arc<dyn Frontier>,
    counts: Arc<CallCounts>,
}

impl CountingFrontier {
    pub fn new(inner: Arc<dyn Frontier>) -> Self {
        Self {
            inner,
            counts: Arc::new(CallCounts::default()),
        }
    }

    /// Shared handle to the counters, readable after the frontier is moved.
    pub fn counts_handle(&self) -> Arc<CallCounts> {
        Arc::clone(&self.counts)
    }
}

#[async_trait]
impl Frontier for CountingFrontier {
    async fn create_game(&self) -> Result<GameId, FrontierError> {
        self.inner.create_game().await
    }

    async fn latest_game(&self) -> Result<Option<GameId>, FrontierError> {
        self.inner.latest_game().await
    }

    async fn insert(&self, state: GameState) -> Result<(), FrontierError> {
        self.counts.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(state).await
    }

    async fn claim_next(&self, game_id: GameId) -> Result<Option<GameState>, FrontierError> {
        self.counts.claims.fetch_add(1, Ordering::SeqCst);
        let claimed = self.inner.claim_next(game_id).await?;
        if claimed.is_none() {
            self.counts.empty_claims.fetch_add(1, Ordering::SeqCst);
        }
        Ok(claimed)
    }

    async fn mark_processed(&self, state_id: StateId) -> Result<(), FrontierError> {
        self.counts.processed.fetch_add(1, Ordering::SeqCst);
        self.inner.mark_processed(state_id).await
    }

    async fn children(&self, state_id: StateId) -> Result<Vec<StateId>, FrontierError> {
        self.inner.children(state_id).await
    }

    async fn root(&self, game_id: GameId) -> Result<GameState, FrontierError> {
        self.inner.root(game_id).await
    }

    async fn get(&self, state_id: StateId) -> Result<GameState, FrontierError> {
        self.inner.get(state_id).await
    }

    async fn counts(&self, game_id: GameId) -> Result<FrontierCounts, FrontierError> {
        self.inner.counts(game_id).await
    }
}
