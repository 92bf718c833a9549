//! Concurrent best-first search over a shared frontier.
//!
//! Workers coordinate only through [`Frontier::claim_next`]. Each one loops:
//! claim the best state, stop if it is solved, otherwise insert every child
//! and mark the state processed. A worker finishes its current expansion
//! before it looks at the stop signal again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use frontier::{Frontier, FrontierError};
use game::{apply_move, flip_stock, possible_moves, ErrorClass, GameError, GameId, GameState, PileKind};

use crate::config::SearchConfig;

/// Errors that abort a search run.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The frontier failed for a reason other than a duplicate insert.
    #[error("Frontier error: {0}")]
    Frontier(#[from] FrontierError),
    /// A generated move could not be applied.
    #[error("Game error: {0}")]
    Game(#[from] GameError),
    /// A worker task panicked or was cancelled.
    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl SearchError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Frontier(e) => e.class(),
            Self::Game(_) | Self::Worker(_) => ErrorClass::Server,
        }
    }
}

/// Why a search run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// A worker claimed a state with score 0.
    Solved,
    /// Nothing unprocessed and nothing claimed after the retries ran out.
    Exhausted,
    /// The caller's shutdown signal fired.
    Shutdown,
    /// `max_expansions` was reached.
    BudgetExhausted,
}

/// Counters aggregated over all workers of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// States claimed, expanded and marked processed.
    pub expansions: u64,
    pub children_inserted: u64,
    /// Inserts rejected as duplicates and ignored.
    pub duplicates_skipped: u64,
    /// Generated moves dropped by the foundation pruning policy.
    pub pruned_moves: u64,
    /// Empty claims that led to a backoff sleep.
    pub claim_retries: u64,
}

impl SearchStats {
    pub fn merge(&mut self, other: &SearchStats) {
        self.expansions += other.expansions;
        self.children_inserted += other.children_inserted;
        self.duplicates_skipped += other.duplicates_skipped;
        self.pruned_moves += other.pruned_moves;
        self.claim_retries += other.claim_retries;
    }
}

/// Result of [`SearchEngine::run`].
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub reason: TerminationReason,
    /// The solved state, when `reason` is `Solved`.
    pub solution: Option<GameState>,
    pub stats: SearchStats,
    pub wall_time_ms: u64,
}

/// How one worker left its loop.
#[derive(Debug)]
enum WorkerExit {
    Solved(GameState),
    Exhausted,
    Shutdown,
    Budget,
    /// Another worker asked everyone to stop.
    Stopped,
}

#[derive(Debug)]
struct WorkerReport {
    exit: WorkerExit,
    stats: SearchStats,
}

// ---------------------------------------------------------------------------
// SearchEngine
// ---------------------------------------------------------------------------

/// Worker-pool driver for one game.
#[derive(Clone)]
pub struct SearchEngine {
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(config: SearchConfig) -> Self {
        config.validate();
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run workers against `game_id` until a solution, exhaustion, the
    /// expansion budget, or `shutdown` turning `true`.
    ///
    /// Returns after every worker has finished its current iteration. A
    /// store failure in any worker stops the others and is returned.
    pub async fn run(
        &self,
        frontier: Arc<dyn Frontier>,
        game_id: GameId,
        shutdown: watch::Receiver<bool>,
    ) -> Result<SearchOutcome, SearchError> {
        let start = Instant::now();
        let num_workers = self.config.effective_workers();
        let (stop_tx, stop_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            frontier,
            game_id,
            config: self.config.clone(),
            expansions: AtomicU64::new(0),
            stop: stop_tx,
        });

        tracing::info!(game_id = %game_id, workers = num_workers, "Starting search");

        let handles: Vec<_> = (0..num_workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    shared: Arc::clone(&shared),
                    shutdown: shutdown.clone(),
                    stop: stop_rx.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        let mut reports = Vec::with_capacity(num_workers);
        let mut first_error = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(report)) => reports.push(report),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    shared.stop.send_replace(true);
                    first_error.get_or_insert(SearchError::Worker(e));
                }
            }
        }
        if let Some(e) = first_error {
            tracing::error!(game_id = %game_id, error = %e, "Search aborted");
            return Err(e);
        }

        let outcome = summarize(reports, start.elapsed().as_millis() as u64);
        tracing::info!(
            game_id = %game_id,
            reason = ?outcome.reason,
            expansions = outcome.stats.expansions,
            inserted = outcome.stats.children_inserted,
            duplicates = outcome.stats.duplicates_skipped,
            time_ms = outcome.wall_time_ms,
            "Search finished"
        );
        Ok(outcome)
    }
}

/// Fold worker reports into one outcome. A solution wins over a spent
/// budget, which wins over shutdown, which wins over exhaustion.
fn summarize(reports: Vec<WorkerReport>, wall_time_ms: u64) -> SearchOutcome {
    let mut stats = SearchStats::default();
    let mut solution = None;
    let mut budget = false;
    let mut shutdown = false;
    for report in reports {
        stats.merge(&report.stats);
        match report.exit {
            WorkerExit::Solved(state) => {
                solution.get_or_insert(state);
            }
            WorkerExit::Budget => budget = true,
            WorkerExit::Shutdown => shutdown = true,
            WorkerExit::Exhausted | WorkerExit::Stopped => {}
        }
    }
    let reason = if solution.is_some() {
        TerminationReason::Solved
    } else if budget {
        TerminationReason::BudgetExhausted
    } else if shutdown {
        TerminationReason::Shutdown
    } else {
        TerminationReason::Exhausted
    };
    SearchOutcome {
        reason,
        solution,
        stats,
        wall_time_ms,
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

struct Shared {
    frontier: Arc<dyn Frontier>,
    game_id: GameId,
    config: SearchConfig,
    /// Expansions completed across all workers.
    expansions: AtomicU64,
    /// Internal fan-out: solution found, budget spent, or a worker failed.
    stop: watch::Sender<bool>,
}

struct Worker {
    id: usize,
    shared: Arc<Shared>,
    shutdown: watch::Receiver<bool>,
    stop: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self) -> Result<WorkerReport, SearchError> {
        let mut stats = SearchStats::default();
        let result = self.run_loop(&mut stats).await;
        match result {
            Ok(exit) => {
                tracing::debug!(worker = self.id, exit = ?exit, expansions = stats.expansions, "Worker done");
                Ok(WorkerReport { exit, stats })
            }
            Err(e) => {
                tracing::error!(worker = self.id, error = %e, "Worker failed");
                self.shared.stop.send_replace(true);
                Err(e)
            }
        }
    }

    async fn run_loop(&mut self, stats: &mut SearchStats) -> Result<WorkerExit, SearchError> {
        let shared = Arc::clone(&self.shared);
        let config = &shared.config;
        let frontier = &shared.frontier;
        let game_id = shared.game_id;
        let initial_backoff = Duration::from_millis(config.retry_backoff_ms);
        let max_backoff = Duration::from_millis(config.max_backoff_ms.max(config.retry_backoff_ms));
        let mut backoff = initial_backoff;
        let mut attempts = 0u32;

        loop {
            if *self.shutdown.borrow() {
                return Ok(WorkerExit::Shutdown);
            }
            if *self.stop.borrow() {
                return Ok(WorkerExit::Stopped);
            }
            if config.max_expansions > 0
                && shared.expansions.load(Ordering::SeqCst) >= config.max_expansions
            {
                shared.stop.send_replace(true);
                return Ok(WorkerExit::Budget);
            }
            // Store calls rarely suspend, so give the runtime a turn here or
            // signal handlers and timers on the same threads never run.
            tokio::task::yield_now().await;

            let Some(state) = frontier.claim_next(game_id).await? else {
                if attempts >= config.claim_retries {
                    let counts = frontier.counts(game_id).await?;
                    if counts.is_drained() {
                        tracing::info!(worker = self.id, "Frontier exhausted");
                        return Ok(WorkerExit::Exhausted);
                    }
                    // Someone is still expanding or holds a lease; keep waiting.
                    attempts = 0;
                }
                attempts += 1;
                stats.claim_retries += 1;
                if !self.sleep_unless_stopped(backoff).await {
                    continue;
                }
                backoff = (backoff * 2).min(max_backoff);
                continue;
            };
            attempts = 0;
            backoff = initial_backoff;

            if state.is_solved() {
                frontier.mark_processed(state.state_id).await?;
                tracing::info!(
                    worker = self.id,
                    state_id = %state.state_id,
                    move_number = state.move_number,
                    "Solution found"
                );
                if config.stop_on_solution {
                    shared.stop.send_replace(true);
                }
                return Ok(WorkerExit::Solved(state));
            }

            expand(frontier.as_ref(), config, &state, stats).await?;
            shared.expansions.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Sleep for `duration`, waking early on shutdown or stop. Returns
    /// `true` if the full duration elapsed.
    async fn sleep_unless_stopped(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            Ok(()) = self.shutdown.changed() => false,
            Ok(()) = self.stop.changed() => false,
        }
    }
}

/// Insert every child of `state`, then mark it processed.
///
/// Duplicate inserts are counted and skipped; any other store error aborts.
pub async fn expand(
    frontier: &dyn Frontier,
    config: &SearchConfig,
    state: &GameState,
    stats: &mut SearchStats,
) -> Result<(), SearchError> {
    tracing::debug!(
        state_id = %state.state_id,
        score = state.score,
        move_number = state.move_number,
        "Expanding state"
    );

    match flip_stock(state) {
        Ok(child) => persist(frontier, child, stats).await?,
        Err(GameError::EmptyStock) => {}
        Err(e) => return Err(e.into()),
    }

    for request in possible_moves(state) {
        if config.prune_foundation_moves && request.from_kind == PileKind::Foundation {
            stats.pruned_moves += 1;
            continue;
        }
        let child = apply_move(state, &request)?;
        persist(frontier, child, stats).await?;
    }

    frontier.mark_processed(state.state_id).await?;
    stats.expansions += 1;
    Ok(())
}

async fn persist(
    frontier: &dyn Frontier,
    child: GameState,
    stats: &mut SearchStats,
) -> Result<(), SearchError> {
    let child_id = child.state_id;
    match frontier.insert(child).await {
        Ok(()) => stats.children_inserted += 1,
        Err(e) if e.is_duplicate() => {
            stats.duplicates_skipped += 1;
            tracing::debug!(state_id = %child_id, "Duplicate state, skipping");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
