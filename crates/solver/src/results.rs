//! Result types written by `solve --output` and printed by `summary --json`.

use std::path::Path;

use frontier::FrontierCounts;
use game::{GameId, GameState, Move, StateId};
use search::{move_sequence, SearchOutcome, SearchStats, TerminationReason};
use serde::{Deserialize, Serialize};

/// Report for one `solve` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub game_id: GameId,
    /// Why the run ended.
    pub reason: TerminationReason,
    /// Whether the game was started by this run or resumed.
    pub resumed: bool,
    pub workers: usize,
    pub stats: SearchStats,
    pub wall_time_ms: u64,
    /// Store counts for the game after the run.
    pub counts: FrontierCounts,
    /// Present only when `reason` is `solved`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<SolutionReport>,
}

/// The winning line, root first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionReport {
    pub solved_state_id: StateId,
    /// State ids from the root deal to the solved state.
    pub state_ids: Vec<StateId>,
    /// Moves in application order; one fewer than `state_ids`.
    pub moves: Vec<Move>,
}

impl SolutionReport {
    /// Build from a root-first path as returned by [`search::solution_path`].
    ///
    /// Returns `None` for an empty path.
    pub fn from_path(path: &[GameState]) -> Option<Self> {
        let last = path.last()?;
        Some(Self {
            solved_state_id: last.state_id,
            state_ids: path.iter().map(|s| s.state_id).collect(),
            moves: move_sequence(path),
        })
    }

    pub fn num_moves(&self) -> usize {
        self.moves.len()
    }
}

impl RunReport {
    pub fn new(
        game_id: GameId,
        outcome: &SearchOutcome,
        resumed: bool,
        workers: usize,
        counts: FrontierCounts,
        solution: Option<SolutionReport>,
    ) -> Self {
        Self {
            game_id,
            reason: outcome.reason,
            resumed,
            workers,
            stats: outcome.stats.clone(),
            wall_time_ms: outcome.wall_time_ms,
            counts,
            solution,
        }
    }

    /// Expansions per second of wall time. Returns 0.0 for a zero-length run.
    pub fn expansion_rate(&self) -> f64 {
        if self.wall_time_ms == 0 {
            return 0.0;
        }
        self.stats.expansions as f64 * 1000.0 / self.wall_time_ms as f64
    }
}

/// Per-game view printed by `summary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSummary {
    pub game_id: GameId,
    pub counts: FrontierCounts,
    /// Score of the root deal.
    pub root_score: u32,
    pub root_state_id: StateId,
}

impl GameSummary {
    /// Percentage of cards on foundations in the best stored state.
    pub fn best_progress_pct(&self) -> f64 {
        match self.counts.best_score {
            Some(best) if self.root_score > 0 => {
                100.0 * (self.root_score - best.min(self.root_score)) as f64
                    / self.root_score as f64
            }
            _ => 0.0,
        }
    }
}

/// Write `value` as pretty JSON, creating parent directories as needed.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    tracing::info!(path = %path.display(), "Wrote report");
    Ok(())
}
