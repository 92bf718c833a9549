//! In-process state table shared by every frontier implementation.
//!
//! Holds every state of every game plus one min-heap per game of the
//! unprocessed ones. Heap entries are never removed eagerly: each push gets a
//! fresh ticket and a popped entry is honoured only if its ticket is still
//! current and the state is still unprocessed.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use game::{GameId, GameState, StateId, StateStatus};

use crate::error::{FrontierError, Key};
use crate::store::FrontierCounts;

/// Milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Heap ordering: lowest score, then lowest move number, then insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    score: u32,
    move_number: u32,
    seq: u64,
    ticket: u64,
    state_id: StateId,
}

#[derive(Debug)]
struct Entry {
    state: GameState,
    seq: u64,
    ticket: u64,
    claimed_at_ms: Option<u64>,
}

/// Result of a claim attempt.
#[derive(Debug, Default)]
pub(crate) struct Claim {
    /// Stale claims released back to unprocessed before selecting.
    pub reclaimed: Vec<StateId>,
    pub state: Option<GameState>,
}

#[derive(Debug, Default)]
pub(crate) struct StateTable {
    entries: HashMap<StateId, Entry>,
    children: HashMap<StateId, Vec<StateId>>,
    roots: HashMap<GameId, StateId>,
    queues: HashMap<GameId, BinaryHeap<Reverse<QueueKey>>>,
    claimed: HashMap<GameId, HashSet<StateId>>,
    stats: HashMap<GameId, FrontierCounts>,
    fingerprints: HashSet<(GameId, u64)>,
    latest_game: Option<GameId>,
    next_seq: u64,
    next_ticket: u64,
    dedup_layouts: bool,
}

impl StateTable {
    pub fn new(dedup_layouts: bool) -> Self {
        Self {
            dedup_layouts,
            ..Default::default()
        }
    }

    pub fn create_game(&mut self) -> GameId {
        let id = GameId(self.latest_game.map_or(1, |g| g.0 + 1));
        self.register_game(id);
        id
    }

    pub fn register_game(&mut self, id: GameId) {
        if self.latest_game.map_or(true, |latest| id > latest) {
            self.latest_game = Some(id);
        }
        self.stats.entry(id).or_default();
    }

    pub fn latest_game(&self) -> Option<GameId> {
        self.latest_game
    }

    pub fn contains(&self, id: StateId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Reject id collisions and, with layout dedup on, known layouts.
    pub fn check_insert(&self, state: &GameState) -> Result<(), FrontierError> {
        if self.entries.contains_key(&state.state_id) {
            return Err(FrontierError::DuplicateState(state.state_id));
        }
        if self.dedup_layouts
            && self
                .fingerprints
                .contains(&(state.game_id, state.layout_fingerprint()))
        {
            return Err(FrontierError::DuplicateState(state.state_id));
        }
        Ok(())
    }

    pub fn insert(&mut self, state: GameState) -> Result<(), FrontierError> {
        self.check_insert(&state)?;
        self.admit(state);
        Ok(())
    }

    /// Store a state as unprocessed without any collision check.
    pub fn admit(&mut self, mut state: GameState) {
        let game_id = state.game_id;
        let state_id = state.state_id;
        self.register_game(game_id);
        if self.dedup_layouts {
            self.fingerprints
                .insert((game_id, state.layout_fingerprint()));
        }
        match state.parent_state_id {
            Some(parent) => self.children.entry(parent).or_default().push(state_id),
            None => {
                self.roots.entry(game_id).or_insert(state_id);
            }
        }

        state.status = StateStatus::Unprocessed;
        let stats = self.stats.entry(game_id).or_default();
        stats.unprocessed += 1;
        stats.best_score = Some(stats.best_score.map_or(state.score, |b| b.min(state.score)));

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            state_id,
            Entry {
                state,
                seq,
                ticket: 0,
                claimed_at_ms: None,
            },
        );
        self.enqueue(state_id);
    }

    fn enqueue(&mut self, id: StateId) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        self.next_ticket += 1;
        entry.ticket = self.next_ticket;
        let key = QueueKey {
            score: entry.state.score,
            move_number: entry.state.move_number,
            seq: entry.seq,
            ticket: entry.ticket,
            state_id: id,
        };
        self.queues
            .entry(entry.state.game_id)
            .or_default()
            .push(Reverse(key));
    }

    /// Release stale leases for `game_id`, then claim the best unprocessed state.
    pub fn claim_next(&mut self, game_id: GameId, now_ms: u64, lease_ms: Option<u64>) -> Claim {
        let reclaimed = match lease_ms {
            Some(lease) => self.reclaim_stale(game_id, now_ms, lease),
            None => Vec::new(),
        };

        let Some(queue) = self.queues.get_mut(&game_id) else {
            return Claim {
                reclaimed,
                state: None,
            };
        };
        while let Some(Reverse(key)) = queue.pop() {
            let Some(entry) = self.entries.get_mut(&key.state_id) else {
                continue;
            };
            if entry.ticket != key.ticket || entry.state.status != StateStatus::Unprocessed {
                continue;
            }
            entry.state.status = StateStatus::Claimed;
            entry.claimed_at_ms = Some(now_ms);
            self.claimed.entry(game_id).or_default().insert(key.state_id);
            let stats = self.stats.entry(game_id).or_default();
            stats.unprocessed -= 1;
            stats.claimed += 1;
            return Claim {
                reclaimed,
                state: Some(entry.state.clone()),
            };
        }
        Claim {
            reclaimed,
            state: None,
        }
    }

    fn reclaim_stale(&mut self, game_id: GameId, now_ms: u64, lease_ms: u64) -> Vec<StateId> {
        let entries = &self.entries;
        let stale: Vec<StateId> = self
            .claimed
            .get(&game_id)
            .into_iter()
            .flatten()
            .filter(|id| {
                entries
                    .get(id)
                    .and_then(|e| e.claimed_at_ms)
                    .is_some_and(|at| now_ms.saturating_sub(at) >= lease_ms)
            })
            .copied()
            .collect();
        for &id in &stale {
            self.release(id);
        }
        stale
    }

    /// Mark a state claimed at `at_ms` (journal replay).
    pub fn apply_claim(&mut self, id: StateId, at_ms: u64) -> Result<(), FrontierError> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(FrontierError::NotFound(Key::State(id)))?;
        if entry.state.status != StateStatus::Unprocessed {
            return Ok(());
        }
        let game_id = entry.state.game_id;
        entry.state.status = StateStatus::Claimed;
        entry.claimed_at_ms = Some(at_ms);
        self.claimed.entry(game_id).or_default().insert(id);
        let stats = self.stats.entry(game_id).or_default();
        stats.unprocessed -= 1;
        stats.claimed += 1;
        Ok(())
    }

    /// Return a claimed state to the queue. No-op for any other status.
    pub fn release(&mut self, id: StateId) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        if entry.state.status != StateStatus::Claimed {
            return;
        }
        let game_id = entry.state.game_id;
        entry.state.status = StateStatus::Unprocessed;
        entry.claimed_at_ms = None;
        if let Some(set) = self.claimed.get_mut(&game_id) {
            set.remove(&id);
        }
        let stats = self.stats.entry(game_id).or_default();
        stats.claimed -= 1;
        stats.unprocessed += 1;
        self.enqueue(id);
    }

    /// Every currently claimed state across all games.
    pub fn claimed_ids(&self) -> Vec<StateId> {
        self.claimed.values().flatten().copied().collect()
    }

    /// Idempotent: marking a processed state again is a no-op.
    pub fn mark_processed(&mut self, id: StateId) -> Result<(), FrontierError> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(FrontierError::NotFound(Key::State(id)))?;
        let previous = entry.state.status;
        if previous == StateStatus::Processed {
            return Ok(());
        }
        let game_id = entry.state.game_id;
        entry.state.status = StateStatus::Processed;
        entry.claimed_at_ms = None;
        let stats = self.stats.entry(game_id).or_default();
        match previous {
            StateStatus::Unprocessed => stats.unprocessed -= 1,
            StateStatus::Claimed => {
                stats.claimed -= 1;
                if let Some(set) = self.claimed.get_mut(&game_id) {
                    set.remove(&id);
                }
            }
            StateStatus::Processed => {}
        }
        stats.processed += 1;
        Ok(())
    }

    pub fn get(&self, id: StateId) -> Result<GameState, FrontierError> {
        self.entries
            .get(&id)
            .map(|e| e.state.clone())
            .ok_or(FrontierError::NotFound(Key::State(id)))
    }

    pub fn children(&self, id: StateId) -> Vec<StateId> {
        self.children.get(&id).cloned().unwrap_or_default()
    }

    pub fn root(&self, game_id: GameId) -> Result<GameState, FrontierError> {
        let id = self
            .roots
            .get(&game_id)
            .ok_or(FrontierError::NotFound(Key::Root(game_id)))?;
        self.get(*id)
    }

    pub fn counts(&self, game_id: GameId) -> FrontierCounts {
        self.stats.get(&game_id).copied().unwrap_or_default()
    }
}
