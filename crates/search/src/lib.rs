//! Concurrent best-first search for Forty Thieves.
//!
//! Workers share nothing but a [`frontier::Frontier`]: each claims the
//! lowest-score state, expands it through the game's move generator, and
//! persists the children. Uses trait-based abstraction so the driver can be
//! tested with mock frontiers.
//!
//! # Key types
//!
//! - [`SearchEngine`] — the worker-pool driver
//! - [`SearchConfig`] — configuration loaded from TOML
//! - [`SearchOutcome`] / [`TerminationReason`] / [`SearchStats`] — run results
//! - [`solution_path`] / [`state_view`] — walking the stored state graph

pub mod config;
pub mod engine;
pub mod mocks;
pub mod path;

pub use config::SearchConfig;
pub use engine::{expand, SearchEngine, SearchError, SearchOutcome, SearchStats, TerminationReason};
pub use path::{find_solved, move_sequence, solution_path, state_view, StateView};
