//! Best-first frontier of Forty Thieves states.
//!
//! One [`Frontier`] trait, two implementations over a shared state table:
//!
//! - [`MemoryFrontier`] — single process, nothing persisted
//! - [`JournalFrontier`] — append-only JSON-lines journal, replayed on open
//!
//! Claims are leased: a state claimed by a worker that never finishes it is
//! handed out again once the lease expires.

pub mod config;
pub mod error;
pub mod journal;
pub mod memory;
pub mod store;
mod table;

pub use config::StoreConfig;
pub use error::{FrontierError, Key};
pub use journal::JournalFrontier;
pub use memory::MemoryFrontier;
pub use store::{Frontier, FrontierCounts};
