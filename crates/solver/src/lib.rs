//! Command implementations behind the `forty-thieves` binary.
//!
//! - `solve` deals (or resumes) a game and runs the search engine on it
//! - `summary` prints frontier counts for a stored game
//! - `show` prints one stored state and its children

pub mod config;
pub mod pipeline;
pub mod results;
