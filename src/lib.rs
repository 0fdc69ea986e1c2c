//! Rookie: a casual-strength chess move selector. Book lookup, time-boxed
//! alpha-beta search over a static (or learned) evaluator, and a weighted
//! pick among the top candidates.
pub mod board;
pub mod book;
pub mod engine;
pub mod error;
pub mod eval;
pub mod perft;
pub mod search;
pub mod uci;

pub use board::{Position, Rules};
pub use engine::{Engine, EngineConfig, MoveChoice, MoveSource};
pub use error::EngineError;
