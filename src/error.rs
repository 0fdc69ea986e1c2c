use thiserror::Error;

use crate::board::BoardError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A move request arrived while another one was still being computed.
    #[error("engine is already thinking")]
    Busy,
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("invalid engine config: {0}")]
    Config(String),
}
