use thiserror::Error;

use crate::solver::comm::Direction;

#[derive(Debug, Error)]
pub enum HeatgridError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Allocation failure: {0}")]
    Allocation(String),

    #[error("Transport failure on rank {rank} ({direction}): {msg}")]
    Transport {
        rank: usize,
        direction: Direction,
        msg: String,
    },

    #[error("Solve error: {0}")]
    Solve(String),
}

pub type Result<T> = std::result::Result<T, HeatgridError>;
