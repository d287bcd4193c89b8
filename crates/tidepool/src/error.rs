//! Pool error types.

use thiserror::Error;

use crate::member::MemberId;

/// Errors that can occur during pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// No idle member became available within the fetch retry budget.
    #[error("object pool overloaded: no idle member after {attempts} attempt(s)")]
    Overload { attempts: u32 },

    /// A member was remanded that the pool does not currently lend out.
    #[error("member {0} is not borrowed from this pool")]
    NotBorrowed(MemberId),

    #[error("invalid pool configuration: {0}")]
    Config(String),

    /// Internal bookkeeping went wrong; indicates a planner bug.
    #[error("pool invariant violated: {0}")]
    Invariant(String),

    #[error("failed to load pool configuration: {0}")]
    Load(#[from] anyhow::Error),
}

pub type PoolResult<T> = Result<T, PoolError>;
