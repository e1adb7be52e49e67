//! Sync driver errors.

use crate::{engine::ExecutionClientError, exchange::ExchangeError};
use alloy_primitives::{BlockNumber, B256};

/// Fatal conditions that abort the sync driver.
///
/// Invariant violations are bugs, not environmental issues; transport
/// failures are environmental and swallowed only when the driver is already
/// stopping. An invalid-chain verdict is not an error at all — it is handled
/// by the unwind path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The persisted canonical head sits beyond the engine's block progress.
    #[error("canonical head {head} beyond block progress {progress}")]
    HeadBeyondProgress {
        /// Height of the persisted head.
        head: BlockNumber,
        /// Reported block progress.
        progress: BlockNumber,
    },

    /// A valid-chain verdict named a head other than the requested target.
    #[error("chain validation settled on {got}, expected {expected}")]
    HeadMismatch {
        /// The target handed to `validate_chain`.
        expected: B256,
        /// The head the engine reported.
        got: B256,
    },

    /// The engine reported an invalid chain but cannot translate its own
    /// latest valid head to a height.
    #[error("latest valid head {0} unknown to the execution engine")]
    UnknownLatestValidHead(B256),

    /// The engine could not complete verification.
    #[error("chain validation failed: latest valid head {latest_valid_head}, missing block {missing_block}")]
    Validation {
        /// Most recent ancestor that still verifies.
        latest_valid_head: B256,
        /// The block the engine was missing.
        missing_block: B256,
    },

    /// Engine adapter transport failure.
    #[error(transparent)]
    Engine(#[from] ExecutionClientError),

    /// Exchange adapter transport failure.
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    /// The spawned driver task terminated abnormally.
    #[error("sync driver task aborted")]
    TaskAborted,
}

impl SyncError {
    /// Whether this error is an adapter transport failure, swallowed when
    /// the driver is already stopping.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Engine(_) | Self::Exchange(_))
    }
}
