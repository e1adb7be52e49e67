//! Typed facade over the execution engine.
//!
//! The sync driver talks to the execution engine exclusively through the
//! [`ExecutionClient`] trait. Each operation is a logically blocking
//! request/response from the driver's task; an implementation may be an
//! in-process call, a cross-thread channel or an RPC bridge, as long as the
//! per-call contract holds.

mod memory;

pub use memory::InMemoryExecution;

use crate::primitives::{Block, BlockHeader, ChainHead};
use alloy_primitives::{BlockNumber, B256};
use std::{collections::HashSet, future::Future};

/// Verdict of a chain validation run.
///
/// The driver matches this sum exhaustively; the type makes any other
/// verdict unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The ancestry up to the requested target verified successfully.
    ValidChain {
        /// Head the engine settled on; must equal the requested target.
        current_head: B256,
    },
    /// A branch leading to the target is bad. Recoverable by unwinding.
    InvalidChain {
        /// Most recent ancestor that still verifies.
        latest_valid_head: B256,
        /// The first offending block, when the engine can name it.
        bad_block: Option<B256>,
        /// Header hashes that must never be re-served by the exchange.
        bad_headers: HashSet<B256>,
    },
    /// The engine could not decide, e.g. an ancestor is missing. Fatal.
    ValidationError {
        /// Most recent ancestor that still verifies.
        latest_valid_head: B256,
        /// The block the engine was missing.
        missing_block: B256,
    },
}

/// Errors raised by the transport underneath an [`ExecutionClient`].
///
/// These are environmental failures of the adapter, not verdicts; the driver
/// treats them as fatal unless it is already stopping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionClientError {
    /// The request could not be served.
    #[error("execution engine request failed: {0}")]
    RequestFailed(String),
    /// The channel to the engine is gone.
    #[error("execution engine channel closed")]
    ChannelClosed,
}

/// Client capable of driving the execution engine.
///
/// All calls resolve sequentially from the driver's single task; the driver
/// never interleaves two engine calls.
pub trait ExecutionClient: Send + Sync {
    /// The persisted canonical head.
    fn last_fork_choice(&self)
        -> impl Future<Output = Result<ChainHead, ExecutionClientError>> + Send;

    /// Highest block number the engine has inserted, canonical or not.
    fn block_progress(&self)
        -> impl Future<Output = Result<BlockNumber, ExecutionClientError>> + Send;

    /// The most recent `n` headers known to the engine, canonical and not,
    /// ordered **oldest-first**. Consumers replay them in arrival order.
    fn get_last_headers(
        &self,
        n: u64,
    ) -> impl Future<Output = Result<Vec<BlockHeader>, ExecutionClientError>> + Send;

    /// Insert blocks into the engine. Idempotent in hash: re-insertion of a
    /// known block is a no-op.
    fn insert_blocks(
        &self,
        blocks: Vec<Block>,
    ) -> impl Future<Output = Result<(), ExecutionClientError>> + Send;

    /// Run state-transition verification along the ancestry of `target`.
    /// Blocking; may take a long time.
    fn validate_chain(
        &self,
        target: B256,
    ) -> impl Future<Output = Result<ValidationOutcome, ExecutionClientError>> + Send;

    /// Install `head` as the canonical pointer. The engine must already have
    /// the block.
    fn update_fork_choice(
        &self,
        head: B256,
    ) -> impl Future<Output = Result<(), ExecutionClientError>> + Send;

    /// Translate a block hash to its number, if the engine knows it.
    fn block_number(
        &self,
        hash: B256,
    ) -> impl Future<Output = Result<Option<BlockNumber>, ExecutionClientError>> + Send;
}
