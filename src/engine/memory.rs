//! In-memory execution engine.
//!
//! A simple in-process implementation of [`ExecutionClient`] for testing and
//! development. Validation verdicts can be scripted ahead of time; without a
//! script every chain validates cleanly.

use super::{ExecutionClient, ExecutionClientError, ValidationOutcome};
use crate::primitives::{Block, BlockHeader, ChainHead};
use alloy_primitives::{BlockNumber, B256};
use parking_lot::RwLock;
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

#[derive(Debug, Default)]
struct Inner {
    /// Inserted blocks keyed by hash.
    blocks: HashMap<B256, Block>,
    /// All known headers in insertion order, side chains included.
    headers: Vec<BlockHeader>,
    /// Hash to number index for headers and blocks alike.
    numbers: HashMap<B256, BlockNumber>,
    /// Persisted canonical head.
    canonical: ChainHead,
    /// Highest inserted block number, canonical or not.
    block_progress: BlockNumber,
    /// Scripted validation verdicts, consumed front to back.
    verdicts: VecDeque<ValidationOutcome>,
    /// Hashes passed to `validate_chain`, for inspection.
    validate_requests: Vec<B256>,
    /// Hashes passed to `update_fork_choice`, for inspection.
    fork_choice_updates: Vec<B256>,
    /// Sizes passed to `get_last_headers`, for inspection.
    header_requests: Vec<u64>,
}

/// In-memory execution engine.
///
/// Thread-safe and cheaply cloneable; clones share state, so a test can keep
/// one clone for inspection while the driver owns another.
#[derive(Debug, Default)]
pub struct InMemoryExecution {
    inner: Arc<RwLock<Inner>>,
}

impl Clone for InMemoryExecution {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl InMemoryExecution {
    /// Create an empty engine: zero head, zero progress.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the persisted canonical head without touching stored blocks.
    pub fn set_canonical_head(&self, head: ChainHead) {
        let mut inner = self.inner.write();
        inner.block_progress = inner.block_progress.max(head.number);
        inner.numbers.insert(head.hash, head.number);
        inner.canonical = head;
    }

    /// Force the reported block progress, e.g. to simulate a half-written
    /// database.
    pub fn set_block_progress(&self, progress: BlockNumber) {
        self.inner.write().block_progress = progress;
    }

    /// Seed headers the engine knows about, side chains included, without
    /// block bodies. Progress advances to cover them.
    pub fn seed_headers(&self, headers: Vec<BlockHeader>) {
        let mut inner = self.inner.write();
        for header in headers {
            inner.block_progress = inner.block_progress.max(header.number);
            inner.numbers.insert(header.hash(), header.number);
            inner.headers.push(header);
        }
    }

    /// Script the verdict for an upcoming `validate_chain` call. Scripted
    /// verdicts are consumed in order; afterwards chains validate cleanly.
    pub fn queue_verdict(&self, verdict: ValidationOutcome) {
        self.inner.write().verdicts.push_back(verdict);
    }

    /// Number of stored blocks.
    pub fn block_count(&self) -> usize {
        self.inner.read().blocks.len()
    }

    /// Hashes handed to `validate_chain` so far.
    pub fn validate_requests(&self) -> Vec<B256> {
        self.inner.read().validate_requests.clone()
    }

    /// Hashes handed to `update_fork_choice` so far.
    pub fn fork_choice_updates(&self) -> Vec<B256> {
        self.inner.read().fork_choice_updates.clone()
    }

    /// Sizes handed to `get_last_headers` so far.
    pub fn header_requests(&self) -> Vec<u64> {
        self.inner.read().header_requests.clone()
    }
}

impl ExecutionClient for InMemoryExecution {
    async fn last_fork_choice(&self) -> Result<ChainHead, ExecutionClientError> {
        Ok(self.inner.read().canonical)
    }

    async fn block_progress(&self) -> Result<BlockNumber, ExecutionClientError> {
        Ok(self.inner.read().block_progress)
    }

    async fn get_last_headers(&self, n: u64) -> Result<Vec<BlockHeader>, ExecutionClientError> {
        let mut inner = self.inner.write();
        inner.header_requests.push(n);
        let mut headers = inner.headers.clone();
        headers.sort_by_key(|h| h.number);
        let skip = headers.len().saturating_sub(n as usize);
        Ok(headers.split_off(skip))
    }

    async fn insert_blocks(&self, blocks: Vec<Block>) -> Result<(), ExecutionClientError> {
        let mut inner = self.inner.write();
        for block in blocks {
            let hash = block.hash();
            if inner.blocks.contains_key(&hash) {
                continue;
            }
            inner.block_progress = inner.block_progress.max(block.number());
            inner.numbers.insert(hash, block.number());
            inner.headers.push(block.header.clone());
            inner.blocks.insert(hash, block);
        }
        Ok(())
    }

    async fn validate_chain(&self, target: B256) -> Result<ValidationOutcome, ExecutionClientError> {
        let mut inner = self.inner.write();
        inner.validate_requests.push(target);
        Ok(inner
            .verdicts
            .pop_front()
            .unwrap_or(ValidationOutcome::ValidChain { current_head: target }))
    }

    async fn update_fork_choice(&self, head: B256) -> Result<(), ExecutionClientError> {
        let mut inner = self.inner.write();
        let Some(&number) = inner.numbers.get(&head) else {
            return Err(ExecutionClientError::RequestFailed(format!(
                "unknown fork choice target {head}"
            )));
        };
        let total_difficulty = inner
            .blocks
            .get(&head)
            .map(|b| b.total_difficulty)
            .unwrap_or(inner.canonical.total_difficulty);
        inner.fork_choice_updates.push(head);
        inner.canonical = ChainHead::new(number, head, total_difficulty);
        Ok(())
    }

    async fn block_number(&self, hash: B256) -> Result<Option<BlockNumber>, ExecutionClientError> {
        Ok(self.inner.read().numbers.get(&hash).copied())
    }
}
