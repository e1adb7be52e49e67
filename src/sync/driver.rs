//! Proof-of-work sync driver.
//!
//! A single long-running task that keeps the execution engine's canonical
//! chain aligned with the best chain observed on the network.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     Sync Driver Cycle                      │
//! ├────────────────────────────────────────────────────────────┤
//! │                                                            │
//! │  resume            reconcile the fork-choice view with     │
//! │    │               the engine's persisted head             │
//! │    ▼                                                       │
//! │  forward           drain downloaded batches, apply fork    │
//! │    │               choice, insert blocks, announce them    │
//! │    ▼                                                       │
//! │  verify            run state-transition verification up    │
//! │    │               to the candidate head                   │
//! │    ├── valid ────► update fork choice, announce hashes     │
//! │    ├── invalid ──► unwind, reject bad headers, fall back   │
//! │    │               to the latest valid head                │
//! │    └── error ────► fatal                                   │
//! │                                                            │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The driver owns the fork-choice view exclusively and never interleaves
//! two engine calls. Shutdown is cooperative: a stop flag observed at loop
//! heads, bounded by the timed queue wait.

use super::{announcements::AnnouncementEmitter, config::SyncConfig, error::SyncError};
use crate::{
    engine::{ExecutionClient, ValidationOutcome},
    exchange::{BadHeadersUpdate, BlockExchange, ExchangeMessage, TargetTracking},
    forkchoice::ForkChoiceView,
    primitives::NewHeight,
};
use alloy_primitives::{BlockNumber, B256};
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{debug, info, trace, warn};

/// Where an unwind lands: the latest valid block on the surviving chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnwindPoint {
    /// Height of the latest valid block.
    pub number: BlockNumber,
    /// Hash of the latest valid block.
    pub hash: B256,
}

/// The proof-of-work sync driver.
///
/// Orchestrates the resume → forward → verify → announce/unwind cycle over
/// the block exchange and the execution engine.
#[derive(Debug)]
pub struct SyncDriver<E, C> {
    exchange: E,
    engine: C,
    fork_view: ForkChoiceView,
    announcer: AnnouncementEmitter,
    config: SyncConfig,
    stop: Arc<AtomicBool>,
}

impl<E, C> SyncDriver<E, C>
where
    E: BlockExchange,
    C: ExecutionClient,
{
    /// Create a driver over the given adapters.
    pub fn new(exchange: E, engine: C, config: SyncConfig) -> Self {
        Self {
            exchange,
            engine,
            fork_view: ForkChoiceView::new(),
            announcer: AnnouncementEmitter::new(),
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared stop flag; setting it requests a cooperative shutdown.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Whether the driver is still in its initial catch-up phase.
    pub fn is_first_sync(&self) -> bool {
        self.announcer.is_first_sync()
    }

    /// The fork-choice view, for inspection.
    pub fn fork_view(&self) -> &ForkChoiceView {
        &self.fork_view
    }

    fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Run the sync cycle until a stop is requested or a fatal condition is
    /// hit.
    pub async fn run(mut self) -> Result<(), SyncError> {
        // The exchange needs a starting point to locate peers' positions
        // relative to the local chain.
        let last_headers = self.engine.get_last_headers(self.config.bootstrap_headers).await?;
        self.exchange.initial_state(last_headers);

        let mut starting_up = true;
        while !self.is_stopping() {
            let step = if starting_up {
                // Resuming; the following verification re-checks all stages.
                self.resume().await
            } else {
                self.forward_and_insert_blocks().await
            };
            starting_up = false;

            let new_height = match step {
                Ok(new_height) => new_height,
                Err(err) if err.is_transport() && self.is_stopping() => {
                    debug!(target: "sync", %err, "transport failure while stopping");
                    break;
                }
                Err(err) => return Err(err),
            };

            if new_height.number == 0 {
                // Empty database bootstrap: nothing to verify yet.
                continue;
            }
            if self.is_stopping() {
                break;
            }

            match self.verify_chain(new_height).await {
                Ok(()) => {}
                Err(err) if err.is_transport() && self.is_stopping() => {
                    debug!(target: "sync", %err, "transport failure while stopping");
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        info!(target: "sync", "sync driver stopped");
        Ok(())
    }

    /// Reconcile the fork-choice view with the engine's persisted state and
    /// report the head to resume from.
    pub async fn resume(&mut self) -> Result<NewHeight, SyncError> {
        let head = self.engine.last_fork_choice().await?;
        let block_progress = self.engine.block_progress().await?;

        self.fork_view.reset_head(head);

        if head.number > block_progress {
            return Err(SyncError::HeadBeyondProgress { head: head.number, progress: block_progress });
        }

        // Canonical head and header progress match: the head was fully
        // updated before shutdown, a forward sync is all that is needed.
        if block_progress == head.number {
            return Ok(head.block_id());
        }

        // Otherwise re-compute the preferred head from the most recent
        // headers on disk, non-canonical tips included.
        let prev_headers = self.engine.get_last_headers(self.config.resume_lookback).await?;
        debug!(
            target: "sync",
            head = head.number,
            block_progress,
            replayed = prev_headers.len(),
            "resuming with header replay"
        );
        for header in prev_headers {
            self.fork_view.add(header);
        }

        Ok(self.fork_view.head().block_id())
    }

    /// Download blocks above the current progress, apply fork choice, insert
    /// them into the engine and announce the gossip-worthy subset. Returns
    /// the preferred head once the exchange reports it has caught up or a
    /// stop is requested.
    pub async fn forward_and_insert_blocks(&mut self) -> Result<NewHeight, SyncError> {
        let initial_progress = self.engine.block_progress().await?;
        let mut block_progress = initial_progress;

        self.exchange.download_blocks(initial_progress, TargetTracking::ByAnnouncements);

        info!(target: "sync", from = initial_progress, "waiting for blocks");
        let started = Instant::now();
        let mut downloaded: u64 = 0;

        while !self.is_stopping()
            && !(self.exchange.in_sync() && block_progress == self.exchange.current_height())
        {
            let popped = self
                .exchange
                .result_queue()
                .timed_wait_and_pop(self.config.queue_poll_interval)
                .await;
            let mut blocks = match popped {
                Ok(Some(blocks)) => blocks,
                Ok(None) => continue,
                Err(err) if self.is_stopping() => {
                    debug!(target: "sync", %err, "result queue closed while stopping");
                    break;
                }
                Err(err) => return Err(err.into()),
            };

            // Compute the head of the chain, applying the fork choice rule.
            let mut announcements = Vec::new();
            for block in &mut blocks {
                block.total_difficulty = self.fork_view.add(block.header.clone());
                block_progress = block_progress.max(block.header.number);
                if block.to_announce {
                    announcements.push(block.clone());
                }
            }
            downloaded += blocks.len() as u64;

            self.engine.insert_blocks(blocks).await?;

            // Per eth/67 new-block announcements go out here, after simple
            // header verification, before full chain verification.
            self.announcer.announce_new_blocks(&self.exchange, announcements);

            let elapsed = started.elapsed().as_secs_f64();
            info!(
                target: "sync",
                downloaded,
                blocks_per_sec = downloaded as f64 / elapsed.max(f64::EPSILON),
                last = block_progress,
                head = self.fork_view.head_height(),
                "downloading progress"
            );
        }

        self.exchange.stop_downloading();

        info!(
            target: "sync",
            last = block_progress,
            head = self.fork_view.head_height(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "downloading completed"
        );

        Ok(NewHeight { number: self.fork_view.head_height(), hash: self.fork_view.head_hash() })
    }

    /// Run one verify cycle over the candidate head and react to the
    /// verdict.
    pub async fn verify_chain(&mut self, new_height: NewHeight) -> Result<(), SyncError> {
        info!(target: "sync", head = new_height.number, "verifying chain");
        let verdict = self.engine.validate_chain(new_height.hash).await?; // blocking, may be long

        match verdict {
            ValidationOutcome::ValidChain { current_head } => {
                if current_head != new_height.hash {
                    return Err(SyncError::HeadMismatch {
                        expected: new_height.hash,
                        got: current_head,
                    });
                }

                info!(target: "sync", number = new_height.number, hash = %new_height.hash, "valid chain, updating fork choice");
                self.engine.update_fork_choice(new_height.hash).await?;
                self.fork_view.prune(new_height.number.saturating_sub(self.config.prune_window));

                // Per eth/67 hash announcements go out only after a full
                // block verification.
                self.announcer.announce_new_block_hashes(&self.exchange);
            }
            ValidationOutcome::InvalidChain { latest_valid_head, bad_block, bad_headers } => {
                let latest_valid_height = self
                    .engine
                    .block_number(latest_valid_head)
                    .await?
                    .ok_or(SyncError::UnknownLatestValidHead(latest_valid_head))?;

                info!(target: "sync", unwind_to = latest_valid_height, "invalid chain, unwinding");
                self.unwind(
                    UnwindPoint { number: latest_valid_height, hash: latest_valid_head },
                    bad_block,
                );

                if !bad_headers.is_empty() {
                    let _ack = self.update_bad_headers(bad_headers);
                }

                info!(target: "sync", hash = %latest_valid_head, "notifying fork choice update");
                self.engine.update_fork_choice(latest_valid_head).await?;
            }
            ValidationOutcome::ValidationError { latest_valid_head, missing_block } => {
                return Err(SyncError::Validation { latest_valid_head, missing_block });
            }
        }

        self.announcer.mark_first_sync_complete();
        Ok(())
    }

    /// Unwind hook, a no-op for proof of work: the engine performs its own
    /// rewind in response to the subsequent fork-choice update. Rule sets
    /// needing extra invalidation work attach it here.
    fn unwind(&mut self, point: UnwindPoint, bad_block: Option<B256>) {
        trace!(target: "sync", number = point.number, hash = %point.hash, ?bad_block, "unwind requested");
    }

    /// Submit bad headers so the exchange stops re-serving them.
    /// Fire-and-forget: the returned ack can be awaited or discarded.
    fn update_bad_headers(&self, bad_headers: HashSet<B256>) -> oneshot::Receiver<()> {
        let (update, ack) = BadHeadersUpdate::new(bad_headers);
        if let Err(err) = self.exchange.accept(ExchangeMessage::BadHeaders(update)) {
            warn!(target: "sync", %err, "failed to submit bad headers to the block exchange");
        }
        ack
    }
}

/// Builds a [`SyncDriver`] and spawns it on the runtime.
#[derive(Debug)]
pub struct SyncDriverBuilder<E, C> {
    exchange: E,
    engine: C,
    config: SyncConfig,
}

impl<E, C> SyncDriverBuilder<E, C>
where
    E: BlockExchange + Send + 'static,
    C: ExecutionClient + 'static,
{
    /// Create a builder over the given adapters.
    pub fn new(exchange: E, engine: C) -> Self {
        Self { exchange, engine, config: SyncConfig::default() }
    }

    /// Override the driver configuration.
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the driver without spawning it.
    pub fn build(self) -> SyncDriver<E, C> {
        SyncDriver::new(self.exchange, self.engine, self.config)
    }

    /// Spawn the driver task and return a handle for interaction.
    pub fn spawn(self) -> SyncDriverHandle {
        let driver = self.build();
        let stop = driver.stop_handle();
        let task = tokio::spawn(driver.run());
        SyncDriverHandle { stop, task }
    }
}

/// Handle for interacting with a running sync driver.
#[derive(Debug)]
pub struct SyncDriverHandle {
    stop: Arc<AtomicBool>,
    task: JoinHandle<Result<(), SyncError>>,
}

impl SyncDriverHandle {
    /// Request a cooperative stop. The driver completes its current
    /// iteration and exits.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Wait for the driver to exit and return its outcome.
    pub async fn await_termination(self) -> Result<(), SyncError> {
        self.task.await.unwrap_or(Err(SyncError::TaskAborted))
    }
}
