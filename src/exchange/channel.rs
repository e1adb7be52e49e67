//! Channel-backed block exchange facade.
//!
//! Control calls become commands on an unbounded channel, accepted messages
//! flow on a second channel, and sync status is published through shared
//! atomics. The out-of-scope download state machine plugs in by holding the
//! [`DownloaderHandle`]; tests drive the handle directly.

use super::{
    queue, BlockBatchSender, BlockExchange, ExchangeError, ExchangeMessage, ResultQueue,
    TargetTracking,
};
use crate::primitives::{Block, BlockHeader};
use alloy_primitives::BlockNumber;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tracing::warn;

/// Control signals sent to the downloader.
#[derive(Debug)]
pub enum DownloaderCommand {
    /// Bootstrap window of recent headers.
    InitialState(Vec<BlockHeader>),
    /// Start or resume downloading above `from`.
    DownloadBlocks {
        /// Height to download above.
        from: BlockNumber,
        /// Target selection mode.
        tracking: TargetTracking,
    },
    /// Cooperative stop.
    StopDownloading,
}

/// Sync status shared between the facade and the downloader.
#[derive(Debug, Default)]
struct Status {
    in_sync: AtomicBool,
    current_height: AtomicU64,
}

/// Driver-side facade over a channel-connected downloader.
#[derive(Debug)]
pub struct ChannelBlockExchange {
    commands: mpsc::UnboundedSender<DownloaderCommand>,
    messages: mpsc::UnboundedSender<ExchangeMessage>,
    status: Arc<Status>,
    results: ResultQueue,
}

/// Downloader-side handle feeding the facade.
#[derive(Debug)]
pub struct DownloaderHandle {
    commands: mpsc::UnboundedReceiver<DownloaderCommand>,
    messages: mpsc::UnboundedReceiver<ExchangeMessage>,
    batches: BlockBatchSender,
    status: Arc<Status>,
}

impl ChannelBlockExchange {
    /// Create a connected facade/handle pair.
    pub fn new() -> (Self, DownloaderHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let (batches, results) = queue::channel();
        let status = Arc::new(Status::default());

        let exchange = Self {
            commands: command_tx,
            messages: message_tx,
            status: Arc::clone(&status),
            results,
        };
        let handle =
            DownloaderHandle { commands: command_rx, messages: message_rx, batches, status };
        (exchange, handle)
    }

    fn send_command(&self, command: DownloaderCommand) {
        if self.commands.send(command).is_err() {
            warn!(target: "sync::exchange", "downloader is gone, dropping control signal");
        }
    }
}

impl BlockExchange for ChannelBlockExchange {
    fn initial_state(&self, last_headers: Vec<BlockHeader>) {
        self.send_command(DownloaderCommand::InitialState(last_headers));
    }

    fn download_blocks(&self, from: BlockNumber, tracking: TargetTracking) {
        self.send_command(DownloaderCommand::DownloadBlocks { from, tracking });
    }

    fn result_queue(&mut self) -> &mut ResultQueue {
        &mut self.results
    }

    fn in_sync(&self) -> bool {
        self.status.in_sync.load(Ordering::Relaxed)
    }

    fn current_height(&self) -> BlockNumber {
        self.status.current_height.load(Ordering::Relaxed)
    }

    fn stop_downloading(&self) {
        self.send_command(DownloaderCommand::StopDownloading);
    }

    fn accept(&self, message: ExchangeMessage) -> Result<(), ExchangeError> {
        self.messages.send(message).map_err(|_| ExchangeError::Closed)
    }
}

impl DownloaderHandle {
    /// Push a completed batch onto the result queue.
    pub fn send_blocks(&self, batch: Vec<Block>) -> Result<(), ExchangeError> {
        self.batches.send(batch)
    }

    /// A clone of the batch sender, for additional download workers.
    pub fn batch_sender(&self) -> BlockBatchSender {
        self.batches.clone()
    }

    /// Publish whether the downloader considers itself caught up.
    pub fn set_in_sync(&self, in_sync: bool) {
        self.status.in_sync.store(in_sync, Ordering::Relaxed);
    }

    /// Publish the height the downloader has progressed to.
    pub fn set_current_height(&self, height: BlockNumber) {
        self.status.current_height.store(height, Ordering::Relaxed);
    }

    /// Wait for the next control signal from the driver.
    pub async fn next_command(&mut self) -> Option<DownloaderCommand> {
        self.commands.recv().await
    }

    /// Pop a control signal if one is already queued.
    pub fn try_next_command(&mut self) -> Option<DownloaderCommand> {
        self.commands.try_recv().ok()
    }

    /// Wait for the next accepted message from the driver.
    pub async fn next_message(&mut self) -> Option<ExchangeMessage> {
        self.messages.recv().await
    }

    /// Pop an accepted message if one is already queued.
    pub fn try_next_message(&mut self) -> Option<ExchangeMessage> {
        self.messages.try_recv().ok()
    }
}
