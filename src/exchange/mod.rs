//! Typed facade over the block exchange.
//!
//! The exchange is the download state machine living on its own task(s); the
//! driver only ever sees this surface: control signals in, a FIFO result
//! queue of block batches out, and an accept path for outbound announcements
//! and internal maintenance messages.

mod channel;
mod messages;
mod queue;

pub use channel::{ChannelBlockExchange, DownloaderCommand, DownloaderHandle};
pub use messages::{BadHeadersUpdate, ExchangeMessage, OutboundNewBlock, OutboundNewBlockHashes};
pub use queue::{channel as result_queue_channel, BlockBatchSender, ResultQueue};

use crate::primitives::BlockHeader;
use alloy_primitives::BlockNumber;

/// How the exchange decides what to fetch next while downloading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetTracking {
    /// Follow new-block and new-block-hashes announcements from peers.
    ByAnnouncements,
    /// Probe the advertised head of newly connected peers.
    ByNewPeers,
}

/// Errors raised by the exchange adapter transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// The exchange side of the channel is gone.
    #[error("block exchange channel closed")]
    Closed,
}

/// Driver-facing contract of the block exchange.
pub trait BlockExchange: Send {
    /// Hand the downloader a bootstrap window of recent headers so it can
    /// locate peers' positions relative to the local chain.
    fn initial_state(&self, last_headers: Vec<BlockHeader>);

    /// Start or resume downloading above `from`.
    fn download_blocks(&self, from: BlockNumber, tracking: TargetTracking);

    /// The FIFO queue of downloaded block batches. The driver is the sole
    /// consumer.
    fn result_queue(&mut self) -> &mut ResultQueue;

    /// Whether the exchange believes it has caught up with the network.
    fn in_sync(&self) -> bool;

    /// Highest height the exchange has progressed to.
    fn current_height(&self) -> BlockNumber;

    /// Cooperative stop; batches already queued remain drainable.
    fn stop_downloading(&self);

    /// Deliver an announcement or maintenance message; the exchange owns
    /// dispatch.
    fn accept(&self, message: ExchangeMessage) -> Result<(), ExchangeError>;
}
