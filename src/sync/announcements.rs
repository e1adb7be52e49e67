//! Outbound announcement emission.
//!
//! Thin by intent: the emitter packages block or hash payloads with the
//! first-sync flag and hands them to the exchange. Peer selection and eth/67
//! suppression live in the exchange.

use crate::{
    exchange::{BlockExchange, ExchangeMessage, OutboundNewBlock, OutboundNewBlockHashes},
    primitives::Block,
};
use tracing::warn;

/// Emits outbound announcements through the block exchange.
///
/// Owns the `is_first_sync` flag: true until the first complete verify cycle
/// finishes, false thereafter until process restart.
#[derive(Debug)]
pub struct AnnouncementEmitter {
    first_sync: bool,
}

impl Default for AnnouncementEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnouncementEmitter {
    /// Create an emitter in the initial catch-up phase.
    pub fn new() -> Self {
        Self { first_sync: true }
    }

    /// Whether the driver is still in its initial catch-up phase.
    pub fn is_first_sync(&self) -> bool {
        self.first_sync
    }

    /// Record that a verify cycle has completed; gossip is no longer
    /// suppressed.
    pub fn mark_first_sync_complete(&mut self) {
        self.first_sync = false;
    }

    /// Announce freshly inserted blocks. A no-op on an empty set. Emission
    /// failures are logged and swallowed; they never block the sync cycle.
    pub fn announce_new_blocks<E: BlockExchange>(&self, exchange: &E, blocks: Vec<Block>) {
        if blocks.is_empty() {
            return;
        }
        let message = OutboundNewBlock { blocks, is_first_sync: self.first_sync };
        if let Err(err) = exchange.accept(ExchangeMessage::NewBlock(message)) {
            warn!(target: "sync", %err, "failed to deliver new-block announcement");
        }
    }

    /// Announce the hashes of a newly verified head. Emission failures are
    /// logged and swallowed.
    pub fn announce_new_block_hashes<E: BlockExchange>(&self, exchange: &E) {
        let message = OutboundNewBlockHashes { is_first_sync: self.first_sync };
        if let Err(err) = exchange.accept(ExchangeMessage::NewBlockHashes(message)) {
            warn!(target: "sync", %err, "failed to deliver new-block-hashes announcement");
        }
    }
}
