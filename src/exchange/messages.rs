//! Messages the driver hands to the block exchange.
//!
//! Two outbound announcement flavors plus one internal maintenance message.
//! The exchange, not the driver, decides which peers receive which
//! announcement and applies the eth/67 suppression rules; both announcement
//! types therefore carry an `is_first_sync` flag so broad gossip can be
//! muted during the initial catch-up.

use crate::primitives::Block;
use alloy_primitives::B256;
use std::collections::HashSet;
use tokio::sync::oneshot;

/// Announce freshly inserted blocks to peers.
///
/// Per eth/67 this goes out after insertion but before full verification.
#[derive(Debug)]
pub struct OutboundNewBlock {
    /// Blocks flagged for announcement by the exchange.
    pub blocks: Vec<Block>,
    /// Whether the driver is still in its initial catch-up phase.
    pub is_first_sync: bool,
}

/// Announce the hashes of a newly verified head to peers.
///
/// Per eth/67 this goes out only after full verification.
#[derive(Debug)]
pub struct OutboundNewBlockHashes {
    /// Whether the driver is still in its initial catch-up phase.
    pub is_first_sync: bool,
}

/// Internal maintenance message: union these hashes into the exchange's
/// reject set so they are never re-served.
///
/// The exchange applies the update on its own loop. Submission is
/// fire-and-forget; the optional ack lets a caller observe completion, the
/// result itself is empty.
#[derive(Debug)]
pub struct BadHeadersUpdate {
    /// Header hashes to reject from now on.
    pub bad_headers: HashSet<B256>,
    /// Completion ack, fired once the exchange has applied the update.
    pub ack: Option<oneshot::Sender<()>>,
}

impl BadHeadersUpdate {
    /// Create an update together with its completion handle.
    pub fn new(bad_headers: HashSet<B256>) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self { bad_headers, ack: Some(tx) }, rx)
    }

    /// Signal that the update has been applied.
    pub fn complete(&mut self) {
        if let Some(ack) = self.ack.take() {
            let _ = ack.send(());
        }
    }
}

/// Everything the driver can submit through [`super::BlockExchange::accept`].
#[derive(Debug)]
pub enum ExchangeMessage {
    /// Outbound new-block announcement.
    NewBlock(OutboundNewBlock),
    /// Outbound new-block-hashes announcement.
    NewBlockHashes(OutboundNewBlockHashes),
    /// Internal bad-headers update.
    BadHeaders(BadHeadersUpdate),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bad_headers_ack_observes_completion() {
        let hashes: HashSet<B256> = [B256::repeat_byte(0x01)].into();
        let (mut update, ack) = BadHeadersUpdate::new(hashes.clone());

        assert_eq!(update.bad_headers, hashes);
        update.complete();
        ack.await.expect("ack fires on completion");
    }

    #[tokio::test]
    async fn dropping_the_update_releases_waiters() {
        let (update, ack) = BadHeadersUpdate::new(HashSet::new());
        drop(update);
        assert!(ack.await.is_err());
    }
}
