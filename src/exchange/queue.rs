//! FIFO result queue carrying downloaded block batches to the driver.

use super::ExchangeError;
use crate::primitives::Block;
use std::time::Duration;
use tokio::sync::mpsc;

/// Create a connected sender/queue pair.
pub fn channel() -> (BlockBatchSender, ResultQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (BlockBatchSender { tx }, ResultQueue { rx })
}

/// Producer half: downloader workers push completed batches here.
#[derive(Debug, Clone)]
pub struct BlockBatchSender {
    tx: mpsc::UnboundedSender<Vec<Block>>,
}

impl BlockBatchSender {
    /// Push a batch onto the queue.
    pub fn send(&self, batch: Vec<Block>) -> Result<(), ExchangeError> {
        self.tx.send(batch).map_err(|_| ExchangeError::Closed)
    }
}

/// Consumer half: the driver is the sole consumer, popping batches in FIFO
/// order. Ownership of a batch transfers on pop. Batches pushed before a
/// cooperative stop remain drainable.
#[derive(Debug)]
pub struct ResultQueue {
    rx: mpsc::UnboundedReceiver<Vec<Block>>,
}

impl ResultQueue {
    /// Wait up to `wait` for a batch.
    ///
    /// `Ok(None)` means the wait elapsed with nothing queued; that is not an
    /// error. `Err` means every producer is gone and the queue is drained.
    pub async fn timed_wait_and_pop(
        &mut self,
        wait: Duration,
    ) -> Result<Option<Vec<Block>>, ExchangeError> {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(Some(batch)) => Ok(Some(batch)),
            Ok(None) => Err(ExchangeError::Closed),
            Err(_elapsed) => Ok(None),
        }
    }

    /// Pop a batch if one is already queued.
    pub fn try_pop(&mut self) -> Option<Vec<Block>> {
        self.rx.try_recv().ok()
    }
}
