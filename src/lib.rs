//! Proof-of-work chain synchronization core.
//!
//! Keeps a local execution engine's canonical chain aligned with the best
//! chain observed on the peer-to-peer network: a download pipeline feeds
//! block batches into a fork-choice view, blocks are inserted into the
//! engine, chain segments are verified against execution semantics, and
//! announcements propagate back to peers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Sync Core                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   BlockExchange ──batches──►  SyncDriver  ◄──verdicts── Engine  │
//! │        ▲                     │         │                   ▲    │
//! │        │                     ▼         ▼                   │    │
//! │   announcements,       ForkChoiceView  insert/validate/────┘    │
//! │   bad headers          (total difficulty)  fork choice          │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The driver is a single task; the exchange and the engine live behind
//! narrow trait facades ([`exchange::BlockExchange`],
//! [`engine::ExecutionClient`]) so in-process, cross-thread and RPC-backed
//! implementations are interchangeable.
//!
//! # Modules
//!
//! - [`primitives`]: block identifiers, headers, bodies and chain heads
//! - [`forkchoice`]: the total-difficulty fork-choice view
//! - [`engine`]: the execution engine facade and validation verdicts
//! - [`exchange`]: the block exchange facade, result queue and messages
//! - [`sync`]: the driver, its configuration and announcement emission

#![warn(unused_crate_dependencies)]
#![warn(missing_docs)]

pub mod engine;
pub mod exchange;
pub mod forkchoice;
pub mod primitives;
pub mod sync;

pub use engine::{ExecutionClient, ExecutionClientError, InMemoryExecution, ValidationOutcome};
pub use exchange::{
    BadHeadersUpdate, BlockBatchSender, BlockExchange, ChannelBlockExchange, DownloaderCommand,
    DownloaderHandle, ExchangeError, ExchangeMessage, OutboundNewBlock, OutboundNewBlockHashes,
    ResultQueue, TargetTracking,
};
pub use forkchoice::ForkChoiceView;
pub use primitives::{Block, BlockBody, BlockHeader, BlockId, ChainHead, NewHeight};
pub use sync::{SyncConfig, SyncDriver, SyncDriverBuilder, SyncDriverHandle, SyncError};
