//! Core block primitives shared by the sync driver, the fork-choice view and
//! the adapter surfaces.
//!
//! The core interprets only the linkage-relevant parts of a block: parent
//! hash, height and declared difficulty. Everything else travels as opaque
//! payload bytes owned by the surrounding node.

use alloy_primitives::{keccak256, BlockNumber, Bytes, B256, U256};
use alloy_rlp::{RlpDecodable, RlpEncodable};

/// Identifier of a block: height plus hash.
///
/// Ordering follows the height; the hash disambiguates siblings at the same
/// height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    /// Block height.
    pub number: BlockNumber,
    /// Block hash.
    pub hash: B256,
}

/// The head reached after a resume or forward pass, reported by the driver
/// to the verification step.
pub type NewHeight = BlockId;

/// A block header as seen by the sync core.
///
/// Only parent linkage, height and declared difficulty are interpreted; the
/// `extra` field carries the RLP remainder of the full header untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct BlockHeader {
    /// Hash of the parent block header.
    pub parent_hash: B256,
    /// Block height.
    pub number: BlockNumber,
    /// Declared difficulty of this block alone.
    pub difficulty: U256,
    /// Opaque remainder of the header; not interpreted by the core.
    pub extra: Bytes,
}

impl BlockHeader {
    /// Hash of this header: the keccak of its RLP encoding.
    pub fn hash(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }

    /// The `(number, hash)` identifier of this header.
    pub fn block_id(&self) -> BlockId {
        BlockId { number: self.number, hash: self.hash() }
    }
}

/// Opaque block body payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct BlockBody {
    /// Encoded transactions and ommers; not interpreted by the core.
    pub payload: Bytes,
}

/// A downloaded block flowing through the sync core.
///
/// Two fields are written by the core itself: `total_difficulty`, computed by
/// the fork-choice view on insertion, and `to_announce`, set by the block
/// exchange when the block arrived via gossip and should be re-announced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    /// The block header.
    pub header: BlockHeader,
    /// The opaque body payload.
    pub body: BlockBody,
    /// Cumulative difficulty up to and including this block; filled in by the
    /// fork-choice view when the block is processed.
    pub total_difficulty: U256,
    /// Whether the exchange flagged this block for re-announcement to peers.
    pub to_announce: bool,
}

impl Block {
    /// Create a block from its header and body, with the core-visible fields
    /// cleared.
    pub fn new(header: BlockHeader, body: BlockBody) -> Self {
        Self { header, body, total_difficulty: U256::ZERO, to_announce: false }
    }

    /// Block height.
    pub fn number(&self) -> BlockNumber {
        self.header.number
    }

    /// Block hash.
    pub fn hash(&self) -> B256 {
        self.header.hash()
    }
}

/// Snapshot of the currently preferred chain head.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChainHead {
    /// Head height.
    pub number: BlockNumber,
    /// Head hash.
    pub hash: B256,
    /// Cumulative difficulty from genesis to the head.
    pub total_difficulty: U256,
}

impl ChainHead {
    /// Create a new chain head snapshot.
    pub fn new(number: BlockNumber, hash: B256, total_difficulty: U256) -> Self {
        Self { number, hash, total_difficulty }
    }

    /// The `(number, hash)` identifier of the head.
    pub fn block_id(&self) -> BlockId {
        BlockId { number: self.number, hash: self.hash }
    }
}
