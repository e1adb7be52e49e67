//! In-memory fork-choice view over recent block headers.
//!
//! The view tracks candidate heads across branches and selects the current
//! best head by cumulative total difficulty. It holds a bounded window of
//! recent headers keyed by hash; parent linkage is a hash lookup, never a
//! back-pointer.
//!
//! # Fork Choice Rule
//!
//! The best head is the tracked entry with the highest cumulative total
//! difficulty. Ties break deterministically:
//! - lower block number wins (shorter chain), then
//! - lexicographically smaller hash wins.
//!
//! # Linkage
//!
//! A header whose parent is unknown is parked: it stays in the view but is
//! not eligible to become best until its parent arrives. The anchor installed
//! by [`ForkChoiceView::reset_head`] carries a cumulative difficulty but no
//! header; once its full header is seen, the ancestor trunk below it gains
//! derived cumulative difficulties, which lets sibling branches of the anchor
//! link up and compete for the head.

use crate::primitives::{BlockHeader, ChainHead};
use alloy_primitives::{BlockNumber, B256, U256};
use std::collections::HashMap;
use tracing::trace;

/// Number of blocks below the confirmed head the view keeps around.
///
/// Must stay at least as large as the resume look-back so that recently seen
/// sibling branches remain comparable. Tunable via
/// [`ForkChoiceView::prune`]'s caller.
pub const DEFAULT_RETENTION_DEPTH: u64 = 128;

/// A tracked header entry.
///
/// Three shapes occur: the anchor and derived trunk ancestors have a
/// cumulative difficulty but no header yet; parked headers have a header but
/// no cumulative difficulty; linked entries have both.
#[derive(Debug, Clone)]
struct Tracked {
    number: BlockNumber,
    header: Option<BlockHeader>,
    total_difficulty: Option<U256>,
}

/// Fork-choice view tracking candidate heads by total difficulty.
///
/// Owned exclusively by the sync driver; never persisted. On restart it is
/// rebuilt from the execution engine via `reset_head` and header replay.
#[derive(Debug, Default)]
pub struct ForkChoiceView {
    /// All tracked entries keyed by header hash.
    entries: HashMap<B256, Tracked>,
    /// Parked children waiting for a parent hash to gain a cumulative
    /// difficulty.
    waiting: HashMap<B256, Vec<B256>>,
    /// Current best head under the fork-choice rule.
    best: ChainHead,
}

impl ForkChoiceView {
    /// Create an empty view. `reset_head` installs the first anchor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the view and install `head` as the sole anchor.
    pub fn reset_head(&mut self, head: ChainHead) {
        self.entries.clear();
        self.waiting.clear();
        self.entries.insert(
            head.hash,
            Tracked { number: head.number, header: None, total_difficulty: Some(head.total_difficulty) },
        );
        self.best = head;
    }

    /// Add a header, computing and storing its cumulative total difficulty.
    ///
    /// Returns the computed value so callers can back-annotate their block.
    /// Unknown-parent headers are parked, not rejected; they report
    /// `U256::ZERO` until their parent arrives. Re-adding a known header is a
    /// no-op returning the stored value.
    pub fn add(&mut self, header: BlockHeader) -> U256 {
        let hash = header.hash();

        if let Some(entry) = self.entries.get_mut(&hash) {
            match (entry.header.is_some(), entry.total_difficulty) {
                // Already linked or parked; nothing new to learn.
                (true, td) => return td.unwrap_or(U256::ZERO),
                // Anchor or derived trunk entry gaining its full header:
                // the parent's cumulative difficulty becomes derivable.
                (false, Some(td)) => {
                    entry.header = Some(header.clone());
                    self.derive_parent(&header, td);
                    return td;
                }
                (false, None) => unreachable!("tracked entry without header or difficulty"),
            }
        }

        let parent_td = self.entries.get(&header.parent_hash).and_then(|p| p.total_difficulty);
        match parent_td {
            Some(parent_td) => {
                let td = parent_td + header.difficulty;
                self.entries.insert(
                    hash,
                    Tracked { number: header.number, header: Some(header), total_difficulty: Some(td) },
                );
                self.settle(hash, td);
                td
            }
            None => {
                trace!(target: "sync::forkchoice", %hash, parent = %header.parent_hash, "parking header with unknown parent");
                self.waiting.entry(header.parent_hash).or_default().push(hash);
                self.entries.insert(
                    hash,
                    Tracked { number: header.number, header: Some(header), total_difficulty: None },
                );
                U256::ZERO
            }
        }
    }

    /// Current best head.
    pub fn head(&self) -> ChainHead {
        self.best
    }

    /// Height of the current best head.
    pub fn head_height(&self) -> BlockNumber {
        self.best.number
    }

    /// Hash of the current best head.
    pub fn head_hash(&self) -> B256 {
        self.best.hash
    }

    /// Cumulative total difficulty of the current best head.
    pub fn head_total_difficulty(&self) -> U256 {
        self.best.total_difficulty
    }

    /// Whether the view tracks the given hash.
    pub fn contains(&self, hash: &B256) -> bool {
        self.entries.contains_key(hash)
    }

    /// Number of tracked entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries with a height below `keep_from`.
    ///
    /// Called once the engine has confirmed a new canonical head; the caller
    /// passes `head - retention window` so cold branches stop accumulating.
    pub fn prune(&mut self, keep_from: BlockNumber) {
        self.entries.retain(|_, entry| entry.number >= keep_from);
        let entries = &self.entries;
        self.waiting.retain(|_, children| {
            children.retain(|child| entries.contains_key(child));
            !children.is_empty()
        });
    }

    /// Propagate a freshly known cumulative difficulty through the view:
    /// the entry competes for the head, parked children link upward, and
    /// trunk ancestors gain derived values downward.
    fn settle(&mut self, hash: B256, total_difficulty: U256) {
        let mut work = vec![(hash, total_difficulty)];
        while let Some((hash, td)) = work.pop() {
            let entry = match self.entries.get(&hash) {
                Some(entry) => entry.clone(),
                None => continue,
            };
            self.consider_best(ChainHead::new(entry.number, hash, td));

            if let Some(header) = &entry.header {
                if let Some((parent, parent_td)) = self.derivable_parent(header, td) {
                    work.push((parent, parent_td));
                }
            }

            if let Some(children) = self.waiting.remove(&hash) {
                for child in children {
                    if let Some(child_entry) = self.entries.get_mut(&child) {
                        let difficulty = child_entry
                            .header
                            .as_ref()
                            .map(|h| h.difficulty)
                            .unwrap_or(U256::ZERO);
                        let child_td = td + difficulty;
                        child_entry.total_difficulty = Some(child_td);
                        work.push((child, child_td));
                    }
                }
            }
        }
    }

    /// Record the parent of a now-complete trunk entry, deriving its
    /// cumulative difficulty by subtraction, then settle it.
    fn derive_parent(&mut self, header: &BlockHeader, td: U256) {
        if let Some((parent, parent_td)) = self.derivable_parent(header, td) {
            self.settle(parent, parent_td);
        }
    }

    /// Compute the parent's cumulative difficulty from a child's, recording
    /// the parent entry if the view has not seen it. Returns `None` when the
    /// parent is already linked, the child is at height zero, or the
    /// subtraction is not meaningful.
    fn derivable_parent(&mut self, header: &BlockHeader, td: U256) -> Option<(B256, U256)> {
        if header.number == 0 {
            return None;
        }
        let parent_td = td.checked_sub(header.difficulty)?;
        let parent = header.parent_hash;
        match self.entries.get_mut(&parent) {
            Some(entry) if entry.total_difficulty.is_some() => None,
            Some(entry) => {
                entry.total_difficulty = Some(parent_td);
                Some((parent, parent_td))
            }
            None => {
                self.entries.insert(
                    parent,
                    Tracked {
                        number: header.number - 1,
                        header: None,
                        total_difficulty: Some(parent_td),
                    },
                );
                Some((parent, parent_td))
            }
        }
    }

    /// Move the best pointer if `candidate` wins under the fork-choice rule.
    fn consider_best(&mut self, candidate: ChainHead) {
        let best = &self.best;
        let wins = candidate.total_difficulty > best.total_difficulty
            || (candidate.total_difficulty == best.total_difficulty
                && (candidate.number < best.number
                    || (candidate.number == best.number && candidate.hash < best.hash)));
        if wins {
            trace!(
                target: "sync::forkchoice",
                number = candidate.number,
                hash = %candidate.hash,
                td = %candidate.total_difficulty,
                "new best head"
            );
            self.best = candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;

    fn header(number: BlockNumber, parent: B256, difficulty: u64, tag: u8) -> BlockHeader {
        BlockHeader {
            parent_hash: parent,
            number,
            difficulty: U256::from(difficulty),
            extra: Bytes::from(vec![tag]),
        }
    }

    fn anchored_view(number: BlockNumber, hash: B256, td: u64) -> ForkChoiceView {
        let mut view = ForkChoiceView::new();
        view.reset_head(ChainHead::new(number, hash, U256::from(td)));
        view
    }

    #[test]
    fn reset_head_installs_anchor() {
        let hash = B256::repeat_byte(0xaa);
        let view = anchored_view(100, hash, 5000);
        assert_eq!(view.head_height(), 100);
        assert_eq!(view.head_hash(), hash);
        assert_eq!(view.head_total_difficulty(), U256::from(5000));
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn add_extends_the_anchor() {
        let anchor = B256::repeat_byte(0xaa);
        let mut view = anchored_view(100, anchor, 5000);

        let h101 = header(101, anchor, 100, 0);
        let td = view.add(h101.clone());

        assert_eq!(td, U256::from(5100));
        assert_eq!(view.head_height(), 101);
        assert_eq!(view.head_hash(), h101.hash());
    }

    #[test]
    fn add_is_idempotent() {
        let anchor = B256::repeat_byte(0xaa);
        let mut view = anchored_view(100, anchor, 5000);

        let h101 = header(101, anchor, 100, 0);
        let first = view.add(h101.clone());
        let head = view.head();
        let second = view.add(h101);

        assert_eq!(first, second);
        assert_eq!(view.head(), head);
    }

    #[test]
    fn heavier_sibling_branch_wins() {
        let anchor = B256::repeat_byte(0xaa);
        let mut view = anchored_view(100, anchor, 5000);

        let light = header(101, anchor, 100, 0);
        let heavy = header(101, anchor, 200, 1);
        view.add(light);
        view.add(heavy.clone());

        assert_eq!(view.head_hash(), heavy.hash());
        assert_eq!(view.head_total_difficulty(), U256::from(5200));
    }

    #[test]
    fn equal_difficulty_prefers_shorter_chain() {
        let anchor = B256::repeat_byte(0xaa);
        let mut view = anchored_view(100, anchor, 5000);

        // Two blocks of 100 versus one block of 200: same cumulative
        // difficulty, the shorter chain keeps the head.
        let long_a = header(101, anchor, 100, 0);
        let long_b = header(102, long_a.hash(), 100, 0);
        let short = header(101, anchor, 200, 1);

        view.add(long_a);
        view.add(long_b);
        view.add(short.clone());

        assert_eq!(view.head_hash(), short.hash());
        assert_eq!(view.head_height(), 101);
    }

    #[test]
    fn equal_difficulty_and_height_prefers_smaller_hash() {
        let anchor = B256::repeat_byte(0xaa);
        let mut view = anchored_view(100, anchor, 5000);

        let a = header(101, anchor, 100, 0);
        let b = header(101, anchor, 100, 1);
        let smaller = if a.hash() < b.hash() { a.clone() } else { b.clone() };

        view.add(a);
        view.add(b);

        assert_eq!(view.head_hash(), smaller.hash());
    }

    #[test]
    fn unknown_parent_is_parked_without_moving_the_head() {
        let anchor = B256::repeat_byte(0xaa);
        let mut view = anchored_view(100, anchor, 5000);

        let orphan = header(105, B256::repeat_byte(0xdd), 10_000, 0);
        let td = view.add(orphan.clone());

        assert_eq!(td, U256::ZERO);
        assert!(view.contains(&orphan.hash()));
        assert_eq!(view.head_hash(), anchor);
        assert_eq!(view.head_height(), 100);
    }

    #[test]
    fn parked_subtree_links_when_parent_arrives() {
        let anchor = B256::repeat_byte(0xaa);
        let mut view = anchored_view(100, anchor, 5000);

        let h101 = header(101, anchor, 100, 0);
        let h102 = header(102, h101.hash(), 100, 0);
        let h103 = header(103, h102.hash(), 100, 0);

        // Children first: both park.
        view.add(h102.clone());
        view.add(h103.clone());
        assert_eq!(view.head_hash(), anchor);

        // The missing link arrives and the whole subtree becomes eligible.
        view.add(h101);
        assert_eq!(view.head_height(), 103);
        assert_eq!(view.head_hash(), h103.hash());
        assert_eq!(view.head_total_difficulty(), U256::from(5300));
    }

    #[test]
    fn anchor_header_unlocks_sibling_branches() {
        // Canonical trunk 99 -> A(100); the engine later replays A plus a
        // heavier sibling branch A'(100) -> 101.
        let h99 = header(99, B256::repeat_byte(0x01), 100, 0);
        let a = header(100, h99.hash(), 100, 0);
        let a_prime = header(100, h99.hash(), 150, 1);
        let h101 = header(101, a_prime.hash(), 150, 1);

        let mut view = ForkChoiceView::new();
        view.reset_head(ChainHead::new(100, a.hash(), U256::from(5000)));

        // The sibling parks until the anchor's own header reveals the trunk.
        view.add(a_prime.clone());
        assert_eq!(view.head_hash(), a.hash());

        view.add(a.clone());
        // td(99) = 5000 - 100 = 4900, so td(A') = 5050 beats the anchor.
        assert_eq!(view.head_hash(), a_prime.hash());

        view.add(h101.clone());
        assert_eq!(view.head_height(), 101);
        assert_eq!(view.head_total_difficulty(), U256::from(5200));
        assert_eq!(view.head_hash(), h101.hash());
    }

    #[test]
    fn reset_then_add_own_header_keeps_head() {
        let h99 = header(99, B256::repeat_byte(0x01), 100, 0);
        let a = header(100, h99.hash(), 100, 0);

        let mut view = ForkChoiceView::new();
        let head = ChainHead::new(100, a.hash(), U256::from(5000));
        view.reset_head(head);
        let td = view.add(a);

        assert_eq!(td, U256::from(5000));
        assert_eq!(view.head(), head);
    }

    #[test]
    fn prune_drops_cold_entries() {
        let anchor = B256::repeat_byte(0xaa);
        let mut view = anchored_view(100, anchor, 5000);

        let mut parent = anchor;
        let mut hashes = Vec::new();
        for number in 101..=110 {
            let h = header(number, parent, 100, 0);
            parent = h.hash();
            hashes.push((number, h.hash()));
            view.add(h);
        }

        view.prune(105);

        for (number, hash) in hashes {
            assert_eq!(view.contains(&hash), number >= 105, "entry {number}");
        }
        assert!(!view.contains(&anchor));
        assert_eq!(view.head_height(), 110);
    }
}
