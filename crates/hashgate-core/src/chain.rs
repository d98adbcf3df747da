//! Height-indexed chain index.
//!
//! Entries are appended once a block is accepted onto the best chain and are
//! never mutated afterwards. Consensus code reads them through [`ChainView`],
//! which resolves the previous-block relation by height.

use crate::constants::GENESIS_HEIGHT;
use crate::types::{BlockHash, CoreError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Header fields of an accepted block that consensus rules read back.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChainIndexEntry {
    /// Block height (genesis is 0).
    pub height: u64,
    /// Block timestamp in seconds since the Unix epoch.
    pub timestamp: i64,
    /// Compact difficulty target carried by the block.
    pub bits: u32,
    /// Hash of this block.
    pub hash: BlockHash,
    /// Hash of the previous block (all-zero for genesis).
    pub prev: BlockHash,
}

/// Read-only access to a consistent snapshot of accepted blocks.
///
/// Implementations must not unlink or mutate entries while a caller holds a
/// borrow; the borrow checker enforces this for [`ChainIndex`].
pub trait ChainView {
    /// Entry at `height`, if it is present in this view.
    fn entry(&self, height: u64) -> Option<&ChainIndexEntry>;

    /// Highest entry in this view.
    fn tip(&self) -> Option<&ChainIndexEntry>;

    /// Entry directly below `entry`, or `None` at the start of the view.
    fn previous(&self, entry: &ChainIndexEntry) -> Option<&ChainIndexEntry> {
        let prev = self.entry(entry.height.checked_sub(1)?)?;
        (prev.hash == entry.prev).then_some(prev)
    }

    /// Follow previous links from `entry` at most `steps` times.
    ///
    /// Stops early at the first entry without a previous one.
    fn walk_back<'a>(&'a self, entry: &'a ChainIndexEntry, steps: u64) -> &'a ChainIndexEntry {
        walk_links(self, entry, steps)
    }
}

/// Link-chasing walk shared by the default [`ChainView::walk_back`].
pub fn walk_links<'a, V: ChainView + ?Sized>(
    view: &'a V,
    entry: &'a ChainIndexEntry,
    steps: u64,
) -> &'a ChainIndexEntry {
    let mut cur = entry;
    for _ in 0..steps {
        match view.previous(cur) {
            Some(prev) => cur = prev,
            None => break,
        }
    }
    cur
}

/// Append-only, contiguous store of entries addressed by height.
///
/// The index may start at genesis or at any snapshot height (`base_height`);
/// the first stored entry has no previous entry inside the view.
#[derive(Clone, Debug, Default)]
pub struct ChainIndex {
    base_height: u64,
    entries: Vec<ChainIndexEntry>,
}

impl ChainIndex {
    /// Empty index whose first entry will be genesis.
    pub fn new() -> Self {
        Self::with_base_height(GENESIS_HEIGHT)
    }

    /// Empty index whose first entry will sit at `base_height`.
    pub fn with_base_height(base_height: u64) -> Self {
        Self {
            base_height,
            entries: Vec::new(),
        }
    }

    /// Height of the first entry this index accepts or holds.
    pub fn base_height(&self) -> u64 {
        self.base_height
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from lowest to highest height.
    pub fn iter(&self) -> impl Iterator<Item = &ChainIndexEntry> {
        self.entries.iter()
    }

    /// Append a fully-formed entry on top of the current tip.
    ///
    /// The entry must carry the next height and, unless it is the first entry
    /// of the index, link to the tip hash.
    pub fn push(&mut self, entry: ChainIndexEntry) -> Result<&ChainIndexEntry, CoreError> {
        let expected = self.next_height();
        if entry.height != expected {
            return Err(CoreError::UnexpectedHeight {
                expected,
                got: entry.height,
            });
        }
        if let Some(tip) = self.entries.last() {
            if entry.prev != tip.hash {
                return Err(CoreError::PrevMismatch {
                    height: entry.height,
                });
            }
        }
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Append a block by hash, filling in height and previous hash from the tip.
    pub fn append(
        &mut self,
        hash: BlockHash,
        timestamp: i64,
        bits: u32,
    ) -> Result<&ChainIndexEntry, CoreError> {
        let prev = self
            .entries
            .last()
            .map(|tip| tip.hash)
            .unwrap_or_else(BlockHash::zero);
        let height = self.next_height();
        self.push(ChainIndexEntry {
            height,
            timestamp,
            bits,
            hash,
            prev,
        })
    }

    fn next_height(&self) -> u64 {
        self.base_height + self.entries.len() as u64
    }

    fn slot(&self, height: u64) -> Option<usize> {
        usize::try_from(height.checked_sub(self.base_height)?).ok()
    }

    fn contains(&self, entry: &ChainIndexEntry) -> bool {
        self.entry(entry.height)
            .is_some_and(|stored| stored.hash == entry.hash)
    }
}

impl ChainView for ChainIndex {
    fn entry(&self, height: u64) -> Option<&ChainIndexEntry> {
        self.entries.get(self.slot(height)?)
    }

    fn tip(&self) -> Option<&ChainIndexEntry> {
        self.entries.last()
    }

    fn walk_back<'a>(&'a self, entry: &'a ChainIndexEntry, steps: u64) -> &'a ChainIndexEntry {
        // Linkage is checked on push, so stored entries can be reached by height.
        if !self.contains(entry) {
            return walk_links(self, entry, steps);
        }
        let target = entry.height.saturating_sub(steps).max(self.base_height);
        self.entry(target).unwrap_or(entry)
    }
}
