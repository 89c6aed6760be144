//! The watch set and the seen-context registry.

use mirage_mem::ContextId;

use crate::ConfigurationError;

/// Most context ids a watch set can hold.
pub const WATCH_CAPACITY: usize = 1000;

/// Most distinct context ids the seen registry records.
pub const ALL_PIDS_CAPACITY: usize = 10_000;

/// Ordered list of watched context ids with a parallel per-id counter of
/// bytes printed on its behalf. Index 0 is kept hot: the matcher swaps the
/// most recently matched id (and its counter) to the front, so sustained
/// execution in one context stays O(1).
///
/// The set never shrinks after construction.
#[derive(Debug, Clone)]
pub struct WatchSet {
    ids: Vec<ContextId>,
    printed_bytes: Vec<u64>,
}

impl WatchSet {
    /// Build a watch set. Rejects the reserved unset sentinel and lists that
    /// exceed [`WATCH_CAPACITY`]; both would otherwise corrupt matching
    /// invariants mid-run.
    pub fn new(ids: Vec<ContextId>) -> Result<Self, ConfigurationError> {
        if ids.len() > WATCH_CAPACITY {
            return Err(ConfigurationError::WatchListFull {
                len: ids.len(),
                capacity: WATCH_CAPACITY,
            });
        }
        if ids.iter().any(|id| id.is_unset()) {
            return Err(ConfigurationError::UnsetWatchId);
        }
        let printed_bytes = vec![0; ids.len()];
        Ok(Self { ids, printed_bytes })
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &[ContextId] {
        &self.ids
    }

    pub fn printed_bytes(&self) -> &[u64] {
        &self.printed_bytes
    }

    pub(crate) fn position(&self, context: ContextId) -> Option<usize> {
        self.ids.iter().position(|&id| id == context)
    }

    /// Swap slot `index` (id and counter together) into slot 0.
    pub(crate) fn promote(&mut self, index: usize) {
        self.ids.swap(0, index);
        self.printed_bytes.swap(0, index);
    }
}

/// Registry of every distinct context id observed by the matcher, kept for
/// off-line triage. Move-to-front ordered: the current id of each observed
/// (current, previous) pair is promoted. Never consulted by matching.
#[derive(Debug, Default, Clone)]
pub struct AllPidsSeen {
    ids: Vec<ContextId>,
}

impl AllPidsSeen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[ContextId] {
        &self.ids
    }

    pub fn front(&self) -> Option<ContextId> {
        self.ids.first().copied()
    }

    /// Register both halves of an observed (current, previous) pair exactly
    /// once each, then promote `current` to the front.
    pub fn observe_pair(&mut self, current: ContextId, previous: ContextId) {
        self.register(current);
        self.register(previous);
        if let Some(index) = self.ids.iter().position(|&id| id == current) {
            self.ids.swap(0, index);
        }
    }

    fn register(&mut self, id: ContextId) {
        if self.ids.len() >= ALL_PIDS_CAPACITY {
            return;
        }
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }
}
