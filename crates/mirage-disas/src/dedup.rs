//! Already-printed block cache.
//!
//! Re-executed translation blocks would otherwise re-emit identical
//! disassembly; this cache remembers every (address, length) pair that has
//! been fully printed. Membership is a hash set, the insertion order is kept
//! in a capacity-managed vector so growth stays observable and bounded.

use std::collections::HashSet;

use thiserror::Error;

/// Initial block capacity.
const INITIAL_CAPACITY: usize = 100;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("printed-block cache exhausted its budget of {budget} blocks; deduplication disabled")]
    BlockBudgetExhausted { budget: usize },
}

/// Set of (address, length) regions that have already been printed in full.
///
/// Growth follows a `2*capacity + 100` policy. When a configured budget is
/// exhausted the cache reports it once and then degrades to "never seen":
/// callers keep printing full walks instead of dying.
#[derive(Debug)]
pub struct PrintedBlocks {
    blocks: Vec<(u64, u64)>,
    index: HashSet<(u64, u64)>,
    capacity: usize,
    budget: Option<usize>,
    disabled: bool,
}

impl Default for PrintedBlocks {
    fn default() -> Self {
        Self::new()
    }
}

impl PrintedBlocks {
    pub fn new() -> Self {
        Self::with_budget_opt(None)
    }

    /// Cache that refuses to track more than `budget` blocks.
    pub fn with_budget(budget: usize) -> Self {
        Self::with_budget_opt(Some(budget))
    }

    fn with_budget_opt(budget: Option<usize>) -> Self {
        let capacity = budget.map_or(INITIAL_CAPACITY, |b| b.min(INITIAL_CAPACITY));
        Self {
            blocks: Vec::with_capacity(capacity),
            index: HashSet::new(),
            capacity,
            budget,
            disabled: false,
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, addr: u64, len: u64) -> bool {
        !self.disabled && self.index.contains(&(addr, len))
    }

    /// Report whether (addr, len) was already printed, recording it if not.
    ///
    /// Idempotent: re-inserting a present pair is a no-op that returns
    /// `Ok(true)`. The error is reported exactly once, at the insert that
    /// exhausts the budget; afterwards the cache is disabled and every call
    /// returns `Ok(false)`.
    pub fn check_and_insert(&mut self, addr: u64, len: u64) -> Result<bool, ResourceError> {
        if self.disabled {
            return Ok(false);
        }
        if self.index.contains(&(addr, len)) {
            return Ok(true);
        }
        if self.blocks.len() == self.capacity {
            if let Some(budget) = self.budget {
                if self.capacity >= budget {
                    self.disabled = true;
                    return Err(ResourceError::BlockBudgetExhausted { budget });
                }
            }
            let grown = self.capacity * 2 + 100;
            let new_capacity = self.budget.map_or(grown, |b| grown.min(b));
            self.blocks.reserve_exact(new_capacity - self.blocks.len());
            self.capacity = new_capacity;
        }
        self.blocks.push((addr, len));
        self.index.insert((addr, len));
        Ok(false)
    }
}
