//! Context-matching and diagnostics state for the tracing core.
//!
//! A [`TracerContext`] is built once at emulator startup from a
//! [`TracerConfig`] and passed by reference to every call that wants to
//! filter or print: it owns the global toggles, the watched-context set, the
//! registry of every context id seen, and the differential register dump.
//! Nothing here is thread-safe; each vCPU thread gets its own instance.

mod regdump;
mod watch;

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mirage_cpu::ArmCpuState;
use mirage_mem::{ContextId, HelperTap};

use regdump::RegDump;
pub use watch::{AllPidsSeen, WatchSet, ALL_PIDS_CAPACITY, WATCH_CAPACITY};

/// Global trace toggles. `cpu` gates the context matcher; `mmu` and `icount`
/// are read by the soft-MMU and instruction-count collaborators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceToggles {
    #[serde(default)]
    pub cpu: bool,
    #[serde(default)]
    pub mmu: bool,
    #[serde(default)]
    pub icount: bool,
}

/// Startup configuration for a [`TracerContext`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TracerConfig {
    #[serde(default)]
    pub toggles: TraceToggles,
    /// Context ids to trace. Zero is reserved and rejected.
    #[serde(default)]
    pub watch: Vec<u32>,
}

/// Configuration problems reported at startup instead of aborting mid-run.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("watched context id 0 is the reserved unset sentinel")]
    UnsetWatchId,
    #[error("watch list of {len} ids exceeds capacity {capacity}")]
    WatchListFull { len: usize, capacity: usize },
}

/// Result of asking whether the current instruction stream belongs to a
/// watched context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Not a watched context (or tracing disabled, or no CPU state).
    NoMatch,
    /// Fast-path hit against the cached last-matched id.
    Front,
    /// Scan hit; 1-based index the id occupied before being moved to front.
    Rank(usize),
}

impl MatchOutcome {
    #[inline]
    pub fn is_match(self) -> bool {
        !matches!(self, MatchOutcome::NoMatch)
    }
}

#[derive(Debug)]
pub struct TracerContext {
    toggles: TraceToggles,
    watch: WatchSet,
    /// Id that matched most recently; the O(1) fast path.
    last_matched: Option<ContextId>,
    /// Id observed on the previous match call, paired with the current one
    /// when updating the seen registry.
    prev_context: Option<ContextId>,
    /// Created on the first observation.
    all_pids: Option<AllPidsSeen>,
    regs: RegDump,
}

impl TracerContext {
    pub fn new(config: TracerConfig) -> Result<Self, ConfigurationError> {
        let watch = WatchSet::new(config.watch.into_iter().map(ContextId).collect())?;
        Ok(Self {
            toggles: config.toggles,
            watch,
            last_matched: None,
            prev_context: None,
            all_pids: None,
            regs: RegDump::default(),
        })
    }

    pub fn toggles(&self) -> TraceToggles {
        self.toggles
    }

    pub fn watch(&self) -> &WatchSet {
        &self.watch
    }

    /// Every distinct context id observed so far (empty until the first
    /// observation).
    pub fn all_pids(&self) -> &[ContextId] {
        self.all_pids.as_ref().map(AllPidsSeen::ids).unwrap_or(&[])
    }

    /// Decide whether the instruction stream of `cpu` belongs to a watched
    /// context.
    ///
    /// Cheapest checks first: a disabled CPU toggle returns immediately and
    /// a missing CPU state fails closed, neither touching watch-set state.
    /// Otherwise the derived id is registered in the seen registry, compared
    /// against the cached last match, and finally scanned for in the watch
    /// set with a move-to-front swap on hit.
    pub fn match_context(&mut self, cpu: Option<&ArmCpuState>) -> MatchOutcome {
        if !self.toggles.cpu {
            return MatchOutcome::NoMatch;
        }
        let Some(cpu) = cpu else {
            return MatchOutcome::NoMatch;
        };
        let context = cpu.context_id();

        let previous = self.prev_context.unwrap_or(context);
        self.all_pids
            .get_or_insert_with(AllPidsSeen::new)
            .observe_pair(context, previous);
        self.prev_context = Some(context);

        if self.last_matched == Some(context) {
            return MatchOutcome::Front;
        }

        if let Some(index) = self.watch.position(context) {
            self.watch.promote(index);
            self.last_matched = Some(context);
            return MatchOutcome::Rank(index + 1);
        }

        MatchOutcome::NoMatch
    }

    /// Tap handed to the typed access layer: armed whenever a watch list is
    /// configured, reporting on behalf of the last matched context.
    pub fn helper_tap<'a>(&self, out: &'a mut dyn Write) -> HelperTap<'a> {
        if self.watch.is_empty() {
            return HelperTap::off();
        }
        HelperTap::armed(self.last_matched.unwrap_or(ContextId::UNSET), out)
    }

    /// Differential register dump (see [`regdump`] semantics).
    pub fn dump_registers<W: Write>(
        &mut self,
        out: &mut W,
        cpu: &ArmCpuState,
        label: &str,
    ) -> io::Result<()> {
        self.regs.dump(out, cpu, label)
    }
}
