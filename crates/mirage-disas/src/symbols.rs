//! Best-effort symbol resolution.
//!
//! Loaders register one [`SymbolSource`] per image; lookups walk the chain
//! and take the first non-empty answer. Unknown addresses resolve to the
//! empty string, never an error.

/// One source of symbol names (an ELF symtab, a JIT map, ...).
pub trait SymbolSource {
    /// Name of the symbol covering `addr`, or `""` when unknown.
    fn lookup(&self, addr: u64) -> &str;
}

/// Chain of registered symbol sources, searched in registration order.
#[derive(Default)]
pub struct SymbolRegistry {
    sources: Vec<Box<dyn SymbolSource>>,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: Box<dyn SymbolSource>) {
        self.sources.push(source);
    }

    pub fn lookup_symbol(&self, addr: u64) -> &str {
        for source in &self.sources {
            let name = source.lookup(addr);
            if !name.is_empty() {
                return name;
            }
        }
        ""
    }
}

/// Simple sorted-range symbol source.
#[derive(Debug, Default)]
pub struct SymbolMap {
    /// (start, size, name), sorted by start.
    syms: Vec<(u64, u64, String)>,
}

impl SymbolMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, start: u64, size: u64, name: impl Into<String>) {
        let name = name.into();
        let at = self
            .syms
            .partition_point(|&(s, _, _)| s <= start);
        self.syms.insert(at, (start, size, name));
    }
}

impl SymbolSource for SymbolMap {
    fn lookup(&self, addr: u64) -> &str {
        let idx = self.syms.partition_point(|&(s, _, _)| s <= addr);
        if idx == 0 {
            return "";
        }
        let (start, size, ref name) = self.syms[idx - 1];
        if addr < start.saturating_add(size) {
            name
        } else {
            ""
        }
    }
}
