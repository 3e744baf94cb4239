//! The process-wide-per-compilation identifier table (spec §3 "Identifier").
//!
//! An `Identifier` is a pointer-sized handle, unique per byte-equal string,
//! with lifetime matching the owning [`Interner`] (in practice, the AST
//! context). We represent it as a dense `u32` index rather than a bare
//! pointer: equality is still O(1) and total, but lookups don't need
//! `unsafe` pointer comparisons and the handle is `Send`-free-of-lifetime,
//! which keeps it usable as a `HashMap` key and a `Copy` field on every
//! tagged AST node without threading an extra lifetime parameter through
//! the whole tree.

use bumpalo::Bump;
use std::cell::RefCell;
use vellum_data_structures::fx::FxHashMap;
use vellum_index::{newtype_index, Idx};

newtype_index!(
    /// A handle into the owning [`Interner`]'s string table.
    pub struct Identifier
);

/// Interns byte-equal strings to a single [`Identifier`] each.
///
/// Interned strings are allocated out of an internal bump arena that lives
/// exactly as long as the `Interner` itself; unlike the AST context's
/// `permanent`/`solver` arenas, this one is never reset mid-compilation.
pub struct Interner {
    arena: Bump,
    // SAFETY invariant: every `&'static str` here is actually borrowed from
    // `arena`, which this struct also owns; the 'static lifetime is a lie
    // that never escapes this module. Entries never move or get deallocated
    // before `arena` itself drops, because `Bump` never frees individual
    // allocations and we never call `Bump::reset`.
    strings: RefCell<Vec<&'static str>>,
    map: RefCell<FxHashMap<&'static str, Identifier>>,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    pub fn new() -> Self {
        Interner { arena: Bump::new(), strings: RefCell::new(Vec::new()), map: RefCell::new(FxHashMap::default()) }
    }

    /// Interns `text`, returning the same `Identifier` for any previously
    /// interned byte-equal string.
    pub fn intern(&self, text: &str) -> Identifier {
        if let Some(&id) = self.map.borrow().get(text) {
            return id;
        }
        let allocated: &str = self.arena.alloc_str(text);
        // SAFETY: `allocated` is owned by `self.arena`, which outlives every
        // read of `strings`/`map` because both are private fields dropped
        // together with `arena` and never exposed with a borrowed lifetime
        // longer than `&self`.
        let allocated: &'static str = unsafe { std::mem::transmute(allocated) };
        let id = Identifier::new(self.strings.borrow().len());
        self.strings.borrow_mut().push(allocated);
        self.map.borrow_mut().insert(allocated, id);
        id
    }

    pub fn as_str(&self, id: Identifier) -> &str {
        // SAFETY: shrinking 'static back down to '_ (borrowed from `self`)
        // is always sound; we only ever handed out the lie to store it.
        self.strings.borrow()[id.index()]
    }

    pub fn len(&self) -> usize {
        self.strings.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
