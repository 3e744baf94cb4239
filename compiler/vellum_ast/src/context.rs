//! The AST context (spec §3 "AST context", §4.1, SPEC_FULL §4.1a).
//!
//! Mirrors the teacher's `GlobalCtxt<'tcx>` / `TyCtxt<'tcx>` split:
//! [`ContextArenas`] is a plain owned value created first; [`AstContextData`]
//! borrows it for `'ctx` and owns every uniquing table; [`AstContext`] is a
//! thin `Copy` wrapper around `&'ctx AstContextData<'ctx>`, passed by value
//! the way `TyCtxt` is, so operations like beginning a constraint-solver
//! session can capture a `'ctx`-lifetime context without an explicit
//! `&'ctx self` receiver.

use crate::conformance::{Conformance, ConformanceData, ConformanceKind};
use crate::decl::Decl;
use crate::module::{Module, ModuleData, ModuleLoader};
use crate::types::{Type, TypeData, TypeKind};
use std::cell::{Cell, RefCell};
use std::ops::Deref;
use tracing::{debug, trace};
use vellum_arena::{Arena, ArenaKind, Identifier, Interner};
use vellum_data_structures::fx::FxHashMap;

/// Owned arena storage, created before any [`AstContextData`] borrows it.
pub struct ContextArenas {
    pub(crate) permanent: Arena,
    pub(crate) solver: Arena,
    pub(crate) identifiers: Interner,
}

impl ContextArenas {
    pub fn new() -> Self {
        ContextArenas { permanent: Arena::new(ArenaKind::Permanent), solver: Arena::new(ArenaKind::ConstraintSolver), identifiers: Interner::new() }
    }
}

impl Default for ContextArenas {
    fn default() -> Self {
        ContextArenas::new()
    }
}

type Cleanup = Box<dyn FnOnce()>;

/// Per-nominal member lookup cache (SPEC_FULL §4.1a), generation-stamped.
struct MemberLookupCache<'ctx> {
    generation: u64,
    members: FxHashMap<Identifier, Vec<Decl<'ctx>>>,
}

/// Owns every uniquing table and the registered loaders/listeners/cleanups.
/// Lives behind `&'ctx` so [`AstContext`] can be a cheap `Copy` handle.
pub struct AstContextData<'ctx> {
    arenas: &'ctx ContextArenas,
    // A linear list rather than a hash set: `TypeData` holds a `Cell` for
    // its canonicalization cache, so it isn't `Hash`/`Eq`; uniquing instead
    // does a structural scan keyed by `StructuralTypeKey` below. Fine at
    // this scale — real cross-module builds would key on a precomputed
    // structural hash instead of scanning every interned type.
    type_table: RefCell<Vec<&'ctx TypeData<'ctx>>>,
    conformance_table: RefCell<FxHashMap<(*const TypeData<'ctx>, *const crate::decl::DeclData<'ctx>), Conformance<'ctx>>>,
    loaders: RefCell<Vec<(Box<dyn ModuleLoader<'ctx> + 'ctx>, bool)>>,
    mutation_listeners: RefCell<Vec<Box<dyn Fn() + 'ctx>>>,
    generation: Cell<u64>,
    cleanups: RefCell<Vec<Cleanup>>,
    member_lookup_caches: RefCell<FxHashMap<*const crate::decl::DeclData<'ctx>, MemberLookupCache<'ctx>>>,
    had_error: Cell<bool>,
    solver_session_active: Cell<bool>,
}

// `TypeData` isn't `Hash`/`Eq` by derive (it holds a `Cell`); the type table
// instead compares structural equality of the kind modulo sugar. We
// implement this via a thin wrapper rather than on `TypeData` itself so
// equality always means "same *structural* type", never "same address".
struct StructuralTypeKey<'a, 'ctx>(&'a TypeKind<'ctx>);

impl PartialEq for StructuralTypeKey<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        format!("{:?}", self.0) == format!("{:?}", other.0)
    }
}

impl<'ctx> AstContextData<'ctx> {
    pub fn new(arenas: &'ctx ContextArenas) -> Self {
        AstContextData {
            arenas,
            type_table: RefCell::new(Vec::new()),
            conformance_table: RefCell::new(FxHashMap::default()),
            loaders: RefCell::new(Vec::new()),
            mutation_listeners: RefCell::new(Vec::new()),
            generation: Cell::new(0),
            cleanups: RefCell::new(Vec::new()),
            member_lookup_caches: RefCell::new(FxHashMap::default()),
            had_error: Cell::new(false),
            solver_session_active: Cell::new(false),
        }
    }

    pub fn had_error(&self) -> bool {
        self.had_error.get()
    }

    pub fn record_error(&self) {
        self.had_error.set(true);
    }

    pub fn intern_identifier(&self, text: &str) -> Identifier {
        self.arenas.identifiers.intern(text)
    }

    pub fn identifier_text(&self, id: Identifier) -> &str {
        self.arenas.identifiers.as_str(id)
    }

    /// Allocates `value` in the named arena (spec §4.1 "allocate"). Permanent
    /// allocations live until context teardown; constraint-solver
    /// allocations live only for the held session (enforced by documented
    /// contract per SPEC_FULL §9, not by the borrow checker: see
    /// `AstContext::begin_constraint_solver_session`).
    pub fn allocate<T>(&self, value: T, arena: ArenaKind) -> &'ctx T {
        match arena {
            ArenaKind::Permanent => self.arenas.permanent.alloc(value),
            ArenaKind::ConstraintSolver => self.arenas.solver.alloc(value),
        }
    }

    /// Interns a structural type form, returning the canonical uniqued
    /// instance (spec §4.1 "intern_type"). All type builders should route
    /// through this so type equality becomes handle equality.
    pub fn intern_type(&self, kind: TypeKind<'ctx>) -> Type<'ctx> {
        let arena_kind = if uses_solver_arena(&kind) { ArenaKind::ConstraintSolver } else { ArenaKind::Permanent };
        let key = StructuralTypeKey(&kind);
        let existing = self.type_table.borrow().iter().find(|t| StructuralTypeKey(&t.kind) == key).copied();
        if let Some(existing) = existing {
            return existing;
        }
        let data = self.allocate(TypeData::new(kind, arena_kind), arena_kind);
        self.type_table.borrow_mut().push(data);
        trace!(arena = ?arena_kind, "interned new type");
        data
    }

    /// Canonicalizes `ty`: strips sugar, canonicalizes children, orders
    /// protocol composition members, collapses single-element tuples (spec
    /// §4.2 "Canonicalization"). Idempotent: canonicalizing a canonical type
    /// returns the same handle.
    pub fn canonicalize(&self, ty: Type<'ctx>) -> Type<'ctx> {
        if let Some(cached) = ty.cached_canonical() {
            return cached;
        }
        let canonical = match ty.kind {
            TypeKind::Paren(inner) | TypeKind::TypeAliasSugar { underlying: inner } | TypeKind::SubstitutedGenericParameterSugar { underlying: inner } => {
                self.canonicalize(inner)
            }
            TypeKind::Tuple { elements } if elements.len() == 1 => self.canonicalize(elements[0].ty),
            TypeKind::Tuple { elements } => {
                let canon_elements: Vec<_> =
                    elements.iter().map(|e| crate::types::TupleElement { label: e.label, ty: self.canonicalize(e.ty) }).collect();
                if canon_elements.len() == 1 {
                    canon_elements[0].ty
                } else {
                    let slice = self.arenas.permanent.alloc_slice_from_vec(canon_elements);
                    self.intern_type(TypeKind::Tuple { elements: slice })
                }
            }
            TypeKind::ProtocolComposition { members } => {
                let mut canon_members: Vec<_> = members.iter().map(|m| self.canonicalize(m)).collect();
                canon_members.sort_by_key(|m| *m as *const TypeData<'ctx> as usize);
                canon_members.dedup_by_key(|m| *m as *const TypeData<'ctx>);
                let slice = self.arenas.permanent.alloc_slice_from_vec(canon_members);
                self.intern_type(TypeKind::ProtocolComposition { members: slice })
            }
            TypeKind::BoundGeneric { nominal, args } => {
                let canon_nominal = self.canonicalize(nominal);
                let canon_args: Vec<_> = args.iter().map(|a| self.canonicalize(a)).collect();
                let slice = self.arenas.permanent.alloc_slice_from_vec(canon_args);
                self.intern_type(TypeKind::BoundGeneric { nominal: canon_nominal, args: slice })
            }
            TypeKind::Function { inputs, result, flags } => {
                let canon_inputs: Vec<_> = inputs.iter().map(|i| self.canonicalize(i)).collect();
                let slice = self.arenas.permanent.alloc_slice_from_vec(canon_inputs);
                self.intern_type(TypeKind::Function { inputs: slice, result: self.canonicalize(result), flags })
            }
            TypeKind::ReferenceStorage { referent, ownership } => {
                self.intern_type(TypeKind::ReferenceStorage { referent: self.canonicalize(referent), ownership })
            }
            TypeKind::LValue { object } => self.intern_type(TypeKind::LValue { object: self.canonicalize(object) }),
            TypeKind::Metatype { instance } => self.intern_type(TypeKind::Metatype { instance: self.canonicalize(instance) }),
            _ => ty,
        };
        ty.set_cached_canonical(canonical);
        canonical.set_cached_canonical(canonical);
        canonical
    }

    /// Walks `ty`, replacing each type-variable/archetype ordinal present in
    /// `map` (spec §4.2 "Substitution"). Non-matching ordinals are left
    /// untouched.
    pub fn substitute(&self, ty: Type<'ctx>, map: &crate::types::SubstitutionMap<'ctx>) -> Type<'ctx> {
        if map.is_empty() {
            return ty;
        }
        match ty.kind {
            TypeKind::Archetype { ordinal, .. } | TypeKind::TypeVariable { id: ordinal } => {
                map.lookup(ordinal).unwrap_or(ty)
            }
            TypeKind::Tuple { elements } => {
                let substituted: Vec<_> =
                    elements.iter().map(|e| crate::types::TupleElement { label: e.label, ty: self.substitute(e.ty, map) }).collect();
                let slice = self.arenas.permanent.alloc_slice_from_vec(substituted);
                self.intern_type(TypeKind::Tuple { elements: slice })
            }
            TypeKind::BoundGeneric { nominal, args } => {
                let substituted: Vec<_> = args.iter().map(|a| self.substitute(a, map)).collect();
                let slice = self.arenas.permanent.alloc_slice_from_vec(substituted);
                self.intern_type(TypeKind::BoundGeneric { nominal, args: slice })
            }
            TypeKind::Function { inputs, result, flags } => {
                let substituted: Vec<_> = inputs.iter().map(|i| self.substitute(i, map)).collect();
                let slice = self.arenas.permanent.alloc_slice_from_vec(substituted);
                self.intern_type(TypeKind::Function { inputs: slice, result: self.substitute(result, map), flags })
            }
            _ => ty,
        }
    }

    pub fn lookup_conformance(&self, ty: Type<'ctx>, protocol: Decl<'ctx>) -> Option<Conformance<'ctx>> {
        let canonical = self.canonicalize(ty);
        let key = (canonical as *const TypeData<'ctx>, protocol as *const crate::decl::DeclData<'ctx>);
        self.conformance_table.borrow().get(&key).copied()
    }

    pub fn record_conformance(&self, ty: Type<'ctx>, protocol: Decl<'ctx>, kind: ConformanceKind<'ctx>, is_error_recovery_synthesized: bool) -> Conformance<'ctx> {
        let canonical = self.canonicalize(ty);
        let data = self.arenas.permanent.alloc(ConformanceData { conforming_type: canonical, protocol, kind, is_error_recovery_synthesized });
        let key = (canonical as *const TypeData<'ctx>, protocol as *const crate::decl::DeclData<'ctx>);
        self.conformance_table.borrow_mut().insert(key, data);
        data
    }

    pub fn add_module_loader(&self, loader: Box<dyn ModuleLoader<'ctx> + 'ctx>, is_foreign_importer: bool) {
        self.loaders.borrow_mut().push((loader, is_foreign_importer));
    }

    pub fn register_mutation_listener(&self, listener: Box<dyn Fn() + 'ctx>) {
        self.mutation_listeners.borrow_mut().push(listener);
    }

    fn notify_mutation_listeners(&self) {
        for listener in self.mutation_listeners.borrow().iter() {
            listener();
        }
    }

    /// Asks every registered loader to contribute extensions to `nominal`
    /// introduced since `previous_generation`, consulting and refreshing the
    /// per-nominal cache as needed (SPEC_FULL §4.1a).
    pub fn load_extensions(&self, nominal: Decl<'ctx>, previous_generation: u64) -> Vec<Decl<'ctx>> {
        let key = nominal as *const crate::decl::DeclData<'ctx>;
        let current = self.generation.get();
        {
            let caches = self.member_lookup_caches.borrow();
            if let Some(cache) = caches.get(&key) {
                if cache.generation >= current && previous_generation >= cache.generation {
                    return cache.members.values().flatten().copied().collect();
                }
            }
        }
        // Loaders are asked relative to the context's current generation, not
        // the caller's `previous_generation` (that parameter only gates the
        // cache-freshness check above) — the rebuilt cache entry is stamped
        // `generation: current`, so loaders must be asked from that same
        // baseline.
        let mut result = Vec::new();
        for (loader, _) in self.loaders.borrow().iter() {
            result.extend(loader.load_extensions(nominal, current));
        }
        let mut members: FxHashMap<Identifier, Vec<Decl<'ctx>>> = FxHashMap::default();
        for decl in &result {
            members.entry(decl.name).or_default().push(*decl);
        }
        self.member_lookup_caches.borrow_mut().insert(key, MemberLookupCache { generation: current, members });
        result
    }

    /// Bumps the generation counter, returning the previous value (spec
    /// §4.1 "bump_generation"). Called by module loaders when they
    /// introduce new declarations (spec §6).
    pub fn bump_generation(&self) -> u64 {
        let old = self.generation.get();
        self.generation.set(old + 1);
        debug!(from = old, to = old + 1, "AST context generation advanced");
        self.notify_mutation_listeners();
        old
    }

    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    pub fn register_cleanup(&self, cleanup: Cleanup) {
        self.cleanups.borrow_mut().push(cleanup);
    }
}

impl Drop for AstContextData<'_> {
    /// Runs registered cleanups in LIFO order at teardown (spec §4.1
    /// "register_cleanup ... run in LIFO order at teardown").
    fn drop(&mut self) {
        for cleanup in self.cleanups.get_mut().drain(..).rev() {
            cleanup();
        }
    }
}

fn uses_solver_arena(kind: &TypeKind<'_>) -> bool {
    match kind {
        TypeKind::TypeVariable { .. } => true,
        _ => kind.children().iter().any(|child| child.arena == ArenaKind::ConstraintSolver),
    }
}

/// A cheap, `Copy` handle to the AST context, threaded through every phase
/// the way the teacher threads `TyCtxt<'tcx>`.
#[derive(Copy, Clone)]
pub struct AstContext<'ctx>(&'ctx AstContextData<'ctx>);

impl<'ctx> AstContext<'ctx> {
    pub fn new(data: &'ctx AstContextData<'ctx>) -> Self {
        AstContext(data)
    }

    /// Begins a constraint-solver session. Panics if one is already active
    /// (spec §9: "nested sessions are not permitted"). Takes `self` by value
    /// (cheap: `AstContext` is a single reference) so the returned session
    /// can hold a `'ctx`-lifetime context without borrowing from a local.
    pub fn begin_constraint_solver_session(self) -> ConstraintSolverSession<'ctx> {
        if self.0.solver_session_active.replace(true) {
            panic!("constraint-solver sessions may not be nested");
        }
        let ctx = self;
        let release: Box<dyn FnMut()> = Box::new(move || ctx.0.solver_session_active.set(false));
        ConstraintSolverSession { ctx, _release: vellum_data_structures::OnDrop(release) }
    }
}

impl<'ctx> Deref for AstContext<'ctx> {
    type Target = AstContextData<'ctx>;

    fn deref(&self) -> &AstContextData<'ctx> {
        self.0
    }
}

/// A scoped acquisition of the constraint-solver arena (spec §4.1
/// "Constraint-solver session"). Dropping it releases the session, allowing
/// a new one to begin; per SPEC_FULL §9, handles allocated during the
/// session must not be used afterward — this is a documented contract, not
/// one the type system enforces, matching the originating implementation's
/// own manually-scoped discipline.
pub struct ConstraintSolverSession<'ctx> {
    ctx: AstContext<'ctx>,
    /// Clears `solver_session_active` on every exit path, including a panic
    /// unwinding through an active session.
    _release: vellum_data_structures::OnDrop<Box<dyn FnMut()>>,
}

impl<'ctx> ConstraintSolverSession<'ctx> {
    pub fn intern_type_variable_dependent(&self, kind: TypeKind<'ctx>) -> Type<'ctx> {
        self.ctx.intern_type(kind)
    }

    pub fn context(&self) -> AstContext<'ctx> {
        self.ctx
    }
}

pub fn new_module<'ctx>(ctx: AstContext<'ctx>, name: Identifier) -> Module<'ctx> {
    ctx.allocate(ModuleData::new(name, ctx.generation()), ArenaKind::Permanent)
}
