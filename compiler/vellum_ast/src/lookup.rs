//! Name lookup (spec §4.3 "Name lookup flags", "Scoped lookup").

use crate::attr::SimpleAttrKind;
use crate::conformance::{Conformance, ConformanceKind};
use crate::decl::{Decl, DeclKind};
use crate::source::{SourceLoc, SourceRange};
use vellum_arena::Identifier;

bitflags::bitflags! {
    /// Qualified-lookup option bitset (spec §4.3 table).
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct LookupFlags: u8 {
        const VISIT_SUPERTYPES   = 0b0001;
        const DEFAULT_DEFINITIONS = 0b0010;
        const REMOVE_NON_VISIBLE  = 0b0100;
        const REMOVE_OVERRIDDEN   = 0b1000;
    }
}

impl LookupFlags {
    /// Combines the options used for qualified lookup by default.
    pub const QUALIFIED_DEFAULT: LookupFlags =
        LookupFlags::VISIT_SUPERTYPES.union(LookupFlags::REMOVE_NON_VISIBLE).union(LookupFlags::REMOVE_OVERRIDDEN);

    /// Combines the options used for unqualified lookup by default.
    pub const UNQUALIFIED_DEFAULT: LookupFlags = LookupFlags::REMOVE_NON_VISIBLE.union(LookupFlags::REMOVE_OVERRIDDEN);

    /// As `QUALIFIED_DEFAULT`, but omits supertype visitation — used for
    /// constructor lookup, which does not inherit initializers implicitly.
    pub const CONSTRUCTOR_DEFAULT: LookupFlags =
        LookupFlags::REMOVE_NON_VISIBLE.union(LookupFlags::REMOVE_OVERRIDDEN);
}

/// Whether a scope is a lookup boundary: lookup reaching this scope stops
/// walking further outward (spec §4.3: "a protocol's lookup does not cross
/// into an enclosing nominal").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Local,
    Generic,
    SelfType,
    Protocol,
    Nominal,
}

impl ScopeKind {
    fn is_lookup_limit(self) -> bool {
        matches!(self, ScopeKind::Protocol)
    }
}

pub struct ScopeNode<'ctx> {
    pub range: SourceRange,
    pub kind: ScopeKind,
    pub bindings: Vec<Decl<'ctx>>,
    pub children: Vec<ScopeNode<'ctx>>,
}

impl<'ctx> ScopeNode<'ctx> {
    pub fn new(range: SourceRange, kind: ScopeKind) -> Self {
        ScopeNode { range, kind, bindings: Vec::new(), children: Vec::new() }
    }

    /// Inserts `child`, keeping `children` sorted by start location so the
    /// innermost-scope search can binary-search it.
    pub fn add_child(&mut self, child: ScopeNode<'ctx>) {
        let pos = self.children.partition_point(|c| c.range.start <= child.range.start);
        self.children.insert(pos, child);
    }

    fn innermost_containing(&self, loc: SourceLoc) -> Option<&ScopeNode<'ctx>> {
        if !self.range.contains(loc) {
            return None;
        }
        let idx = self.children.partition_point(|c| c.range.start <= loc);
        if idx > 0 {
            if let Some(found) = self.children[idx - 1].innermost_containing(loc) {
                return Some(found);
            }
        }
        Some(self)
    }
}

/// Mirrors lexical scopes as a tree; roots are the top-level scopes of one
/// translation unit.
pub struct ScopeTree<'ctx> {
    pub roots: Vec<ScopeNode<'ctx>>,
}

impl<'ctx> ScopeTree<'ctx> {
    pub fn new() -> Self {
        ScopeTree { roots: Vec::new() }
    }

    fn innermost(&self, loc: SourceLoc) -> Option<&ScopeNode<'ctx>> {
        self.roots.iter().find_map(|r| r.innermost_containing(loc))
    }

    /// Unqualified lookup: locates the innermost scope enclosing `loc`, then
    /// walks outward collecting declarations named `name`, stopping once a
    /// scope with a declared lookup limit has been included.
    pub fn lookup_unqualified<'s>(&'s self, name: Identifier, loc: SourceLoc) -> Vec<Decl<'ctx>> {
        let mut results = Vec::new();
        let Some(mut scope) = self.innermost(loc) else { return results };
        loop {
            for &decl in &scope.bindings {
                if decl.name == name {
                    results.push(decl);
                }
            }
            if scope.kind.is_lookup_limit() {
                break;
            }
            // Walking "outward" requires a parent link; this tree is built
            // top-down so we re-descend from each root to find the parent
            // of `scope`. A production implementation would store parent
            // pointers directly; this is equivalent and avoids self-
            // referential arena-backed back-pointers for a reference impl.
            match self.parent_of(scope) {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        results
    }

    fn parent_of<'s>(&'s self, target: &ScopeNode<'ctx>) -> Option<&'s ScopeNode<'ctx>> {
        fn search<'a, 'ctx>(node: &'a ScopeNode<'ctx>, target: *const ScopeNode<'ctx>) -> Option<&'a ScopeNode<'ctx>> {
            for child in &node.children {
                if std::ptr::eq(child, target) {
                    return Some(node);
                }
                if let Some(found) = search(child, target) {
                    return Some(found);
                }
            }
            None
        }
        let target_ptr: *const ScopeNode<'ctx> = target;
        self.roots.iter().find_map(|r| search(r, target_ptr))
    }
}

impl Default for ScopeTree<'_> {
    fn default() -> Self {
        ScopeTree::new()
    }
}

/// Qualified lookup of `name` among a nominal's members, applying the
/// effects of `flags` (spec §4.3 "Name lookup flags").
///
/// `members` is the nominal's own declared member list; `extensions` is the
/// result of `AstContext::load_extensions` for that nominal; `conformances`
/// is the set of protocols it is recorded as conforming to. `VisitSupertypes`
/// walks each conformed protocol's own members as the closest analogue of a
/// supertype's members this crate tracks — `Decl`/`DeclKind` carries no
/// declared superclass or protocol-refinement edge, the same limitation
/// already noted for the typed IR verifier's upcast/downcast checks.
/// `RemoveNonVisible` is a documented no-op: `Decl`/`AttributeSet` carry no
/// access-level concept to filter against, so every candidate passes through
/// rather than being silently (and arbitrarily) dropped.
pub fn lookup_qualified<'ctx>(
    members: &[Decl<'ctx>],
    extensions: &[Decl<'ctx>],
    conformances: &[Conformance<'ctx>],
    name: Identifier,
    flags: LookupFlags,
) -> Vec<Decl<'ctx>> {
    let mut results: Vec<Decl<'ctx>> = members.iter().chain(extensions.iter()).filter(|d| d.name == name).copied().collect();

    if flags.contains(LookupFlags::VISIT_SUPERTYPES) {
        for conformance in conformances {
            if let DeclKind::Type { members: protocol_members } = &conformance.protocol.kind {
                for &candidate in protocol_members.iter().filter(|d| d.name == name) {
                    if !results.iter().any(|d| std::ptr::eq(*d, candidate)) {
                        results.push(candidate);
                    }
                }
            }
        }
    }

    if flags.contains(LookupFlags::DEFAULT_DEFINITIONS) {
        for conformance in conformances {
            let witnesses: &[Decl<'ctx>] = match &conformance.kind {
                ConformanceKind::Normal { witnesses } => witnesses,
                _ => &[],
            };
            if let DeclKind::Type { members: protocol_members } = &conformance.protocol.kind {
                for &requirement in protocol_members.iter().filter(|d| d.name == name && d.body.is_some()) {
                    let has_witness = witnesses.iter().any(|w| w.name == name);
                    if !has_witness && !results.iter().any(|d| std::ptr::eq(*d, requirement)) {
                        results.push(requirement);
                    }
                }
            }
        }
    }

    // RemoveNonVisible: no-op, see doc comment above.

    if flags.contains(LookupFlags::REMOVE_OVERRIDDEN) && results.iter().any(|d| d.attrs.has_simple(SimpleAttrKind::Override)) {
        results.retain(|d| d.attrs.has_simple(SimpleAttrKind::Override));
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_arena::Interner;

    #[test]
    fn qualified_default_omits_default_definitions() {
        assert!(!LookupFlags::QUALIFIED_DEFAULT.contains(LookupFlags::DEFAULT_DEFINITIONS));
        assert!(LookupFlags::QUALIFIED_DEFAULT.contains(LookupFlags::VISIT_SUPERTYPES));
    }

    #[test]
    fn constructor_default_omits_supertype_visit() {
        assert!(!LookupFlags::CONSTRUCTOR_DEFAULT.contains(LookupFlags::VISIT_SUPERTYPES));
        assert!(LookupFlags::CONSTRUCTOR_DEFAULT.contains(LookupFlags::REMOVE_OVERRIDDEN));
    }

    #[test]
    fn visit_supertypes_pulls_in_a_conformed_protocols_member() {
        use crate::attr::AttributeSet;
        use crate::conformance::ConformanceData;
        use crate::context::{new_module, AstContext, AstContextData, ContextArenas};
        use crate::decl::{DeclContext, DeclData};
        use vellum_arena::ArenaKind;

        let arenas = ContextArenas::new();
        let data = AstContextData::new(&arenas);
        let ctx = AstContext::new(&data);
        let module = new_module(ctx, ctx.intern_identifier("M"));
        let requirement_name = ctx.intern_identifier("draw");

        let requirement = ctx.allocate(
            DeclData::new(DeclContext::Module(module), requirement_name, AttributeSet::new(), DeclKind::Value { is_static: false }, SourceRange::INVALID),
            ArenaKind::Permanent,
        );
        let protocol_members: &[Decl<'_>] = ctx.allocate(vec![requirement], ArenaKind::Permanent).as_slice();
        let protocol = ctx.allocate(
            DeclData::new(DeclContext::Module(module), ctx.intern_identifier("Drawable"), AttributeSet::new(), DeclKind::Type { members: protocol_members }, SourceRange::INVALID),
            ArenaKind::Permanent,
        );
        let conforming_ty = ctx.intern_type(crate::types::TypeKind::Builtin(crate::types::BuiltinType::Int(32)));
        let conformance = ctx.allocate(
            ConformanceData { conforming_type: conforming_ty, protocol, kind: ConformanceKind::Normal { witnesses: &[] }, is_error_recovery_synthesized: false },
            ArenaKind::Permanent,
        );

        let without_flag = lookup_qualified(&[], &[], &[conformance], requirement_name, LookupFlags::empty());
        assert!(without_flag.is_empty());

        let with_flag = lookup_qualified(&[], &[], &[conformance], requirement_name, LookupFlags::VISIT_SUPERTYPES);
        assert_eq!(with_flag.len(), 1);
        assert!(std::ptr::eq(with_flag[0], requirement));
    }

    #[test]
    fn remove_overridden_drops_the_base_declaration_when_an_override_is_also_found() {
        use crate::attr::AttributeSet;
        use crate::context::{new_module, AstContext, AstContextData, ContextArenas};
        use crate::decl::{DeclContext, DeclData};
        use vellum_arena::ArenaKind;

        let arenas = ContextArenas::new();
        let data = AstContextData::new(&arenas);
        let ctx = AstContext::new(&data);
        let module = new_module(ctx, ctx.intern_identifier("M"));
        let name = ctx.intern_identifier("speak");

        let base = ctx.allocate(
            DeclData::new(DeclContext::Module(module), name, AttributeSet::new(), DeclKind::Value { is_static: false }, SourceRange::INVALID),
            ArenaKind::Permanent,
        );
        let mut override_attrs = AttributeSet::new();
        override_attrs.insert_simple(SimpleAttrKind::Override);
        let overriding = ctx.allocate(
            DeclData::new(DeclContext::Module(module), name, override_attrs, DeclKind::Value { is_static: false }, SourceRange::INVALID),
            ArenaKind::Permanent,
        );

        let result = lookup_qualified(&[base, overriding], &[], &[], name, LookupFlags::REMOVE_OVERRIDDEN);
        assert_eq!(result.len(), 1);
        assert!(std::ptr::eq(result[0], overriding));
    }

    #[test]
    fn innermost_scope_is_found_by_binary_search() {
        let _interner = Interner::new();
        let mut outer = ScopeNode::new(SourceRange::new(SourceLoc::new(0), SourceLoc::new(100)), ScopeKind::Local);
        let inner = ScopeNode::new(SourceRange::new(SourceLoc::new(10), SourceLoc::new(20)), ScopeKind::Local);
        outer.add_child(inner);
        let mut tree = ScopeTree::new();
        tree.roots.push(outer);

        let found = tree.innermost(SourceLoc::new(15)).unwrap();
        assert_eq!(found.range, SourceRange::new(SourceLoc::new(10), SourceLoc::new(20)));
        let found_outer = tree.innermost(SourceLoc::new(50)).unwrap();
        assert_eq!(found_outer.range, SourceRange::new(SourceLoc::new(0), SourceLoc::new(100)));
    }
}
