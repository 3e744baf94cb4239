//! Protocol conformances (spec §3 "AST context", §4.2 "Conformance kinds").
//!
//! A [`Conformance`] is `&'ctx ConformanceData<'ctx>`: permanent-arena,
//! uniqued by `(canonical type, protocol)` in `AstContext`'s conformance
//! table.

use crate::decl::Decl;
use crate::types::{SubstitutionMap, Type};

pub type Conformance<'ctx> = &'ctx ConformanceData<'ctx>;

#[derive(Clone, Debug)]
pub enum ConformanceKind<'ctx> {
    /// Direct statement that a nominal type conforms, with its witness
    /// table (the concrete per-requirement witnesses).
    Normal { witnesses: &'ctx [Decl<'ctx>] },
    /// A generic normal conformance plus a substitution list.
    Specialized { generic: Conformance<'ctx>, substitutions: SubstitutionMap<'ctx> },
    /// A subclass inheriting a superclass's conformance.
    Inherited { superclass_conformance: Conformance<'ctx> },
}

pub struct ConformanceData<'ctx> {
    pub conforming_type: Type<'ctx>,
    pub protocol: Decl<'ctx>,
    pub kind: ConformanceKind<'ctx>,
    /// Distinguishes an explicit conformance from one synthesized to limp
    /// past an earlier diagnosed error (spec §3: "the entry carries a bit
    /// distinguishing explicit from error-recovery-synthesized conformance").
    pub is_error_recovery_synthesized: bool,
}

impl std::fmt::Debug for ConformanceData<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConformanceData")
            .field("kind", &self.kind)
            .field("is_error_recovery_synthesized", &self.is_error_recovery_synthesized)
            .finish()
    }
}
