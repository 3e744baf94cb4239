//! Patterns (spec §3 "Pattern", §4.3 "Pattern semantics (normative)").
//!
//! A [`Pattern`] is `&'ctx PatternData<'ctx>`, carrying a checked type filled
//! in by type-checking (`None` until then).

use crate::decl::Decl;
use crate::source::SourceRange;
use crate::types::Type;
use std::cell::Cell;
use vellum_arena::Identifier;

pub type Pattern<'ctx> = &'ctx PatternData<'ctx>;

#[derive(Copy, Clone, Debug)]
pub enum PatternKind<'ctx> {
    Paren(Pattern<'ctx>),
    /// A tuple pattern; `variadic` marks the last element as a trailing
    /// variadic group (spec §4.3: "a trailing sequence of matching fields is
    /// grouped into an implicit collection").
    Tuple { elements: &'ctx [Pattern<'ctx>], variadic: bool },
    Named { name: Identifier },
    Wildcard,
    Typed { sub: Pattern<'ctx>, annotation: Type<'ctx> },
    /// Refutable dynamic type check (`is` pattern).
    Is { checked_type: Type<'ctx> },
    NominalDestructure { nominal: Type<'ctx>, fields: &'ctx [(Identifier, Pattern<'ctx>)] },
    EnumCase { case: Decl<'ctx>, sub: Option<Pattern<'ctx>> },
    /// Invokes a user-defined match operator between the pattern expression
    /// and a synthesized scrutinee variable.
    ExpressionMatch { match_operator: Decl<'ctx> },
    Var { sub: Pattern<'ctx> },
}

impl<'ctx> PatternKind<'ctx> {
    /// A pattern is refutable unless it is guaranteed to match any
    /// well-typed scrutinee (spec §4.3: "a typed annotation pattern is
    /// exhaustive (static)"; `is` is refutable).
    pub fn is_exhaustive(&self) -> bool {
        matches!(self, PatternKind::Typed { .. } | PatternKind::Wildcard | PatternKind::Named { .. })
    }
}

pub struct PatternData<'ctx> {
    pub kind: PatternKind<'ctx>,
    pub range: SourceRange,
    checked_type: Cell<Option<Type<'ctx>>>,
}

impl<'ctx> PatternData<'ctx> {
    pub fn new(kind: PatternKind<'ctx>, range: SourceRange) -> Self {
        PatternData { kind, range, checked_type: Cell::new(None) }
    }

    pub fn checked_type(&self) -> Option<Type<'ctx>> {
        self.checked_type.get()
    }

    pub fn set_checked_type(&self, ty: Type<'ctx>) {
        self.checked_type.set(Some(ty));
    }

    /// Strips parenthesized/typed/var wrappers to reach the "semantic"
    /// sub-pattern (spec §3: "A helper returns the 'semantic' sub-pattern by
    /// stripping parens/typed/var wrappers").
    pub fn semantic(&'ctx self) -> Pattern<'ctx> {
        match self.kind {
            PatternKind::Paren(inner) | PatternKind::Typed { sub: inner, .. } | PatternKind::Var { sub: inner } => {
                inner.semantic()
            }
            _ => self,
        }
    }
}

impl std::fmt::Debug for PatternData<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PatternData({:?})", self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semantic_strips_wrapper_chain() {
        let wildcard = PatternData::new(PatternKind::Wildcard, SourceRange::INVALID);
        let var = PatternData::new(PatternKind::Var { sub: &wildcard }, SourceRange::INVALID);
        let paren = PatternData::new(PatternKind::Paren(&var), SourceRange::INVALID);
        assert!(matches!(paren.semantic().kind, PatternKind::Wildcard));
    }

    #[test]
    fn typed_and_wildcard_are_exhaustive_is_is_not() {
        let wildcard: PatternKind<'static> = PatternKind::Wildcard;
        assert!(wildcard.is_exhaustive());
    }
}
