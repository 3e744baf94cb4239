//! Statements (spec §3 "Statement & expression").

use crate::decl::Decl;
use crate::expr::Expr;
use crate::pattern::Pattern;
use crate::source::SourceRange;

pub type Stmt<'ctx> = &'ctx StmtData<'ctx>;

#[derive(Copy, Clone, Debug)]
pub struct CaseLabel<'ctx> {
    pub pattern: Pattern<'ctx>,
    pub guard: Option<Expr<'ctx>>,
}

#[derive(Copy, Clone, Debug)]
pub struct SwitchCase<'ctx> {
    /// A case block may carry one or more labels (spec §3: "switch (with
    /// case blocks carrying one or more labels with optional guard)").
    pub labels: &'ctx [CaseLabel<'ctx>],
    pub body: Stmt<'ctx>,
}

#[derive(Copy, Clone, Debug)]
pub enum StmtKind<'ctx> {
    Brace { elements: &'ctx [Stmt<'ctx>] },
    Return { value: Option<Expr<'ctx>> },
    If { cond: Expr<'ctx>, then: Stmt<'ctx>, els: Option<Stmt<'ctx>> },
    While { cond: Expr<'ctx>, body: Stmt<'ctx> },
    DoWhile { body: Stmt<'ctx>, cond: Expr<'ctx> },
    For { init: Option<Stmt<'ctx>>, cond: Option<Expr<'ctx>>, increment: Option<Expr<'ctx>>, body: Stmt<'ctx> },
    ForEach { pattern: Pattern<'ctx>, sequence: Expr<'ctx>, body: Stmt<'ctx> },
    Switch { scrutinee: Expr<'ctx>, cases: &'ctx [SwitchCase<'ctx>] },
    Break { target: Option<Decl<'ctx>> },
    Continue { target: Option<Decl<'ctx>> },
    Fallthrough,
    Expr(Expr<'ctx>),
}

pub struct StmtData<'ctx> {
    pub kind: StmtKind<'ctx>,
    pub range: SourceRange,
    pub implicit: bool,
}

impl<'ctx> StmtData<'ctx> {
    /// Spec §4.3 "Implicit flag": defaults from "has a valid source
    /// location" when not specified explicitly.
    pub fn new(kind: StmtKind<'ctx>, range: SourceRange) -> Self {
        let implicit = !range.is_valid();
        StmtData { kind, range, implicit }
    }

    pub fn new_explicit(kind: StmtKind<'ctx>, range: SourceRange, implicit: bool) -> Self {
        StmtData { kind, range, implicit }
    }
}

impl std::fmt::Debug for StmtData<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StmtData({:?}, implicit={})", self.kind, self.implicit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceLoc;

    #[test]
    fn implicit_bit_defaults_from_location_validity() {
        let implicit_stmt = StmtData::new(StmtKind::Fallthrough, SourceRange::INVALID);
        assert!(implicit_stmt.implicit);

        let explicit_range = SourceRange::new(SourceLoc::new(0), SourceLoc::new(1));
        let explicit_stmt = StmtData::new(StmtKind::Fallthrough, explicit_range);
        assert!(!explicit_stmt.implicit);
    }
}
