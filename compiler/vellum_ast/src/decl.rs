//! Declarations (spec §3 "Declaration", §4.3).
//!
//! A [`Decl`] is `&'ctx DeclData<'ctx>`: permanent-arena, tagged by
//! [`DeclKind`]. Value declarations gain a resolved [`Type`] after
//! type-checking (`resolved_type`, initially `None`).

use crate::attr::AttributeSet;
use crate::module::Module;
use crate::pattern::Pattern;
use crate::source::SourceRange;
use crate::stmt::Stmt;
use crate::types::Type;
use std::cell::Cell;
use vellum_arena::Identifier;

pub type Decl<'ctx> = &'ctx DeclData<'ctx>;

#[derive(Copy, Clone, Debug)]
pub enum DeclContext<'ctx> {
    Module(Module<'ctx>),
    Nominal(Decl<'ctx>),
    Function(Decl<'ctx>),
}

#[derive(Clone, Debug)]
pub enum DeclKind<'ctx> {
    /// `func`/`let`/`var`-like value declaration.
    Value { is_static: bool },
    /// `struct`/`enum`/`class`/`protocol` nominal type declaration.
    Type { members: &'ctx [Decl<'ctx>] },
    /// A binding introduced by a pattern (`let (a, b) = ...`).
    PatternBinding { pattern: Pattern<'ctx> },
    /// An `extension` of a nominal type.
    Extension { extended: Type<'ctx>, members: &'ctx [Decl<'ctx>] },
    /// One case of an enum, with an optional associated-value payload type.
    EnumCase { ordinal: u32, payload: Option<Type<'ctx>> },
    Subscript { index_params: &'ctx [Type<'ctx>] },
    Initializer { is_failable: bool },
    Destructor,
    Operator { fixity: OperatorFixity, precedence_group: Option<Identifier> },
    Import { imported_module: Identifier },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OperatorFixity {
    Infix,
    Prefix,
    Postfix,
}

pub struct DeclData<'ctx> {
    pub context: DeclContext<'ctx>,
    pub name: Identifier,
    pub attrs: AttributeSet,
    pub kind: DeclKind<'ctx>,
    pub range: SourceRange,
    resolved_type: Cell<Option<Type<'ctx>>>,
    pub body: Option<Stmt<'ctx>>,
}

impl<'ctx> DeclData<'ctx> {
    pub fn new(context: DeclContext<'ctx>, name: Identifier, attrs: AttributeSet, kind: DeclKind<'ctx>, range: SourceRange) -> Self {
        DeclData { context, name, attrs, kind, range, resolved_type: Cell::new(None), body: None }
    }

    pub fn resolved_type(&self) -> Option<Type<'ctx>> {
        self.resolved_type.get()
    }

    /// Records the type-checker's result for a value declaration. Spec §3:
    /// "Value declarations have a resolved type after type-checking."
    pub fn set_resolved_type(&self, ty: Type<'ctx>) {
        self.resolved_type.set(Some(ty));
    }

    pub fn is_value(&self) -> bool {
        matches!(self.kind, DeclKind::Value { .. })
    }
}

impl std::fmt::Debug for DeclData<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeclData").field("name", &self.name).field("kind", &self.kind).finish()
    }
}
