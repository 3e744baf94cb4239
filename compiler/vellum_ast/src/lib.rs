//! Type system core, AST context, declarations/patterns/statements/
//! expressions, and module objects (spec §2 components 2–5).

pub mod attr;
pub mod conformance;
pub mod context;
pub mod decl;
pub mod expr;
pub mod lookup;
pub mod module;
pub mod pattern;
pub mod source;
pub mod stmt;
pub mod types;

pub use context::{AstContext, AstContextData, ConstraintSolverSession, ContextArenas};
pub use decl::{Decl, DeclContext, DeclData, DeclKind};
pub use expr::{Expr, ExprData, ExprKind};
pub use module::{Module, ModuleData, ModuleLoader};
pub use pattern::{Pattern, PatternData, PatternKind};
pub use source::{SourceLoc, SourceRange};
pub use stmt::{Stmt, StmtData, StmtKind};
pub use types::{Type, TypeData, TypeKind};
