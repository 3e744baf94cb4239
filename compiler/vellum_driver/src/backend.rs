//! The backend code generator (spec §4.6: "consumes typed IR functions and
//! their containing module"). Out of scope for implementation (spec §1);
//! this is only the narrow interface the driver dispatches emit actions
//! through.

use vellum_ir::{Function, ValueCategory};

/// Emitted artifact kinds reachable from `FrontendAction::EmitAssembly` /
/// `EmitIr` / `EmitBitcode` / `EmitObject`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    Assembly,
    Ir,
    Bitcode,
    Object,
}

/// Consumes a call graph's bottom-up function order and emits `kind`.
/// Implementations must treat address-typed values as memory locations and
/// reference-typed values per their declared convention (spec §4.6); this
/// trait does not otherwise constrain the backend's form.
pub trait Backend {
    fn emit_function(&mut self, function: &Function<'_>, kind: ArtifactKind) -> Result<(), crate::error::DriverError>;
}

/// Verifies the one constraint spec §4.6 places on any backend
/// implementation: every value's `IrType` tells the backend whether it is
/// a memory location or an object to be handled per its convention. This
/// helper has nothing to emit to; a real backend is a build-time choice
/// the driver does not make.
pub fn value_storage_class(category: ValueCategory) -> &'static str {
    match category {
        ValueCategory::Object => "object",
        ValueCategory::Address => "memory location",
    }
}
