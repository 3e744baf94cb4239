//! Frontend action command set (spec §6 "Frontend actions").

use serde::{Deserialize, Serialize};

/// One action the driver can perform for a translation unit. Each has a
/// deterministic exit code: 0 on success, non-zero if the run accumulated a
/// diagnosed error (spec §6, §7 "the driver decides when accumulated errors
/// warrant halting").
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrontendAction {
    ParseOnly,
    ParseAndDumpAst,
    TypeCheck,
    PrettyPrintAst,
    EmitRawTypedIr,
    EmitCanonicalTypedIr,
    EmitModuleOnly,
    InteractiveExecute,
    InteractiveRepl,
    EmitAssembly,
    EmitIr,
    EmitBitcode,
    EmitObject,
}

impl FrontendAction {
    /// Whether this action needs a working backend (spec §4.6: "Backend:
    /// consumes typed IR functions ..."), as opposed to stopping earlier in
    /// the pipeline.
    pub fn requires_backend(self) -> bool {
        matches!(self, FrontendAction::EmitAssembly | FrontendAction::EmitIr | FrontendAction::EmitBitcode | FrontendAction::EmitObject)
    }

    pub fn is_interactive(self) -> bool {
        matches!(self, FrontendAction::InteractiveExecute | FrontendAction::InteractiveRepl)
    }
}

/// The kind of source a translation unit was built from (spec §6
/// "Translation-unit kinds").
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranslationUnitKind {
    Library,
    Main,
    Repl,
    /// Pre-lowered typed IR input, skipping parsing and type-checking.
    TypedIrInput,
}
