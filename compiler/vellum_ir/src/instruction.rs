//! Instructions (spec §3 "Instruction", §4.4, SPEC_FULL §4.4a).

use crate::ids::{BasicBlockId, ValueId};
use crate::types::IrType;
use smallvec::SmallVec;
use vellum_ast::Decl;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CastKind {
    RefToRawPointer,
    RawPointerToRef,
    Upcast,
    Downcast,
    BridgeToBlock,
    ThinToThick,
    ConvertCc,
    RefToUnowned,
    UnownedToRef,
    ExistentialOpen,
    ExistentialInit,
    ExistentialDeinit,
}

#[derive(Clone, Debug)]
pub struct SwitchEnumCase<'ctx> {
    pub case: Decl<'ctx>,
    pub target: BasicBlockId,
    /// Present iff the case carries a payload the destination block binds
    /// (spec §4.4 invariant 8: zero or exactly one argument).
    pub payload_arg: Option<ValueId>,
}

/// Non-terminator, value-producing or side-effecting instruction kinds.
#[derive(Clone, Debug)]
pub enum InstructionKind<'ctx> {
    Apply { result: ValueId, callee: ValueId, args: SmallVec<[ValueId; 4]>, result_type: IrType<'ctx> },
    /// Produces a (possibly-thin, see invariant 5) function value by binding
    /// a trailing suffix of `callee`'s parameters.
    PartialApply { result: ValueId, callee: ValueId, bound_args: SmallVec<[ValueId; 4]>, result_type: IrType<'ctx> },
    Load { result: ValueId, address: ValueId, result_type: IrType<'ctx> },
    Store { value: ValueId, address: ValueId },
    Cast { result: ValueId, kind: CastKind, operand: ValueId, result_type: IrType<'ctx> },
    FunctionRef { result: ValueId, function: crate::ids::FunctionRef, result_type: IrType<'ctx> },
    /// A reference to a compiler built-in (e.g. the trap built-in used by
    /// trap-block recognition, SPEC_FULL §4.8).
    BuiltinRef { result: ValueId, name: vellum_arena::Identifier, result_type: IrType<'ctx> },
    TupleExtract { result: ValueId, aggregate: ValueId, field: u32, result_type: IrType<'ctx> },
    StructExtract { result: ValueId, aggregate: ValueId, field: u32, result_type: IrType<'ctx> },
    /// Builds a tuple value from its elements, in order. Used to reconstruct
    /// an exploded aggregate parameter inside the function a
    /// signature-optimization moved its body into (spec §4.9 step 3:
    /// "insert argument reconstruction for exploded parameters").
    TupleMake { result: ValueId, elements: SmallVec<[ValueId; 4]>, result_type: IrType<'ctx> },
    Retain { value: ValueId },
    Release { value: ValueId },
    /// Associates `value` with a source-level declaration/pattern binding
    /// for debugging (SPEC_FULL §4.4a). Not a use under alias analysis.
    DebugValue { value: ValueId, decl: Decl<'ctx> },
    /// Delimits a lexical scope for deinitialization insertion (SPEC_FULL
    /// §4.4a). Produces no value and has no operands.
    ScopeMarker { entering: bool },
}

impl<'ctx> InstructionKind<'ctx> {
    /// The operands the verifier must check dominate this instruction (spec
    /// §4.4 invariant 2). `DebugValue`'s tracked value counts as an operand
    /// for this enumeration even though it is not a def-use "use" for
    /// dataflow purposes (SPEC_FULL §4.4a).
    pub fn operands(&self) -> SmallVec<[ValueId; 4]> {
        match self {
            InstructionKind::Apply { callee, args, .. } => {
                let mut v = SmallVec::new();
                v.push(*callee);
                v.extend(args.iter().copied());
                v
            }
            InstructionKind::PartialApply { callee, bound_args, .. } => {
                let mut v = SmallVec::new();
                v.push(*callee);
                v.extend(bound_args.iter().copied());
                v
            }
            InstructionKind::Load { address, .. } => smallvec::smallvec![*address],
            InstructionKind::Store { value, address } => smallvec::smallvec![*value, *address],
            InstructionKind::Cast { operand, .. } => smallvec::smallvec![*operand],
            InstructionKind::FunctionRef { .. } | InstructionKind::BuiltinRef { .. } => SmallVec::new(),
            InstructionKind::TupleExtract { aggregate, .. } | InstructionKind::StructExtract { aggregate, .. } => {
                smallvec::smallvec![*aggregate]
            }
            InstructionKind::TupleMake { elements, .. } => elements.clone(),
            InstructionKind::Retain { value } | InstructionKind::Release { value } => smallvec::smallvec![*value],
            InstructionKind::DebugValue { value, .. } => smallvec::smallvec![*value],
            InstructionKind::ScopeMarker { .. } => SmallVec::new(),
        }
    }

    /// The value this instruction produces, if any.
    pub fn result_type(&self) -> Option<IrType<'ctx>> {
        match self {
            InstructionKind::Apply { result_type, .. }
            | InstructionKind::PartialApply { result_type, .. }
            | InstructionKind::Load { result_type, .. }
            | InstructionKind::Cast { result_type, .. }
            | InstructionKind::FunctionRef { result_type, .. }
            | InstructionKind::BuiltinRef { result_type, .. }
            | InstructionKind::TupleExtract { result_type, .. }
            | InstructionKind::StructExtract { result_type, .. }
            | InstructionKind::TupleMake { result_type, .. } => Some(*result_type),
            InstructionKind::Store { .. }
            | InstructionKind::Retain { .. }
            | InstructionKind::Release { .. }
            | InstructionKind::DebugValue { .. }
            | InstructionKind::ScopeMarker { .. } => None,
        }
    }

    /// The `ValueId` this instruction binds its result to, if any.
    pub fn result(&self) -> Option<ValueId> {
        match self {
            InstructionKind::Apply { result, .. }
            | InstructionKind::PartialApply { result, .. }
            | InstructionKind::Load { result, .. }
            | InstructionKind::Cast { result, .. }
            | InstructionKind::FunctionRef { result, .. }
            | InstructionKind::BuiltinRef { result, .. }
            | InstructionKind::TupleExtract { result, .. }
            | InstructionKind::StructExtract { result, .. }
            | InstructionKind::TupleMake { result, .. } => Some(*result),
            InstructionKind::Store { .. }
            | InstructionKind::Retain { .. }
            | InstructionKind::Release { .. }
            | InstructionKind::DebugValue { .. }
            | InstructionKind::ScopeMarker { .. } => None,
        }
    }

    /// Whether this is a "reference to the trap built-in" for trap-block
    /// recognition (spec §4.8: "reference to trap built-in").
    pub fn is_trap_builtin_ref(&self, trap_name: vellum_arena::Identifier) -> bool {
        matches!(self, InstructionKind::BuiltinRef { name, .. } if *name == trap_name)
    }

    /// A function value used anywhere other than as an apply's callee has
    /// "escaped" (spec §4.7: marks the referenced function's node
    /// caller-set-incomplete). True for any instruction that uses a
    /// `FunctionRef`-produced value outside of `Apply`'s callee position is
    /// determined by the call graph builder walking def-use, not here; this
    /// helper instead flags instructions that themselves directly capture a
    /// function reference as a non-callee operand (e.g. `PartialApply`,
    /// `StructExtract` feeding a closure context).
    pub fn captures_function_value(&self) -> bool {
        matches!(self, InstructionKind::PartialApply { .. })
    }
}

#[derive(Clone, Debug)]
pub enum Terminator<'ctx> {
    Branch { target: BasicBlockId, args: SmallVec<[ValueId; 4]> },
    CondBranch {
        condition: ValueId,
        then_target: BasicBlockId,
        then_args: SmallVec<[ValueId; 4]>,
        else_target: BasicBlockId,
        else_args: SmallVec<[ValueId; 4]>,
    },
    SwitchInt { scrutinee: ValueId, cases: Vec<(i128, BasicBlockId)>, default: Option<BasicBlockId> },
    SwitchEnum { scrutinee: ValueId, cases: Vec<SwitchEnumCase<'ctx>>, default: Option<BasicBlockId> },
    Return { value: Option<ValueId> },
    AutoreleaseReturn { value: ValueId },
    Unreachable,
}

impl<'ctx> Terminator<'ctx> {
    pub fn operands(&self) -> SmallVec<[ValueId; 4]> {
        match self {
            Terminator::Branch { args, .. } => args.clone(),
            Terminator::CondBranch { condition, then_args, else_args, .. } => {
                let mut v = smallvec::smallvec![*condition];
                v.extend(then_args.iter().copied());
                v.extend(else_args.iter().copied());
                v
            }
            Terminator::SwitchInt { scrutinee, .. } | Terminator::SwitchEnum { scrutinee, .. } => smallvec::smallvec![*scrutinee],
            Terminator::Return { value } => value.iter().copied().collect(),
            Terminator::AutoreleaseReturn { value } => smallvec::smallvec![*value],
            Terminator::Unreachable => SmallVec::new(),
        }
    }

    pub fn successors(&self) -> SmallVec<[BasicBlockId; 4]> {
        match self {
            Terminator::Branch { target, .. } => smallvec::smallvec![*target],
            Terminator::CondBranch { then_target, else_target, .. } => smallvec::smallvec![*then_target, *else_target],
            Terminator::SwitchInt { cases, default, .. } => {
                let mut v: SmallVec<[BasicBlockId; 4]> = cases.iter().map(|(_, b)| *b).collect();
                v.extend(*default);
                v
            }
            Terminator::SwitchEnum { cases, default, .. } => {
                let mut v: SmallVec<[BasicBlockId; 4]> = cases.iter().map(|c| c.target).collect();
                v.extend(*default);
                v
            }
            Terminator::Return { .. } | Terminator::AutoreleaseReturn { .. } | Terminator::Unreachable => SmallVec::new(),
        }
    }
}

/// One element of a block's body: either a non-terminator instruction or
/// (only ever last) the block's terminator. Modeling both in one sequence
/// lets a block be legitimately terminator-less mid-construction (spec §4.5
/// "split ... is left terminator-less for the caller to re-terminate").
#[derive(Clone, Debug)]
pub enum Instruction<'ctx> {
    Plain(InstructionKind<'ctx>),
    Terminator(Terminator<'ctx>),
}

impl<'ctx> Instruction<'ctx> {
    pub fn is_terminator(&self) -> bool {
        matches!(self, Instruction::Terminator(_))
    }

    pub fn operands(&self) -> SmallVec<[ValueId; 4]> {
        match self {
            Instruction::Plain(k) => k.operands(),
            Instruction::Terminator(t) => t.operands(),
        }
    }

    pub fn result_type(&self) -> Option<IrType<'ctx>> {
        match self {
            Instruction::Plain(k) => k.result_type(),
            Instruction::Terminator(_) => None,
        }
    }

    pub fn result(&self) -> Option<ValueId> {
        match self {
            Instruction::Plain(k) => k.result(),
            Instruction::Terminator(_) => None,
        }
    }
}
