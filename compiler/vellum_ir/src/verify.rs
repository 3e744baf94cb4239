//! The structural verifier (spec §4.4 "Verifier invariants").
//!
//! Runs in debug mode on every function (spec: "failures abort with a dump
//! of the offending instruction, its block, and its function").

use crate::function::Function;
use crate::ids::{BasicBlockId, ValueId};
use crate::instruction::{CastKind, Instruction, InstructionKind, Terminator};
use crate::types::{IrType, ValueCategory};
use std::collections::{HashMap, HashSet};
use vellum_ast::decl::DeclKind;
use vellum_ast::types::{BuiltinType, NominalKind, ReferenceOwnership, TypeKind};

#[derive(Debug, Clone)]
pub struct VerifierViolation {
    pub function: vellum_arena::Identifier,
    pub block: Option<BasicBlockId>,
    pub message: String,
}

impl std::fmt::Display for VerifierViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.block {
            Some(b) => write!(f, "in function {:?}, block {:?}: {}", self.function, b, self.message),
            None => write!(f, "in function {:?}: {}", self.function, self.message),
        }
    }
}

struct ValueOrigin {
    block: BasicBlockId,
    /// Index within the block's instruction list, or `None` for a block
    /// argument (which dominates everything in its own block, spec
    /// invariant 2: "... or is a block argument of a dominator").
    position: Option<usize>,
}

/// Dominator tree via the standard iterative (Cooper/Harvey/Kennedy)
/// algorithm over the function's reverse-postorder block numbering.
struct Dominators {
    rpo_index: HashMap<BasicBlockId, usize>,
    idom: Vec<usize>,
}

impl Dominators {
    fn compute<'ctx>(func: &Function<'ctx>, entry: BasicBlockId) -> Self {
        let mut rpo = Vec::new();
        let mut visited = HashSet::new();
        Self::postorder(func, entry, &mut visited, &mut rpo);
        rpo.reverse();
        let rpo_index: HashMap<BasicBlockId, usize> = rpo.iter().enumerate().map(|(i, &b)| (b, i)).collect();

        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); rpo.len()];
        for (i, &b) in rpo.iter().enumerate() {
            for succ in func.block(b).successors() {
                if let Some(&si) = rpo_index.get(&succ) {
                    preds[si].push(i);
                }
            }
        }

        let mut idom = vec![usize::MAX; rpo.len()];
        idom[0] = 0;
        let mut changed = true;
        while changed {
            changed = false;
            for i in 1..rpo.len() {
                let mut new_idom = usize::MAX;
                for &p in &preds[i] {
                    if idom[p] == usize::MAX {
                        continue;
                    }
                    new_idom = if new_idom == usize::MAX { p } else { Self::intersect(&idom, new_idom, p) };
                }
                if new_idom != usize::MAX && idom[i] != new_idom {
                    idom[i] = new_idom;
                    changed = true;
                }
            }
        }

        Dominators { rpo_index, idom }
    }

    fn postorder<'ctx>(func: &Function<'ctx>, block: BasicBlockId, visited: &mut HashSet<BasicBlockId>, out: &mut Vec<BasicBlockId>) {
        if !visited.insert(block) {
            return;
        }
        for succ in func.block(block).successors() {
            Self::postorder(func, succ, visited, out);
        }
        out.push(block);
    }

    fn intersect(idom: &[usize], mut a: usize, mut b: usize) -> usize {
        while a != b {
            while a > b {
                a = idom[a];
            }
            while b > a {
                b = idom[b];
            }
        }
        a
    }

    /// Strict dominance: `dominator` dominates `block` and they differ.
    fn strictly_dominates(&self, dominator: BasicBlockId, block: BasicBlockId) -> bool {
        if dominator == block {
            return false;
        }
        let (Some(&di), Some(&bi)) = (self.rpo_index.get(&dominator), self.rpo_index.get(&block)) else {
            return false;
        };
        let mut cur = bi;
        if cur == 0 {
            return false;
        }
        loop {
            cur = self.idom[cur];
            if cur == di {
                return true;
            }
            if cur == 0 {
                return false;
            }
        }
    }
}

pub fn verify_function<'ctx>(func: &Function<'ctx>) -> Result<(), VerifierViolation> {
    if func.is_external_declaration() {
        return Ok(());
    }
    let err = |block: Option<BasicBlockId>, message: String| VerifierViolation { function: func.name, block, message };

    let entry = func.entry_block().expect("non-external function has an entry block");

    // Invariant 13: entry block's arguments match the function's parameter list.
    let entry_args = &func.block(entry).arguments;
    if entry_args.len() != func.parameters.len() {
        return Err(err(Some(entry), format!("entry block has {} arguments, function declares {} parameters", entry_args.len(), func.parameters.len())));
    }
    for (i, (arg, param)) in entry_args.iter().zip(func.parameters.iter()).enumerate() {
        if !arg.ty.matches(&param.ty) {
            return Err(err(Some(entry), format!("entry argument {i} type does not match parameter {i} type")));
        }
    }

    // Invariant 1 + build value-origin map, plus a value-type map the
    // per-instruction checks below use to look up an operand's declared
    // type without re-walking the function.
    let mut origins: HashMap<ValueId, ValueOrigin> = HashMap::new();
    let mut types: HashMap<ValueId, IrType<'ctx>> = HashMap::new();
    for (block_id, block) in func.blocks_in_order() {
        for arg in &block.arguments {
            origins.insert(arg.value, ValueOrigin { block: block_id, position: None });
            types.insert(arg.value, arg.ty);
        }
        let last = block.instructions.len().saturating_sub(1);
        for (i, inst) in block.instructions.iter().enumerate() {
            if inst.is_terminator() && i != last {
                return Err(err(Some(block_id), format!("terminator at position {i} is not the block's last instruction")));
            }
            if !inst.is_terminator() && i == last {
                return Err(err(Some(block_id), "block's last instruction is not a terminator".to_string()));
            }
            if let Some(value) = inst.result() {
                origins.insert(value, ValueOrigin { block: block_id, position: Some(i) });
                if let Some(ty) = inst.result_type() {
                    types.insert(value, ty);
                }
            }
        }
        if block.instructions.is_empty() {
            return Err(err(Some(block_id), "block has no terminator".to_string()));
        }
    }

    let dominators = Dominators::compute(func, entry);

    // Invariant 2: every operand's definition dominates its use.
    for (block_id, block) in func.blocks_in_order() {
        for (i, inst) in block.instructions.iter().enumerate() {
            for operand in inst.operands() {
                let Some(origin) = origins.get(&operand) else {
                    return Err(err(Some(block_id), format!("operand {operand:?} has no definition in this function")));
                };
                let dominates = if origin.block == block_id {
                    match origin.position {
                        None => true,
                        Some(def_pos) => def_pos < i,
                    }
                } else {
                    dominators.strictly_dominates(origin.block, block_id)
                };
                if !dominates {
                    return Err(err(Some(block_id), format!("operand {operand:?} does not dominate its use at instruction {i}")));
                }
            }
        }
    }

    // Per-instruction structural invariants (4-12).
    for (block_id, block) in func.blocks_in_order() {
        for inst in &block.instructions {
            verify_instruction(func, block_id, inst, &types, &err)?;
        }
    }

    Ok(())
}

/// A reference-counted object reference (spec §3 "Type" category table's
/// built-in object-reference kinds, and class nominals): the shape invariant
/// 12 requires of an autorelease-return value and several cast families
/// operate over.
fn is_reference_type(ty: vellum_ast::Type<'_>) -> bool {
    matches!(
        ty.kind,
        TypeKind::Nominal { kind: NominalKind::Class, .. } | TypeKind::Builtin(BuiltinType::NativeObjectReference | BuiltinType::ForeignObjectReference)
    )
}

fn verify_instruction<'ctx>(
    func: &Function<'ctx>,
    block_id: BasicBlockId,
    inst: &Instruction<'ctx>,
    types: &HashMap<ValueId, IrType<'ctx>>,
    err: &impl Fn(Option<BasicBlockId>, String) -> VerifierViolation,
) -> Result<(), VerifierViolation> {
    match inst {
        Instruction::Plain(InstructionKind::Apply { callee, args, result_type, .. }) => {
            let Some(callee_ty) = types.get(callee) else {
                return Err(err(Some(block_id), "apply callee has no recorded type".to_string()));
            };
            if !callee_ty.is_object() {
                return Err(err(Some(block_id), "apply callee must be an object value".to_string()));
            }
            let TypeKind::Function { inputs, result, .. } = callee_ty.underlying.kind else {
                return Err(err(Some(block_id), "apply callee is not function-typed".to_string()));
            };
            if args.len() != inputs.len() {
                return Err(err(Some(block_id), format!("apply supplies {} arguments, callee type declares {}", args.len(), inputs.len())));
            }
            for (i, (arg, input)) in args.iter().zip(inputs.iter()).enumerate() {
                let Some(arg_ty) = types.get(arg) else {
                    return Err(err(Some(block_id), format!("apply argument {i} has no recorded type")));
                };
                if !arg_ty.matches(&IrType::object(*input)) {
                    return Err(err(Some(block_id), format!("apply argument {i} type does not match the callee's declared input type")));
                }
            }
            if !result_type.matches(&IrType::object(result)) {
                return Err(err(Some(block_id), "apply result type does not match the callee's declared result type".to_string()));
            }
            Ok(())
        }
        Instruction::Plain(InstructionKind::PartialApply { callee, bound_args, result_type, .. }) => {
            let Some(callee_ty) = types.get(callee) else {
                return Err(err(Some(block_id), "partial-apply callee has no recorded type".to_string()));
            };
            if !callee_ty.is_object() {
                return Err(err(Some(block_id), "partial-apply callee must be an object value".to_string()));
            }
            let TypeKind::Function { inputs, result: callee_result, .. } = callee_ty.underlying.kind else {
                return Err(err(Some(block_id), "partial-apply callee is not function-typed".to_string()));
            };
            if bound_args.len() > inputs.len() {
                return Err(err(Some(block_id), "partial-apply consumes more parameters than the callee declares".to_string()));
            }
            let split = inputs.len() - bound_args.len();
            for (i, (bound, input)) in bound_args.iter().zip(&inputs[split..]).enumerate() {
                let Some(bound_ty) = types.get(bound) else {
                    return Err(err(Some(block_id), format!("partial-apply bound argument {i} has no recorded type")));
                };
                if !bound_ty.matches(&IrType::object(*input)) {
                    return Err(err(Some(block_id), format!("partial-apply bound argument {i} type does not match the callee's corresponding trailing input type")));
                }
            }
            if !result_type.is_object() {
                return Err(err(Some(block_id), "partial-apply result must be an object value".to_string()));
            }
            let TypeKind::Function { inputs: result_inputs, result: result_result, flags: result_flags } = result_type.underlying.kind else {
                return Err(err(Some(block_id), "partial-apply result must be function-typed".to_string()));
            };
            if result_flags.thin {
                return Err(err(Some(block_id), "partial-apply's produced function must not be thin".to_string()));
            }
            if result_inputs.len() != split || !result_inputs.iter().zip(&inputs[..split]).all(|(a, b)| std::ptr::eq(*a, *b)) {
                return Err(err(Some(block_id), "partial-apply result's remaining parameters do not match the callee type's unconsumed prefix".to_string()));
            }
            if !std::ptr::eq(result_result, callee_result) {
                return Err(err(Some(block_id), "partial-apply result's return type does not match the callee type's return type".to_string()));
            }
            Ok(())
        }
        Instruction::Plain(InstructionKind::Load { address, result_type, .. }) => {
            let Some(addr_ty) = types.get(address) else {
                return Err(err(Some(block_id), "load address has no recorded type".to_string()));
            };
            if !addr_ty.is_address() {
                return Err(err(Some(block_id), "load operand is not an address".to_string()));
            }
            if !result_type.is_object() || !std::ptr::eq(result_type.underlying, addr_ty.underlying) {
                return Err(err(Some(block_id), "load result must be object-typed of the operand's pointee type".to_string()));
            }
            Ok(())
        }
        Instruction::Plain(InstructionKind::Store { value, address }) => {
            let (Some(value_ty), Some(addr_ty)) = (types.get(value), types.get(address)) else {
                return Err(err(Some(block_id), "store operand has no recorded type".to_string()));
            };
            if !value_ty.is_object() {
                return Err(err(Some(block_id), "store source must be an object value".to_string()));
            }
            if !addr_ty.is_address() {
                return Err(err(Some(block_id), "store destination must be an address".to_string()));
            }
            if !std::ptr::eq(addr_ty.underlying, value_ty.underlying) {
                return Err(err(Some(block_id), "store destination's pointee type does not match the source type".to_string()));
            }
            Ok(())
        }
        Instruction::Plain(InstructionKind::Cast { kind, operand, result_type, .. }) => verify_cast(*kind, types.get(operand), *result_type, block_id, err),
        Instruction::Terminator(Terminator::SwitchEnum { cases, default, .. }) => {
            let mut seen = HashSet::new();
            for case in cases {
                if !seen.insert(case.case as *const _ as usize) {
                    return Err(err(Some(block_id), "switch-on-enum has a duplicate case".to_string()));
                }
                if case.payload_arg.is_some() {
                    let target_args = &func.block(case.target).arguments;
                    if target_args.len() > 1 {
                        return Err(err(Some(block_id), "switch-on-enum payload destination takes more than one argument".to_string()));
                    }
                    if let (Some(dest_arg), DeclKind::EnumCase { payload: Some(payload_ty), .. }) = (target_args.first(), &case.case.kind) {
                        if !dest_arg.ty.is_object() || !std::ptr::eq(dest_arg.ty.underlying, *payload_ty) {
                            return Err(err(Some(block_id), "switch-on-enum payload destination argument type does not match the case's declared payload type".to_string()));
                        }
                    }
                } else if func.block(case.target).arguments.len() > 1 {
                    return Err(err(Some(block_id), "switch-on-enum non-payload destination takes more than one argument".to_string()));
                }
            }
            let _ = default;
            Ok(())
        }
        Instruction::Terminator(Terminator::SwitchInt { cases, .. }) => {
            let mut seen_values = HashSet::new();
            for (value, target) in cases {
                if !seen_values.insert(*value) {
                    return Err(err(Some(block_id), "switch-on-integer has a duplicate case value".to_string()));
                }
                if !func.block(*target).arguments.is_empty() {
                    return Err(err(Some(block_id), "switch-on-integer destination takes arguments".to_string()));
                }
            }
            Ok(())
        }
        Instruction::Terminator(Terminator::CondBranch { then_target, then_args, else_target, else_args, .. }) => {
            check_branch_arity(func, block_id, *then_target, then_args.len(), err)?;
            check_branch_arity(func, block_id, *else_target, else_args.len(), err)?;
            Ok(())
        }
        Instruction::Terminator(Terminator::Branch { target, args }) => check_branch_arity(func, block_id, *target, args.len(), err),
        Instruction::Terminator(Terminator::Return { value }) => {
            let matches = match value {
                Some(_) => !matches!(func.result_type.category, ValueCategory::Address),
                None => matches!(func.result_type.underlying.kind, TypeKind::Tuple { elements } if elements.is_empty()),
            };
            if !matches {
                return Err(err(Some(block_id), "return value type does not match function result type".to_string()));
            }
            Ok(())
        }
        Instruction::Terminator(Terminator::AutoreleaseReturn { value }) => {
            let Some(ty) = types.get(value) else {
                return Err(err(Some(block_id), "autorelease-return value has no recorded type".to_string()));
            };
            if !ty.is_object() || !is_reference_type(ty.underlying) {
                return Err(err(Some(block_id), "autorelease-return value must be a non-address reference type".to_string()));
            }
            if !std::ptr::eq(ty.underlying, func.result_type.underlying) {
                return Err(err(Some(block_id), "autorelease-return value type does not match the function result type".to_string()));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Invariant 7's per-`CastKind` structural preconditions. Without a
/// declared-supertype graph on `Decl`, upcast/downcast can only be checked
/// for "both sides are class nominals", not actual subtyping; existential
/// composition membership is checked the same way, shape rather than
/// protocol-conformance.
fn verify_cast<'ctx>(
    kind: CastKind,
    operand_ty: Option<&IrType<'ctx>>,
    result_type: IrType<'ctx>,
    block_id: BasicBlockId,
    err: &impl Fn(Option<BasicBlockId>, String) -> VerifierViolation,
) -> Result<(), VerifierViolation> {
    let Some(operand_ty) = operand_ty else {
        return Err(err(Some(block_id), format!("{kind:?} cast operand has no recorded type")));
    };
    let fail = |msg: &str| Err(err(Some(block_id), format!("{kind:?} cast: {msg}")));
    match kind {
        CastKind::RefToRawPointer => {
            if !operand_ty.is_object() || !is_reference_type(operand_ty.underlying) {
                return fail("operand must be an object reference type");
            }
            if !result_type.is_object() || !matches!(result_type.underlying.kind, TypeKind::Builtin(BuiltinType::RawPointer)) {
                return fail("result must be an object raw pointer");
            }
            Ok(())
        }
        CastKind::RawPointerToRef => {
            if !operand_ty.is_object() || !matches!(operand_ty.underlying.kind, TypeKind::Builtin(BuiltinType::RawPointer)) {
                return fail("operand must be an object raw pointer");
            }
            if !result_type.is_object() || !is_reference_type(result_type.underlying) {
                return fail("result must be an object reference type");
            }
            Ok(())
        }
        CastKind::Upcast | CastKind::Downcast => {
            if !operand_ty.is_object() || !matches!(operand_ty.underlying.kind, TypeKind::Nominal { kind: NominalKind::Class, .. }) {
                return fail("operand must be an object class type");
            }
            if !result_type.is_object() || !matches!(result_type.underlying.kind, TypeKind::Nominal { kind: NominalKind::Class, .. }) {
                return fail("result must be an object class type");
            }
            Ok(())
        }
        CastKind::BridgeToBlock => {
            let (TypeKind::Function { flags: operand_flags, .. }, TypeKind::Function { flags: result_flags, .. }) =
                (operand_ty.underlying.kind, result_type.underlying.kind)
            else {
                return fail("operand and result must both be function types");
            };
            if operand_flags.block_bridging {
                return fail("operand must be a non-block-bridging closure");
            }
            if !result_flags.block_bridging {
                return fail("result must be a block-bridging closure");
            }
            Ok(())
        }
        CastKind::ThinToThick => {
            let (TypeKind::Function { flags: operand_flags, .. }, TypeKind::Function { flags: result_flags, .. }) =
                (operand_ty.underlying.kind, result_type.underlying.kind)
            else {
                return fail("operand and result must both be function types");
            };
            if !operand_flags.thin {
                return fail("operand must be a thin function");
            }
            if result_flags.thin {
                return fail("result must not be thin");
            }
            Ok(())
        }
        CastKind::ConvertCc => {
            if !matches!(operand_ty.underlying.kind, TypeKind::Function { .. }) || !matches!(result_type.underlying.kind, TypeKind::Function { .. }) {
                return fail("operand and result must both be function types");
            }
            Ok(())
        }
        CastKind::RefToUnowned => {
            if !operand_ty.is_object() || !is_reference_type(operand_ty.underlying) {
                return fail("operand must be an object reference type");
            }
            let TypeKind::ReferenceStorage { referent, ownership: ReferenceOwnership::Unowned } = result_type.underlying.kind else {
                return fail("result must be an unowned reference-storage type");
            };
            if !std::ptr::eq(referent, operand_ty.underlying) {
                return fail("result's referent does not match the operand type");
            }
            Ok(())
        }
        CastKind::UnownedToRef => {
            let TypeKind::ReferenceStorage { referent, ownership: ReferenceOwnership::Unowned } = operand_ty.underlying.kind else {
                return fail("operand must be an unowned reference-storage type");
            };
            if !result_type.is_object() || !std::ptr::eq(result_type.underlying, referent) {
                return fail("result must be the operand's referent type");
            }
            Ok(())
        }
        CastKind::ExistentialOpen => {
            if !operand_ty.is_object() || !matches!(operand_ty.underlying.kind, TypeKind::ProtocolComposition { .. }) {
                return fail("operand must be an object existential type");
            }
            if !result_type.is_object() || !matches!(result_type.underlying.kind, TypeKind::Archetype { .. }) {
                return fail("result must be an object archetype opened from the existential");
            }
            Ok(())
        }
        CastKind::ExistentialInit => {
            if !operand_ty.is_object() {
                return fail("operand must be an object value");
            }
            if !result_type.is_object() || !matches!(result_type.underlying.kind, TypeKind::ProtocolComposition { .. }) {
                return fail("result must be an object existential type");
            }
            Ok(())
        }
        CastKind::ExistentialDeinit => {
            if !matches!(operand_ty.underlying.kind, TypeKind::ProtocolComposition { .. }) {
                return fail("operand must be an existential type");
            }
            Ok(())
        }
    }
}

fn check_branch_arity<'ctx>(
    func: &Function<'ctx>,
    block_id: BasicBlockId,
    target: BasicBlockId,
    arg_count: usize,
    err: &impl Fn(Option<BasicBlockId>, String) -> VerifierViolation,
) -> Result<(), VerifierViolation> {
    let expected = func.block(target).arguments.len();
    if arg_count != expected {
        return Err(err(Some(block_id), format!("branch to {target:?} supplies {arg_count} arguments, block expects {expected}")));
    }
    Ok(())
}
