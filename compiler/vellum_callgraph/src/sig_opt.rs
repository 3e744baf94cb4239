//! Function-signature optimization (spec §4.9, SPEC_FULL §4.9a).

use smallvec::SmallVec;
use vellum_ast::types::{NominalKind, TypeKind};
use vellum_ir::{BasicBlockId, CallingConvention, Function, FunctionRef, Instruction, InstructionKind, IrType, Parameter, ParameterConvention, Terminator, ValueId};
use vellum_rc::{DefMap, RcAnalysisResult};

/// The per-parameter action a signature optimization performs (spec §4.9
/// step 1-2). Mangled-name letters in parens match step §4.9's encoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParamAction {
    /// No uses anywhere in the body ("d").
    Dead,
    /// Direct-owned with a matching release on the function's single exit
    /// path; the new parameter becomes direct-guaranteed ("o2g").
    CalleeRelease,
    /// An aggregate with a known, shallow leaf projection tree ("s").
    Exploded(u32),
    /// Left unchanged ("n").
    Nothing,
}

impl ParamAction {
    fn mangled_letter(self) -> &'static str {
        match self {
            ParamAction::Dead => "d",
            ParamAction::CalleeRelease => "o2g",
            ParamAction::Exploded(_) => "s",
            ParamAction::Nothing => "n",
        }
    }
}

/// A supported calling convention for this optimization (spec §4.9: "with a
/// supported calling convention"). `CFunction` has a fixed external ABI this
/// optimization must not disturb.
fn has_supported_convention(func: &Function<'_>) -> bool {
    !matches!(func.calling_convention, CallingConvention::CFunction)
}

/// Gates whether `func` is a candidate at all (spec §4.9: "non-external,
/// non-transparent, non-polymorphic function with a supported calling
/// convention").
pub fn is_candidate(func: &Function<'_>) -> bool {
    !func.is_external_declaration() && !func.flags.transparent && func.generic_context.archetypes.is_empty() && has_supported_convention(func)
}

/// An aggregate parameter's leaf types, if it is explodable (SPEC_FULL
/// §4.9a: at most 3 leaves, explosion one level deep). Only tuple
/// aggregates carry a leaf projection tree visible at this layer: nominal
/// struct field layout lives behind an opaque `Decl` this crate does not
/// resolve, so struct parameters are never classified explodable here.
fn explode_leaves<'ctx>(param: &Parameter<'ctx>) -> Option<Vec<vellum_ast::Type<'ctx>>> {
    if !param.ty.is_object() {
        return None;
    }
    let TypeKind::Tuple { elements } = param.ty.underlying.kind else {
        return None;
    };
    if elements.is_empty() || elements.len() > 3 {
        return None;
    }
    if elements.iter().any(|e| matches!(e.ty.kind, TypeKind::Tuple { .. } | TypeKind::Nominal { kind: NominalKind::Struct, .. })) {
        return None;
    }
    Some(elements.iter().map(|e| e.ty).collect())
}

/// Whether `func` has exactly one `return`-terminated block (spec §4.9 step
/// 1: "a matching release exists on the single exit path").
fn has_single_exit(func: &Function<'_>) -> bool {
    let mut returns = 0;
    for (_, block) in func.blocks_in_order() {
        if matches!(block.terminator(), Some(vellum_ir::Terminator::Return { .. } | vellum_ir::Terminator::AutoreleaseReturn { .. })) {
            returns += 1;
        }
    }
    returns == 1
}

fn has_no_uses(func: &Function<'_>, value: vellum_ir::ValueId) -> bool {
    for (_, block) in func.blocks_in_order() {
        for inst in &block.instructions {
            if inst.operands().contains(&value) {
                return false;
            }
        }
    }
    true
}

/// A release is only a genuine discharge of the parameter's incoming
/// ownership if the RC dataflow didn't already pair it with a retain inside
/// this same function (spec §4.9 step 1: "a matching release exists");
/// one that cancels a locally-paired retain (`rc.decrement_to_increment`)
/// doesn't touch the ownership the caller handed in, so it can't stand in
/// for the parameter's own release.
fn has_matching_release(func: &Function<'_>, defs: &DefMap, rc: &RcAnalysisResult, value: vellum_ir::ValueId) -> bool {
    for (block_id, block) in func.blocks_in_order() {
        for (index, inst) in block.instructions.iter().enumerate() {
            if let vellum_ir::Instruction::Plain(InstructionKind::Release { value: released }) = inst {
                if defs.strip_to_identity_root(func, *released) == value {
                    let loc = vellum_rc::InstLoc { block: block_id, index };
                    if !rc.decrement_to_increment.contains_key(&loc) {
                        return true;
                    }
                }
            }
        }
    }
    false
}

/// Classifies every original parameter (spec §4.9 step 1). Requires the
/// entry block to exist (non-external functions always have one). `rc` is
/// the RC dataflow result for `func` (SPEC_FULL §4.8/§4.9a): it is what
/// lets `CalleeRelease` distinguish a release that truly discharges the
/// parameter from one that is merely balancing a retain already performed
/// inside the body.
pub fn classify_parameters(func: &Function<'_>, defs: &DefMap, rc: &RcAnalysisResult) -> Vec<ParamAction> {
    let entry = func.entry_block().expect("signature optimization candidates are never external declarations");
    let args = &func.block(entry).arguments;
    let single_exit = has_single_exit(func);

    (0..func.parameters.len())
        .map(|i| {
            let Some(arg) = args.get(i) else { return ParamAction::Nothing };
            if has_no_uses(func, arg.value) {
                return ParamAction::Dead;
            }
            let param = &func.parameters[i];
            if param.convention == ParameterConvention::DirectOwned && single_exit && has_matching_release(func, defs, rc, arg.value) {
                return ParamAction::CalleeRelease;
            }
            if let Some(leaves) = explode_leaves(param) {
                return ParamAction::Exploded(leaves.len() as u32);
            }
            ParamAction::Nothing
        })
        .collect()
}

/// The rewritten parameter list a plan of `actions` produces (spec §4.9 step
/// 2: "drop dead, convert owned→guaranteed for callee-release, expand
/// explodable parameters into one parameter per leaf").
pub fn rewrite_parameters<'ctx>(original: &[Parameter<'ctx>], actions: &[ParamAction]) -> Vec<Parameter<'ctx>> {
    let mut out = Vec::new();
    for (param, action) in original.iter().zip(actions) {
        match action {
            ParamAction::Dead => {}
            ParamAction::CalleeRelease => out.push(Parameter { ty: param.ty, convention: ParameterConvention::DirectGuaranteed }),
            ParamAction::Exploded(_) => {
                let TypeKind::Tuple { elements } = param.ty.underlying.kind else {
                    unreachable!("explode_leaves only returns Some for tuple-typed parameters")
                };
                for element in elements {
                    out.push(Parameter { ty: vellum_ir::IrType::object(element.ty), convention: param.convention });
                }
            }
            ParamAction::Nothing => out.push(param.clone()),
        }
    }
    out
}

/// Whether any parameter action actually changes the signature (spec §4.9
/// step 2: "if any of dead / callee-release / explodable holds").
pub fn should_optimize(actions: &[ParamAction]) -> bool {
    actions.iter().any(|a| *a != ParamAction::Nothing)
}

/// The mangled-name suffix encoding every parameter's action (spec §4.9:
/// "encodes the per-parameter action ... ensuring the optimization is
/// idempotent and deterministic").
pub fn mangled_suffix(actions: &[ParamAction]) -> String {
    actions.iter().map(|a| a.mangled_letter()).collect::<Vec<_>>().join("_")
}

/// Full name for the optimized sibling function, e.g. `foo$d_o2g_s_n`.
/// Idempotent: re-running classification on a function whose name already
/// carries a suffix for an identical action list produces the same name.
pub fn mangled_name(original: &str, actions: &[ParamAction]) -> String {
    format!("{original}${}", mangled_suffix(actions))
}

/// Emits a call to `callee` with `original_args` adapted to the rewritten
/// signature `actions` describes, inserting it (and whatever leaf
/// extractions it needs) into `func` at `block`, starting at instruction
/// index `at` (spec §4.9 steps 3/4/5 all route through this: the moved
/// body's thunk, and every rewritten known call site, build the same
/// shape of call). `Dead` arguments are simply omitted: spec §4.9 step 1
/// requires no uses anywhere in the body, so there was never a release to
/// preserve for them. `CalleeRelease` arguments are passed unchanged but
/// the call no longer transfers ownership away, so the value still owes a
/// release once the call returns; `reuse_result`, if given, becomes the
/// `Apply`'s result id instead of a fresh one (used to keep a rewritten
/// call site's own result id intact for its existing uses). Returns the
/// `Apply`'s result id.
fn emit_call<'ctx>(
    func: &mut Function<'ctx>,
    block: BasicBlockId,
    at: usize,
    callee: FunctionRef,
    callee_type: IrType<'ctx>,
    original_args: &[ValueId],
    original_params: &[Parameter<'ctx>],
    actions: &[ParamAction],
    result_type: IrType<'ctx>,
    reuse_result: Option<ValueId>,
) -> ValueId {
    let mut insert_at = at;
    let mut new_args: SmallVec<[ValueId; 4]> = SmallVec::new();
    let mut post_call_releases: Vec<ValueId> = Vec::new();

    for ((arg, param), action) in original_args.iter().zip(original_params).zip(actions) {
        match action {
            ParamAction::Dead => {}
            ParamAction::CalleeRelease => {
                new_args.push(*arg);
                post_call_releases.push(*arg);
            }
            ParamAction::Exploded(leaf_count) => {
                let TypeKind::Tuple { elements } = param.ty.underlying.kind else {
                    unreachable!("explode_leaves only returns Some for tuple-typed parameters")
                };
                for (field, element) in elements.iter().take(*leaf_count as usize).enumerate() {
                    let leaf = func.fresh_value();
                    func.block_mut(block).instructions.insert(
                        insert_at,
                        Instruction::Plain(InstructionKind::TupleExtract { result: leaf, aggregate: *arg, field: field as u32, result_type: IrType::object(element.ty) }),
                    );
                    insert_at += 1;
                    new_args.push(leaf);
                }
            }
            ParamAction::Nothing => new_args.push(*arg),
        }
    }

    let callee_value = func.fresh_value();
    func.block_mut(block).instructions.insert(insert_at, Instruction::Plain(InstructionKind::FunctionRef { result: callee_value, function: callee, result_type: callee_type }));
    insert_at += 1;

    let apply_result = reuse_result.unwrap_or_else(|| func.fresh_value());
    func.block_mut(block).instructions.insert(insert_at, Instruction::Plain(InstructionKind::Apply { result: apply_result, callee: callee_value, args: new_args, result_type }));
    insert_at += 1;

    for v in post_call_releases {
        func.block_mut(block).instructions.insert(insert_at, Instruction::Plain(InstructionKind::Release { value: v }));
        insert_at += 1;
    }

    apply_result
}

/// Moves `original`'s body into a freshly built sibling with the rewritten
/// parameter list `actions` describes (spec §4.9 steps 2-3). Reuses each
/// surviving original parameter's own `ValueId` as the reconstruction
/// instruction's result instead of introducing a rename pass: every
/// pre-existing use in the moved body already refers to that id, so a
/// `Dead` parameter's argument is simply dropped from the argument list (no
/// uses exist to fix up) and an `Exploded` parameter's tuple value is
/// rebuilt by a `TupleMake` bound to the *original* tuple argument's id,
/// right where that argument used to live, making the rest of the body
/// oblivious to the rewrite. Returns the new function together with the
/// number of prelude instructions spliced into its entry block (needed to
/// adjust any call site recorded at an index within that same block, e.g.
/// a self-recursive call).
pub fn synthesize_optimized_function<'ctx>(original: &mut Function<'ctx>, actions: &[ParamAction], new_name: vellum_arena::Identifier) -> (Function<'ctx>, usize) {
    let new_params = rewrite_parameters(&original.parameters, actions);
    let mut new_func = Function::new(new_name, original.calling_convention, new_params, original.result_type);
    new_func.declaration = original.declaration;
    new_func.generic_context = original.generic_context.clone();
    new_func.flags = original.flags.clone();

    new_func.install_body(original.take_body());

    let entry = new_func.entry_block().expect("signature optimization candidates always have an entry block");
    let old_args = new_func.block(entry).arguments.clone();
    let mut rebuilt_args = Vec::new();
    let mut prelude: Vec<Instruction<'ctx>> = Vec::new();

    for (i, action) in actions.iter().enumerate() {
        let Some(old_arg) = old_args.get(i) else { continue };
        match action {
            ParamAction::Dead => {}
            ParamAction::CalleeRelease => {
                rebuilt_args.push(old_arg.clone());
                prelude.push(Instruction::Plain(InstructionKind::Retain { value: old_arg.value }));
            }
            ParamAction::Exploded(leaf_count) => {
                let TypeKind::Tuple { elements } = old_arg.ty.underlying.kind else {
                    unreachable!("explode_leaves only returns Some for tuple-typed parameters")
                };
                let mut leaves: SmallVec<[ValueId; 4]> = SmallVec::new();
                for element in elements.iter().take(*leaf_count as usize) {
                    let leaf_value = new_func.fresh_value();
                    rebuilt_args.push(vellum_ir::BlockArgument { value: leaf_value, ty: IrType::object(element.ty) });
                    leaves.push(leaf_value);
                }
                prelude.push(Instruction::Plain(InstructionKind::TupleMake { result: old_arg.value, elements: leaves, result_type: old_arg.ty }));
            }
            ParamAction::Nothing => rebuilt_args.push(old_arg.clone()),
        }
    }

    let prelude_len = prelude.len();
    new_func.block_mut(entry).arguments = rebuilt_args;
    let rest = std::mem::take(&mut new_func.block_mut(entry).instructions);
    prelude.extend(rest);
    new_func.block_mut(entry).instructions = prelude;

    (new_func, prelude_len)
}

/// Replaces `original`'s (now body-less, post-[`synthesize_optimized_function`])
/// implementation with a thunk that forwards to `new_ref` (spec §4.9 step
/// 4: "replace the original function's body with a thunk that calls the
/// new function with arguments derived from the original parameters").
/// `original_params` is `original`'s parameter list exactly as it stood
/// before synthesis (unchanged by this optimization, so already available
/// on `original` itself, but threaded explicitly since it was borrowed out
/// at the call site that also needs it for the new function's type).
pub fn install_thunk<'ctx>(original: &mut Function<'ctx>, original_params: &[Parameter<'ctx>], new_ref: FunctionRef, new_function_type: IrType<'ctx>, actions: &[ParamAction]) {
    let entry = original.create_block();
    let mut arg_values = Vec::with_capacity(original_params.len());
    for (i, param) in original_params.iter().enumerate() {
        let v = original.fresh_value();
        original.insert_argument(entry, i, v, param.ty);
        arg_values.push(v);
    }
    let result_type = original.result_type;
    let apply_result = emit_call(original, entry, 0, new_ref, new_function_type, &arg_values, original_params, actions, result_type, None);
    original.block_mut(entry).push(Instruction::Terminator(Terminator::Return { value: Some(apply_result) }));
}

/// Rewrites a known call site (spec §4.9 step 5: "rewrite every known call
/// site ... to call the new function directly"). The existing `Apply`'s
/// result id is kept so every downstream use in `caller` stays valid.
pub fn rewrite_call_site<'ctx>(
    caller: &mut Function<'ctx>,
    block: BasicBlockId,
    index: usize,
    new_ref: FunctionRef,
    new_function_type: IrType<'ctx>,
    original_params: &[Parameter<'ctx>],
    actions: &[ParamAction],
) {
    let Instruction::Plain(InstructionKind::Apply { result, args, result_type, .. }) = caller.block(block).instructions[index].clone() else {
        return;
    };
    caller.block_mut(block).instructions.remove(index);
    let original_args: Vec<ValueId> = args.iter().copied().collect();
    emit_call(caller, block, index, new_ref, new_function_type, &original_args, original_params, actions, result_type, Some(result));
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_ast::context::{AstContext, AstContextData, ContextArenas};
    use vellum_ast::types::BuiltinType;
    use vellum_ir::{IrType, Linkage};
    use vellum_rc::WellKnownBuiltins;

    fn builtins(ctx: AstContext<'_>) -> WellKnownBuiltins {
        WellKnownBuiltins { trap: ctx.intern_identifier("trap"), autorelease_pool_push: ctx.intern_identifier("autoreleasePoolPush") }
    }

    #[test]
    fn dead_parameter_is_classified_dead() {
        let arenas = ContextArenas::new();
        let data = AstContextData::new(&arenas);
        let ctx = AstContext::new(&data);
        let int_ty = ctx.intern_type(TypeKind::Builtin(BuiltinType::Int(32)));

        let mut f = Function::new(
            ctx.intern_identifier("f"),
            CallingConvention::Thin,
            vec![Parameter { ty: IrType::object(int_ty), convention: ParameterConvention::DirectOwned }],
            IrType::object(int_ty),
        );
        let entry = f.create_block();
        let arg_value = f.fresh_value();
        f.insert_argument(entry, 0, arg_value, IrType::object(int_ty));
        f.block_mut(entry).push(vellum_ir::Instruction::Terminator(vellum_ir::Terminator::Return { value: None }));

        let defs = DefMap::build(&f);
        let rc = vellum_rc::analyze(&f, &builtins(ctx));
        let actions = classify_parameters(&f, &defs, &rc);
        assert_eq!(actions, vec![ParamAction::Dead]);
        assert_eq!(mangled_suffix(&actions), "d");
    }

    #[test]
    fn owned_parameter_with_matching_release_is_callee_release() {
        let arenas = ContextArenas::new();
        let data = AstContextData::new(&arenas);
        let ctx = AstContext::new(&data);
        let int_ty = ctx.intern_type(TypeKind::Builtin(BuiltinType::Int(32)));

        let mut f = Function::new(
            ctx.intern_identifier("g"),
            CallingConvention::Thin,
            vec![Parameter { ty: IrType::object(int_ty), convention: ParameterConvention::DirectOwned }],
            IrType::object(int_ty),
        );
        let entry = f.create_block();
        let arg_value = f.fresh_value();
        f.insert_argument(entry, 0, arg_value, IrType::object(int_ty));
        f.block_mut(entry).push(vellum_ir::Instruction::Plain(InstructionKind::Release { value: arg_value }));
        f.block_mut(entry).push(vellum_ir::Instruction::Terminator(vellum_ir::Terminator::Return { value: None }));

        let defs = DefMap::build(&f);
        let rc = vellum_rc::analyze(&f, &builtins(ctx));
        let actions = classify_parameters(&f, &defs, &rc);
        assert_eq!(actions, vec![ParamAction::CalleeRelease]);
        let rewritten = rewrite_parameters(&f.parameters, &actions);
        assert_eq!(rewritten[0].convention, ParameterConvention::DirectGuaranteed);
    }

    fn function_type<'ctx>(ctx: AstContext<'ctx>, params: &[Parameter<'ctx>], result: vellum_ast::Type<'ctx>) -> IrType<'ctx> {
        let inputs: &[vellum_ast::Type<'ctx>] = ctx.allocate(params.iter().map(|p| p.ty.underlying).collect::<Vec<_>>(), vellum_arena::ArenaKind::Permanent).as_slice();
        let flags = vellum_ast::types::FunctionFlags { convention: vellum_ast::types::CallingConvention::Standard, thin: true, block_bridging: false, variadic: false, autoclosure: false };
        IrType::object(ctx.intern_type(TypeKind::Function { inputs, result, flags }))
    }

    #[test]
    fn synthesized_function_reconstructs_an_exploded_tuple_parameter_at_entry() {
        let arenas = ContextArenas::new();
        let data = AstContextData::new(&arenas);
        let ctx = AstContext::new(&data);
        let int_ty = ctx.intern_type(TypeKind::Builtin(BuiltinType::Int(32)));
        let elements: &[vellum_ast::types::TupleElement<'_>] =
            ctx.allocate(vec![vellum_ast::types::TupleElement { label: None, ty: int_ty }, vellum_ast::types::TupleElement { label: None, ty: int_ty }], vellum_arena::ArenaKind::Permanent)
                .as_slice();
        let tuple_ty = ctx.intern_type(TypeKind::Tuple { elements });

        let mut original = Function::new(
            ctx.intern_identifier("pair_user"),
            CallingConvention::Thin,
            vec![Parameter { ty: IrType::object(tuple_ty), convention: ParameterConvention::DirectOwned }],
            IrType::object(int_ty),
        );
        original.flags.linkage = Linkage::Private;
        let entry = original.create_block();
        let tuple_arg = original.fresh_value();
        original.insert_argument(entry, 0, tuple_arg, IrType::object(tuple_ty));
        let extracted = original.fresh_value();
        original.block_mut(entry).push(Instruction::Plain(InstructionKind::TupleExtract { result: extracted, aggregate: tuple_arg, field: 0, result_type: IrType::object(int_ty) }));
        original.block_mut(entry).push(Instruction::Terminator(Terminator::Return { value: Some(extracted) }));

        let original_params = original.parameters.clone();
        let defs = DefMap::build(&original);
        let rc = vellum_rc::analyze(&original, &builtins(ctx));
        let actions = classify_parameters(&original, &defs, &rc);
        assert_eq!(actions, vec![ParamAction::Exploded(2)]);

        let (new_func, prelude_len) = synthesize_optimized_function(&mut original, &actions, ctx.intern_identifier("pair_user$s"));
        assert!(original.is_external_declaration());
        assert_eq!(prelude_len, 1);
        assert_eq!(new_func.parameters.len(), 2);

        let new_entry = new_func.entry_block().unwrap();
        assert_eq!(new_func.block(new_entry).arguments.len(), 2);
        let Instruction::Plain(InstructionKind::TupleMake { result, elements: leaves, .. }) = &new_func.block(new_entry).instructions[0] else {
            panic!("expected a TupleMake prelude instruction");
        };
        assert_eq!(*result, tuple_arg);
        assert_eq!(leaves.len(), 2);
        // The original TupleExtract still reads `tuple_arg`, now produced by
        // the prelude instead of a block argument.
        let Instruction::Plain(InstructionKind::TupleExtract { aggregate, .. }) = &new_func.block(new_entry).instructions[1] else {
            panic!("expected the original TupleExtract to follow the prelude unchanged");
        };
        assert_eq!(*aggregate, tuple_arg);

        let new_ref = FunctionRef::from_u32(1);
        let new_type = function_type(ctx, &new_func.parameters, int_ty);
        install_thunk(&mut original, &original_params, new_ref, new_type, &actions);
        assert!(!original.is_external_declaration());
        let thunk_entry = original.entry_block().unwrap();
        let thunk_block = original.block(thunk_entry);
        assert_eq!(thunk_block.arguments.len(), 1);
        assert!(matches!(thunk_block.instructions.iter().find(|i| matches!(i, Instruction::Plain(InstructionKind::TupleExtract { .. }))), Some(_)));
        assert!(matches!(thunk_block.terminator(), Some(Terminator::Return { value: Some(_) })));

        assert!(vellum_ir::verify_function(&new_func).is_ok(), "synthesized function should verify cleanly");
        assert!(vellum_ir::verify_function(&original).is_ok(), "thunk should verify cleanly");
    }

    #[test]
    fn callee_release_parameter_keeps_its_value_id_and_gets_a_compensating_retain() {
        let arenas = ContextArenas::new();
        let data = AstContextData::new(&arenas);
        let ctx = AstContext::new(&data);
        let int_ty = ctx.intern_type(TypeKind::Builtin(BuiltinType::Int(32)));

        let mut original = Function::new(
            ctx.intern_identifier("consumer"),
            CallingConvention::Thin,
            vec![Parameter { ty: IrType::object(int_ty), convention: ParameterConvention::DirectOwned }],
            IrType::object(int_ty),
        );
        original.flags.linkage = Linkage::Private;
        let entry = original.create_block();
        let arg_value = original.fresh_value();
        original.insert_argument(entry, 0, arg_value, IrType::object(int_ty));
        original.block_mut(entry).push(Instruction::Plain(InstructionKind::Release { value: arg_value }));
        original.block_mut(entry).push(Instruction::Terminator(Terminator::Return { value: None }));

        let defs = DefMap::build(&original);
        let rc = vellum_rc::analyze(&original, &builtins(ctx));
        let actions = classify_parameters(&original, &defs, &rc);
        assert_eq!(actions, vec![ParamAction::CalleeRelease]);

        let (new_func, prelude_len) = synthesize_optimized_function(&mut original, &actions, ctx.intern_identifier("consumer$o2g"));
        assert_eq!(prelude_len, 1);
        assert_eq!(new_func.parameters[0].convention, ParameterConvention::DirectGuaranteed);
        let new_entry = new_func.entry_block().unwrap();
        assert_eq!(new_func.block(new_entry).arguments[0].value, arg_value);
        assert!(matches!(new_func.block(new_entry).instructions[0], Instruction::Plain(InstructionKind::Retain { value }) if value == arg_value));

        assert!(vellum_ir::verify_function(&new_func).is_ok(), "synthesized function should verify cleanly");
    }
}
