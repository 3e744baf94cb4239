//! `optimize_module` end to end (spec §4.9 steps 2-6): a helper whose sole
//! parameter is owned and released on its only exit path gets a
//! signature-optimized sibling, its caller's apply is rewritten to call
//! that sibling directly, and the now-unreachable original becomes a dead
//! thunk that `optimize_module` drops instead of keeping around.

use vellum_ast::context::{AstContext, AstContextData, ContextArenas};
use vellum_ast::types::{BuiltinType, TypeKind};
use vellum_ir::{CallingConvention, Function, FunctionRef, Instruction, InstructionKind, IrType, Linkage, Parameter, ParameterConvention, Terminator};
use vellum_rc::WellKnownBuiltins;

fn builtins(ctx: AstContext<'_>) -> WellKnownBuiltins {
    WellKnownBuiltins { trap: ctx.intern_identifier("trap"), autorelease_pool_push: ctx.intern_identifier("autoreleasePoolPush") }
}

#[test]
fn owned_and_released_helper_is_split_and_its_caller_rewritten() {
    let arenas = ContextArenas::new();
    let data = AstContextData::new(&arenas);
    let ctx = AstContext::new(&data);
    let int_ty = ctx.intern_type(TypeKind::Builtin(BuiltinType::Int(32)));

    let helper_ref = FunctionRef::from_u32(0);
    let caller_ref = FunctionRef::from_u32(1);

    let mut helper = Function::new(
        ctx.intern_identifier("helper"),
        CallingConvention::Thin,
        vec![Parameter { ty: IrType::object(int_ty), convention: ParameterConvention::DirectOwned }],
        IrType::object(int_ty),
    );
    helper.flags.linkage = Linkage::Private;
    let helper_entry = helper.create_block();
    let x = helper.fresh_value();
    helper.insert_argument(helper_entry, 0, x, IrType::object(int_ty));
    helper.block_mut(helper_entry).push(Instruction::Plain(InstructionKind::Release { value: x }));
    helper.block_mut(helper_entry).push(Instruction::Terminator(Terminator::Return { value: None }));

    let mut caller = Function::new(
        ctx.intern_identifier("caller"),
        CallingConvention::Thin,
        vec![Parameter { ty: IrType::object(int_ty), convention: ParameterConvention::DirectOwned }],
        IrType::object(int_ty),
    );
    caller.flags.linkage = Linkage::Private;
    let caller_entry = caller.create_block();
    let y = caller.fresh_value();
    caller.insert_argument(caller_entry, 0, y, IrType::object(int_ty));
    let fref_value = caller.fresh_value();
    caller.block_mut(caller_entry).push(Instruction::Plain(InstructionKind::FunctionRef { result: fref_value, function: helper_ref, result_type: IrType::object(int_ty) }));
    let apply_result = caller.fresh_value();
    caller.block_mut(caller_entry).push(Instruction::Plain(InstructionKind::Apply {
        result: apply_result,
        callee: fref_value,
        args: smallvec::smallvec![y],
        result_type: IrType::object(int_ty),
    }));
    caller.block_mut(caller_entry).push(Instruction::Terminator(Terminator::Return { value: Some(apply_result) }));

    let mut functions = vec![(helper_ref, helper), (caller_ref, caller)];
    let wk = builtins(ctx);
    let plans = vellum_driver::optimize_module(ctx, &mut functions, &wk);

    assert_eq!(plans.len(), 1, "only the helper is a candidate");
    let (new_ref, suffix) = plans[0];
    assert_eq!(suffix, "o2g");

    // The original helper had no caller left over once `caller`'s apply was
    // rewritten, so it was dropped entirely rather than kept as a dead thunk.
    assert!(functions.iter().all(|(f, _)| *f != helper_ref), "unreachable thunk should have been removed");

    let (_, new_func) = functions.iter().find(|(f, _)| *f == new_ref).expect("synthesized sibling is present");
    assert_eq!(new_func.parameters[0].convention, ParameterConvention::DirectGuaranteed);
    assert!(vellum_ir::verify_function(new_func).is_ok());

    let (_, rewritten_caller) = functions.iter().find(|(f, _)| *f == caller_ref).expect("caller is still present");
    assert!(vellum_ir::verify_function(rewritten_caller).is_ok());
    let calls_new_ref = rewritten_caller.blocks_in_order().flat_map(|(_, b)| b.instructions.iter()).any(|inst| {
        matches!(inst, Instruction::Plain(InstructionKind::FunctionRef { function, .. }) if *function == new_ref)
    });
    assert!(calls_new_ref, "caller's apply should now reference the synthesized sibling");
}

#[test]
fn a_module_with_no_candidates_produces_no_plans() {
    let arenas = ContextArenas::new();
    let data = AstContextData::new(&arenas);
    let ctx = AstContext::new(&data);
    let int_ty = ctx.intern_type(TypeKind::Builtin(BuiltinType::Int(32)));

    let plain_ref = FunctionRef::from_u32(0);
    let mut plain = Function::new(ctx.intern_identifier("plain"), CallingConvention::Thin, Vec::new(), IrType::object(int_ty));
    plain.flags.linkage = Linkage::Private;
    let entry = plain.create_block();
    plain.block_mut(entry).push(Instruction::Terminator(Terminator::Return { value: None }));

    let mut functions = vec![(plain_ref, plain)];
    let wk = builtins(ctx);
    let plans = vellum_driver::optimize_module(ctx, &mut functions, &wk);

    assert!(plans.is_empty());
    assert_eq!(functions.len(), 1);
}
