//! Boundary scenarios 1 and 2, exercised end to end: a call graph built over
//! a caller/callee pair, the RC dataflow run over the candidate, and
//! signature optimization classifying its parameters from the dataflow's
//! `DefMap` (spec §4.9: "consumer of 4.7 and 4.8").

use vellum_ast::context::{AstContext, AstContextData, ContextArenas};
use vellum_ast::types::{BuiltinType, TypeKind};
use vellum_callgraph::{classify_parameters, is_candidate, mangled_suffix, should_optimize, CallGraph, ParamAction};
use vellum_ir::{CallingConvention, Function, FunctionRef, Instruction, InstructionKind, IrType, Linkage, Parameter, ParameterConvention, Terminator};
use vellum_rc::{analyze, DefMap, WellKnownBuiltins};

fn builtins(ctx: AstContext<'_>) -> WellKnownBuiltins {
    WellKnownBuiltins { trap: ctx.intern_identifier("trap"), autorelease_pool_push: ctx.intern_identifier("autoreleasePoolPush") }
}

#[test]
fn owned_parameter_released_on_the_single_exit_path_becomes_callee_release_through_the_full_pipeline() {
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

    let functions = [(helper_ref, &helper), (caller_ref, &caller)];
    let graph = CallGraph::build(&functions);
    let order = graph.functions_bottom_up();
    assert!(order.iter().position(|&f| f == helper_ref).unwrap() < order.iter().position(|&f| f == caller_ref).unwrap());

    let wk = builtins(ctx);
    let mut plans = Vec::new();
    for fref in order {
        let (_, func) = functions.iter().find(|(f, _)| *f == fref).unwrap();
        if !is_candidate(func) {
            continue;
        }
        let rc = analyze(func, &wk);
        assert!(rc.decrement_to_increment.is_empty(), "no retain precedes the release, so no pair is matched inside this function");
        let defs = DefMap::build(func);
        let actions = classify_parameters(func, &defs, &rc);
        if should_optimize(&actions) {
            plans.push((fref, mangled_suffix(&actions)));
        }
    }

    assert_eq!(plans, vec![(helper_ref, "o2g".to_string())]);
}

#[test]
fn parameter_with_no_uses_becomes_dead_through_the_full_pipeline() {
    let arenas = ContextArenas::new();
    let data = AstContextData::new(&arenas);
    let ctx = AstContext::new(&data);
    let int_ty = ctx.intern_type(TypeKind::Builtin(BuiltinType::Int(32)));

    let unused_ref = FunctionRef::from_u32(0);
    let mut unused_fn = Function::new(
        ctx.intern_identifier("unused"),
        CallingConvention::Thin,
        vec![Parameter { ty: IrType::object(int_ty), convention: ParameterConvention::DirectOwned }],
        IrType::object(int_ty),
    );
    unused_fn.flags.linkage = Linkage::Private;
    let entry = unused_fn.create_block();
    let z = unused_fn.fresh_value();
    unused_fn.insert_argument(entry, 0, z, IrType::object(int_ty));
    unused_fn.block_mut(entry).push(Instruction::Terminator(Terminator::Return { value: None }));

    let functions = [(unused_ref, &unused_fn)];
    let graph = CallGraph::build(&functions);
    assert_eq!(graph.functions_bottom_up(), vec![unused_ref]);

    let wk = builtins(ctx);
    let defs = DefMap::build(&unused_fn);
    let rc = analyze(&unused_fn, &wk);
    let actions = classify_parameters(&unused_fn, &defs, &rc);
    assert_eq!(actions, vec![ParamAction::Dead]);
    assert_eq!(mangled_suffix(&actions), "d");
}
