//! Block-level bottom-up and top-down refcount dataflow passes (spec §4.8).

use crate::identity::DefMap;
use crate::lattice::{BottomUpKind, InstLoc, PathOrigin, RefCountState, TopDownKind};
use std::collections::{HashMap, HashSet};
use vellum_ir::{BasicBlockId, Function, Instruction, InstructionKind, ValueId};

/// Identifiers for the two compiler built-ins the dataflow treats specially
/// (spec §4.8 "trap block recognition", "autorelease-pool calls").
pub struct WellKnownBuiltins {
    pub trap: vellum_arena::Identifier,
    pub autorelease_pool_push: vellum_arena::Identifier,
}

struct BlockState<K> {
    states: HashMap<ValueId, RefCountState<K>>,
    origins: HashMap<ValueId, PathOrigin>,
}

impl<K> Default for BlockState<K> {
    fn default() -> Self {
        BlockState { states: HashMap::new(), origins: HashMap::new() }
    }
}

pub struct RcAnalysisResult {
    pub increment_to_decrement: HashMap<InstLoc, InstLoc>,
    pub decrement_to_increment: HashMap<InstLoc, InstLoc>,
    pub trap_blocks: HashSet<BasicBlockId>,
}

/// A block whose entire body is `reference-to-trap-builtin; apply with no
/// arguments; unreachable` (spec §4.8 "Trap block recognition").
fn is_trap_block(func: &Function<'_>, block: BasicBlockId, builtins: &WellKnownBuiltins) -> bool {
    let insts = &func.block(block).instructions;
    if insts.len() != 3 {
        return false;
    }
    let Instruction::Plain(InstructionKind::BuiltinRef { name, result: ref_result, .. }) = &insts[0] else {
        return false;
    };
    if *name != builtins.trap {
        return false;
    }
    let Instruction::Plain(InstructionKind::Apply { callee, args, .. }) = &insts[1] else {
        return false;
    };
    if callee != ref_result || !args.is_empty() {
        return false;
    }
    matches!(insts[2], Instruction::Terminator(vellum_ir::Terminator::Unreachable))
}

/// True for an apply whose callee is a direct reference to the
/// autorelease-pool-push built-in (spec §4.8: "autorelease-pool calls are
/// treated as full barriers").
fn is_autorelease_pool_push(func: &Function<'_>, defs: &DefMap, inst: &Instruction<'_>, builtins: &WellKnownBuiltins) -> bool {
    let Instruction::Plain(InstructionKind::Apply { callee, .. }) = inst else {
        return false;
    };
    defs.defining_builtin_name(func, *callee) == Some(builtins.autorelease_pool_push)
}

fn reverse_postorder(func: &Function<'_>, entry: BasicBlockId) -> Vec<BasicBlockId> {
    let mut visited = HashSet::new();
    let mut post = Vec::new();
    fn visit(func: &Function<'_>, b: BasicBlockId, visited: &mut HashSet<BasicBlockId>, post: &mut Vec<BasicBlockId>) {
        if !visited.insert(b) {
            return;
        }
        for s in func.block(b).successors() {
            visit(func, s, visited, post);
        }
        post.push(b);
    }
    visit(func, entry, &mut visited, &mut post);
    post.reverse();
    post
}

fn back_edge_heads(func: &Function<'_>, entry: BasicBlockId, _rpo: &[BasicBlockId]) -> HashSet<BasicBlockId> {
    let mut heads = HashSet::new();
    let mut on_stack = HashSet::new();
    let mut visited = HashSet::new();
    fn dfs(
        func: &Function<'_>,
        b: BasicBlockId,
        visited: &mut HashSet<BasicBlockId>,
        on_stack: &mut HashSet<BasicBlockId>,
        heads: &mut HashSet<BasicBlockId>,
    ) {
        if !visited.insert(b) {
            return;
        }
        on_stack.insert(b);
        for s in func.block(b).successors() {
            if on_stack.contains(&s) {
                heads.insert(s);
            } else if !visited.contains(&s) {
                dfs(func, s, visited, on_stack, heads);
            }
        }
        on_stack.remove(&b);
    }
    dfs(func, entry, &mut visited, &mut on_stack, &mut heads);
    heads
}

/// Runs both directions of the dataflow over `func` and returns the pairs
/// that survived (spec §4.8 "Completion").
pub fn analyze(func: &Function<'_>, builtins: &WellKnownBuiltins) -> RcAnalysisResult {
    let defs = DefMap::build(func);
    let Some(entry) = func.entry_block() else {
        return RcAnalysisResult { increment_to_decrement: HashMap::new(), decrement_to_increment: HashMap::new(), trap_blocks: HashSet::new() };
    };

    let trap_blocks: HashSet<BasicBlockId> = func.blocks_in_order().map(|(id, _)| id).filter(|&b| is_trap_block(func, b, builtins)).collect();

    let rpo = reverse_postorder(func, entry);
    let back_edges = back_edge_heads(func, entry, &rpo);

    let mut preds: HashMap<BasicBlockId, Vec<BasicBlockId>> = HashMap::new();
    let mut succs: HashMap<BasicBlockId, Vec<BasicBlockId>> = HashMap::new();
    for (id, block) in func.blocks_in_order() {
        for s in block.successors() {
            preds.entry(s).or_default().push(id);
            succs.entry(id).or_default().push(s);
        }
    }

    let increment_to_decrement = top_down_pass(func, &defs, &rpo, &preds, &back_edges, &trap_blocks, builtins);
    let mut rpo_rev = rpo.clone();
    rpo_rev.reverse();
    let decrement_to_increment = bottom_up_pass(func, &defs, &rpo_rev, &succs, &trap_blocks, builtins);

    RcAnalysisResult { increment_to_decrement, decrement_to_increment, trap_blocks }
}

fn top_down_pass(
    func: &Function<'_>,
    defs: &DefMap,
    rpo: &[BasicBlockId],
    preds: &HashMap<BasicBlockId, Vec<BasicBlockId>>,
    back_edges: &HashSet<BasicBlockId>,
    trap_blocks: &HashSet<BasicBlockId>,
    builtins: &WellKnownBuiltins,
) -> HashMap<InstLoc, InstLoc> {
    let mut pairs = HashMap::new();
    let mut out_states: HashMap<BasicBlockId, BlockState<TopDownKind>> = HashMap::new();

    for &block in rpo {
        if trap_blocks.contains(&block) {
            continue;
        }
        let mut state = BlockState::<TopDownKind>::default();
        if back_edges.contains(&block) {
            // Merge rule: a back-edge predecessor clears the incoming state.
        } else if let Some(block_preds) = preds.get(&block) {
            let mut iter = block_preds.iter().filter(|p| !trap_blocks.contains(p));
            if let Some(&first) = iter.next() {
                if let Some(s) = out_states.get(&first) {
                    state.states = s.states.clone();
                    state.origins = s.origins.clone();
                }
                for &p in iter {
                    let other = out_states.get(&p);
                    merge_topdown_into(&mut state, other);
                }
            }
        }

        for (i, inst) in func.block(block).instructions.iter().enumerate() {
            let loc = InstLoc { block, index: i };
            step_topdown(func, defs, &mut state, loc, inst, &mut pairs, builtins);
        }

        out_states.insert(block, state);
    }
    pairs
}

fn merge_topdown_into(state: &mut BlockState<TopDownKind>, other: Option<&BlockState<TopDownKind>>) {
    let Some(other) = other else {
        state.states.clear();
        return;
    };
    let keys: Vec<ValueId> = state.states.keys().chain(other.states.keys()).copied().collect::<HashSet<_>>().into_iter().collect();
    for k in keys {
        let a = state.states.get(&k);
        let b = other.states.get(&k);
        let a_origin = state.origins.get(&k);
        let b_origin = other.origins.get(&k);
        let origins_conflict = matches!((a_origin, b_origin), (Some(x), Some(y)) if x != y);
        let merged = if origins_conflict { None } else { RefCountState::merge(a, b) };
        match merged {
            Some(m) => {
                state.states.insert(k, m);
            }
            None => {
                state.states.remove(&k);
                state.origins.remove(&k);
            }
        }
    }
}

fn step_topdown(
    func: &Function<'_>,
    defs: &DefMap,
    state: &mut BlockState<TopDownKind>,
    loc: InstLoc,
    inst: &Instruction<'_>,
    pairs: &mut HashMap<InstLoc, InstLoc>,
    builtins: &WellKnownBuiltins,
) {
    if is_autorelease_pool_push(func, defs, inst, builtins) {
        state.states.clear();
        state.origins.clear();
        return;
    }

    match inst {
        Instruction::Plain(InstructionKind::Retain { value }) => {
            let root = defs.strip_to_identity_root(func, *value);
            // SPEC_FULL §4.8a: known-safe iff the tracked pointer's root is
            // a Direct-Guaranteed function argument.
            let known_safe = matches!(defs.argument_convention(func, *value), Some(vellum_ir::ParameterConvention::DirectGuaranteed));
            let is_argument = defs.is_argument_origin(func, *value);
            state.states.insert(root, RefCountState::fresh(TopDownKind::Incremented, known_safe, loc));
            state.origins.insert(root, if is_argument { PathOrigin::Argument } else { PathOrigin::NonArgument });
            return;
        }
        Instruction::Plain(InstructionKind::Release { value }) => {
            let root = defs.strip_to_identity_root(func, *value);
            if let Some(s) = state.states.get(&root) {
                if s.kind == TopDownKind::Incremented {
                    for &origin in &s.matched {
                        pairs.insert(origin, loc);
                    }
                }
                state.states.remove(&root);
                state.origins.remove(&root);
            }
            return;
        }
        _ => {}
    }

    advance_for_operands(func, defs, state, inst, TopDownKind::MightBeUsed, TopDownKind::MightBeDecremented);
}

fn bottom_up_pass(
    func: &Function<'_>,
    defs: &DefMap,
    post_order: &[BasicBlockId],
    succs: &HashMap<BasicBlockId, Vec<BasicBlockId>>,
    trap_blocks: &HashSet<BasicBlockId>,
    builtins: &WellKnownBuiltins,
) -> HashMap<InstLoc, InstLoc> {
    let mut pairs = HashMap::new();
    let mut in_states: HashMap<BasicBlockId, BlockState<BottomUpKind>> = HashMap::new();

    for &block in post_order {
        if trap_blocks.contains(&block) {
            continue;
        }
        let mut state = BlockState::<BottomUpKind>::default();
        if let Some(block_succs) = succs.get(&block) {
            let mut iter = block_succs.iter().filter(|s| !trap_blocks.contains(s));
            if let Some(&first) = iter.next() {
                if let Some(s) = in_states.get(&first) {
                    state.states = s.states.clone();
                }
                for &s in iter {
                    let other = in_states.get(&s);
                    merge_bottomup_into(&mut state, other);
                }
            }
        }

        let insts = &func.block(block).instructions;
        for i in (0..insts.len()).rev() {
            let loc = InstLoc { block, index: i };
            step_bottomup(func, defs, &mut state, loc, &insts[i], &mut pairs, builtins);
        }

        in_states.insert(block, state);
    }
    pairs
}

fn merge_bottomup_into(state: &mut BlockState<BottomUpKind>, other: Option<&BlockState<BottomUpKind>>) {
    let Some(other) = other else {
        state.states.clear();
        return;
    };
    let keys: Vec<ValueId> = state.states.keys().chain(other.states.keys()).copied().collect::<HashSet<_>>().into_iter().collect();
    for k in keys {
        let merged = RefCountState::merge(state.states.get(&k), other.states.get(&k));
        match merged {
            Some(m) => {
                state.states.insert(k, m);
            }
            None => {
                state.states.remove(&k);
            }
        }
    }
}

fn step_bottomup(
    func: &Function<'_>,
    defs: &DefMap,
    state: &mut BlockState<BottomUpKind>,
    loc: InstLoc,
    inst: &Instruction<'_>,
    pairs: &mut HashMap<InstLoc, InstLoc>,
    builtins: &WellKnownBuiltins,
) {
    if is_autorelease_pool_push(func, defs, inst, builtins) {
        state.states.clear();
        return;
    }

    match inst {
        Instruction::Plain(InstructionKind::Release { value }) => {
            let root = defs.strip_to_identity_root(func, *value);
            let known_safe = matches!(defs.argument_convention(func, *value), Some(vellum_ir::ParameterConvention::DirectGuaranteed));
            state.states.insert(root, RefCountState::fresh(BottomUpKind::Decremented, known_safe, loc));
            return;
        }
        Instruction::Plain(InstructionKind::Retain { value }) => {
            let root = defs.strip_to_identity_root(func, *value);
            if let Some(s) = state.states.get(&root) {
                if s.kind == BottomUpKind::Decremented {
                    for &origin in &s.matched {
                        pairs.insert(origin, loc);
                    }
                }
                state.states.remove(&root);
            }
            return;
        }
        _ => {}
    }

    advance_for_operands(func, defs, state, inst, BottomUpKind::MightBeUsed, BottomUpKind::MightBeDecremented);
}

/// Advances every tracked pointer the instruction touches. An apply-like
/// instruction is treated, conservatively, as a potential use-and-decrement
/// of every tracked pointer (no alias analysis is modeled); any other
/// instruction only affects roots it names directly as an operand.
fn advance_for_operands<K: crate::lattice::LatticeKind>(
    func: &Function<'_>,
    defs: &DefMap,
    state: &mut BlockState<K>,
    inst: &Instruction<'_>,
    used_kind: K,
    decremented_kind: K,
) {
    let is_call = matches!(inst, Instruction::Plain(InstructionKind::Apply { .. } | InstructionKind::PartialApply { .. }));
    if is_call {
        for s in state.states.values_mut() {
            s.advance(decremented_kind);
        }
        return;
    }
    let touched: HashSet<ValueId> = inst.operands().into_iter().map(|v| defs.strip_to_identity_root(func, v)).collect();
    for root in touched {
        if let Some(s) = state.states.get_mut(&root) {
            s.advance(used_kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_ast::context::{AstContext, AstContextData, ContextArenas};
    use vellum_ast::types::{BuiltinType, TypeKind};
    use vellum_ir::{CallingConvention, IrType, Terminator};

    fn builtins(ctx: AstContext<'_>) -> WellKnownBuiltins {
        WellKnownBuiltins { trap: ctx.intern_identifier("trap"), autorelease_pool_push: ctx.intern_identifier("autoreleasePoolPush") }
    }

    #[test]
    fn adjacent_retain_release_with_no_intervening_use_is_matched_both_directions() {
        let arenas = ContextArenas::new();
        let data = AstContextData::new(&arenas);
        let ctx = AstContext::new(&data);
        let int_ty = ctx.intern_type(TypeKind::Builtin(BuiltinType::Int(32)));
        let mut func = vellum_ir::Function::new(ctx.intern_identifier("f"), CallingConvention::Thin, Vec::new(), IrType::object(int_ty));

        let entry = func.create_block();
        let value = func.fresh_value();
        func.block_mut(entry).append_argument(value, IrType::object(int_ty));
        func.block_mut(entry).push(Instruction::Plain(InstructionKind::Retain { value }));
        func.block_mut(entry).push(Instruction::Plain(InstructionKind::Release { value }));
        func.block_mut(entry).set_terminator(Terminator::Return { value: None });

        let result = analyze(&func, &builtins(ctx));
        assert_eq!(result.increment_to_decrement.len(), 1);
        assert_eq!(result.decrement_to_increment.len(), 1);
    }

    #[test]
    fn trap_block_is_recognized_and_excluded() {
        let arenas = ContextArenas::new();
        let data = AstContextData::new(&arenas);
        let ctx = AstContext::new(&data);
        let int_ty = ctx.intern_type(TypeKind::Builtin(BuiltinType::Int(32)));
        let mut func = vellum_ir::Function::new(ctx.intern_identifier("f"), CallingConvention::Thin, Vec::new(), IrType::object(int_ty));
        let wk = builtins(ctx);

        let entry = func.create_block();
        let trap_ref = func.fresh_value();
        let apply_result = func.fresh_value();
        func.block_mut(entry).push(Instruction::Plain(InstructionKind::BuiltinRef { result: trap_ref, name: wk.trap, result_type: IrType::object(int_ty) }));
        func.block_mut(entry).push(Instruction::Plain(InstructionKind::Apply {
            result: apply_result,
            callee: trap_ref,
            args: Default::default(),
            result_type: IrType::object(int_ty),
        }));
        func.block_mut(entry).set_terminator(Terminator::Unreachable);

        let result = analyze(&func, &wk);
        assert!(result.trap_blocks.contains(&entry));
    }
}
