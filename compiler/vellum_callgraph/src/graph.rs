//! Call graph construction and Tarjan SCC bottom-up ordering (spec §4.7).

use crate::node::{can_have_indirect_uses, ApplySite, CalleeSet, CallGraphEdge, CallGraphNode};
use std::collections::HashMap;
use vellum_ir::{CastKind, Function, FunctionRef, Instruction, InstructionKind, ValueId};
use vellum_rc::DefMap;

pub struct CallGraph {
    nodes: Vec<CallGraphNode>,
    index_of: HashMap<FunctionRef, usize>,
    /// SCCs in bottom-up (post) order: callees before callers (spec §4.7
    /// "Bottom-up ordering"). Each entry is a list of node indices.
    sccs: Vec<Vec<usize>>,
}

fn resolve_function_ref(defs: &DefMap, func: &Function<'_>, value: ValueId) -> Option<FunctionRef> {
    match defs.defining_instruction(func, value) {
        Some(Instruction::Plain(InstructionKind::FunctionRef { function, .. })) => Some(*function),
        Some(Instruction::Plain(InstructionKind::Cast { kind: CastKind::ThinToThick, operand, .. })) => resolve_function_ref(defs, func, *operand),
        _ => None,
    }
}

fn is_builtin_call(defs: &DefMap, func: &Function<'_>, callee: ValueId) -> bool {
    defs.defining_builtin_name(func, callee).is_some()
}

/// Every `FunctionRef`-valued operand of `inst` used somewhere other than
/// as an apply's callee (spec §4.7: "mark the referenced function's node
/// caller set incomplete"). A `thin-to-thick` cast consumed solely to reach
/// an apply callee is not itself an escaping use; this does not trace
/// further uses of its result, a deliberate scoping simplification for a
/// reference implementation without a full def-use graph.
fn escaping_function_refs(defs: &DefMap, func: &Function<'_>, inst: &Instruction<'_>) -> Vec<FunctionRef> {
    match inst {
        Instruction::Plain(InstructionKind::Apply { args, .. }) => args.iter().filter_map(|v| resolve_function_ref(defs, func, *v)).collect(),
        Instruction::Plain(InstructionKind::Cast { kind: CastKind::ThinToThick, .. }) => Vec::new(),
        Instruction::Plain(InstructionKind::DebugValue { .. } | InstructionKind::ScopeMarker { .. }) => Vec::new(),
        _ => inst.operands().into_iter().filter_map(|v| resolve_function_ref(defs, func, v)).collect(),
    }
}

impl CallGraph {
    /// Builds the call graph for a set of functions (spec §4.7
    /// "Construction"). `functions` gives each function its stable
    /// `FunctionRef` identity.
    pub fn build<'ctx>(functions: &[(FunctionRef, &Function<'ctx>)]) -> Self {
        let mut index_of = HashMap::new();
        let mut nodes = Vec::with_capacity(functions.len());
        for (ordinal, (fref, func)) in functions.iter().enumerate() {
            let complete_start = !can_have_indirect_uses(func.flags.linkage, func.calling_convention);
            nodes.push(CallGraphNode::new(*fref, ordinal as u32, complete_start));
            index_of.insert(*fref, ordinal);
        }

        for (fref, func) in functions {
            let defs = DefMap::build(func);
            let caller_idx = index_of[fref];
            for (block_id, block) in func.blocks_in_order() {
                for (i, inst) in block.instructions.iter().enumerate() {
                    if let Instruction::Plain(InstructionKind::Apply { callee, .. }) = inst {
                        if is_builtin_call(&defs, func, *callee) {
                            continue;
                        }
                        let callees = match resolve_function_ref(&defs, func, *callee) {
                            Some(target) => CalleeSet::singleton_complete(target),
                            None => CalleeSet::unresolved(),
                        };
                        let site = ApplySite { caller: *fref, block: block_id, index: i };
                        for &target in &callees.callees {
                            if let Some(&ti) = index_of.get(&target) {
                                nodes[ti].incoming.insert(site);
                            }
                        }
                        nodes[caller_idx].edges.push(CallGraphEdge { site, callees });
                    }

                    for escaped in escaping_function_refs(&defs, func, inst) {
                        if let Some(&ti) = index_of.get(&escaped) {
                            nodes[ti].caller_set_complete = false;
                        }
                    }
                }
            }
        }

        let sccs = tarjan_bottom_up(&nodes, &index_of);
        CallGraph { nodes, index_of, sccs }
    }

    pub fn node(&self, fref: FunctionRef) -> Option<&CallGraphNode> {
        self.index_of.get(&fref).map(|&i| &self.nodes[i])
    }

    pub fn nodes(&self) -> &[CallGraphNode] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut Vec<CallGraphNode> {
        &mut self.nodes
    }

    pub(crate) fn index_of(&self) -> &HashMap<FunctionRef, usize> {
        &self.index_of
    }

    pub(crate) fn index_of_mut(&mut self) -> &mut HashMap<FunctionRef, usize> {
        &mut self.index_of
    }

    /// SCCs in bottom-up order; within an SCC, function order is arbitrary
    /// (mutually recursive functions have no well-defined single order).
    pub fn sccs_bottom_up(&self) -> &[Vec<usize>] {
        &self.sccs
    }

    /// The bottom-up function order interprocedural passes iterate (spec
    /// §4.7: "iterating functions in this order yields the bottom-up
    /// function order").
    pub fn functions_bottom_up(&self) -> Vec<FunctionRef> {
        self.sccs.iter().flatten().map(|&i| self.nodes[i].function).collect()
    }

    pub(crate) fn recompute_sccs(&mut self) {
        self.sccs = tarjan_bottom_up(&self.nodes, &self.index_of);
    }
}

/// Tarjan's strongly-connected-components algorithm over the graph's
/// apply-edges, returning SCCs in post-order (spec §4.7: "emit SCCs in
/// post-order (callees before callers)"). Implemented directly: the
/// underlying corpus does not carry a ready-made generic SCC utility.
fn tarjan_bottom_up(nodes: &[CallGraphNode], index_of: &HashMap<FunctionRef, usize>) -> Vec<Vec<usize>> {
    struct State {
        index: Vec<Option<u32>>,
        lowlink: Vec<u32>,
        on_stack: Vec<bool>,
        stack: Vec<usize>,
        next_index: u32,
        sccs: Vec<Vec<usize>>,
    }

    fn strongconnect(v: usize, nodes: &[CallGraphNode], index_of: &HashMap<FunctionRef, usize>, st: &mut State) {
        st.index[v] = Some(st.next_index);
        st.lowlink[v] = st.next_index;
        st.next_index += 1;
        st.stack.push(v);
        st.on_stack[v] = true;

        let targets: Vec<usize> =
            nodes[v].edges.iter().flat_map(|e| e.callees.callees.iter()).filter_map(|callee| index_of.get(callee).copied()).collect();

        for w in targets {
            if st.index[w].is_none() {
                strongconnect(w, nodes, index_of, st);
                st.lowlink[v] = st.lowlink[v].min(st.lowlink[w]);
            } else if st.on_stack[w] {
                st.lowlink[v] = st.lowlink[v].min(st.index[w].unwrap());
            }
        }

        if st.lowlink[v] == st.index[v].unwrap() {
            let mut component = Vec::new();
            loop {
                let w = st.stack.pop().unwrap();
                st.on_stack[w] = false;
                component.push(w);
                if w == v {
                    break;
                }
            }
            st.sccs.push(component);
        }
    }

    let n = nodes.len();
    let mut st = State { index: vec![None; n], lowlink: vec![0; n], on_stack: vec![false; n], stack: Vec::new(), next_index: 0, sccs: Vec::new() };
    for v in 0..n {
        if st.index[v].is_none() {
            strongconnect(v, nodes, index_of, &mut st);
        }
    }
    // Tarjan emits each SCC once every member's outgoing edges are explored,
    // i.e. already callees-before-callers; spec calls this "post-order"
    // directly matching the algorithm's natural emission order.
    st.sccs
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_ast::context::{AstContext, AstContextData, ContextArenas};
    use vellum_ast::types::{BuiltinType, TypeKind};
    use vellum_ir::{IrType, Linkage};

    fn direct_call_graph<'ctx>(ctx: AstContext<'ctx>) -> (FunctionRef, FunctionRef, Function<'ctx>, Function<'ctx>) {
        let int_ty = ctx.intern_type(TypeKind::Builtin(BuiltinType::Int(32)));
        let callee_ref = FunctionRef::from_u32(0);
        let caller_ref = FunctionRef::from_u32(1);

        let mut callee = Function::new(ctx.intern_identifier("callee"), vellum_ir::CallingConvention::Thin, Vec::new(), IrType::object(int_ty));
        callee.flags.linkage = Linkage::Private;
        let callee_entry = callee.create_block();
        callee.block_mut(callee_entry).push(Instruction::Terminator(vellum_ir::Terminator::Return { value: None }));

        let mut caller = Function::new(ctx.intern_identifier("caller"), vellum_ir::CallingConvention::Thin, Vec::new(), IrType::object(int_ty));
        caller.flags.linkage = Linkage::Private;
        let caller_entry = caller.create_block();
        let fref_value = caller.fresh_value();
        caller.block_mut(caller_entry).push(Instruction::Plain(InstructionKind::FunctionRef { result: fref_value, function: callee_ref, result_type: IrType::object(int_ty) }));
        let apply_result = caller.fresh_value();
        caller.block_mut(caller_entry).push(Instruction::Plain(InstructionKind::Apply { result: apply_result, callee: fref_value, args: Default::default(), result_type: IrType::object(int_ty) }));
        caller.block_mut(caller_entry).push(Instruction::Terminator(vellum_ir::Terminator::Return { value: Some(apply_result) }));

        (callee_ref, caller_ref, callee, caller)
    }

    #[test]
    fn direct_apply_produces_a_complete_singleton_edge() {
        let arenas = ContextArenas::new();
        let data = AstContextData::new(&arenas);
        let ctx = AstContext::new(&data);
        let (callee_ref, caller_ref, callee, caller) = direct_call_graph(ctx);

        let graph = CallGraph::build(&[(callee_ref, &callee), (caller_ref, &caller)]);
        let caller_node = graph.node(caller_ref).unwrap();
        assert_eq!(caller_node.edges.len(), 1);
        assert!(caller_node.edges[0].callees.complete);
        assert_eq!(caller_node.edges[0].callees.callees, vec![callee_ref]);

        let callee_node = graph.node(callee_ref).unwrap();
        assert_eq!(callee_node.incoming.len(), 1);
        // The callee's own `FunctionRef` (used only as the apply's callee)
        // does not escape, so a private, non-method function stays dead once
        // its only caller is accounted for... except here it has exactly one
        // caller, so it is not dead.
        assert!(!callee_node.is_dead());
    }

    #[test]
    fn bottom_up_order_places_callee_before_caller() {
        let arenas = ContextArenas::new();
        let data = AstContextData::new(&arenas);
        let ctx = AstContext::new(&data);
        let (callee_ref, caller_ref, callee, caller) = direct_call_graph(ctx);

        let graph = CallGraph::build(&[(callee_ref, &callee), (caller_ref, &caller)]);
        let order = graph.functions_bottom_up();
        let callee_pos = order.iter().position(|&f| f == callee_ref).unwrap();
        let caller_pos = order.iter().position(|&f| f == caller_ref).unwrap();
        assert!(callee_pos < caller_pos);
    }
}
