//! Call graph nodes and edges (spec §4.7 "Call graph").

use std::collections::HashSet;
use vellum_ir::{BasicBlockId, FunctionRef};

/// Location of the apply-like instruction that originates an edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApplySite {
    pub caller: FunctionRef,
    pub block: BasicBlockId,
    pub index: usize,
}

/// The resolved (or conservatively unresolved) set of callees an apply site
/// might invoke (spec §4.7 "Construction").
#[derive(Clone, Debug, Default)]
pub struct CalleeSet {
    pub callees: Vec<FunctionRef>,
    pub complete: bool,
}

impl CalleeSet {
    pub fn singleton_complete(callee: FunctionRef) -> Self {
        CalleeSet { callees: vec![callee], complete: true }
    }

    pub fn unresolved() -> Self {
        CalleeSet { callees: Vec::new(), complete: false }
    }
}

#[derive(Clone, Debug)]
pub struct CallGraphEdge {
    pub site: ApplySite,
    pub callees: CalleeSet,
}

/// A node for one function in the module (spec §4.7: "allocate a node with
/// a fresh ordinal").
#[derive(Clone, Debug)]
pub struct CallGraphNode {
    pub function: FunctionRef,
    pub ordinal: u32,
    /// False once any function-reference use outside an apply callee
    /// position is observed, or the starting value computed from
    /// `can_have_indirect_uses` is itself false (SPEC_FULL §4.7a).
    pub caller_set_complete: bool,
    /// Apply sites within this node's function, with their resolved callee
    /// sets (the node's *outgoing* edges).
    pub edges: Vec<CallGraphEdge>,
    /// Mirrors every edge in the graph whose callee set contains this node
    /// (spec §4.7 invariant b).
    pub incoming: HashSet<ApplySite>,
}

impl CallGraphNode {
    pub fn new(function: FunctionRef, ordinal: u32, caller_set_complete: bool) -> Self {
        CallGraphNode { function, ordinal, caller_set_complete, edges: Vec::new(), incoming: HashSet::new() }
    }

    /// Spec §4.7 invariant (c): dead iff caller-set complete and no
    /// incoming edges.
    pub fn is_dead(&self) -> bool {
        self.caller_set_complete && self.incoming.is_empty()
    }
}

/// SPEC_FULL §4.7a: whether a function's address could conceivably be used
/// somewhere this module cannot see — i.e. whether its node must start
/// life with an incomplete caller set.
pub fn can_have_indirect_uses(linkage: vellum_ir::Linkage, convention: vellum_ir::CallingConvention) -> bool {
    matches!(linkage, vellum_ir::Linkage::Public | vellum_ir::Linkage::External) || matches!(convention, vellum_ir::CallingConvention::Method)
}
