pub mod editor;
pub mod graph;
pub mod node;
pub mod sig_opt;

pub use editor::CallGraphEditor;
pub use graph::CallGraph;
pub use node::{can_have_indirect_uses, ApplySite, CalleeSet, CallGraphEdge, CallGraphNode};
pub use sig_opt::{
    classify_parameters, install_thunk, is_candidate, mangled_name, mangled_suffix, rewrite_call_site, rewrite_parameters, should_optimize, synthesize_optimized_function, ParamAction,
};
