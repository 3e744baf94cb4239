//! Call-graph edit operations (spec §4.7 "Edit operations").

use crate::graph::CallGraph;
use crate::node::{ApplySite, CalleeSet, CallGraphEdge, CallGraphNode};
use vellum_ir::FunctionRef;

pub struct CallGraphEditor<'g> {
    graph: &'g mut CallGraph,
}

impl<'g> CallGraphEditor<'g> {
    pub fn new(graph: &'g mut CallGraph) -> Self {
        CallGraphEditor { graph }
    }

    /// Allocates a node for a newly created function (a thunk or a
    /// signature-optimized replacement, e.g. spec §4.9).
    pub fn add_node(&mut self, function: FunctionRef, caller_set_complete: bool) {
        let ordinal = self.graph.nodes().len() as u32;
        self.graph.nodes_mut().push(CallGraphNode::new(function, ordinal, caller_set_complete));
        let idx = self.graph.nodes().len() - 1;
        self.index_of_mut().insert(function, idx);
        self.graph.recompute_sccs();
    }

    pub fn remove_node(&mut self, function: FunctionRef) {
        let Some(&idx) = self.graph.index_of().get(&function) else { return };
        let sites: Vec<ApplySite> = self.graph.nodes()[idx].edges.iter().map(|e| e.site).collect();
        for site in sites {
            self.remove_edge(site);
        }
        self.graph.nodes_mut().remove(idx);
        self.index_of_mut().remove(&function);
        for (_, i) in self.index_of_mut().iter_mut() {
            if *i > idx {
                *i -= 1;
            }
        }
        for node in self.graph.nodes_mut().iter_mut() {
            node.ordinal = if node.ordinal as usize > idx { node.ordinal - 1 } else { node.ordinal };
        }
        self.graph.recompute_sccs();
    }

    fn index_of_mut(&mut self) -> &mut std::collections::HashMap<FunctionRef, usize> {
        // SAFETY-free: `CallGraph` keeps its index map private; editor needs
        // mutable access, so the graph exposes it via a crate-visible
        // accessor pair instead of a public setter.
        self.graph.index_of_mut()
    }

    /// Adds (or replaces, if one exists) the edge for the apply at `site`,
    /// re-resolving its callee set, and updates every affected node's
    /// incoming set (spec §4.7 invariant b).
    pub fn set_edge(&mut self, site: ApplySite, callees: CalleeSet) {
        self.remove_edge(site);
        let Some(&caller_idx) = self.graph.index_of().get(&site.caller) else { return };
        for &target in &callees.callees {
            if let Some(&ti) = self.graph.index_of().get(&target) {
                self.graph.nodes_mut()[ti].incoming.insert(site);
            }
        }
        self.graph.nodes_mut()[caller_idx].edges.push(CallGraphEdge { site, callees });
        self.graph.recompute_sccs();
    }

    /// Removes the edge for `site`, eagerly clearing it from both the
    /// owning node's edge list and every prior callee's incoming set (spec
    /// §4.7 invariant d).
    pub fn remove_edge(&mut self, site: ApplySite) {
        let Some(&caller_idx) = self.graph.index_of().get(&site.caller) else { return };
        let removed: Vec<FunctionRef> = {
            let node = &mut self.graph.nodes_mut()[caller_idx];
            let before = node.edges.len();
            let mut removed_callees = Vec::new();
            node.edges.retain(|e| {
                if e.site == site {
                    removed_callees.extend(e.callees.callees.iter().copied());
                    false
                } else {
                    true
                }
            });
            debug_assert!(node.edges.len() <= before);
            removed_callees
        };
        for target in removed {
            if let Some(&ti) = self.graph.index_of().get(&target) {
                self.graph.nodes_mut()[ti].incoming.remove(&site);
            }
        }
    }

    /// Replaces the apply at `old_site` with one or many new applies
    /// (spec §4.7 "replace an apply with one or many new applies,
    /// re-resolving their callees"). Each `new_callees` entry becomes an
    /// edge at the same caller with a distinct instruction index.
    pub fn replace_apply(&mut self, old_site: ApplySite, new_sites: Vec<(ApplySite, CalleeSet)>) {
        self.remove_edge(old_site);
        for (site, callees) in new_sites {
            self.set_edge(site, callees);
        }
    }

    /// When an apply is replaced by an unknown-callee form, every callee it
    /// used to resolve to loses that incoming edge but must still be
    /// treated conservatively: the caller-set completeness downgrade from
    /// the general escape rule (spec §4.7) is applied explicitly here for
    /// callees that might now be reached only through the unknown form.
    pub fn mark_incoming_incomplete(&mut self, function: FunctionRef) {
        if let Some(&idx) = self.graph.index_of().get(&function) {
            self.graph.nodes_mut()[idx].caller_set_complete = false;
        }
    }
}
