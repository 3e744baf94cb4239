//! The driver: frontend action dispatch, search-path configuration, and the
//! external-interface stand-ins (spec §6, SPEC_FULL §6/§10/§11/§12).
//!
//! Everything in `vellum_ast`, `vellum_ir`, `vellum_callgraph`, and
//! `vellum_rc` follows spec §7's "the core never throws": lookups return
//! `Option`/empty `Vec`, and the verifier aborts with a structured dump
//! rather than a recoverable error. This crate is the one place that talks
//! to the outside world (files, the REPL port) and so is the only place
//! that defines a fallible-with-payload error type.

pub mod action;
pub mod backend;
pub mod error;
pub mod repl;
pub mod search_path;

pub use action::{FrontendAction, TranslationUnitKind};
pub use backend::{ArtifactKind, Backend};
pub use error::DriverError;
pub use repl::{channel, classify_line, ReplClient, ReplContinue, ReplInput, ReplInputKind, ReplPort};
pub use search_path::SearchPathOptions;

/// Installs the one process-wide `tracing` subscriber (SPEC_FULL §10:
/// "`vellum_driver` owns the one process-wide subscriber installation").
/// Library crates only instrument with `tracing::debug!`/`trace!`/`error!`;
/// none of them call this.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

/// The function type to give a freshly synthesized signature-optimized
/// sibling: a thin `Standard`-convention function from `params`' types to
/// `result`, built the same way a `FunctionRef`'s `result_type` always is
/// (spec §4.9 step 3 needs a real function type here, not a stand-in).
fn synthesized_function_type<'ctx>(
    ctx: vellum_ast::context::AstContext<'ctx>,
    params: &[vellum_ir::Parameter<'ctx>],
    result: vellum_ast::Type<'ctx>,
) -> vellum_ir::IrType<'ctx> {
    let inputs: &[vellum_ast::Type<'ctx>] =
        ctx.allocate(params.iter().map(|p| p.ty.underlying).collect::<Vec<_>>(), vellum_arena::ArenaKind::Permanent).as_slice();
    let flags = vellum_ast::types::FunctionFlags {
        convention: vellum_ast::types::CallingConvention::Standard,
        thin: true,
        block_bridging: false,
        variadic: false,
        autoclosure: false,
    };
    vellum_ir::IrType::object(ctx.intern_type(vellum_ast::types::TypeKind::Function { inputs, result, flags }))
}

/// Runs the call graph and RC dataflow over a module's functions and
/// performs function-signature optimization end to end (spec §4.9 steps
/// 2-6: synthesize the optimized sibling and move the candidate's body into
/// it, replace the candidate with a thunk, rewrite every known call site to
/// call the sibling directly, and delete any thunk that call-graph analysis
/// now shows is dead). This is the one place in the workspace that strings
/// `vellum_callgraph`, `vellum_rc`, and `vellum_ir` together end to end.
/// Returns every newly synthesized sibling's `FunctionRef` paired with its
/// mangled name; `functions` is updated in place (thunks kept where a
/// candidate's address still escapes, the synthesized siblings appended,
/// dead thunks dropped).
pub fn optimize_module<'ctx>(
    ctx: vellum_ast::context::AstContext<'ctx>,
    functions: &mut Vec<(vellum_ir::FunctionRef, vellum_ir::Function<'ctx>)>,
    builtins: &vellum_rc::WellKnownBuiltins,
) -> Vec<(vellum_ir::FunctionRef, String)> {
    let borrowed: Vec<(vellum_ir::FunctionRef, &vellum_ir::Function<'ctx>)> = functions.iter().map(|(f, func)| (*f, func)).collect();
    let mut graph = vellum_callgraph::CallGraph::build(&borrowed);
    let order = graph.functions_bottom_up();
    drop(borrowed);

    let mut next_ordinal = functions.iter().map(|(f, _)| f.as_u32()).max().map_or(0, |m| m + 1);
    let mut plans = Vec::new();

    for fref in order {
        let Some(idx) = functions.iter().position(|(f, _)| *f == fref) else { continue };
        if !vellum_callgraph::is_candidate(&functions[idx].1) {
            continue;
        }

        let rc = vellum_rc::analyze(&functions[idx].1, builtins);
        let defs = vellum_rc::DefMap::build(&functions[idx].1);
        let actions = vellum_callgraph::classify_parameters(&functions[idx].1, &defs, &rc);
        if !vellum_callgraph::should_optimize(&actions) {
            continue;
        }

        // Snapshot every known caller before anything moves: rewriting a
        // site can shift later instruction indices in the same block, so
        // within one (caller, block) pair the highest index must be
        // rewritten first.
        let mut incoming: Vec<vellum_callgraph::ApplySite> =
            graph.node(fref).map(|n| n.incoming.iter().copied().collect()).unwrap_or_default();
        incoming.sort_by_key(|s| (s.caller.as_u32(), s.block.as_u32(), s.index));
        incoming.reverse();

        let original_name = ctx.identifier_text(functions[idx].1.name).to_string();
        let new_name = ctx.intern_identifier(&vellum_callgraph::mangled_name(&original_name, &actions));
        let original_params = functions[idx].1.parameters.clone();
        let result_type = functions[idx].1.result_type;

        let (mut new_func, prelude_len) = vellum_callgraph::synthesize_optimized_function(&mut functions[idx].1, &actions, new_name);
        let new_ref = vellum_ir::FunctionRef::from_u32(next_ordinal);
        next_ordinal += 1;
        let new_function_type = synthesized_function_type(ctx, &new_func.parameters, result_type.underlying);

        vellum_callgraph::install_thunk(&mut functions[idx].1, &original_params, new_ref, new_function_type, &actions);
        let thunk_entry = functions[idx].1.entry_block().expect("install_thunk always creates an entry block");

        {
            let mut editor = vellum_callgraph::CallGraphEditor::new(&mut graph);
            editor.add_node(new_ref, true);
            editor.set_edge(
                vellum_callgraph::ApplySite { caller: fref, block: thunk_entry, index: 0 },
                vellum_callgraph::CalleeSet::singleton_complete(new_ref),
            );
        }

        for site in &incoming {
            let new_entry = new_func.entry_block();
            if site.caller == fref {
                let index = if Some(site.block) == new_entry { site.index + prelude_len } else { site.index };
                vellum_callgraph::rewrite_call_site(&mut new_func, site.block, index, new_ref, new_function_type, &original_params, &actions);
            } else if let Some(caller_idx) = functions.iter().position(|(f, _)| *f == site.caller) {
                vellum_callgraph::rewrite_call_site(&mut functions[caller_idx].1, site.block, site.index, new_ref, new_function_type, &original_params, &actions);
            }

            let mut editor = vellum_callgraph::CallGraphEditor::new(&mut graph);
            editor.set_edge(*site, vellum_callgraph::CalleeSet::singleton_complete(new_ref));
        }

        // Step 6: a thunk nobody can reach any more (every known caller was
        // just redirected, and nothing else can take its address) is dead
        // weight, so drop it instead of shipping an unreachable forwarder.
        let thunk_is_dead = graph.node(fref).map(vellum_callgraph::CallGraphNode::is_dead).unwrap_or(false);
        if thunk_is_dead {
            let mut editor = vellum_callgraph::CallGraphEditor::new(&mut graph);
            editor.remove_node(fref);
            functions.remove(idx);
        }

        plans.push((new_ref, vellum_callgraph::mangled_suffix(&actions)));
        functions.push((new_ref, new_func));
    }

    plans
}

/// Runs `action` against a module already loaded into `ctx`. Parsing,
/// type-checking, and the backend are external collaborators this crate
/// only sketches interfaces for (spec §1 "out of scope"); this stops at
/// reporting which pipeline stage an action would have entered next and
/// returns the deterministic exit code spec §6 requires (0 success,
/// non-zero if the context accumulated a diagnosed error).
pub fn run_action<'ctx>(action: FrontendAction, ctx: vellum_ast::context::AstContext<'ctx>) -> i32 {
    tracing::debug!(?action, "dispatching frontend action");
    if action.requires_backend() {
        tracing::warn!(?action, "backend is an external collaborator; nothing is emitted");
    }
    if ctx.had_error() {
        1
    } else {
        0
    }
}
