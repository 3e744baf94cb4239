//! Boundary scenario 6: a module import that introduces new extensions
//! advances the AST context's generation counter, and an affected nominal's
//! cached member lookup re-runs on next query.

use std::cell::Cell;
use std::rc::Rc;
use vellum_arena::Identifier;
use vellum_ast::attr::AttributeSet;
use vellum_ast::context::{new_module, AstContext, AstContextData, ContextArenas};
use vellum_ast::decl::{Decl, DeclContext, DeclData, DeclKind};
use vellum_ast::module::{Module, ModuleLoader};
use vellum_ast::source::SourceRange;

/// A loader that hands back one more extension member each time the
/// context's generation advances past what it last reported, counting how
/// many times it was actually asked to contribute.
struct GrowingLoader<'ctx> {
    ctx: AstContext<'ctx>,
    calls: Rc<Cell<u32>>,
}

impl<'ctx> ModuleLoader<'ctx> for GrowingLoader<'ctx> {
    fn load_module(&self, _path: &str) -> Option<Module<'ctx>> {
        None
    }

    fn lookup_value(&self, _name: Identifier, _consumer: Module<'ctx>) -> Vec<Decl<'ctx>> {
        Vec::new()
    }

    fn load_extensions(&self, nominal: Decl<'ctx>, previous_generation: u64) -> Vec<Decl<'ctx>> {
        self.calls.set(self.calls.get() + 1);
        let count = previous_generation + 1;
        (0..count)
            .map(|i| {
                let name = self.ctx.intern_identifier(&format!("extensionMember{i}"));
                self.ctx.allocate(
                    DeclData::new(DeclContext::Nominal(nominal), name, AttributeSet::new(), DeclKind::Value { is_static: false }, SourceRange::INVALID),
                    vellum_arena::ArenaKind::Permanent,
                )
            })
            .collect()
    }
}

#[test]
fn generation_advance_invalidates_cached_extension_lookup() {
    let arenas = ContextArenas::new();
    let data = AstContextData::new(&arenas);
    let ctx = AstContext::new(&data);

    let module = new_module(ctx, ctx.intern_identifier("M"));
    let nominal_name = ctx.intern_identifier("Widget");
    let nominal = ctx.allocate(
        DeclData::new(DeclContext::Module(module), nominal_name, AttributeSet::new(), DeclKind::Type { members: &[] }, SourceRange::INVALID),
        vellum_arena::ArenaKind::Permanent,
    );

    let calls = Rc::new(Cell::new(0));
    let loader = GrowingLoader { ctx, calls: calls.clone() };
    ctx.add_module_loader(Box::new(loader), false);

    let first = ctx.load_extensions(nominal, 0);
    assert_eq!(first.len(), 1);
    assert_eq!(calls.get(), 1);

    // Same generation, same `previous_generation`: served from cache, the
    // loader is not consulted again.
    let second = ctx.load_extensions(nominal, 0);
    assert_eq!(second.len(), 1);
    assert_eq!(calls.get(), 1);

    // A module import bumps the generation counter (spec §6).
    let old_generation = ctx.bump_generation();
    assert_eq!(old_generation, 0);
    assert_eq!(ctx.generation(), 1);

    // The cache is now stale relative to the current generation, so the
    // next query re-runs the loader and observes the new extension.
    let third = ctx.load_extensions(nominal, old_generation);
    assert_eq!(third.len(), 2);
    assert_eq!(calls.get(), 2);
}
