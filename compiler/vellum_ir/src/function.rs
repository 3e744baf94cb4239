//! Typed IR function (spec §3 "Typed IR function", §4.5 block manipulation).

use crate::block::BasicBlockData;
use crate::ids::{BasicBlockId, ValueId};
use crate::instruction::{Instruction, Terminator};
use crate::types::{IrType, ParameterConvention};
use std::cell::Cell;
use vellum_ast::Decl;
use vellum_index::IndexVec;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CallingConvention {
    Thick,
    Thin,
    Method,
    WitnessMethod,
    CFunction,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InlineStrategy {
    Default,
    Never,
    Always,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Linkage {
    Public,
    Hidden,
    Private,
    External,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SideEffects {
    Unknown,
    ReadNone,
    ReadOnly,
}

#[derive(Clone, Debug)]
pub struct Parameter<'ctx> {
    pub ty: IrType<'ctx>,
    pub convention: ParameterConvention,
}

#[derive(Clone, Debug)]
pub struct FunctionFlags {
    pub bare: bool,
    pub transparent: bool,
    pub global_initializer: bool,
    pub inline_strategy: InlineStrategy,
    pub effects: SideEffects,
    pub linkage: Linkage,
}

impl Default for FunctionFlags {
    fn default() -> Self {
        FunctionFlags {
            bare: false,
            transparent: false,
            global_initializer: false,
            inline_strategy: InlineStrategy::Default,
            effects: SideEffects::Unknown,
            linkage: Linkage::Hidden,
        }
    }
}

/// A function's generic context: the archetypes available to its body,
/// referenced by `vellum_ast::TypeKind::Archetype`'s `ordinal` (spec §3
/// "Type" category table, "Archetype").
#[derive(Clone, Debug, Default)]
pub struct GenericContext<'ctx> {
    pub archetypes: Vec<vellum_ast::Type<'ctx>>,
}

pub struct Function<'ctx> {
    pub name: vellum_arena::Identifier,
    pub declaration: Option<Decl<'ctx>>,
    pub calling_convention: CallingConvention,
    pub parameters: Vec<Parameter<'ctx>>,
    pub result_type: IrType<'ctx>,
    pub generic_context: GenericContext<'ctx>,
    pub flags: FunctionFlags,
    blocks: IndexVec<BasicBlockId, BasicBlockData<'ctx>>,
    block_order: Vec<BasicBlockId>,
    next_value: Cell<u32>,
    /// Count of uses of this function's address outside of an apply callee
    /// position, e.g. held by another function's `FunctionRef`-producing
    /// instruction list or a call-graph editor (spec §3: "a reference count
    /// of external users").
    external_use_count: Cell<u32>,
}

impl<'ctx> Function<'ctx> {
    pub fn new(
        name: vellum_arena::Identifier,
        calling_convention: CallingConvention,
        parameters: Vec<Parameter<'ctx>>,
        result_type: IrType<'ctx>,
    ) -> Self {
        Function {
            name,
            declaration: None,
            calling_convention,
            parameters,
            result_type,
            generic_context: GenericContext::default(),
            flags: FunctionFlags::default(),
            blocks: IndexVec::new(),
            block_order: Vec::new(),
            next_value: Cell::new(0),
            external_use_count: Cell::new(0),
        }
    }

    /// An empty block list means an external declaration (spec §3: "optional
    /// list of basic blocks (empty = external declaration)").
    pub fn is_external_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn fresh_value(&self) -> ValueId {
        let id = self.next_value.get();
        self.next_value.set(id + 1);
        ValueId::from_u32(id)
    }

    pub fn retain_external_use(&self) {
        self.external_use_count.set(self.external_use_count.get() + 1);
    }

    pub fn release_external_use(&self) {
        self.external_use_count.set(self.external_use_count.get().saturating_sub(1));
    }

    pub fn external_use_count(&self) -> u32 {
        self.external_use_count.get()
    }

    pub fn entry_block(&self) -> Option<BasicBlockId> {
        self.block_order.first().copied()
    }

    pub fn block(&self, id: BasicBlockId) -> &BasicBlockData<'ctx> {
        &self.blocks[id]
    }

    pub fn block_mut(&mut self, id: BasicBlockId) -> &mut BasicBlockData<'ctx> {
        &mut self.blocks[id]
    }

    /// Blocks in the function's current ordering (spec §3: "ordered list of
    /// basic blocks").
    pub fn blocks_in_order(&self) -> impl Iterator<Item = (BasicBlockId, &BasicBlockData<'ctx>)> {
        self.block_order.iter().map(move |&id| (id, &self.blocks[id]))
    }

    fn position_of(&self, id: BasicBlockId) -> usize {
        self.block_order.iter().position(|&b| b == id).expect("block not present in this function")
    }

    // ---- §4.5 basic block manipulation -------------------------------

    /// Create a new block at the end of the ordering.
    pub fn create_block(&mut self) -> BasicBlockId {
        let id = self.blocks.push(BasicBlockData::new());
        self.block_order.push(id);
        id
    }

    /// Create a new block immediately after `peer` in the ordering.
    pub fn create_block_after(&mut self, peer: BasicBlockId) -> BasicBlockId {
        let id = self.blocks.push(BasicBlockData::new());
        let pos = self.position_of(peer);
        self.block_order.insert(pos + 1, id);
        id
    }

    pub fn move_after_peer(&mut self, block: BasicBlockId, peer: BasicBlockId) {
        let from = self.position_of(block);
        self.block_order.remove(from);
        let to = self.position_of(peer);
        self.block_order.insert(to + 1, block);
    }

    /// Erase a block. Callers must have already removed it as a successor
    /// of every predecessor and updated those predecessors' argument lists;
    /// this only removes the block itself and its entry from the ordering.
    pub fn erase_block(&mut self, block: BasicBlockId) {
        let pos = self.position_of(block);
        self.block_order.remove(pos);
    }

    /// Splits `block` before instruction index `split_at`: the tail
    /// (instructions `split_at..`, including the terminator) moves into a
    /// freshly created successor block; `block` itself is left
    /// terminator-less (spec §4.5).
    pub fn split_block(&mut self, block: BasicBlockId, split_at: usize) -> BasicBlockId {
        let tail = self.blocks[block].instructions.split_off(split_at);
        let new_id = self.create_block_after(block);
        self.blocks[new_id].instructions = tail;
        new_id
    }

    /// As [`Function::split_block`], but additionally inserts an
    /// unconditional branch from `block` to the new tail block, carrying
    /// `branch_args` (spec §4.5 "split-and-branch").
    pub fn split_block_and_branch(
        &mut self,
        block: BasicBlockId,
        split_at: usize,
        branch_args: smallvec::SmallVec<[ValueId; 4]>,
    ) -> BasicBlockId {
        let new_id = self.split_block(block, split_at);
        self.blocks[block].set_terminator(Terminator::Branch { target: new_id, args: branch_args });
        self.blocks[new_id].predecessors.push(block);
        new_id
    }

    /// Splits the edge `from -> to` if it is critical (spec §4.5: source has
    /// multiple successors and destination has multiple predecessors),
    /// inserting a new block that re-branches to `to` carrying the same
    /// argument values the original branch supplied. Returns the inserted
    /// block, or `None` if the edge was not critical.
    pub fn split_critical_edge(&mut self, from: BasicBlockId, to: BasicBlockId) -> Option<BasicBlockId> {
        let is_critical = self.blocks[from].successors().len() > 1 && self.blocks[to].predecessors.len() > 1;
        if !is_critical {
            return None;
        }
        let edge_args = match self.blocks[from].terminator() {
            Some(Terminator::Branch { target, args }) if *target == to => args.clone(),
            Some(Terminator::CondBranch { then_target, then_args, else_target, else_args, .. }) => {
                if *then_target == to {
                    then_args.clone()
                } else if *else_target == to {
                    else_args.clone()
                } else {
                    smallvec::SmallVec::new()
                }
            }
            _ => smallvec::SmallVec::new(),
        };

        let new_id = self.create_block();
        self.blocks[new_id].set_terminator(Terminator::Branch { target: to, args: edge_args });
        self.blocks[new_id].predecessors.push(from);
        self.retarget_branch(from, to, new_id);

        self.blocks[to].predecessors.retain(|&p| p != from);
        self.blocks[to].predecessors.push(new_id);
        Some(new_id)
    }

    fn retarget_branch(&mut self, from: BasicBlockId, old_target: BasicBlockId, new_target: BasicBlockId) {
        let term = self.blocks[from].clear_terminator().expect("retargeting an unterminated block");
        let retargeted = match term {
            Terminator::Branch { target, args } if target == old_target => Terminator::Branch { target: new_target, args },
            Terminator::CondBranch { condition, then_target, then_args, else_target, else_args } => {
                Terminator::CondBranch {
                    condition,
                    then_target: if then_target == old_target { new_target } else { then_target },
                    then_args,
                    else_target: if else_target == old_target { new_target } else { else_target },
                    else_args,
                }
            }
            other => other,
        };
        self.blocks[from].set_terminator(retargeted);
    }

    pub fn replace_argument(&mut self, block: BasicBlockId, index: usize, value: ValueId, ty: IrType<'ctx>) {
        self.blocks[block].replace_argument(index, value, ty);
    }

    pub fn erase_argument(&mut self, block: BasicBlockId, index: usize) {
        self.blocks[block].erase_argument(index);
    }

    pub fn insert_argument(&mut self, block: BasicBlockId, index: usize, value: ValueId, ty: IrType<'ctx>) {
        self.blocks[block].insert_argument(index, value, ty);
    }

    /// Takes this function's block list, ordering, and value counter,
    /// leaving it an external declaration (spec §4.9 step 3: "move the
    /// original body to the new function"). The result is a one-time
    /// transfer token: installing it anywhere other than exactly once (via
    /// [`Self::install_body`]) panics rather than silently duplicating or
    /// dropping the moved body.
    pub fn take_body(&mut self) -> vellum_data_structures::Steal<(IndexVec<BasicBlockId, BasicBlockData<'ctx>>, Vec<BasicBlockId>, u32)> {
        let blocks = std::mem::take(&mut self.blocks);
        let block_order = std::mem::take(&mut self.block_order);
        let next_value = self.next_value.replace(0);
        vellum_data_structures::Steal::new((blocks, block_order, next_value))
    }

    /// Installs a body taken from another function via [`Self::take_body`].
    /// Panics if `body` was already installed elsewhere.
    pub fn install_body(&mut self, body: vellum_data_structures::Steal<(IndexVec<BasicBlockId, BasicBlockData<'ctx>>, Vec<BasicBlockId>, u32)>) {
        let (blocks, block_order, next_value) = body.steal();
        self.blocks = blocks;
        self.block_order = block_order;
        self.next_value = Cell::new(next_value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Instruction;
    use vellum_ast::context::{AstContext, AstContextData, ContextArenas};
    use vellum_ast::types::{BuiltinType, TypeKind};

    fn dummy_function<'ctx>(ctx: AstContext<'ctx>) -> Function<'ctx> {
        let int_ty = ctx.intern_type(TypeKind::Builtin(BuiltinType::Int(32)));
        Function::new(
            ctx.intern_identifier("f"),
            CallingConvention::Thin,
            Vec::new(),
            IrType::object(int_ty),
        )
    }

    #[test]
    fn create_block_after_inserts_immediately_following_peer() {
        let arenas = ContextArenas::new();
        let data = AstContextData::new(&arenas);
        let ctx = AstContext::new(&data);
        let mut f = dummy_function(ctx);
        let a = f.create_block();
        let c = f.create_block();
        let b = f.create_block_after(a);
        let order: Vec<_> = f.blocks_in_order().map(|(id, _)| id).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn split_block_moves_tail_and_unterminates_head() {
        let arenas = ContextArenas::new();
        let data = AstContextData::new(&arenas);
        let ctx = AstContext::new(&data);
        let mut f = dummy_function(ctx);
        let entry = f.create_block();
        f.block_mut(entry).push(Instruction::Terminator(Terminator::Unreachable));
        let new_id = f.split_block(entry, 0);
        assert!(!f.block(entry).is_terminated());
        assert!(f.block(new_id).is_terminated());
    }
}
