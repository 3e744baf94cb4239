//! Basic blocks and their manipulation operations (spec §3 "Basic block",
//! §4.5).

use crate::ids::{BasicBlockId, ValueId};
use crate::instruction::{Instruction, Terminator};
use crate::types::IrType;
use smallvec::SmallVec;

/// One block argument: an SSA value bound by every predecessor's branch
/// (spec §3: "arguments act as the phi nodes of the function").
#[derive(Clone, Debug)]
pub struct BlockArgument<'ctx> {
    pub value: ValueId,
    pub ty: IrType<'ctx>,
}

#[derive(Clone, Debug, Default)]
pub struct BasicBlockData<'ctx> {
    pub arguments: Vec<BlockArgument<'ctx>>,
    pub instructions: Vec<Instruction<'ctx>>,
    /// Maintained incrementally by [`crate::function::Function`]'s
    /// manipulation operations rather than recomputed; spec §4.5 invariant
    /// (predecessor lists stay consistent across every block operation).
    pub predecessors: Vec<BasicBlockId>,
}

impl<'ctx> BasicBlockData<'ctx> {
    pub fn new() -> Self {
        BasicBlockData::default()
    }

    /// `None` until a terminator instruction has been appended; a block in
    /// this state is a legal intermediate value during construction or a
    /// pending split (spec §4.5), never a legal final state (spec §4.4
    /// invariant 1).
    pub fn terminator(&self) -> Option<&Terminator<'ctx>> {
        match self.instructions.last() {
            Some(Instruction::Terminator(t)) => Some(t),
            _ => None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminator().is_some()
    }

    pub fn push(&mut self, inst: Instruction<'ctx>) {
        debug_assert!(!self.is_terminated(), "cannot append past a block's terminator");
        self.instructions.push(inst);
    }

    pub fn set_terminator(&mut self, term: Terminator<'ctx>) {
        if self.is_terminated() {
            self.instructions.pop();
        }
        self.instructions.push(Instruction::Terminator(term));
    }

    /// Drops the terminator, leaving the block terminator-less (the state a
    /// `split` leaves a block in: spec §4.5 "split ... is left
    /// terminator-less for the caller to re-terminate").
    pub fn clear_terminator(&mut self) -> Option<Terminator<'ctx>> {
        match self.instructions.last() {
            Some(Instruction::Terminator(_)) => match self.instructions.pop() {
                Some(Instruction::Terminator(t)) => Some(t),
                _ => unreachable!(),
            },
            _ => None,
        }
    }

    pub fn successors(&self) -> SmallVec<[BasicBlockId; 4]> {
        self.terminator().map(Terminator::successors).unwrap_or_default()
    }

    pub fn append_argument(&mut self, value: ValueId, ty: IrType<'ctx>) {
        self.arguments.push(BlockArgument { value, ty });
    }

    /// Replaces argument `index`'s value id and type in place (spec §4.5
    /// "replace argument"), preserving its position so every predecessor's
    /// branch-argument list stays aligned by index.
    pub fn replace_argument(&mut self, index: usize, value: ValueId, ty: IrType<'ctx>) {
        self.arguments[index] = BlockArgument { value, ty };
    }

    /// Removes argument `index` (spec §4.5 "erase argument"). Callers are
    /// responsible for removing the corresponding operand from every
    /// predecessor's branch-argument list; this method only owns the
    /// block's own argument list.
    pub fn erase_argument(&mut self, index: usize) -> BlockArgument<'ctx> {
        self.arguments.remove(index)
    }

    pub fn insert_argument(&mut self, index: usize, value: ValueId, ty: IrType<'ctx>) {
        self.arguments.insert(index, BlockArgument { value, ty });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_block_has_no_terminator() {
        let block: BasicBlockData<'static> = BasicBlockData::new();
        assert!(!block.is_terminated());
        assert!(block.successors().is_empty());
    }

    #[test]
    fn set_terminator_replaces_existing_one() {
        let mut block: BasicBlockData<'static> = BasicBlockData::new();
        block.set_terminator(Terminator::Unreachable);
        assert!(block.is_terminated());
        block.set_terminator(Terminator::Return { value: None });
        assert_eq!(block.instructions.len(), 1);
        assert!(matches!(block.terminator(), Some(Terminator::Return { value: None })));
    }

    #[test]
    fn clear_terminator_leaves_block_unterminated() {
        let mut block: BasicBlockData<'static> = BasicBlockData::new();
        block.set_terminator(Terminator::Unreachable);
        let cleared = block.clear_terminator();
        assert!(cleared.is_some());
        assert!(!block.is_terminated());
    }
}
