//! Tracked-pointer identity-root stripping (spec §4.8 "Tracked pointer").

use std::collections::HashMap;
use vellum_ir::{BasicBlockId, CastKind, Function, Instruction, InstructionKind, ValueId};

/// Maps every value produced in `func` to the block/index that produces it,
/// so `strip_to_identity_root` can walk a value back to its defining cast
/// chain without a separate def-use index.
pub struct DefMap {
    defs: HashMap<ValueId, (BasicBlockId, usize)>,
}

impl DefMap {
    pub fn build(func: &Function<'_>) -> Self {
        let mut defs = HashMap::new();
        for (block_id, block) in func.blocks_in_order() {
            for (i, inst) in block.instructions.iter().enumerate() {
                if let Some(result) = inst.result() {
                    defs.insert(result, (block_id, i));
                }
            }
        }
        Self { defs }
    }

    pub fn defining_instruction<'a, 'ctx>(&self, func: &'a Function<'ctx>, value: ValueId) -> Option<&'a Instruction<'ctx>> {
        let (block, index) = *self.defs.get(&value)?;
        func.block(block).instructions.get(index)
    }

    /// The built-in name `value` directly refers to, if its defining
    /// instruction is a `BuiltinRef`.
    pub fn defining_builtin_name(&self, func: &Function<'_>, value: ValueId) -> Option<vellum_arena::Identifier> {
        match self.defining_instruction(func, value) {
            Some(Instruction::Plain(InstructionKind::BuiltinRef { name, .. })) => Some(*name),
            _ => None,
        }
    }

    /// A cast preserves reference identity iff it is a bit-level
    /// reinterpretation of the same underlying object (spec §4.8: "all
    /// casts that preserve reference identity (reference-bit-casts
    /// included)"). `Downcast`/`Upcast` and the unowned conversions change
    /// representation but not identity; the existential and
    /// bridge-to-block forms box or reinterpret the value and do not
    /// preserve identity for this analysis.
    fn preserves_identity(kind: CastKind) -> bool {
        matches!(
            kind,
            CastKind::RefToRawPointer
                | CastKind::RawPointerToRef
                | CastKind::Upcast
                | CastKind::Downcast
                | CastKind::ThinToThick
                | CastKind::ConvertCc
                | CastKind::RefToUnowned
                | CastKind::UnownedToRef
        )
    }

    /// Strips `value` through every identity-preserving cast to find its
    /// identity root.
    pub fn strip_to_identity_root(&self, func: &Function<'_>, value: ValueId) -> ValueId {
        let mut current = value;
        loop {
            let Some(Instruction::Plain(InstructionKind::Cast { kind, operand, .. })) = self.defining_instruction(func, current) else {
                return current;
            };
            if !Self::preserves_identity(*kind) {
                return current;
            }
            current = *operand;
        }
    }

    /// True if `value`'s identity root originates from one of the
    /// function's entry-block arguments (spec §4.8 merge rule 5:
    /// "argument-origin" vs. "non-argument-origin").
    pub fn is_argument_origin(&self, func: &Function<'_>, value: ValueId) -> bool {
        self.argument_convention(func, value).is_some()
    }

    /// The declared parameter convention for `value`'s identity root, if it
    /// is one of the function's entry-block arguments (SPEC_FULL §4.8a:
    /// `known_safe` is seeded from whether the argument is
    /// Direct-Guaranteed).
    pub fn argument_convention(&self, func: &Function<'_>, value: ValueId) -> Option<vellum_ir::ParameterConvention> {
        let root = self.strip_to_identity_root(func, value);
        let entry = func.entry_block()?;
        let index = func.block(entry).arguments.iter().position(|a| a.value == root)?;
        func.parameters.get(index).map(|p| p.convention)
    }
}
