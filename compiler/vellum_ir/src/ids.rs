//! Index types used throughout a typed IR function.

use vellum_index::newtype_index;

newtype_index!(
    /// A basic block within one [`crate::function::Function`].
    pub struct BasicBlockId
);

newtype_index!(
    /// An SSA value: either a block argument or the (sole) result of a
    /// value-producing instruction.
    pub struct ValueId
);

newtype_index!(
    /// A stable reference to a [`crate::function::Function`] within a call
    /// graph (spec §4.7 "Call graph node"), used by `FunctionRef` instructions
    /// to name a callee without borrowing it directly.
    pub struct FunctionRef
);

impl BasicBlockId {
    pub const ENTRY: BasicBlockId = BasicBlockId::from_u32(0);
}
