//! Typed IR function representation and structural verifier (spec §2
//! components 6–7).

pub mod block;
pub mod function;
pub mod ids;
pub mod instruction;
pub mod types;
pub mod verify;

pub use block::{BasicBlockData, BlockArgument};
pub use function::{CallingConvention, Function, FunctionFlags, GenericContext, InlineStrategy, Linkage, Parameter, SideEffects};
pub use ids::{BasicBlockId, FunctionRef, ValueId};
pub use instruction::{CastKind, Instruction, InstructionKind, SwitchEnumCase, Terminator};
pub use types::{IrType, ParameterConvention, ValueCategory};
pub use verify::{verify_function, VerifierViolation};
