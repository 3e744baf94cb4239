//! Reference-count sequence dataflow over typed IR functions (spec §4.8).

pub mod analysis;
pub mod identity;
pub mod lattice;

pub use analysis::{analyze, RcAnalysisResult, WellKnownBuiltins};
pub use identity::DefMap;
pub use lattice::{BottomUpKind, InstLoc, PathOrigin, RefCountState, TopDownKind};
