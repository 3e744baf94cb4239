//! The two-directional refcount lattice (spec §4.8 "Lattice", "Merge
//! rules").

use smallvec::SmallVec;
use vellum_ir::BasicBlockId;

/// Location of an instruction within a function, used to name the specific
/// retain/release an analysis state is tracking.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstLoc {
    pub block: BasicBlockId,
    pub index: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BottomUpKind {
    None,
    Decremented,
    MightBeUsed,
    MightBeDecremented,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TopDownKind {
    None,
    Incremented,
    MightBeUsed,
    MightBeDecremented,
}

/// Whether a top-down state's originating increment was reached via a path
/// that passes through a function argument's entry value, vs. one that does
/// not (spec §4.8 merge rule 5: mixing the two along a merge is illegal).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PathOrigin {
    Argument,
    NonArgument,
}

pub trait LatticeKind: Copy + Eq + Ord {
    const BOTTOM: Self;
}

impl LatticeKind for BottomUpKind {
    const BOTTOM: Self = BottomUpKind::None;
}

impl LatticeKind for TopDownKind {
    const BOTTOM: Self = TopDownKind::None;
}

/// One tracked pointer's analysis state in one direction (spec §4.8
/// "Per-basic-block state").
#[derive(Clone, Debug)]
pub struct RefCountState<K> {
    pub kind: K,
    /// AND-merged: true only if every path to this point saw a value whose
    /// initial retain is known not to be aliased before the dataflow began.
    pub known_safe: bool,
    /// OR-merged, and forced true when merged insert-point sets diverge in
    /// size (spec §4.8 merge rules).
    pub partial: bool,
    /// Candidate partner instructions (the increments a bottom-up state
    /// might pair with, or vice versa); unioned on merge.
    pub matched: SmallVec<[InstLoc; 2]>,
}

impl<K: LatticeKind> RefCountState<K> {
    pub fn fresh(kind: K, known_safe: bool, origin: InstLoc) -> Self {
        RefCountState { kind, known_safe, partial: false, matched: smallvec::smallvec![origin] }
    }

    /// Merge rule (spec §4.8): equal states return either; either-`None`
    /// collapses to `None`; otherwise the further-along state wins.
    pub fn merge(a: Option<&Self>, b: Option<&Self>) -> Option<Self> {
        match (a, b) {
            (None, _) | (_, None) => None,
            (Some(a), Some(b)) => {
                if a.kind == K::BOTTOM || b.kind == K::BOTTOM {
                    return None;
                }
                let mut matched = a.matched.clone();
                for m in &b.matched {
                    if !matched.contains(m) {
                        matched.push(*m);
                    }
                }
                let further = if a.kind >= b.kind { a.kind } else { b.kind };
                let size_mismatch = a.matched.len() != b.matched.len();
                Some(RefCountState {
                    kind: further,
                    known_safe: a.known_safe && b.known_safe,
                    partial: a.partial || b.partial || size_mismatch,
                    matched,
                })
            }
        }
    }

    pub fn advance(&mut self, new_kind: K) {
        if new_kind > self.kind {
            self.kind = new_kind;
        }
    }
}
