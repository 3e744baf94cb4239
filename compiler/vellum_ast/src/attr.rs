//! Declaration attributes (SPEC_FULL §4.3a, grounded on `Attr.cpp`).
//!
//! Attributes with no payload are tracked as bits in a small bitset;
//! attributes that carry a payload (a version, an optional explicit name)
//! overflow into a side list. Bitset membership is `O(1)`; payload lookup is
//! linear over the (typically tiny) overflow list.

use vellum_arena::Identifier;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SimpleAttrKind {
    Final = 0,
    Override = 1,
    Required = 2,
    Dynamic = 3,
    Transparent = 4,
    UsableFromInline = 5,
}

const SIMPLE_ATTR_COUNT: u32 = 6;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AvailableVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverflowAttr {
    Available { introduced: AvailableVersion },
    ObjC { explicit_name: Option<Identifier> },
}

/// Bitset-plus-overflow attribute set (spec §4.3a).
#[derive(Clone, Debug, Default)]
pub struct AttributeSet {
    bits: u32,
    overflow: Vec<OverflowAttr>,
}

impl AttributeSet {
    pub fn new() -> Self {
        AttributeSet::default()
    }

    pub fn insert_simple(&mut self, kind: SimpleAttrKind) {
        self.bits |= 1 << (kind as u32);
    }

    pub fn has_simple(&self, kind: SimpleAttrKind) -> bool {
        debug_assert!((kind as u32) < SIMPLE_ATTR_COUNT);
        self.bits & (1 << (kind as u32)) != 0
    }

    pub fn insert_overflow(&mut self, attr: OverflowAttr) {
        self.overflow.push(attr);
    }

    pub fn available(&self) -> Option<&AvailableVersion> {
        self.overflow.iter().find_map(|a| match a {
            OverflowAttr::Available { introduced } => Some(introduced),
            _ => None,
        })
    }

    pub fn objc_name(&self) -> Option<Identifier> {
        self.overflow.iter().find_map(|a| match a {
            OverflowAttr::ObjC { explicit_name } => Some(*explicit_name),
            _ => None,
        })?
    }
}
