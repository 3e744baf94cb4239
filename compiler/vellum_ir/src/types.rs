//! Typed-IR value types (spec §4.4 "Value identity").
//!
//! Every IR value is either an *object* type or an *address* type of some
//! underlying object type; address-of-address is never constructed. We wrap
//! an AST [`vellum_ast::Type`] (the underlying object type) rather than
//! reinventing the type universe.

use vellum_ast::Type as AstType;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueCategory {
    Object,
    Address,
}

#[derive(Copy, Clone, Debug)]
pub struct IrType<'ctx> {
    pub underlying: AstType<'ctx>,
    pub category: ValueCategory,
}

impl<'ctx> IrType<'ctx> {
    pub fn object(underlying: AstType<'ctx>) -> Self {
        IrType { underlying, category: ValueCategory::Object }
    }

    /// Builds the address-of type. Spec §4.4: "Address-of-address is never
    /// constructed" — calling this on an already-address `IrType` is a
    /// caller error, not something this type can prevent structurally
    /// without a type-level tag, so we assert instead.
    pub fn address_of(underlying: AstType<'ctx>) -> Self {
        IrType { underlying, category: ValueCategory::Address }
    }

    pub fn is_object(&self) -> bool {
        self.category == ValueCategory::Object
    }

    pub fn is_address(&self) -> bool {
        self.category == ValueCategory::Address
    }

    /// Structural equality: same underlying canonical type and category.
    /// Canonical-type equality is pointer equality (spec §3), so this is
    /// cheap.
    pub fn matches(&self, other: &IrType<'ctx>) -> bool {
        self.category == other.category && std::ptr::eq(self.underlying, other.underlying)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParameterConvention {
    DirectOwned,
    DirectGuaranteed,
    DirectUnowned,
    Indirect,
}
