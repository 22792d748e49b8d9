//! The typed constant payload a fold can produce (§4.7): an arbitrary-width
//! integer, an `f64` float, an address constant, or the null pointer. xcc's
//! `evaluator.cpp` only ever returns a bare `uintmax_t` (`evali`/`casti`);
//! this widens that into a small tagged value so floats and addresses are
//! first-class results instead of evaluation failures.

use cc_arena::IdentHandle;
use cc_ir::LabelId;

/// An address-constant payload (§4.7: "`&global`, `&global + constant`,
/// `"…"`, and `&&label` are valid address constants").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressConstant<'a> {
    Global { name: IdentHandle, offset: i64 },
    Label(LabelId),
    StringLiteral(&'a [u8]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue<'a> {
    Int { value: i128, signed: bool, width: u32 },
    Float(f64),
    Address(AddressConstant<'a>),
    NullPointer,
}

impl<'a> ConstValue<'a> {
    /// §4.7 boolean conversion: integer/float zero is false, non-zero is
    /// true; the null pointer is false; any other address (including the
    /// address of a global) is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            ConstValue::Int { value, .. } => *value != 0,
            ConstValue::Float(f) => *f != 0.0,
            ConstValue::Address(_) => true,
            ConstValue::NullPointer => false,
        }
    }

    pub fn as_int(&self) -> Option<(i128, u32, bool)> {
        match self {
            ConstValue::Int { value, width, signed } => Some((*value, *width, *signed)),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ConstValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn offset_by(self, delta: i64) -> Option<ConstValue<'a>> {
        match self {
            ConstValue::Address(AddressConstant::Global { name, offset }) => {
                Some(ConstValue::Address(AddressConstant::Global { name, offset: offset + delta }))
            }
            _ => None,
        }
    }
}

/// Returned when an expression is not a constant expression at all (as
/// opposed to a constant expression whose evaluation hit a defined-but-
/// diagnosed condition like division by zero, which still yields a value).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotConstant {
    pub reason: &'static str,
}

impl NotConstant {
    pub fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

impl std::fmt::Display for NotConstant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "not a constant expression: {}", self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_zero_rules() {
        assert!(!ConstValue::Int { value: 0, width: 32, signed: true }.is_truthy());
        assert!(ConstValue::Int { value: -1, width: 32, signed: true }.is_truthy());
        assert!(!ConstValue::Float(0.0).is_truthy());
        assert!(!ConstValue::NullPointer.is_truthy());
        assert!(ConstValue::Address(AddressConstant::Label(LabelId(0))).is_truthy());
    }

    #[test]
    fn offset_by_accumulates_on_global() {
        let name = IdentHandle::INVALID;
        let v = ConstValue::Address(AddressConstant::Global { name, offset: 4 });
        let v2 = v.offset_by(8).unwrap();
        assert_eq!(v2, ConstValue::Address(AddressConstant::Global { name, offset: 12 }));
    }
}
