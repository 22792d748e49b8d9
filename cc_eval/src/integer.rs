//! Checked integer arithmetic over `(value: i128, width, signed)`, grounded
//! on xcc's `evali` binary-op switch (`SAdd`/`UAdd`/`Shr`/`AShr`/...) but
//! generalized from "whatever the host ALU does" to "wrap to the operand
//! width and report whether it overflowed", since §4.7 asks for a warning
//! plus a *defined* wrapped result rather than host-dependent behavior.

/// Truncate `value` to `width` bits, sign- or zero-extending the top bit
/// back out so the stored `i128` always reads as the mathematically correct
/// value for that width/signedness.
pub fn wrap(value: i128, width: u32, signed: bool) -> i128 {
    if width == 0 || width >= 128 {
        return value;
    }
    let mask = (1i128 << width) - 1;
    let v = value & mask;
    if signed && (v & (1i128 << (width - 1))) != 0 {
        v - (1i128 << width)
    } else {
        v
    }
}

fn wrapping(raw: i128, width: u32, signed: bool) -> (i128, bool) {
    let wrapped = wrap(raw, width, signed);
    (wrapped, wrapped != raw)
}

pub fn add(lhs: i128, rhs: i128, width: u32, signed: bool) -> (i128, bool) {
    wrapping(lhs.wrapping_add(rhs), width, signed)
}

pub fn sub(lhs: i128, rhs: i128, width: u32, signed: bool) -> (i128, bool) {
    wrapping(lhs.wrapping_sub(rhs), width, signed)
}

pub fn mul(lhs: i128, rhs: i128, width: u32, signed: bool) -> (i128, bool) {
    wrapping(lhs.wrapping_mul(rhs), width, signed)
}

pub fn neg(operand: i128, width: u32, signed: bool) -> (i128, bool) {
    wrapping(operand.wrapping_neg(), width, signed)
}

/// Division by zero is reported by the caller (this just defines the
/// result); §4.7: "Division and remainder by zero produce a warning and an
/// undef value" — `0` is used as the defined stand-in for "undef".
pub fn div(lhs: i128, rhs: i128, width: u32, signed: bool) -> (i128, bool, bool) {
    if rhs == 0 {
        return (0, false, true);
    }
    let (raw, overflow) = if signed { lhs.overflowing_div(rhs) } else { (((lhs as u128) / (rhs as u128)) as i128, false) };
    let (wrapped, wrap_overflow) = wrapping(raw, width, signed);
    (wrapped, overflow || wrap_overflow, false)
}

pub fn rem(lhs: i128, rhs: i128, width: u32, signed: bool) -> (i128, bool, bool) {
    if rhs == 0 {
        return (0, false, true);
    }
    let raw = if signed { lhs.wrapping_rem(rhs) } else { ((lhs as u128) % (rhs as u128)) as i128 };
    let (wrapped, overflow) = wrapping(raw, width, signed);
    (wrapped, overflow, false)
}

/// §4.7: "Shift by ≥ width or by a negative amount produces a warning; the
/// result is defined as zero." `amount` is the already-evaluated rhs
/// operand, read as a plain (possibly negative) integer.
pub fn shift_is_well_defined(amount: i128, width: u32) -> bool {
    amount >= 0 && (amount as u128) < width as u128
}

pub fn shl(lhs: i128, amount: i128, width: u32, signed: bool) -> i128 {
    if !shift_is_well_defined(amount, width) {
        return 0;
    }
    wrap(lhs.wrapping_shl(amount as u32), width, signed)
}

pub fn shr_unsigned(lhs: i128, amount: i128, width: u32) -> i128 {
    if !shift_is_well_defined(amount, width) {
        return 0;
    }
    let unsigned = wrap(lhs, width, false) as u128 & ((1u128 << width) - 1);
    wrap((unsigned >> amount) as i128, width, false)
}

pub fn shr_arithmetic(lhs: i128, amount: i128, width: u32) -> i128 {
    if !shift_is_well_defined(amount, width) {
        return 0;
    }
    wrap(lhs.wrapping_shr(amount as u32), width, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn wrap_sign_extends_at_width_boundary() {
        assert_eq!(wrap(0xFF, 8, true), -1);
        assert_eq!(wrap(0xFF, 8, false), 0xFF);
    }

    #[test]
    fn add_detects_signed_overflow() {
        let (value, overflowed) = add(i128::from(i32::MAX), 1, 32, true);
        assert!(overflowed);
        assert_eq!(value, i32::MIN as i128);
    }

    #[test]
    fn div_by_zero_is_flagged_and_defined() {
        let (value, overflow, div_zero) = div(10, 0, 32, true);
        assert_eq!(value, 0);
        assert!(!overflow);
        assert!(div_zero);
    }

    #[test]
    fn shift_by_width_or_more_is_zero() {
        assert_eq!(shl(1, 32, 32, false), 0);
        assert_eq!(shr_unsigned(1, 32, 32), 0);
        assert!(!shift_is_well_defined(-1, 32));
    }

    #[test]
    fn arithmetic_shift_preserves_sign() {
        assert_eq!(shr_arithmetic(-8, 1, 32), -4);
    }

    proptest! {
        /// `(a + b) + c` and `a + (b + c)` wrap to the same 32-bit value
        /// regardless of whether either grouping overflows along the way —
        /// two's-complement wraparound is associative modulo `2^32` even
        /// when the individual additions that produce it are not.
        #[test]
        fn add_is_associative_modulo_overflow(a: i32, b: i32, c: i32) {
            let (a, b, c) = (a as i128, b as i128, c as i128);
            let left = add(add(a, b, 32, true).0, c, 32, true).0;
            let right = add(a, add(b, c, 32, true).0, 32, true).0;
            prop_assert_eq!(left, right);
        }
    }
}
