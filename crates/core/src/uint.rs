//! An unsigned 256 bit integer type. Used as the intermediate of fixed-point
//! multiplication and division so that products of two 128 bit mantissas
//! never overflow before being scaled back down.

#![allow(clippy::assign_op_pattern)]
// `construct_uint!` generates unchecked operators
#![allow(clippy::arithmetic_side_effects)]

use uint::construct_uint;

construct_uint! {
    /// Unsigned 256 bit integer.
    pub struct Uint(4);
}

impl Uint {
    /// Convert into a `u128`, if the value fits.
    pub fn to_u128(&self) -> Option<u128> {
        if self.bits() <= 128 {
            Some(self.low_u128())
        } else {
            None
        }
    }

    /// Compute `self * mul / div` without intermediate overflow of the
    /// product as long as it fits in 256 bits. Returns `None` on overflow or
    /// division by zero. The result is truncated.
    pub fn checked_mul_div(&self, mul: Self, div: Self) -> Option<Self> {
        if div.is_zero() {
            return None;
        }
        self.checked_mul(mul)?.checked_div(div)
    }
}
